#![allow(dead_code)]

pub const SEARCH_URL: &str =
    "https://www.immoweb.be/en/search/apartment/for-sale/etterbeek/1040?countries=BE&maxPrice=300000&orderBy=relevance";
pub const SEARCH_URL_PAGE_2: &str =
    "https://www.immoweb.be/en/search/apartment/for-sale/etterbeek/1040?countries=BE&maxPrice=300000&orderBy=relevance&page=2";

pub fn card(id: u64, title: &str, price: &str, meta: &str) -> String {
    format!(
        r#"<article data-item="result">
  <small>1040 Etterbeek</small>
  <h2 data-qa="card-title">{title}</h2>
  <a href="/en/classified/apartment/for-sale/etterbeek/1040/{id}">View</a>
  <p data-qa="card-price">{price}</p>
  <ul data-qa="card-parameters">
    <li>{meta}</li>
  </ul>
  <div data-qa="card-agency">Immo Etterbeek</div>
</article>"#
    )
}

pub fn results_page(cards: &[String], next_href: Option<&str>) -> String {
    let next = next_href
        .map(|href| format!(r#"<nav><a rel="next" href="{href}">Next</a></nav>"#))
        .unwrap_or_default();

    format!(
        "<html><body><div id=\"consent\"><button>Accept all</button></div><main>{}</main>{}</body></html>",
        cards.join("\n"),
        next
    )
}

pub fn empty_page() -> String {
    results_page(&[], None)
}
