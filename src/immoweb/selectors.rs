use crate::config::SiteSelectors;

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/*
   Immoweb search result markup. Order inside the chains matters: the first
   selector yielding non-empty text wins
*/
pub fn immoweb() -> SiteSelectors {
    SiteSelectors {
        cards: owned(&[
            "[data-item='result']",
            "article:has(a[href*='/en/classified'])",
        ]),
        next_link: owned(&["a[aria-label*='Next']", "a[rel='next']"]),
        detail_link: owned(&[
            "a[href*='/en/classified']",
            "a[href*='/fr/annonce']",
            "a[href*='/nl/zoekertje']",
        ]),
        title: owned(&["[data-qa='card-title']", "h2", "h3"]),
        price: owned(&["[data-qa='card-price']", "[class*='price']"]),
        agency: owned(&["[data-qa='card-agency']", "[class*='agency']"]),
        meta: owned(&[
            "[data-qa='card-parameters']",
            "ul",
            ".classified__information--property",
            "[class*='property-parameters']",
        ]),
        locality: owned(&[
            "a[href*='/en/']",
            "a[href*='/fr/']",
            "a[href*='/nl/']",
            "small",
            "span",
        ]),
        consent_labels: owned(&["Accept", "Accepter", "Accepteren"]),
    }
}
