use url::Url;

/*
   Output files are named immoweb_<region>_<pricecap>, e.g. a search for
   etterbeek capped at maxPrice=300000 gives immoweb_etterbeek_300k
*/
pub fn output_stem(start_url: &str) -> String {
    let (region, price_cap) = match Url::parse(start_url) {
        Ok(url) => (region(&url), price_cap(&url)),
        Err(_) => (None, None),
    };

    format!(
        "immoweb_{}_{}",
        region.unwrap_or_else(|| String::from("all")),
        price_cap.unwrap_or_else(|| String::from("nocap"))
    )
}

fn region(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_alphabetic() || c == '-')
        })
        .last()
        .map(|segment| segment.to_lowercase())
}

fn price_cap(url: &Url) -> Option<String> {
    let (_, value) = url
        .query_pairs()
        .find(|(key, _)| key.eq_ignore_ascii_case("maxPrice"))?;
    let amount: u64 = value.parse().ok()?;

    if amount >= 1000 && amount % 1000 == 0 {
        Some(format!("{}k", amount / 1000))
    } else {
        Some(amount.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::output_stem;

    #[test]
    fn stem_from_search_url() {
        let url = "https://www.immoweb.be/en/search/apartment/for-sale/etterbeek/1040?countries=BE&maxPrice=300000&page=1&orderBy=relevance";
        assert_eq!(output_stem(url), "immoweb_etterbeek_300k");
    }

    #[test]
    fn stem_without_cap_or_region() {
        assert_eq!(output_stem("https://www.immoweb.be/1040"), "immoweb_all_nocap");
        assert_eq!(output_stem("not a url"), "immoweb_all_nocap");
    }

    #[test]
    fn odd_cap_is_kept_verbatim() {
        let url = "https://www.immoweb.be/en/search/apartment/for-sale/ixelles?maxPrice=275500";
        assert_eq!(output_stem(url), "immoweb_ixelles_275500");
    }
}
