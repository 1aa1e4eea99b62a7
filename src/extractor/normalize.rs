use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref NON_NUMERIC: Regex = Regex::new(r"[^0-9,.]").unwrap();
    static ref PRICE_RUN: Regex = Regex::new(r"\d[\d.,\s]*").unwrap();
    static ref BEDROOMS: Regex =
        Regex::new(r"(\d+[.,]?\d*)\s*(bed|bedroom|chambre|slaapkamer)s?").unwrap();
    static ref BATHROOMS: Regex =
        Regex::new(r"(\d+[.,]?\d*)\s*(bath|bathroom|salle de bain|badkamer)s?").unwrap();
    static ref AREA: Regex = Regex::new(r"(\d+[.,]?\d*)\s*(m²|sqm|m2)").unwrap();
    static ref FLOOR: Regex = Regex::new(
        r"(ground|rez|rdc|gelijkvloers|first|1st|2nd|3rd|\d+(?:th|er|ste|de|e)?)\s*(floor|étage|verdieping)"
    )
    .unwrap();
    static ref EPC: Regex = Regex::new(r"(?:epc|peb|epb)\s*[:\-]?\s*([a-g][+\-]?)(?:[^a-z0-9]|$)").unwrap();
    static ref ZIP_LOCALITY: Regex = Regex::new(r"\b(\d{4})\s+([\w\-'\s]+)").unwrap();
    static ref ID_RUN: Regex = Regex::new(r"\d{6,}").unwrap();
    static ref DOT_GROUPED: Regex = Regex::new(r"^\d{1,3}(?:\.\d{3})+$").unwrap();
}

/*
   Keeps digits, dots and commas. One comma sitting after the last dot (or
   after several dots) marks the European format "1.234,56"; otherwise
   commas are thousands separators as in "1,234.56". Without any comma,
   dots grouping digits in threes ("295.000") are thousands separators too
*/
pub fn parse_float(text: &str) -> Option<f64> {
    let cleaned = NON_NUMERIC.replace_all(text, "");
    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();
    let comma_after_dot = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) => comma > dot,
        _ => false,
    };

    let normalized = if commas == 1 && (dots > 1 || comma_after_dot) {
        cleaned.replace('.', "").replace(',', ".")
    } else if commas == 0 && DOT_GROUPED.is_match(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned.replace(',', "")
    };

    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Price from display text such as "€ 295,000" or "Price on request".
pub fn parse_price(text: &str) -> Option<f64> {
    PRICE_RUN
        .find(text)
        .and_then(|run| parse_float(run.as_str()))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaFields {
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
    pub habitable_area_sqm: Option<f64>,
    pub floor: Option<String>,
    pub epc: Option<String>,
}

fn first_number(pattern: &Regex, text: &str) -> Option<f64> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|number| parse_float(number.as_str()))
}

/*
   The meta block mixes English, French and Dutch labels, e.g.
   "2 bedrooms 95 m² 3rd floor EPC: C+"
*/
pub fn parse_meta_block(text: &str) -> MetaFields {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    MetaFields {
        bedrooms: first_number(&BEDROOMS, &normalized),
        bathrooms: first_number(&BATHROOMS, &normalized),
        habitable_area_sqm: first_number(&AREA, &normalized),
        floor: FLOOR
            .find(&normalized)
            .map(|floor| floor.as_str().to_string()),
        epc: EPC
            .captures(&normalized)
            .and_then(|captures| captures.get(1))
            .map(|grade| normalize_epc(grade.as_str())),
    }
}

pub fn normalize_epc(grade: &str) -> String {
    grade.trim().to_uppercase()
}

/// First run of six or more digits inside a path segment of `url`.
pub fn listing_id_from_url(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.split('/')
        .find_map(|segment| ID_RUN.find(segment))
        .map(|run| run.as_str().to_string())
}

/*
   Best effort: "1040 Etterbeek" gives zipcode 1040 and locality Etterbeek.
   Any four digit number followed by words matches
*/
pub fn zipcode_and_locality(text: &str) -> (Option<String>, Option<String>) {
    match ZIP_LOCALITY.captures(text) {
        Some(captures) => {
            let zipcode = captures.get(1).map(|zip| zip.as_str().to_string());
            let locality = captures
                .get(2)
                .map(|words| words.as_str().trim().to_string())
                .filter(|words| !words.is_empty());
            (zipcode, locality)
        }
        None => (None, None),
    }
}
