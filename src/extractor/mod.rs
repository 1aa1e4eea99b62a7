pub mod normalize;

use chrono::{DateTime, Utc};
use log::debug;
use scraper::{Html, Selector};
use url::Url;

use crate::{
    config::{Config, SiteSelectors},
    dom,
    driver::CardSnapshot,
    models::listing::{Listing, ListingDraft},
};

use normalize::{listing_id_from_url, parse_meta_block, parse_price, zipcode_and_locality};

/// Parsed markup of one card. Only lives for the duration of an extraction.
pub struct CardView {
    doc: Html,
}

impl CardView {
    pub fn parse(snapshot: &CardSnapshot) -> Self {
        CardView {
            doc: Html::parse_fragment(snapshot.html()),
        }
    }

    /// Text of the first element matching `selector`, `None` when absent or blank.
    pub fn first_text(&self, selector: &Selector) -> Option<String> {
        self.doc
            .select(selector)
            .next()
            .map(dom::inner_text)
            .and_then(dom::non_empty)
    }

    pub fn texts_any(&self, selectors: &[Selector]) -> Vec<String> {
        dom::select_any(&self.doc, selectors)
            .into_iter()
            .map(dom::inner_text)
            .filter(|text| !text.is_empty())
            .collect()
    }

    pub fn first_attr_any(&self, selectors: &[Selector], name: &str) -> Option<String> {
        dom::first_any(&self.doc, selectors)
            .and_then(|element| element.value().attr(name))
            .map(|value| value.trim().to_string())
            .and_then(dom::non_empty)
    }
}

pub type Rule = Box<dyn Fn(&CardView) -> Option<String> + Send + Sync>;

pub fn text_of(selector: Selector) -> Rule {
    Box::new(move |card: &CardView| card.first_text(&selector))
}

/*
   Ordered candidates for one field. The first rule returning text wins and
   the remaining ones are never evaluated
*/
pub struct FallbackChain {
    rules: Vec<Rule>,
}

impl FallbackChain {
    pub fn new(rules: Vec<Rule>) -> Self {
        FallbackChain { rules }
    }

    pub fn from_selectors(selectors: &[String]) -> Self {
        let rules = dom::compile_selectors(selectors)
            .into_iter()
            .map(text_of)
            .collect();
        FallbackChain { rules }
    }

    pub fn first(&self, card: &CardView) -> Option<String> {
        self.rules.iter().find_map(|rule| rule(card))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub struct CardExtractor {
    title: FallbackChain,
    price: FallbackChain,
    agency: FallbackChain,
    meta: FallbackChain,
    detail_link: Vec<Selector>,
    locality: Vec<Selector>,
    property_type: String,
}

impl CardExtractor {
    pub fn new(selectors: &SiteSelectors, property_type: &str) -> Self {
        CardExtractor {
            title: FallbackChain::from_selectors(&selectors.title),
            price: FallbackChain::from_selectors(&selectors.price),
            agency: FallbackChain::from_selectors(&selectors.agency),
            meta: FallbackChain::from_selectors(&selectors.meta),
            detail_link: dom::compile_selectors(&selectors.detail_link),
            locality: dom::compile_selectors(&selectors.locality),
            property_type: property_type.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.selectors, &config.property_type)
    }

    pub fn extract(&self, card: &CardSnapshot, page_url: Option<&Url>) -> Listing {
        self.extract_at(card, page_url, Utc::now())
    }

    /*
       Every field degrades to None on its own; nothing in here can fail the
       card as a whole
    */
    pub fn extract_at(
        &self,
        card: &CardSnapshot,
        page_url: Option<&Url>,
        scraped_at: DateTime<Utc>,
    ) -> Listing {
        let view = CardView::parse(card);
        let mut draft = ListingDraft {
            property_type: Some(self.property_type.clone()),
            ..ListingDraft::default()
        };

        draft.url = view
            .first_attr_any(&self.detail_link, "href")
            .map(|href| absolute_url(&href, page_url));
        draft.listing_id = draft.url.as_deref().and_then(listing_id_from_url);

        draft.title = self.title.first(&view);
        draft.agency = self.agency.first(&view);

        if let Some(price_text) = self.price.first(&view) {
            draft.price_eur = parse_price(&price_text);
            if draft.price_eur.is_none() {
                debug!("Unparseable price '{}'", price_text);
            }
        }

        let meta = parse_meta_block(&self.meta.first(&view).unwrap_or_default());
        draft.bedrooms = meta.bedrooms;
        draft.bathrooms = meta.bathrooms;
        draft.habitable_area_sqm = meta.habitable_area_sqm;
        draft.floor = meta.floor;
        draft.epc = meta.epc;

        // The first small-text element that looks like "1040 Etterbeek" wins
        let (zipcode, locality) = view
            .texts_any(&self.locality)
            .iter()
            .map(|text| zipcode_and_locality(text))
            .find(|(zipcode, _)| zipcode.is_some())
            .unwrap_or((None, None));
        draft.zipcode = zipcode;
        draft.locality = locality;

        draft.finish(scraped_at)
    }
}

fn absolute_url(href: &str, base: Option<&Url>) -> String {
    let resolved = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };

    resolved
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}
