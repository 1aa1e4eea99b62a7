use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/*
   One scraped listing. Fields are read-only once built; a wrong value is
   fixed by extracting the card again, never by patching the record
*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    listing_id: Option<String>,
    title: Option<String>,
    price_eur: Option<f64>,
    locality: Option<String>,
    zipcode: Option<String>,
    bedrooms: Option<f64>,
    bathrooms: Option<f64>,
    habitable_area_sqm: Option<f64>,
    floor: Option<String>,
    epc: Option<String>,
    property_type: Option<String>,
    url: Option<String>,
    agency: Option<String>,
    date_scraped: DateTime<Utc>,
}

/// Mutable staging area filled field by field during extraction.
#[derive(Debug, Clone, Default)]
pub struct ListingDraft {
    pub listing_id: Option<String>,
    pub title: Option<String>,
    pub price_eur: Option<f64>,
    pub locality: Option<String>,
    pub zipcode: Option<String>,
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
    pub habitable_area_sqm: Option<f64>,
    pub floor: Option<String>,
    pub epc: Option<String>,
    pub property_type: Option<String>,
    pub url: Option<String>,
    pub agency: Option<String>,
}

impl ListingDraft {
    pub fn finish(self, date_scraped: DateTime<Utc>) -> Listing {
        Listing {
            listing_id: self.listing_id,
            title: self.title,
            price_eur: self.price_eur,
            locality: self.locality,
            zipcode: self.zipcode,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            habitable_area_sqm: self.habitable_area_sqm,
            floor: self.floor,
            epc: self.epc,
            property_type: self.property_type,
            url: self.url,
            agency: self.agency,
            date_scraped,
        }
    }
}

impl Listing {
    pub fn listing_id(&self) -> Option<&str> {
        self.listing_id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn price_eur(&self) -> Option<f64> {
        self.price_eur
    }

    pub fn locality(&self) -> Option<&str> {
        self.locality.as_deref()
    }

    pub fn zipcode(&self) -> Option<&str> {
        self.zipcode.as_deref()
    }

    pub fn bedrooms(&self) -> Option<f64> {
        self.bedrooms
    }

    pub fn bathrooms(&self) -> Option<f64> {
        self.bathrooms
    }

    pub fn habitable_area_sqm(&self) -> Option<f64> {
        self.habitable_area_sqm
    }

    pub fn floor(&self) -> Option<&str> {
        self.floor.as_deref()
    }

    pub fn epc(&self) -> Option<&str> {
        self.epc.as_deref()
    }

    pub fn property_type(&self) -> Option<&str> {
        self.property_type.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn agency(&self) -> Option<&str> {
        self.agency.as_deref()
    }

    pub fn date_scraped(&self) -> DateTime<Utc> {
        self.date_scraped
    }

    pub fn identity(&self) -> (Option<&str>, Option<&str>) {
        (self.listing_id(), self.url())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}
