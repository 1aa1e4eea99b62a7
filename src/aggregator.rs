use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::models::listing::{Listing, OutputFormat};

/// Deduplicated, sorted rows ready to be written out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingTable {
    rows: Vec<Listing>,
}

/*
   None always sorts after Some, whichever direction the values go
*/
fn nulls_last(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/*
   First occurrence of each (listing_id, url) pair wins; absent parts of the
   key compare equal to each other. Rows are then ordered by price
   ascending, larger area first on ties, missing values last. The sort is
   stable so equal rows keep their scrape order
*/
pub fn aggregate<I>(listings: I) -> ListingTable
where
    I: IntoIterator<Item = Listing>,
{
    let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::new();
    let mut rows: Vec<Listing> = listings
        .into_iter()
        .filter(|listing| {
            let (id, url) = listing.identity();
            seen.insert((id.map(str::to_string), url.map(str::to_string)))
        })
        .collect();

    rows.sort_by(|a, b| {
        nulls_last(a.price_eur(), b.price_eur(), false).then_with(|| {
            nulls_last(a.habitable_area_sqm(), b.habitable_area_sqm(), true)
        })
    });

    ListingTable { rows }
}

impl ListingTable {
    pub fn rows(&self) -> &[Listing] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row plus one row per listing; unset fields are empty cells.
    pub fn to_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        if self.rows.is_empty() {
            csv_writer.write_record(CSV_HEADER)?;
        }
        for listing in &self.rows {
            csv_writer.serialize(listing)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Pretty-printed array of objects; unset fields are `null`.
    pub fn to_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.rows)?;
        Ok(())
    }

    pub fn write_files(
        &self,
        dir: &Path,
        stem: &str,
        formats: &[OutputFormat],
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output dir {}", dir.display()))?;

        let mut written = Vec::new();
        for format in formats {
            let path = dir.join(format!("{}.{}", stem, format.extension()));
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);

            match format {
                OutputFormat::Csv => self.to_csv(&mut writer)?,
                OutputFormat::Json => self.to_json(&mut writer)?,
            }
            writer
                .flush()
                .with_context(|| format!("failed to write {}", path.display()))?;

            info!("Saved {} -> {}", format.extension().to_uppercase(), path.display());
            written.push(path);
        }

        Ok(written)
    }
}

// serde only emits a header together with the first record
const CSV_HEADER: [&str; 14] = [
    "listing_id",
    "title",
    "price_eur",
    "locality",
    "zipcode",
    "bedrooms",
    "bathrooms",
    "habitable_area_sqm",
    "floor",
    "epc",
    "property_type",
    "url",
    "agency",
    "date_scraped",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_still_has_header() {
        let mut buffer = Vec::new();
        ListingTable::default().to_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.trim_end(), CSV_HEADER.join(","));
    }

    #[test]
    fn empty_table_is_empty_json_array() {
        let mut buffer = Vec::new();
        ListingTable::default().to_json(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "[]");
    }
}
