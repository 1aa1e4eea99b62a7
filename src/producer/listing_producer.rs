use std::time::{Duration, Instant};

use anyhow::Result;
use futures::{pin_mut, TryStreamExt};
use log::{info, warn};
use url::Url;

use crate::{
    aggregator::{aggregate, ListingTable},
    config::Config,
    driver::{ChromiumDriver, PageDriver},
    extractor::CardExtractor,
    models::listing::Listing,
    pagination::PaginationWalker,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub pages_visited: usize,
    pub cards_seen: usize,
    pub cards_skipped: usize,
    pub listings_extracted: usize,
    pub rows: usize,
    pub elapsed: Duration,
}

pub struct ListingProducer;

impl ListingProducer {
    /*
       Launches Chromium, walks the results and always closes the browser
       before returning, whether the walk succeeded or not
    */
    pub async fn run_chromium(
        config: &Config,
        start_url: &str,
        max_pages: usize,
    ) -> Result<(ListingTable, RunSummary)> {
        let mut driver = ChromiumDriver::launch(config).await?;
        Self::run(config, &mut driver, start_url, max_pages).await
    }

    pub async fn run<D: PageDriver>(
        config: &Config,
        driver: &mut D,
        start_url: &str,
        max_pages: usize,
    ) -> Result<(ListingTable, RunSummary)> {
        info!("Starting scrape of {} (max {} pages)", start_url, max_pages);
        let start = Instant::now();

        let collected = Self::collect(config, driver, start_url, max_pages).await;

        if let Err(e) = driver.close().await {
            warn!("Failed to release browser session: {}", e);
        }

        let (listings, mut summary) = collected?;
        let table = aggregate(listings);

        summary.rows = table.len();
        summary.elapsed = start.elapsed();

        info!(
            "Finished scrape in {:?}: {} pages, {} cards ({} skipped), {} rows after dedup",
            summary.elapsed,
            summary.pages_visited,
            summary.cards_seen,
            summary.cards_skipped,
            summary.rows
        );

        Ok((table, summary))
    }

    async fn collect<D: PageDriver>(
        config: &Config,
        driver: &mut D,
        start_url: &str,
        max_pages: usize,
    ) -> Result<(Vec<Listing>, RunSummary)> {
        let extractor = CardExtractor::from_config(config);
        let mut listings: Vec<Listing> = Vec::new();
        let mut summary = RunSummary::default();

        let batches = PaginationWalker::new(driver, config, start_url, max_pages).into_stream();
        pin_mut!(batches);

        while let Some(batch) = batches.try_next().await? {
            let page_url = Url::parse(&batch.url).ok();

            summary.pages_visited += 1;
            summary.cards_seen += batch.matched();
            summary.cards_skipped += batch.skipped;

            // Pages are sequential; cards of one page are extracted in order
            for card in &batch.cards {
                listings.push(extractor.extract(card, page_url.as_ref()));
            }
        }

        summary.listings_extracted = listings.len();
        Ok((listings, summary))
    }
}
