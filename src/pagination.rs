use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::Stream;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use rand::Rng;
use regex::{Captures, Regex};
use url::Url;

use crate::{
    config::{Config, RetryPolicy, SiteSelectors},
    driver::{CardSnapshot, ConsentOutcome, DriverError, PageDriver},
};

lazy_static! {
    static ref PAGE_PARAM: Regex = Regex::new(r"([?&]page=)(\d+)").unwrap();
}

/// How the URL of the following page was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    ExplicitLink,
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPage {
    pub url: String,
    pub mode: PaginationMode,
}

/// Current URL and pages visited so far. Only moves forward.
#[derive(Debug, Clone)]
pub struct PageCursor {
    url: String,
    pages_visited: usize,
}

impl PageCursor {
    pub fn new(start_url: &str) -> Self {
        PageCursor {
            url: start_url.to_string(),
            pages_visited: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn pages_visited(&self) -> usize {
        self.pages_visited
    }
}

/// Cards found on one results page.
#[derive(Debug, Clone)]
pub struct PageBatch {
    pub page_number: usize,
    pub url: String,
    pub cards: Vec<CardSnapshot>,
    /// Cards matched by the selector but lost before they could be read.
    pub skipped: usize,
    /// Page the walk continues with, `None` when this was the last one.
    pub next: Option<NextPage>,
}

impl PageBatch {
    pub fn matched(&self) -> usize {
        self.cards.len() + self.skipped
    }
}

pub fn has_page_param(url: &str) -> bool {
    PAGE_PARAM.is_match(url)
}

/*
   Bumps an existing page=N, otherwise appends page=2. The fragment, if
   any, stays at the end
*/
pub fn synthesize_next(url: &str) -> String {
    if let Some((base, fragment)) = url.split_once('#') {
        return format!("{}#{}", synthesize_next(base), fragment);
    }

    let current = PAGE_PARAM
        .captures(url)
        .and_then(|captures| captures[2].parse::<u64>().ok());

    match current {
        Some(number) => PAGE_PARAM
            .replace(url, |captures: &Captures| {
                format!("{}{}", &captures[1], number + 1)
            })
            .into_owned(),
        None => {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{url}{separator}page=2")
        }
    }
}

/// An explicit "next" href always wins over a synthesized URL.
pub fn resolve_next(current_url: &str, explicit_href: Option<&str>) -> NextPage {
    let explicit = explicit_href
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| match Url::parse(current_url) {
            Ok(base) => base
                .join(href)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| href.to_string()),
            Err(_) => href.to_string(),
        });

    match explicit {
        Some(url) => NextPage {
            url,
            mode: PaginationMode::ExplicitLink,
        },
        None => NextPage {
            url: synthesize_next(current_url),
            mode: PaginationMode::Synthesized,
        },
    }
}

/*
   Results ran out: synthesized pagination, the current URL is already a
   page=N URL, this is not the first page and nothing matched. Explicit
   links never end the walk, only the page cap does
*/
pub fn reached_end(mode: PaginationMode, current_url: &str, page_number: usize, matched: usize) -> bool {
    mode == PaginationMode::Synthesized
        && has_page_param(current_url)
        && page_number > 1
        && matched == 0
}

fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy
        .backoff_ms
        .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(16));
    let jitter = rand::thread_rng().gen_range(0..=policy.backoff_ms / 2);
    Duration::from_millis(base.saturating_add(jitter))
}

/*
   Walks result pages one at a time on a single driver session. Each call
   to next_batch loads exactly one page; the walk ends at max_pages or when
   synthesized pagination runs dry
*/
pub struct PaginationWalker<'a, D: PageDriver> {
    driver: &'a mut D,
    selectors: SiteSelectors,
    retry: RetryPolicy,
    cursor: PageCursor,
    max_pages: usize,
    visited: HashSet<String>,
    finished: bool,
}

impl<'a, D: PageDriver> PaginationWalker<'a, D> {
    pub fn new(driver: &'a mut D, config: &Config, start_url: &str, max_pages: usize) -> Self {
        PaginationWalker {
            driver,
            selectors: config.selectors.clone(),
            retry: config.retry.clone(),
            cursor: PageCursor::new(start_url),
            max_pages,
            visited: HashSet::new(),
            finished: false,
        }
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished || self.cursor.pages_visited >= self.max_pages
    }

    async fn open_with_retry(&mut self, url: &str) -> Result<()> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.driver.open(url).await {
                Ok(()) => return Ok(()),
                Err(e @ DriverError::Navigation { .. }) if attempt < attempts => {
                    let delay = backoff_delay(&self.retry, attempt);
                    warn!(
                        "Loading {} failed (attempt {}/{}): {}. Retrying in {:?}",
                        url, attempt, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to load {url} after {attempt} attempt(s)"))
                }
            }
        }
    }

    async fn query_cards(&mut self) -> Result<(Vec<CardSnapshot>, usize)> {
        let mut results = self.driver.query_all(&self.selectors.cards).await?;

        if results.is_empty() {
            debug!("No cards on first query, waiting for network idle");
            self.driver.wait_network_idle().await?;
            results = self.driver.query_all(&self.selectors.cards).await?;
        }

        let mut cards = Vec::with_capacity(results.len());
        let mut skipped = 0;
        for result in results {
            match result {
                Ok(card) => cards.push(card),
                Err(e) => {
                    warn!("Skipping card: {}", e);
                    skipped += 1;
                }
            }
        }

        Ok((cards, skipped))
    }

    fn pick_next(&self, current_url: &str, explicit_href: Option<&str>) -> Option<NextPage> {
        let next = resolve_next(current_url, explicit_href);
        if !self.visited.contains(&next.url) {
            return Some(next);
        }

        // A stale "next" link pointing backwards: fall back to synthesizing
        let synthesized = resolve_next(current_url, None);
        if self.visited.contains(&synthesized.url) {
            None
        } else {
            Some(synthesized)
        }
    }

    pub async fn next_batch(&mut self) -> Result<Option<PageBatch>> {
        if self.is_finished() {
            return Ok(None);
        }

        let requested = self.cursor.url.clone();
        self.open_with_retry(&requested).await?;
        self.visited.insert(requested.clone());

        // Best effort: a missing banner or a failed click never stops the page
        let consent = self.driver.dismiss_consent(&self.selectors.consent_labels).await;
        match consent {
            Ok(ConsentOutcome::Dismissed) => debug!("Dismissed cookie consent on {}", requested),
            Ok(ConsentOutcome::NotPresent) => {}
            Err(e) => debug!("Ignoring consent failure on {}: {}", requested, e),
        }

        let (cards, skipped) = self.query_cards().await?;

        let loaded_url = self
            .driver
            .current_url()
            .await
            .unwrap_or_else(|_| requested.clone());
        self.visited.insert(loaded_url.clone());

        let explicit_href = self
            .driver
            .first_attribute(&self.selectors.next_link, "href")
            .await?;

        self.cursor.pages_visited += 1;
        let page_number = self.cursor.pages_visited;
        let matched = cards.len() + skipped;

        info!(
            "Page {}: {} cards ({} skipped) at {}",
            page_number, matched, skipped, loaded_url
        );

        let next = match self.pick_next(&loaded_url, explicit_href.as_deref()) {
            None => {
                info!("Next page would revisit a known URL, stopping");
                self.finished = true;
                None
            }
            Some(next) if reached_end(next.mode, &requested, page_number, matched) => {
                info!("No more results after page {}", page_number);
                self.finished = true;
                None
            }
            Some(next) => {
                debug!("Next page ({:?}): {}", next.mode, next.url);
                self.cursor.url = next.url.clone();
                Some(next)
            }
        };

        if self.cursor.pages_visited >= self.max_pages {
            info!("Reached page cap of {}", self.max_pages);
        }

        Ok(Some(PageBatch {
            page_number,
            url: loaded_url,
            cards,
            skipped,
            next,
        }))
    }

    /// Lazy, single-use stream of page batches.
    pub fn into_stream(self) -> impl Stream<Item = Result<PageBatch>> + 'a {
        futures::stream::try_unfold(self, |mut walker| async move {
            let batch = walker.next_batch().await?;
            Ok::<_, anyhow::Error>(batch.map(|batch| (batch, walker)))
        })
    }
}
