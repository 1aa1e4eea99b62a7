use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;
use scraper::Html;

use super::{CardSnapshot, ConsentOutcome, DriverError, DriverResult, PageDriver};
use crate::dom;

/// Attribute marking a fixture card as detached: querying it fails.
pub const DETACHED_ATTR: &str = "data-fixture-detached";

#[derive(Debug, Clone)]
struct FixturePage {
    html: String,
    // Markup served once the network went idle, for late-rendering pages
    after_idle: Option<String>,
    broken_consent: bool,
}

/*
   In-memory site: every URL maps to fixed markup. Records what the caller
   did so pagination and cleanup can be asserted without a browser
*/
#[derive(Debug, Default)]
pub struct FixtureDriver {
    pages: HashMap<String, FixturePage>,
    failures: HashMap<String, u32>,
    current: Option<String>,
    idle_reached: bool,
    visited: Vec<String>,
    consent_clicks: usize,
    closed: bool,
}

impl FixtureDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FixturePage {
                html: html.to_string(),
                after_idle: None,
                broken_consent: false,
            },
        );
        self
    }

    pub fn page_after_idle(mut self, url: &str, initial: &str, settled: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FixturePage {
                html: initial.to_string(),
                after_idle: Some(settled.to_string()),
                broken_consent: false,
            },
        );
        self
    }

    pub fn with_broken_consent(mut self, url: &str) -> Self {
        if let Some(page) = self.pages.get_mut(url) {
            page.broken_consent = true;
        }
        self
    }

    /// The next `times` navigations to `url` fail before it loads.
    pub fn failing(mut self, url: &str, times: u32) -> Self {
        self.failures.insert(url.to_string(), times);
        self
    }

    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    pub fn consent_clicks(&self) -> usize {
        self.consent_clicks
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn current_page(&self) -> DriverResult<&FixturePage> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .ok_or_else(|| DriverError::Query {
                selector: String::from("document"),
                reason: String::from("no page loaded"),
            })
    }

    fn current_html(&self) -> DriverResult<&str> {
        let page = self.current_page()?;
        Ok(match (&page.after_idle, self.idle_reached) {
            (Some(settled), true) => settled.as_str(),
            _ => page.html.as_str(),
        })
    }
}

#[async_trait]
impl PageDriver for FixtureDriver {
    async fn open(&mut self, url: &str) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::Closed);
        }

        if let Some(remaining) = self.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    reason: String::from("connection reset"),
                });
            }
        }

        if !self.pages.contains_key(url) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                reason: String::from("404 not found"),
            });
        }

        debug!("Fixture navigation to {}", url);
        self.visited.push(url.to_string());
        self.current = Some(url.to_string());
        self.idle_reached = false;
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.current_page()?;
        self.current.clone().ok_or(DriverError::Closed)
    }

    async fn dismiss_consent(&mut self, labels: &[String]) -> DriverResult<ConsentOutcome> {
        let page = self.current_page()?;
        if page.broken_consent {
            return Err(DriverError::Query {
                selector: String::from("button"),
                reason: String::from("click intercepted"),
            });
        }

        let found = {
            let doc = Html::parse_document(self.current_html()?);
            let buttons = dom::compile_selectors(&[String::from("button")]);
            dom::select_any(&doc, &buttons).into_iter().any(|button| {
                let text = dom::inner_text(button).to_lowercase();
                labels
                    .iter()
                    .any(|label| text.contains(&label.to_lowercase()))
            })
        };

        if found {
            self.consent_clicks += 1;
            Ok(ConsentOutcome::Dismissed)
        } else {
            Ok(ConsentOutcome::NotPresent)
        }
    }

    async fn wait_network_idle(&mut self) -> DriverResult<()> {
        self.current_page()?;
        self.idle_reached = true;
        Ok(())
    }

    async fn query_all(&self, selectors: &[String]) -> DriverResult<Vec<DriverResult<CardSnapshot>>> {
        let doc = Html::parse_document(self.current_html()?);
        let compiled = dom::compile_selectors(selectors);

        let cards = dom::select_any(&doc, &compiled)
            .into_iter()
            .map(|card| {
                if card.value().attr(DETACHED_ATTR).is_some() {
                    Err(DriverError::Detached)
                } else {
                    Ok(CardSnapshot::new(card.html()))
                }
            })
            .collect();

        Ok(cards)
    }

    async fn first_attribute(
        &self,
        selectors: &[String],
        name: &str,
    ) -> DriverResult<Option<String>> {
        let doc = Html::parse_document(self.current_html()?);
        let compiled = dom::compile_selectors(selectors);

        Ok(dom::first_any(&doc, &compiled)
            .and_then(|element| element.value().attr(name))
            .map(str::to_string))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}
