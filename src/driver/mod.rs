pub mod chromium;
pub mod fixture;

use async_trait::async_trait;
use thiserror::Error;

pub use chromium::ChromiumDriver;
pub use fixture::FixtureDriver;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("query '{selector}' failed: {reason}")]
    Query { selector: String, reason: String },
    #[error("element detached before it could be read")]
    Detached,
    #[error("browser session is closed")]
    Closed,
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Result of the best-effort cookie banner click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Dismissed,
    NotPresent,
}

/// Detached copy of one card's markup, taken when the card was queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSnapshot {
    html: String,
}

impl CardSnapshot {
    pub fn new(html: impl Into<String>) -> Self {
        CardSnapshot { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

/*
   A rendering session holding exactly one page. Selector lists passed to
   the query methods are alternations: any entry may match, results come
   back in document order
*/
#[async_trait]
pub trait PageDriver: Send {
    /// Load `url`, wait for the load event, then for the settle duration.
    async fn open(&mut self, url: &str) -> DriverResult<()>;

    /// URL of the loaded page after redirects.
    async fn current_url(&self) -> DriverResult<String>;

    async fn dismiss_consent(&mut self, labels: &[String]) -> DriverResult<ConsentOutcome>;

    async fn wait_network_idle(&mut self) -> DriverResult<()>;

    /// One entry per matching element; an element that cannot be read is
    /// reported on its own without failing its siblings.
    async fn query_all(&self, selectors: &[String]) -> DriverResult<Vec<DriverResult<CardSnapshot>>>;

    /// Attribute of the first matching element, `None` when either is absent.
    async fn first_attribute(&self, selectors: &[String], name: &str)
        -> DriverResult<Option<String>>;

    /// Releases the browser. Safe to call more than once.
    async fn close(&mut self) -> DriverResult<()>;
}
