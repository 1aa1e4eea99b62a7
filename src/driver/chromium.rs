use std::fmt::Display;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use super::{CardSnapshot, ConsentOutcome, DriverError, DriverResult, PageDriver};
use crate::config::Config;

const IDLE_POLL: Duration = Duration::from_millis(100);
const RESOURCE_COUNT_JS: &str =
    "document.readyState === 'complete' ? performance.getEntriesByType('resource').length : -1";

// Consent banners rendered inside a shadow root hang off one of these hosts
const CONSENT_SHADOW_HOSTS: &[&str] = &["#usercentrics-root"];

/*
   Clicks the first button whose text contains one of `labels`, searching
   the document first and then the shadow roots of the consent hosts.
   Evaluates to whether a button was clicked
*/
fn consent_script(labels: &[String]) -> String {
    let lowered: Vec<String> = labels.iter().map(|label| label.to_lowercase()).collect();
    let labels_json = serde_json::to_string(&lowered).unwrap_or_else(|_| String::from("[]"));
    let hosts_json =
        serde_json::to_string(CONSENT_SHADOW_HOSTS).unwrap_or_else(|_| String::from("[]"));

    format!(
        r#"(() => {{
    const labels = {labels_json};
    const roots = [document];
    for (const selector of {hosts_json}) {{
        const host = document.querySelector(selector);
        if (host && host.shadowRoot) roots.push(host.shadowRoot);
    }}
    for (const root of roots) {{
        for (const button of root.querySelectorAll('button')) {{
            const text = (button.innerText || button.textContent || '').toLowerCase();
            if (labels.some((label) => text.includes(label))) {{
                button.click();
                return true;
            }}
        }}
    }}
    return false;
}})()"#
    )
}

fn query_error(selector: &str, reason: impl Display) -> DriverError {
    DriverError::Query {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

/// Headless Chromium session driven over CDP.
pub struct ChromiumDriver {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    settle: Duration,
    consent_pause: Duration,
    network_idle: Duration,
    network_idle_timeout: Duration,
    navigation_timeout: Duration,
}

impl ChromiumDriver {
    pub async fn launch(config: &Config) -> DriverResult<ChromiumDriver> {
        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.arg(format!("--user-agent={user_agent}"));
        }
        let browser_config = builder.build().map_err(DriverError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while the handler is polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(DriverError::Launch(e.to_string()));
            }
        };

        info!("Launched Chromium (headless: {})", config.headless);

        Ok(ChromiumDriver {
            browser: Some(browser),
            page: Some(page),
            handler: Some(handler_task),
            settle: config.settle(),
            consent_pause: config.consent_pause(),
            network_idle: Duration::from_millis(config.network_idle_ms),
            network_idle_timeout: Duration::from_millis(config.network_idle_timeout_ms),
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
        })
    }

    fn page(&self) -> DriverResult<&Page> {
        self.page.as_ref().ok_or(DriverError::Closed)
    }

    async fn resource_count(&self) -> DriverResult<i64> {
        self.page()?
            .evaluate(RESOURCE_COUNT_JS)
            .await
            .map_err(|e| query_error("performance", e))?
            .into_value::<i64>()
            .map_err(|e| query_error("performance", e))
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn open(&mut self, url: &str) -> DriverResult<()> {
        let page = self.page()?;
        let navigation_error = |reason: String| DriverError::Navigation {
            url: url.to_string(),
            reason,
        };

        match tokio::time::timeout(self.navigation_timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(navigation_error(e.to_string())),
            Err(_) => {
                return Err(navigation_error(format!(
                    "timed out after {:?}",
                    self.navigation_timeout
                )))
            }
        }

        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.page()?
            .url()
            .await
            .map_err(|e| query_error("location", e))?
            .ok_or_else(|| query_error("location", "page has no url"))
    }

    async fn dismiss_consent(&mut self, labels: &[String]) -> DriverResult<ConsentOutcome> {
        let clicked = self
            .page()?
            .evaluate(consent_script(labels))
            .await
            .map_err(|e| query_error("button", e))?
            .into_value::<bool>()
            .map_err(|e| query_error("button", e))?;

        if !clicked {
            return Ok(ConsentOutcome::NotPresent);
        }

        tokio::time::sleep(self.consent_pause).await;
        Ok(ConsentOutcome::Dismissed)
    }

    /*
       CDP has no direct network-idle wait. The page counts as idle once the
       document is complete and no new resource entries appeared for the
       idle window. Hitting the timeout is not an error
    */
    async fn wait_network_idle(&mut self) -> DriverResult<()> {
        let started = Instant::now();
        let mut last_count = self.resource_count().await?;
        let mut stable_since = Instant::now();

        while started.elapsed() < self.network_idle_timeout {
            tokio::time::sleep(IDLE_POLL).await;
            let count = self.resource_count().await?;

            if count != last_count || count < 0 {
                last_count = count;
                stable_since = Instant::now();
            } else if stable_since.elapsed() >= self.network_idle {
                return Ok(());
            }
        }

        debug!(
            "Network did not settle within {:?}, continuing",
            self.network_idle_timeout
        );
        Ok(())
    }

    async fn query_all(&self, selectors: &[String]) -> DriverResult<Vec<DriverResult<CardSnapshot>>> {
        let selector = selectors.join(", ");
        let elements = self
            .page()?
            .find_elements(selector.as_str())
            .await
            .map_err(|e| query_error(&selector, e))?;

        let mut cards = Vec::with_capacity(elements.len());
        for element in elements {
            let snapshot = match element.outer_html().await {
                Ok(Some(html)) => Ok(CardSnapshot::new(html)),
                Ok(None) | Err(_) => Err(DriverError::Detached),
            };
            cards.push(snapshot);
        }

        Ok(cards)
    }

    async fn first_attribute(
        &self,
        selectors: &[String],
        name: &str,
    ) -> DriverResult<Option<String>> {
        let selector = selectors.join(", ");

        // find_element reports a missing element as an error
        let element = match self.page()?.find_element(selector.as_str()).await {
            Ok(element) => element,
            Err(_) => return Ok(None),
        };

        Ok(element.attribute(name).await.unwrap_or(None))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.page = None;

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser cleanly: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to reap browser process: {}", e);
            }
            info!("Closed Chromium");
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        Ok(())
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        if self.browser.is_some() {
            // Browser's own Drop kills the child process
            warn!("ChromiumDriver dropped without close()");
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}
