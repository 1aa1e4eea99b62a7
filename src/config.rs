use anyhow::{Context, Result};
use dotenvy::dotenv;
use log::info;
use serde::Deserialize;
use std::{env, path::Path, time::Duration};

use crate::immoweb::selectors;

const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub settle_ms: u64,
    pub consent_pause_ms: u64,
    pub network_idle_ms: u64,
    pub network_idle_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub headless: bool,
    pub user_agent: Option<String>,
    pub property_type: String,
    pub output_dir: String,
    pub retry: RetryPolicy,
    pub selectors: SiteSelectors,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            settle_ms: 1500,
            consent_pause_ms: 500,
            network_idle_ms: 750,
            network_idle_timeout_ms: 10_000,
            navigation_timeout_ms: 30_000,
            headless: true,
            user_agent: None,
            property_type: String::from("apartment"),
            output_dir: String::from("."),
            retry: RetryPolicy::default(),
            selectors: SiteSelectors::default(),
        }
    }
}

impl Config {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn consent_pause(&self) -> Duration {
        Duration::from_millis(self.consent_pause_ms)
    }
}

/*
   Page loads are retried `attempts` times in total, sleeping
   `backoff_ms * 2^n` (plus jitter) between attempts
*/
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            backoff_ms: 1000,
        }
    }
}

/// Selector tables for one site. Chains are tried in order, alternations
/// are matched together in document order.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SiteSelectors {
    pub cards: Vec<String>,
    pub next_link: Vec<String>,
    pub detail_link: Vec<String>,
    pub title: Vec<String>,
    pub price: Vec<String>,
    pub agency: Vec<String>,
    pub meta: Vec<String>,
    pub locality: Vec<String>,
    pub consent_labels: Vec<String>,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        selectors::immoweb()
    }
}

pub fn create_test_config() -> Config {
    Config {
        settle_ms: 0,
        consent_pause_ms: 0,
        network_idle_ms: 0,
        network_idle_timeout_ms: 0,
        navigation_timeout_ms: 1000,
        headless: true,
        user_agent: None,
        property_type: String::from("apartment"),
        output_dir: String::from("."),
        retry: RetryPolicy {
            attempts: 2,
            backoff_ms: 0,
        },
        selectors: SiteSelectors {
            cards: vec![String::from("[data-item='result']")],
            ..selectors::immoweb()
        },
    }
}

/*
   Explicit path wins over CONFIG_PATH; with neither the defaults are used
*/
pub fn read_config(explicit_path: Option<&Path>) -> Result<Config> {
    dotenv().ok();

    let path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None => match env::var(CONFIG_PATH_ENV) {
            Ok(path) => path.into(),
            Err(_) => {
                info!("No {CONFIG_PATH_ENV} set, using default configuration");
                return Ok(Config::default());
            }
        },
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: Config = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
