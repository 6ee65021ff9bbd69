//! Feed configuration.
//!
//! Stored as JSON on disk; every field except `subjects` may be omitted:
//! ```json
//! {
//!   "interval_secs": 120,
//!   "stagger_secs": 5,
//!   "subjects": [
//!     { "agency": "actransit", "route": "210", "stop": "0702640", "label": "Ohlone College" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::fetch::DEFAULT_BASE_URL;
use crate::poller::{DEFAULT_INTERVAL, DEFAULT_REQUEST_TIMEOUT};
use crate::subject::Subject;

pub const DEFAULT_STAGGER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub base_url: String,
    pub interval: Duration,
    pub stagger: Duration,
    pub request_timeout: Duration,
    /// Polled in this order; position determines stagger.
    pub subjects: Vec<Subject>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_interval_secs")]
    interval_secs: u64,
    #[serde(default = "default_stagger_secs")]
    stagger_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    subjects: Vec<Subject>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL.as_secs()
}

fn default_stagger_secs() -> u64 {
    DEFAULT_STAGGER.as_secs()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl From<ConfigFile> for FeedConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            base_url: file.base_url,
            interval: Duration::from_secs(file.interval_secs),
            stagger: Duration::from_secs(file.stagger_secs),
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            subjects: file.subjects,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            interval: DEFAULT_INTERVAL,
            stagger: DEFAULT_STAGGER,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            subjects: default_subjects(),
        }
    }
}

/// AC Transit lines 210 and 232 around Fremont, both directions.
pub fn default_subjects() -> Vec<Subject> {
    vec![
        Subject::new("actransit", "210", "0702640", "Ohlone College"),
        Subject::new("actransit", "232", "0704440", "Fremont BART"),
        Subject::new("actransit", "210", "0702630", "Union Landing"),
        Subject::new("actransit", "232", "0704430", "NewPark Mall"),
    ]
}

impl FeedConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        Self::from_json(&content).with_context(|| format!("invalid config '{}'", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)?;
        let config = FeedConfig::from(file);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.subjects.is_empty() {
            bail!("at least one subject must be configured");
        }
        if self.interval.is_zero() {
            bail!("polling interval must be greater than zero");
        }
        if self.request_timeout.is_zero() {
            bail!("request timeout must be greater than zero");
        }
        if self.stagger.is_zero() && self.subjects.len() > 1 {
            bail!("stagger must be greater than zero when polling more than one subject");
        }
        for (index, subject) in self.subjects.iter().enumerate() {
            if subject.agency().is_empty() || subject.route().is_empty() || subject.stop().is_empty() {
                bail!("subject #{index} ('{}') has an empty identifier", subject.label());
            }
        }
        Ok(())
    }
}
