// Copyright 2025 tsfinder Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Adapter Configuration
//!
//! [`FinderConfig`] is built once at initialization and handed to the
//! finder, which passes the relevant pieces to each component. Nothing in
//! it changes after construction.
//!
//! # Loading
//!
//! The configuration loader hands over one JSON section:
//!
//! ```json
//! {
//!     "urls": ["http://10.0.0.1:8080", "http://10.0.0.2:8080"],
//!     "urllength": 8000,
//!     "find_timeout": 3,
//!     "fetch_timeout": 10
//! }
//! ```
//!
//! `urls` wins over a single `url`. Timeouts are in seconds and may be
//! fractional. Every other key is optional.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{FinderError, Result};

/// Default maximum encoded length of one batched metrics request
pub const DEFAULT_URL_LENGTH: usize = 8000;

/// Default bound on a path resolution request
pub const DEFAULT_FIND_TIMEOUT: Duration = Duration::from_secs(3);

/// Default bound on a datapoint fetch request
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of leaf patterns remembered by the leaf cache
pub const DEFAULT_LEAF_CACHE_SIZE: usize = 10_000;

/// Process-wide adapter configuration.
///
/// # Fields
///
/// - `urls`: Base URLs of the metrics backend, visited round-robin
/// - `url_length`: Maximum encoded length of one batched request
/// - `find_timeout`: Bound on each path resolution request
/// - `fetch_timeout`: Bound on each datapoint fetch request
/// - `leaf_cache_size`: Capacity of the leaf cache
///
/// # Example
///
/// ```
/// use tsfinder_common::FinderConfig;
/// use std::time::Duration;
///
/// let config = FinderConfig::new(["http://127.0.0.1:8080/"])
///     .with_url_length(2000)
///     .with_fetch_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.urls, vec!["http://127.0.0.1:8080".to_string()]);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FinderConfig {
    pub urls: Vec<String>,
    pub url_length: usize,
    pub find_timeout: Duration,
    pub fetch_timeout: Duration,
    pub leaf_cache_size: usize,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            url_length: DEFAULT_URL_LENGTH,
            find_timeout: DEFAULT_FIND_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            leaf_cache_size: DEFAULT_LEAF_CACHE_SIZE,
        }
    }
}

/// Raw shape of the configuration section before defaults are applied
#[derive(Debug, Deserialize)]
struct ConfigSection {
    urls: Option<Vec<String>>,
    url: Option<String>,
    urllength: Option<usize>,
    find_timeout: Option<f64>,
    fetch_timeout: Option<f64>,
    leaf_cache_size: Option<usize>,
}

impl FinderConfig {
    /// Creates a configuration for the given base URLs with default limits.
    ///
    /// Trailing slashes are stripped so endpoint suffixes can be appended
    /// directly.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(|u| normalize_url(u.into())).collect(),
            ..Self::default()
        }
    }

    pub fn with_url_length(mut self, url_length: usize) -> Self {
        self.url_length = url_length;
        self
    }

    pub fn with_find_timeout(mut self, timeout: Duration) -> Self {
        self.find_timeout = timeout;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_leaf_cache_size(mut self, size: usize) -> Self {
        self.leaf_cache_size = size;
        self
    }

    /// Builds a configuration from the loader's JSON section.
    ///
    /// # Errors
    ///
    /// - `FinderError::Json` if the section does not have the expected shape
    /// - `FinderError::Configuration` if neither `urls` nor `url` is present,
    ///   or if any value fails [`validate`](Self::validate)
    pub fn from_value(value: &Value) -> Result<Self> {
        let section: ConfigSection = serde_json::from_value(value.clone())?;

        let urls = match (section.urls, section.url) {
            (Some(urls), _) => urls,
            (None, Some(url)) => vec![url],
            (None, None) => {
                return Err(FinderError::Configuration(
                    "either `urls` or `url` must be set".to_string(),
                ))
            }
        };

        let mut config = Self::new(urls);
        if let Some(url_length) = section.urllength {
            config.url_length = url_length;
        }
        if let Some(secs) = section.find_timeout {
            config.find_timeout = seconds("find_timeout", secs)?;
        }
        if let Some(secs) = section.fetch_timeout {
            config.fetch_timeout = seconds("fetch_timeout", secs)?;
        }
        if let Some(size) = section.leaf_cache_size {
            config.leaf_cache_size = size;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document holding the configuration section.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Checks the invariants every component relies on.
    pub fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(FinderError::Configuration(
                "at least one backend URL is required".to_string(),
            ));
        }
        if let Some(blank) = self.urls.iter().position(|u| u.trim().is_empty()) {
            return Err(FinderError::Configuration(format!(
                "backend URL #{} is empty",
                blank
            )));
        }
        if self.url_length == 0 {
            return Err(FinderError::Configuration(
                "urllength must be greater than zero".to_string(),
            ));
        }
        if self.find_timeout.is_zero() || self.fetch_timeout.is_zero() {
            return Err(FinderError::Configuration(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.leaf_cache_size == 0 {
            return Err(FinderError::Configuration(
                "leaf_cache_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn normalize_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn seconds(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| {
            FinderError::Configuration(format!("{} must be a positive number of seconds", name))
        })
}
