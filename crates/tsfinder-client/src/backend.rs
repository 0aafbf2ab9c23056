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

//! Backend Endpoints
//!
//! [`Backend`] issues the three request kinds the metrics store understands,
//! picking a host by round-robin for every request:
//!
//! - `GET {host}/paths?query=..&from=..&to=..` - pattern search
//! - `GET {host}/metrics?path=..&from=..&to=..` - one series
//! - `POST {host}/metrics` with repeated `path` fields - many series
//!
//! Requests are never retried here; a failed request fails the calling
//! operation and the caller decides what to do next.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use tsfinder_common::error::{FinderError, Result};
use tsfinder_common::{FindQuery, FinderConfig, MetricsResponse, PathDescriptor};

use crate::hosts::HostRotator;
use crate::http::HttpClient;
use crate::metrics::FinderMetrics;

/// Request router for the remote metrics store.
pub struct Backend {
    hosts: HostRotator,
    http: HttpClient,
    find_timeout: Duration,
    fetch_timeout: Duration,
    metrics: Arc<FinderMetrics>,
}

impl Backend {
    /// Creates a backend over the configured hosts.
    ///
    /// # Errors
    ///
    /// Returns `FinderError::Configuration` when the host list is empty.
    pub fn new(config: &FinderConfig, metrics: Arc<FinderMetrics>) -> Result<Self> {
        Ok(Self {
            hosts: HostRotator::new(config.urls.clone())?,
            http: HttpClient::new(),
            find_timeout: config.find_timeout,
            fetch_timeout: config.fetch_timeout,
            metrics,
        })
    }

    pub fn hosts(&self) -> &HostRotator {
        &self.hosts
    }

    pub fn metrics(&self) -> &Arc<FinderMetrics> {
        &self.metrics
    }

    /// Searches for paths matching `query.pattern`, bounded by the find timeout.
    pub async fn find_paths(&self, query: &FindQuery) -> Result<Vec<PathDescriptor>> {
        let url = self.hosts.paths_url();
        self.metrics.record_find(&url);
        debug!(pattern = %query.pattern, %url, "searching paths");

        let params = [
            ("query", query.pattern.clone()),
            ("from", query.start_time.to_string()),
            ("to", query.end_time.to_string()),
        ];
        let result = self.http.get_json(&url, &params, self.find_timeout).await;
        self.observe(result)
    }

    /// Fetches datapoints for a single path, bounded by the fetch timeout.
    pub async fn fetch_series(&self, path: &str, from: i64, to: i64) -> Result<MetricsResponse> {
        let url = self.hosts.metrics_url();
        self.metrics.record_series_fetch(&url);
        debug!(%path, %url, from, to, "fetching series");

        let params = [
            ("path", path.to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
        ];
        let result = self.http.get_json(&url, &params, self.fetch_timeout).await;
        self.observe_series(result)
    }

    /// Fetches datapoints for a batch of paths in one form-encoded `POST`,
    /// bounded by the fetch timeout.
    pub async fn fetch_batch(&self, paths: &[String], from: i64, to: i64) -> Result<MetricsResponse> {
        let url = self.hosts.metrics_url();
        self.metrics.record_batch_fetch(&url);
        debug!(%url, paths = paths.len(), from, to, "fetching batch");

        let mut params: Vec<(&str, String)> = paths.iter().map(|p| ("path", p.clone())).collect();
        params.push(("from", from.to_string()));
        params.push(("to", to.to_string()));

        let result = self.http.post_form(&url, &params, self.fetch_timeout).await;
        self.observe_series(result)
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(FinderError::Timeout(ms)) = &result {
            self.metrics.record_timeout();
            debug!(timeout_ms = ms, "backend request timed out");
        }
        result
    }

    fn observe_series(&self, result: Result<MetricsResponse>) -> Result<MetricsResponse> {
        let result = self.observe(result);
        if let Ok(MetricsResponse::Failed(failure)) = &result {
            self.metrics.record_backend_error();
            warn!(error = %failure.message(), "backend reported an error");
        }
        result
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("hosts", &self.hosts.hosts())
            .field("find_timeout", &self.find_timeout)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}
