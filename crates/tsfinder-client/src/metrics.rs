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

//! Request Statistics
//!
//! Counters describing how the adapter has talked to the backend: how many
//! resolutions and fetches it issued, how often the leaf cache saved a
//! request, and how requests spread across backend endpoints.
//!
//! Counters are lock-free atomics on the hot path; only the per-URL
//! distribution takes a short lock. Statistics are observational and never
//! influence routing or results.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Live counters shared by every component of one finder.
#[derive(Debug)]
pub struct FinderMetrics {
    started: Instant,
    find_requests: AtomicU64,
    leaf_cache_hits: AtomicU64,
    series_fetches: AtomicU64,
    batch_fetches: AtomicU64,
    backend_errors: AtomicU64,
    timeouts: AtomicU64,
    requests_by_url: Mutex<HashMap<String, u64>>,
}

impl FinderMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            find_requests: AtomicU64::new(0),
            leaf_cache_hits: AtomicU64::new(0),
            series_fetches: AtomicU64::new(0),
            batch_fetches: AtomicU64::new(0),
            backend_errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            requests_by_url: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_find(&self, url: &str) {
        self.find_requests.fetch_add(1, Ordering::Relaxed);
        self.record_url(url);
    }

    pub fn record_leaf_cache_hit(&self) {
        self.leaf_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_series_fetch(&self, url: &str) {
        self.series_fetches.fetch_add(1, Ordering::Relaxed);
        self.record_url(url);
    }

    pub fn record_batch_fetch(&self, url: &str) {
        self.batch_fetches.fetch_add(1, Ordering::Relaxed);
        self.record_url(url);
    }

    pub fn record_backend_error(&self) {
        self.backend_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_url(&self, url: &str) {
        let mut by_url = self.requests_by_url.lock();
        *by_url.entry(url.to_string()).or_insert(0) += 1;
    }

    /// Takes a point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_ms: self.started.elapsed().as_millis() as u64,
            find_requests: self.find_requests.load(Ordering::Relaxed),
            leaf_cache_hits: self.leaf_cache_hits.load(Ordering::Relaxed),
            series_fetches: self.series_fetches.load(Ordering::Relaxed),
            batch_fetches: self.batch_fetches.load(Ordering::Relaxed),
            backend_errors: self.backend_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            requests_by_url: self.requests_by_url.lock().clone(),
        }
    }
}

impl Default for FinderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable copy of [`FinderMetrics`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    pub uptime_ms: u64,
    pub find_requests: u64,
    pub leaf_cache_hits: u64,
    pub series_fetches: u64,
    pub batch_fetches: u64,
    pub backend_errors: u64,
    pub timeouts: u64,
    pub requests_by_url: HashMap<String, u64>,
}
