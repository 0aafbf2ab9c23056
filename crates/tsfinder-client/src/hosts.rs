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

use std::sync::atomic::{AtomicUsize, Ordering};

use tsfinder_common::error::{FinderError, Result};

/// Round-robin rotation over the configured backend hosts.
///
/// The host list is fixed at construction; only the cursor moves. The
/// cursor is an atomic index, so concurrent callers each get a valid host
/// without taking a lock.
#[derive(Debug)]
pub struct HostRotator {
    hosts: Vec<String>,
    cursor: AtomicUsize,
}

impl HostRotator {
    /// Create a rotator over a non-empty host list.
    ///
    /// Hosts are used as given; `FinderConfig` strips trailing slashes.
    pub fn new(hosts: Vec<String>) -> Result<Self> {
        if hosts.is_empty() {
            return Err(FinderError::Configuration(
                "host rotation needs at least one backend URL".to_string(),
            ));
        }

        Ok(Self {
            hosts,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Get the next host in round-robin order
    pub fn next_host(&self) -> &str {
        let len = self.hosts.len();
        // fetch_update keeps the cursor in range, so wrap-around never skips a host
        let index = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| Some((i + 1) % len))
            .unwrap_or(0);
        &self.hosts[index % len]
    }

    /// Path-search endpoint on the next host
    pub fn paths_url(&self) -> String {
        format!("{}/paths", self.next_host())
    }

    /// Metrics endpoint on the next host
    pub fn metrics_url(&self) -> String {
        format!("{}/metrics", self.next_host())
    }

    /// Get the number of hosts
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Get list of all hosts in rotation order
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}
