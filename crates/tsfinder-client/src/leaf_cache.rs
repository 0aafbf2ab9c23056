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

//! Leaf Cache
//!
//! Remembers query patterns the backend has confirmed to be leaves, so a
//! repeated lookup of the same pattern can skip the path-search request.
//!
//! # Policy
//!
//! - Only positive confirmations are stored; branch patterns are never cached
//! - Entries do not expire; they leave only under capacity pressure (LRU)
//! - Memory-only, lives as long as the process
//!
//! A pattern later relabeled by the backend keeps its leaf classification
//! until it is evicted or the process restarts.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Bounded LRU map from query pattern to "is a leaf".
///
/// Thread-safe: every access takes a short internal lock, since even a
/// lookup promotes the entry to most-recently-used.
pub struct LeafCache {
    entries: Mutex<LruCache<String, bool>>,
}

impl LeafCache {
    /// Create a cache holding at most `capacity` patterns (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a pattern, promoting it to most-recently-used on a hit.
    ///
    /// Returns `None` when the pattern has never been confirmed (or was
    /// evicted).
    pub fn get(&self, pattern: &str) -> Option<bool> {
        self.entries.lock().get(pattern).copied()
    }

    /// Record a backend leaf confirmation, evicting the least-recently-used
    /// entry if the cache is full.
    pub fn put(&self, pattern: impl Into<String>) {
        self.entries.lock().put(pattern.into(), true);
    }

    /// Check membership without touching recency
    pub fn contains(&self, pattern: &str) -> bool {
        self.entries.lock().contains(pattern)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

impl std::fmt::Debug for LeafCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("LeafCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}
