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

//! Pattern Resolution
//!
//! Turns a path pattern into leaf and branch nodes by asking the backend's
//! path-search endpoint, with a shortcut through the [`LeafCache`].
//!
//! # Algorithm
//!
//! 1. If the pattern was previously confirmed as a leaf, return one leaf
//!    node for it without touching the network
//! 2. Otherwise search the backend (bounded by the find timeout)
//! 3. Every leaf descriptor is recorded in the cache and becomes a leaf node
//! 4. Every other descriptor becomes a branch node
//!
//! The cache shortcut assumes a pattern string seen as a leaf stays a leaf.
//! Backend relabeling is not noticed until the entry is evicted.

use std::sync::Arc;
use tracing::debug;

use tsfinder_common::error::Result;
use tsfinder_common::FindQuery;

use crate::backend::Backend;
use crate::leaf_cache::LeafCache;
use crate::node::Node;

#[derive(Debug)]
pub struct MetricsResolver {
    backend: Arc<Backend>,
    leaf_cache: Arc<LeafCache>,
}

impl MetricsResolver {
    pub fn new(backend: Arc<Backend>, leaf_cache: Arc<LeafCache>) -> Self {
        Self {
            backend,
            leaf_cache,
        }
    }

    /// Resolves `query.pattern` into nodes, in backend order.
    ///
    /// # Errors
    ///
    /// Timeouts, transport failures and malformed search responses are
    /// returned unchanged; nothing is retried.
    pub async fn resolve(&self, query: &FindQuery) -> Result<Vec<Node>> {
        if self.leaf_cache.get(&query.pattern) == Some(true) {
            self.backend.metrics().record_leaf_cache_hit();
            debug!(pattern = %query.pattern, "leaf cache hit");
            return Ok(vec![Node::leaf(query.pattern.clone(), self.backend.clone())]);
        }

        let descriptors = self.backend.find_paths(query).await?;
        debug!(pattern = %query.pattern, found = descriptors.len(), "pattern resolved");

        let nodes = descriptors
            .into_iter()
            .map(|descriptor| {
                if descriptor.leaf {
                    self.leaf_cache.put(descriptor.path.clone());
                    Node::leaf(descriptor.path, self.backend.clone())
                } else {
                    Node::branch(descriptor.path)
                }
            })
            .collect();

        Ok(nodes)
    }
}
