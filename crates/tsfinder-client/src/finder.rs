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

use std::sync::Arc;
use tracing::info;

use tsfinder_common::error::Result;
use tsfinder_common::{FindQuery, FinderConfig, SeriesMap, TimeInfo};

use crate::backend::Backend;
use crate::batch::PathBatcher;
use crate::fetcher::SeriesFetcher;
use crate::hosts::HostRotator;
use crate::leaf_cache::LeafCache;
use crate::metrics::{FinderMetrics, MetricsSnapshot};
use crate::node::Node;
use crate::resolver::MetricsResolver;

/// Entry point the host query engine drives.
///
/// Built once from a [`FinderConfig`]; owns the host rotation, the leaf
/// cache and the request statistics, and shares them between the resolver,
/// the multi-series fetcher and every [`SeriesReader`](crate::SeriesReader)
/// it hands out.
///
/// # Concurrency
///
/// All methods take `&self`; a `Finder` can be wrapped in an `Arc` and
/// used from many tasks at once. Each call issues its own requests
/// sequentially.
///
/// # Example
/// ```no_run
/// # use tsfinder_client::Finder;
/// # use tsfinder_common::{FindQuery, FinderConfig};
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let finder = Finder::new(FinderConfig::new([
///     "http://10.0.0.1:8080",
///     "http://10.0.0.2:8080",
/// ]))?;
///
/// let nodes = finder.find_nodes(&FindQuery::new("servers.*.cpu", 0, 3600)).await?;
/// let (time_info, series) = finder.fetch_multi(&nodes, 0, 3600).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Finder {
    backend: Arc<Backend>,
    leaf_cache: Arc<LeafCache>,
    resolver: MetricsResolver,
    fetcher: SeriesFetcher,
}

impl Finder {
    /// Creates a finder from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `FinderError::Configuration` if the configuration is invalid
    /// (no hosts, zero limits or timeouts).
    pub fn new(config: FinderConfig) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(FinderMetrics::new());
        let backend = Arc::new(Backend::new(&config, metrics)?);
        let leaf_cache = Arc::new(LeafCache::new(config.leaf_cache_size));

        let resolver = MetricsResolver::new(backend.clone(), leaf_cache.clone());
        let fetcher = SeriesFetcher::new(backend.clone(), PathBatcher::new(config.url_length));

        info!(
            hosts = backend.hosts().len(),
            url_length = config.url_length,
            "Finder initialized"
        );

        Ok(Self {
            backend,
            leaf_cache,
            resolver,
            fetcher,
        })
    }

    /// Resolves a pattern into leaf and branch nodes.
    pub async fn find_nodes(&self, query: &FindQuery) -> Result<Vec<Node>> {
        self.resolver.resolve(query).await
    }

    /// Fetches the series of many nodes over one window.
    pub async fn fetch_multi(
        &self,
        nodes: &[Node],
        start_time: i64,
        end_time: i64,
    ) -> Result<(TimeInfo, SeriesMap)> {
        self.fetcher.fetch_multi(nodes, start_time, end_time).await
    }

    pub fn leaf_cache(&self) -> &LeafCache {
        &self.leaf_cache
    }

    pub fn hosts(&self) -> &HostRotator {
        self.backend.hosts()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.backend.metrics().snapshot()
    }
}
