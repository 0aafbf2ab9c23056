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

//! Multi-Series Fetching
//!
//! Fetches many paths at once: the path list is split by [`PathBatcher`],
//! each batch goes to the next host as one `POST`, and the per-batch series
//! are merged into a single [`SeriesMap`].
//!
//! # Failure Policy
//!
//! All or nothing. If any batch comes back with an error marker the whole
//! call returns the degenerate time info and an empty map, discarding
//! batches already merged. Timeouts, transport failures and malformed
//! bodies abort the call with an error.

use std::sync::Arc;
use tracing::debug;

use tsfinder_common::error::Result;
use tsfinder_common::{MetricsResponse, SeriesMap, TimeInfo};

use crate::backend::Backend;
use crate::batch::PathBatcher;
use crate::node::Node;

#[derive(Debug)]
pub struct SeriesFetcher {
    backend: Arc<Backend>,
    batcher: PathBatcher,
}

impl SeriesFetcher {
    pub fn new(backend: Arc<Backend>, batcher: PathBatcher) -> Self {
        Self { backend, batcher }
    }

    /// Fetches every node's series for `[start_time, end_time]`.
    ///
    /// Branch nodes are sent like any other path; the backend simply returns
    /// nothing for them.
    pub async fn fetch_multi(
        &self,
        nodes: &[Node],
        start_time: i64,
        end_time: i64,
    ) -> Result<(TimeInfo, SeriesMap)> {
        let paths: Vec<String> = nodes.iter().map(|n| n.path().to_string()).collect();
        self.fetch_paths(&paths, start_time, end_time).await
    }

    /// Same as [`fetch_multi`](Self::fetch_multi), over raw paths.
    ///
    /// Time info comes from the last batch processed; batches cover the same
    /// window and are expected to agree on it. With no paths at all, no
    /// request is made and the degenerate time info is returned.
    pub async fn fetch_paths(
        &self,
        paths: &[String],
        start_time: i64,
        end_time: i64,
    ) -> Result<(TimeInfo, SeriesMap)> {
        let mut time_info = None;
        let mut series = SeriesMap::new();

        for batch in self.batcher.batch(paths).filter(|b| !b.is_empty()) {
            match self.backend.fetch_batch(batch, start_time, end_time).await? {
                MetricsResponse::Failed(_) => {
                    debug!(
                        paths = paths.len(),
                        "batch failed, discarding all fetched series"
                    );
                    return Ok((TimeInfo::degenerate(start_time, end_time), SeriesMap::new()));
                }
                MetricsResponse::Series(payload) => {
                    time_info = Some(payload.time_info());
                    series.extend(payload.series);
                }
            }
        }

        debug!(requested = paths.len(), returned = series.len(), "fetch complete");
        Ok((
            time_info.unwrap_or_else(|| TimeInfo::degenerate(start_time, end_time)),
            series,
        ))
    }
}
