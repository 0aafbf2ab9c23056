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

//! Resolved Nodes
//!
//! A resolution yields [`Node`]s, each either a [`LeafNode`] (a path with
//! datapoints, carrying a [`SeriesReader`]) or a [`BranchNode`] (a
//! namespace prefix that can only be expanded further).

use std::sync::Arc;
use std::time::SystemTime;

use tsfinder_common::error::Result;
use tsfinder_common::{Datapoint, MetricsResponse, TimeInfo};

use crate::backend::Backend;

/// Closed time range in Unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: i64) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Ranges for which a series is known to hold data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new(intervals: Vec<Interval>) -> Self {
        Self { intervals }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn contains(&self, t: i64) -> bool {
        self.intervals.iter().any(|i| i.contains(t))
    }
}

/// Fetches the datapoints of one leaf path.
#[derive(Clone)]
pub struct SeriesReader {
    path: String,
    backend: Arc<Backend>,
}

impl SeriesReader {
    pub fn new(path: impl Into<String>, backend: Arc<Backend>) -> Self {
        Self {
            path: path.into(),
            backend,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fetches this path's datapoints for `[start_time, end_time]`.
    ///
    /// # Returns
    ///
    /// - `Ok(None)` - the backend returned no series at all for the window
    /// - `Ok(Some((degenerate, [])))` - the backend reported an error; the
    ///   time info spans the whole window as one step
    /// - `Ok(Some((time_info, values)))` - the path's values, empty when the
    ///   backend answered with other series but not this one
    ///
    /// Timeouts, transport failures and malformed bodies are returned as
    /// errors.
    pub async fn fetch(
        &self,
        start_time: i64,
        end_time: i64,
    ) -> Result<Option<(TimeInfo, Vec<Datapoint>)>> {
        match self.backend.fetch_series(&self.path, start_time, end_time).await? {
            MetricsResponse::Failed(_) => {
                Ok(Some((TimeInfo::degenerate(start_time, end_time), Vec::new())))
            }
            MetricsResponse::Series(mut payload) => {
                if payload.series.is_empty() {
                    return Ok(None);
                }
                let values = payload.series.remove(&self.path).unwrap_or_default();
                Ok(Some((payload.time_info(), values)))
            }
        }
    }

    /// Ranges for which data is available.
    ///
    /// The backend does not expose retention bounds, so this always reports
    /// a single interval from the epoch to now.
    pub fn get_intervals(&self) -> IntervalSet {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        IntervalSet::new(vec![Interval::new(0, now)])
    }
}

impl std::fmt::Debug for SeriesReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesReader").field("path", &self.path).finish()
    }
}

/// A path with datapoints
#[derive(Debug, Clone)]
pub struct LeafNode {
    pub path: String,
    pub reader: SeriesReader,
}

/// A namespace prefix; not fetchable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNode {
    pub path: String,
}

/// Result of resolving a path pattern.
#[derive(Debug, Clone)]
pub enum Node {
    Leaf(LeafNode),
    Branch(BranchNode),
}

impl Node {
    pub fn leaf(path: impl Into<String>, backend: Arc<Backend>) -> Self {
        let path = path.into();
        Node::Leaf(LeafNode {
            reader: SeriesReader::new(path.clone(), backend),
            path,
        })
    }

    pub fn branch(path: impl Into<String>) -> Self {
        Node::Branch(BranchNode { path: path.into() })
    }

    pub fn path(&self) -> &str {
        match self {
            Node::Leaf(leaf) => &leaf.path,
            Node::Branch(branch) => &branch.path,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// The reader for a leaf; branches have none
    pub fn reader(&self) -> Option<&SeriesReader> {
        match self {
            Node::Leaf(leaf) => Some(&leaf.reader),
            Node::Branch(_) => None,
        }
    }
}
