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

//! tsfinder Client
//!
//! Lets a time-series query engine resolve metric path patterns and fetch
//! datapoints from a remote metrics store over HTTP.
//!
//! # Components
//!
//! - [`HostRotator`] - round-robin over the configured backend hosts
//! - [`LeafCache`] - LRU memory of patterns confirmed as leaves
//! - [`PathBatcher`] - splits path lists so each request stays under the
//!   configured length
//! - [`MetricsResolver`] - pattern to leaf/branch [`Node`]s
//! - [`SeriesFetcher`] - batched multi-path fetch merged into one series map
//! - [`SeriesReader`] - single-path fetch attached to every leaf node
//! - [`Finder`] - wires the above together from a
//!   [`FinderConfig`](tsfinder_common::FinderConfig)
//!
//! # Control Flow
//!
//! The query engine calls [`Finder::find_nodes`] for a pattern, then either
//! [`Finder::fetch_multi`] for all leaves at once or
//! [`SeriesReader::fetch`] per leaf.

pub mod backend;
pub mod batch;
pub mod fetcher;
pub mod finder;
pub mod hosts;
pub mod http;
pub mod leaf_cache;
pub mod metrics;
pub mod node;
pub mod resolver;

pub use backend::Backend;
pub use batch::{Batches, PathBatcher, PATH_PARAM_OVERHEAD};
pub use fetcher::SeriesFetcher;
pub use finder::Finder;
pub use hosts::HostRotator;
pub use http::HttpClient;
pub use leaf_cache::LeafCache;
pub use metrics::{FinderMetrics, MetricsSnapshot};
pub use node::{BranchNode, Interval, IntervalSet, LeafNode, Node, SeriesReader};
pub use resolver::MetricsResolver;
