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

//! Series Types
//!
//! Types for the backend's metrics endpoint (`GET`/`POST {host}/metrics`)
//! and the time-series values handed back to the query engine.
//!
//! # Response Shapes
//!
//! The backend answers either with a series payload:
//!
//! ```json
//! {"from": 0, "to": 60, "step": 60, "series": {"a.b.c": [1.0, null]}}
//! ```
//!
//! or with an error marker:
//!
//! ```json
//! {"error": "no such tenant"}
//! ```
//!
//! Any body carrying an `error` key is treated as an error marker, even if
//! it also carries series data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single datapoint; `None` marks a gap in the series
pub type Datapoint = Option<f64>;

/// Datapoints per path, aligned to a shared [`TimeInfo`]
pub type SeriesMap = HashMap<String, Vec<Datapoint>>;

/// Window and resolution of a fetched series, all in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeInfo {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl TimeInfo {
    pub fn new(start: i64, end: i64, step: i64) -> Self {
        Self { start, end, step }
    }

    /// Time info returned in place of data when the backend reports an
    /// error: the whole requested window as a single step.
    ///
    /// ```
    /// use tsfinder_common::TimeInfo;
    ///
    /// assert_eq!(TimeInfo::degenerate(100, 400), TimeInfo::new(100, 400, 300));
    /// ```
    pub fn degenerate(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            step: end - start,
        }
    }
}

/// Successful metrics response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesPayload {
    pub from: i64,
    pub to: i64,
    pub step: i64,
    pub series: SeriesMap,
}

impl SeriesPayload {
    pub fn time_info(&self) -> TimeInfo {
        TimeInfo::new(self.from, self.to, self.step)
    }
}

/// Error marker returned by the backend instead of series data.
///
/// The marker's value is kept verbatim; the backend does not promise it is
/// a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendFailure {
    pub error: serde_json::Value,
}

impl BackendFailure {
    pub fn message(&self) -> String {
        match &self.error {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Body of a metrics endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricsResponse {
    /// Must stay first: untagged decoding tries variants in order
    Failed(BackendFailure),
    Series(SeriesPayload),
}
