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

//! Path Search Types
//!
//! Types for the backend's path-search endpoint (`GET {host}/paths`).

use serde::{Deserialize, Serialize};

/// A pattern lookup issued by the host query engine.
///
/// `start_time` and `end_time` are Unix timestamps in seconds and bound the
/// window the backend should consider when matching paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindQuery {
    pub pattern: String,
    pub start_time: i64,
    pub end_time: i64,
}

impl FindQuery {
    pub fn new(pattern: impl Into<String>, start_time: i64, end_time: i64) -> Self {
        Self {
            pattern: pattern.into(),
            start_time,
            end_time,
        }
    }
}

/// One element of the path-search response array.
///
/// `leaf` marks paths that carry datapoints; anything else is a namespace
/// prefix that can only be expanded further.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathDescriptor {
    pub path: String,
    pub leaf: bool,
}
