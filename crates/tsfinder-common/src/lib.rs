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

//! tsfinder Common Types
//!
//! Shared definitions for the tsfinder adapter, which lets a time-series
//! query engine resolve metric path patterns and fetch datapoints from a
//! remote metrics store over HTTP.
//!
//! # Components
//!
//! - [`protocol`] - Wire types exchanged with the metrics backend
//!   (path descriptors, series payloads, time info)
//! - [`error`] - The [`FinderError`] taxonomy and crate-wide [`Result`]
//! - [`config`] - [`FinderConfig`], loaded once at initialization
//!
//! # Example
//!
//! ```
//! use tsfinder_common::{FinderConfig, TimeInfo};
//! use serde_json::json;
//!
//! let config = FinderConfig::from_value(&json!({
//!     "urls": ["http://10.0.0.1:8080", "http://10.0.0.2:8080"],
//!     "urllength": 4000
//! })).unwrap();
//! assert_eq!(config.urls.len(), 2);
//!
//! let degenerate = TimeInfo::degenerate(0, 60);
//! assert_eq!(degenerate.step, 60);
//! ```

pub mod config;
pub mod error;
pub mod protocol;

pub use config::FinderConfig;
pub use error::{FinderError, Result};
pub use protocol::*;
