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

//! Path Batching
//!
//! Splits a path list into consecutive batches so that each batched metrics
//! request stays under the configured maximum encoded length.
//!
//! Each path costs its own length plus [`PATH_PARAM_OVERHEAD`] bytes for the
//! `&path=` framing it gets in the request. Packing is greedy and keeps
//! input order: a batch is closed as soon as the next path would push it
//! past the limit. A path that is longer than the limit on its own still
//! gets a batch of its own.

use std::iter::FusedIterator;

/// Bytes of request framing added per path (`&path=`)
pub const PATH_PARAM_OVERHEAD: usize = 6;

/// Greedy batcher bounded by a maximum encoded length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathBatcher {
    max_length: usize,
}

impl PathBatcher {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Encoded cost of one path inside a batched request
    pub fn encoded_len(path: &str) -> usize {
        path.len() + PATH_PARAM_OVERHEAD
    }

    /// Lazily split `paths` into batches.
    ///
    /// The returned iterator borrows `paths` and yields contiguous slices of
    /// it. Cloning the iterator restarts from the same position, and calling
    /// `batch` again starts over. An empty input yields exactly one empty
    /// batch, which callers treat as a no-op.
    ///
    /// # Example
    ///
    /// ```
    /// use tsfinder_client::PathBatcher;
    ///
    /// let paths: Vec<String> = vec!["a.b".into(), "c.d".into(), "e.f".into()];
    /// // each path costs 3 + 6 = 9
    /// let batches: Vec<&[String]> = PathBatcher::new(18).batch(&paths).collect();
    /// assert_eq!(batches.len(), 2);
    /// assert_eq!(batches[0], &paths[..2]);
    /// assert_eq!(batches[1], &paths[2..]);
    /// ```
    pub fn batch<'a>(&self, paths: &'a [String]) -> Batches<'a> {
        Batches {
            paths,
            max_length: self.max_length,
            pos: 0,
            done: false,
        }
    }
}

/// Iterator over the batches of a path list; see [`PathBatcher::batch`].
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    paths: &'a [String],
    max_length: usize,
    pos: usize,
    done: bool,
}

impl<'a> Iterator for Batches<'a> {
    type Item = &'a [String];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let start = self.pos;
        let mut length = 0;
        while let Some(path) = self.paths.get(self.pos) {
            let cost = PathBatcher::encoded_len(path);
            // the first path of a batch is always taken, even when oversized
            if self.pos > start && length + cost > self.max_length {
                break;
            }
            length += cost;
            self.pos += 1;
        }

        if self.pos == self.paths.len() {
            self.done = true;
        }
        Some(&self.paths[start..self.pos])
    }
}

impl FusedIterator for Batches<'_> {}
