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

//! HTTP Transport
//!
//! Thin JSON-over-HTTP layer used to talk to the metrics backend.
//!
//! # Architecture
//!
//! - One hyper client is built per [`HttpClient`] and reused for every
//!   request, so connections may be kept alive between sequential calls
//! - Each exchange (send + body read) runs under a single
//!   `tokio::time::timeout`
//! - Parameters are form-urlencoded: appended as a query string for `GET`,
//!   sent as the body for `POST`
//! - Bodies are decoded as JSON regardless of the HTTP status, because the
//!   backend reports errors as JSON bodies on non-2xx statuses too

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Method, Request};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::trace;
use url::form_urlencoded;

use tsfinder_common::error::{FinderError, Result};

/// Form or query parameters; keys may repeat
pub type Params<'a> = [(&'a str, String)];

/// JSON HTTP client with per-request timeouts.
#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    /// Sends a `GET url?params` request and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// - `FinderError::InvalidRequest` if the URL cannot form a request URI
    /// - `FinderError::Timeout` if the exchange exceeds `timeout`
    /// - `FinderError::Transport` if the connection or body read fails
    /// - `FinderError::MalformedResponse` if the body is not a `T`
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &Params<'_>,
        timeout: Duration,
    ) -> Result<T> {
        let uri = format!("{}?{}", url, encode_params(params));
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri.as_str())
            .header(ACCEPT, "application/json")
            .body(Full::new(Bytes::new()))
            .map_err(|e| FinderError::InvalidRequest(format!("Failed to build request for {}: {}", url, e)))?;

        self.send(request, timeout).await
    }

    /// Sends a form-encoded `POST` and decodes the JSON body.
    ///
    /// Errors are the same as for [`get_json`](Self::get_json).
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &Params<'_>,
        timeout: Duration,
    ) -> Result<T> {
        let body = encode_params(params);
        let request = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| FinderError::InvalidRequest(format!("Failed to build request for {}: {}", url, e)))?;

        self.send(request, timeout).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: Request<Full<Bytes>>,
        timeout: Duration,
    ) -> Result<T> {
        let method = request.method().clone();
        let uri = request.uri().clone();

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| FinderError::Transport(format!("HTTP request to {} failed: {}", uri, e)))?;

            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| FinderError::Transport(format!("Failed to read response from {}: {}", uri, e)))?
                .to_bytes();

            Ok::<_, FinderError>((status, body))
        };

        let (status, body) = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| FinderError::Timeout(timeout.as_millis() as u64))??;

        trace!(%method, %uri, %status, bytes = body.len(), "backend responded");

        serde_json::from_slice(&body).map_err(|e| {
            FinderError::MalformedResponse(format!("{} {} returned {}: {}", method, uri, status, e))
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Form-urlencode parameters, keeping repeated keys in order
pub fn encode_params(params: &Params<'_>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
