//! Finder Integration Tests
//!
//! These tests run the finder against an in-process mock metrics backend
//! and verify:
//! - Pattern resolution into leaf and branch nodes
//! - Leaf cache shortcuts (no second request for a known leaf)
//! - Batched multi-path fetches, merging and round-robin host selection
//! - All-or-nothing handling of backend error markers
//! - Single-path reads and their "no data" vs "error" distinction
//! - Timeouts, refused connections and malformed bodies
//!
//! All mock servers bind `127.0.0.1:0` and are addressed as
//! `http://127.0.0.1:PORT`.

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tsfinder_client::{Finder, Node};
use tsfinder_common::{FindQuery, FinderConfig, FinderError, TimeInfo};

/// A request as seen by the mock backend, with its form/query parameters
#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    params: Vec<(String, String)>,
}

impl RecordedRequest {
    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn params(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> (StatusCode, Value) + Send + Sync>;
type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

/// Mock metrics backend that runs on a separate task
struct MockBackend {
    addr: String,
    requests: Recorded,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockBackend {
    /// Starts a backend answering every request with `200 OK` and the
    /// handler's JSON
    async fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Value + Send + Sync + 'static,
    {
        Self::start_with(Duration::ZERO, move |req| (StatusCode::OK, handler(req))).await
    }

    /// Starts a backend that waits `delay` before answering
    async fn start_with<F>(delay: Duration, handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let requests: Recorded = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        let recorded = requests.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let handler = handler.clone();
                                let recorded = recorded.clone();

                                tokio::spawn(async move {
                                    let service = service_fn(move |req| {
                                        let handler = handler.clone();
                                        let recorded = recorded.clone();
                                        async move { Self::handle(req, handler, recorded, delay).await }
                                    });

                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        eprintln!("Server error: {}", err);
                                    }
                                });
                            }
                            Err(err) => {
                                eprintln!("Accept error: {}", err);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    async fn handle(
        req: Request<Incoming>,
        handler: Handler,
        recorded: Recorded,
        delay: Duration,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let query = req.uri().query().unwrap_or("").to_string();
        let body = req.into_body().collect().await?.to_bytes();

        let encoded = if method == "POST" {
            String::from_utf8_lossy(&body).into_owned()
        } else {
            query
        };
        let params = url::form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect();

        let request = RecordedRequest {
            method,
            path,
            params,
        };
        recorded.lock().unwrap().push(request.clone());

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let (status, value) = handler(&request);
        Ok(Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(serde_json::to_vec(&value).unwrap())))
            .unwrap())
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Serves `leaves` from `/paths` and echoes one datapoint per requested
/// path from `/metrics`
fn echo_handler(leaves: Vec<&'static str>) -> impl Fn(&RecordedRequest) -> Value + Send + Sync {
    move |req| match req.path.as_str() {
        "/paths" => Value::Array(
            leaves
                .iter()
                .map(|p| json!({"path": p, "leaf": true}))
                .collect(),
        ),
        _ => {
            let series: serde_json::Map<String, Value> = req
                .params("path")
                .into_iter()
                .map(|p| (p.to_string(), json!([p.len() as f64])))
                .collect();
            json!({"from": 0, "to": 60, "step": 60, "series": series})
        }
    }
}

fn finder_for(servers: &[&MockBackend]) -> Finder {
    Finder::new(FinderConfig::new(servers.iter().map(|s| s.base_url()))).unwrap()
}

// ============================================================================
// Resolution Tests
// ============================================================================

#[tokio::test]
async fn test_resolve_leaf_and_branch() {
    let server = MockBackend::start(|_| {
        json!([
            {"path": "a.b.c", "leaf": true},
            {"path": "a.b.d", "leaf": false}
        ])
    })
    .await;
    let finder = finder_for(&[&server]);

    let nodes = finder
        .find_nodes(&FindQuery::new("a.b.*", 100, 200))
        .await
        .unwrap();

    assert_eq!(nodes.len(), 2);
    assert!(nodes[0].is_leaf());
    assert_eq!(nodes[0].path(), "a.b.c");
    assert_eq!(nodes[0].reader().unwrap().path(), "a.b.c");
    assert!(matches!(&nodes[1], Node::Branch(b) if b.path == "a.b.d"));

    assert_eq!(finder.leaf_cache().get("a.b.c"), Some(true));
    assert_eq!(finder.leaf_cache().get("a.b.d"), None);
    assert_eq!(finder.leaf_cache().get("a.b.*"), None);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/paths");
    assert_eq!(requests[0].param("query"), Some("a.b.*"));
    assert_eq!(requests[0].param("from"), Some("100"));
    assert_eq!(requests[0].param("to"), Some("200"));
}

#[tokio::test]
async fn test_resolving_known_leaf_skips_backend() {
    let server = MockBackend::start(|_| json!([{"path": "a.b.c", "leaf": true}])).await;
    let finder = finder_for(&[&server]);
    let query = FindQuery::new("a.b.c", 0, 60);

    let first = finder.find_nodes(&query).await.unwrap();
    let second = finder.find_nodes(&query).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert!(first[0].is_leaf() && second[0].is_leaf());
    assert_eq!(first[0].path(), second[0].path());

    assert_eq!(server.requests().len(), 1, "second lookup must come from the cache");
    let metrics = finder.metrics();
    assert_eq!(metrics.find_requests, 1);
    assert_eq!(metrics.leaf_cache_hits, 1);
}

#[tokio::test]
async fn test_branch_patterns_are_not_cached() {
    let server = MockBackend::start(|_| json!([{"path": "a.b", "leaf": false}])).await;
    let finder = finder_for(&[&server]);
    let query = FindQuery::new("a.b", 0, 60);

    finder.find_nodes(&query).await.unwrap();
    let nodes = finder.find_nodes(&query).await.unwrap();

    assert!(!nodes[0].is_leaf());
    assert_eq!(server.requests().len(), 2);
    assert!(finder.leaf_cache().is_empty());
}

#[tokio::test]
async fn test_resolve_empty_result() {
    let server = MockBackend::start(|_| json!([])).await;
    let finder = finder_for(&[&server]);

    let nodes = finder
        .find_nodes(&FindQuery::new("nothing.*", 0, 60))
        .await
        .unwrap();
    assert!(nodes.is_empty());
}

#[tokio::test]
async fn test_resolve_malformed_response() {
    let server = MockBackend::start(|_| json!({"unexpected": true})).await;
    let finder = finder_for(&[&server]);

    let result = finder.find_nodes(&FindQuery::new("a.*", 0, 60)).await;
    assert!(matches!(result, Err(FinderError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_resolve_timeout() {
    let server = MockBackend::start_with(Duration::from_millis(500), |_| {
        (StatusCode::OK, json!([]))
    })
    .await;
    let config = FinderConfig::new([server.base_url()])
        .with_find_timeout(Duration::from_millis(100));
    let finder = Finder::new(config).unwrap();

    let result = finder.find_nodes(&FindQuery::new("a.*", 0, 60)).await;
    assert!(matches!(result, Err(FinderError::Timeout(100))));
    assert_eq!(finder.metrics().timeouts, 1);
}

#[tokio::test]
async fn test_resolve_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let finder = Finder::new(FinderConfig::new([format!("http://{}", addr)])).unwrap();
    let result = finder.find_nodes(&FindQuery::new("a.*", 0, 60)).await;
    assert!(matches!(result, Err(FinderError::Transport(_))));
}

#[tokio::test]
async fn test_concurrent_resolution() {
    let server = MockBackend::start(|req| {
        json!([{"path": req.param("query").unwrap_or_default(), "leaf": true}])
    })
    .await;
    let finder = Arc::new(finder_for(&[&server]));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let finder = finder.clone();
            tokio::spawn(async move {
                finder
                    .find_nodes(&FindQuery::new(format!("servers.host{}.cpu", i), 0, 60))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let nodes = handle.await.unwrap().unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_leaf());
    }
    assert_eq!(finder.leaf_cache().len(), 20);
}

// ============================================================================
// Multi-Series Fetch Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_multi_single_batch() {
    let server = MockBackend::start(|req| match req.path.as_str() {
        "/paths" => json!([{"path": "a", "leaf": true}, {"path": "b", "leaf": true}]),
        _ => json!({"from": 0, "to": 60, "step": 60, "series": {"a": [1, 2]}}),
    })
    .await;
    let finder = finder_for(&[&server]);

    let nodes = finder.find_nodes(&FindQuery::new("*", 0, 60)).await.unwrap();
    let (time_info, series) = finder.fetch_multi(&nodes, 0, 60).await.unwrap();

    assert_eq!(time_info, TimeInfo::new(0, 60, 60));
    assert_eq!(series.len(), 1);
    assert_eq!(series["a"], vec![Some(1.0), Some(2.0)]);
    assert!(!series.contains_key("b"));

    let posts = server.requests_to("/metrics");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].method, "POST");
    assert_eq!(posts[0].params("path"), vec!["a", "b"]);
    assert_eq!(posts[0].param("from"), Some("0"));
    assert_eq!(posts[0].param("to"), Some("60"));
}

#[tokio::test]
async fn test_fetch_multi_batches_across_hosts() {
    let leaves = vec!["m.0", "m.1", "m.2", "m.3", "m.4", "m.5"];
    let first = MockBackend::start(echo_handler(leaves.clone())).await;
    let second = MockBackend::start(echo_handler(leaves.clone())).await;

    // every path costs 3 + 6 = 9, so two fit under 20
    let config = FinderConfig::new([first.base_url(), second.base_url()]).with_url_length(20);
    let finder = Finder::new(config).unwrap();

    // the search goes to the first host, the three batches alternate after it
    let nodes = finder.find_nodes(&FindQuery::new("m.*", 0, 60)).await.unwrap();
    let (time_info, series) = finder.fetch_multi(&nodes, 0, 60).await.unwrap();

    assert_eq!(time_info, TimeInfo::new(0, 60, 60));
    assert_eq!(series.len(), 6);
    for leaf in &leaves {
        assert_eq!(series[*leaf], vec![Some(3.0)]);
    }

    let first_posts = first.requests_to("/metrics");
    let second_posts = second.requests_to("/metrics");
    assert_eq!(first_posts.len(), 1);
    assert_eq!(second_posts.len(), 2);

    assert_eq!(second_posts[0].params("path"), vec!["m.0", "m.1"]);
    assert_eq!(first_posts[0].params("path"), vec!["m.2", "m.3"]);
    assert_eq!(second_posts[1].params("path"), vec!["m.4", "m.5"]);

    assert_eq!(finder.metrics().batch_fetches, 3);
}

#[tokio::test]
async fn test_fetch_multi_error_discards_merged_batches() {
    let server = MockBackend::start(|req| match req.path.as_str() {
        "/paths" => json!([
            {"path": "m.0", "leaf": true},
            {"path": "m.1", "leaf": true},
            {"path": "m.2", "leaf": true},
            {"path": "m.3", "leaf": true}
        ]),
        _ if req.params("path").contains(&"m.2") => json!({"error": "x"}),
        _ => json!({"from": 100, "to": 400, "step": 60, "series": {"m.0": [1], "m.1": [2]}}),
    })
    .await;
    let config = FinderConfig::new([server.base_url()]).with_url_length(20);
    let finder = Finder::new(config).unwrap();

    let nodes = finder.find_nodes(&FindQuery::new("m.*", 100, 400)).await.unwrap();
    let (time_info, series) = finder.fetch_multi(&nodes, 100, 400).await.unwrap();

    // spans the requested window, not the merged batch's step
    assert_eq!(time_info, TimeInfo::new(100, 400, 300));
    assert!(series.is_empty());
    assert_eq!(server.requests_to("/metrics").len(), 2);
    assert_eq!(finder.metrics().backend_errors, 1);
}

#[tokio::test]
async fn test_fetch_multi_time_info_from_last_batch() {
    let server = MockBackend::start(|req| match req.path.as_str() {
        "/paths" => json!([{"path": "m.0", "leaf": true}, {"path": "m.1", "leaf": true}]),
        _ if req.params("path") == vec!["m.0"] => {
            json!({"from": 0, "to": 60, "step": 10, "series": {"m.0": [1]}})
        }
        _ => json!({"from": 0, "to": 60, "step": 20, "series": {"m.1": [2]}}),
    })
    .await;
    // one path per batch
    let config = FinderConfig::new([server.base_url()]).with_url_length(10);
    let finder = Finder::new(config).unwrap();

    let nodes = finder.find_nodes(&FindQuery::new("m.*", 0, 60)).await.unwrap();
    let (time_info, series) = finder.fetch_multi(&nodes, 0, 60).await.unwrap();

    assert_eq!(time_info, TimeInfo::new(0, 60, 20));
    assert_eq!(series.len(), 2);
}

#[tokio::test]
async fn test_fetch_multi_timeout_propagates() {
    let server = MockBackend::start_with(Duration::from_millis(500), |_| {
        (StatusCode::OK, json!({"from": 0, "to": 60, "step": 60, "series": {}}))
    })
    .await;
    let config = FinderConfig::new([server.base_url()])
        .with_fetch_timeout(Duration::from_millis(100));
    let finder = Finder::new(config).unwrap();

    let nodes = vec![Node::branch("a")];
    let result = finder.fetch_multi(&nodes, 0, 60).await;
    assert!(matches!(result, Err(FinderError::Timeout(100))));
}

// ============================================================================
// Single-Series Reader Tests
// ============================================================================

#[tokio::test]
async fn test_reader_fetch_values() {
    let server = MockBackend::start(|req| match req.path.as_str() {
        "/paths" => json!([{"path": "a.b.c", "leaf": true}]),
        _ => json!({"from": 0, "to": 180, "step": 60, "series": {"a.b.c": [1, null, 3]}}),
    })
    .await;
    let finder = finder_for(&[&server]);

    let nodes = finder.find_nodes(&FindQuery::new("a.b.c", 0, 180)).await.unwrap();
    let reader = nodes[0].reader().unwrap();
    let (time_info, values) = reader.fetch(0, 180).await.unwrap().unwrap();

    assert_eq!(time_info, TimeInfo::new(0, 180, 60));
    assert_eq!(values, vec![Some(1.0), None, Some(3.0)]);

    let gets = server.requests_to("/metrics");
    assert_eq!(gets.len(), 1);
    assert_eq!(gets[0].method, "GET");
    assert_eq!(gets[0].param("path"), Some("a.b.c"));
    assert_eq!(gets[0].param("from"), Some("0"));
    assert_eq!(gets[0].param("to"), Some("180"));
    assert_eq!(finder.metrics().series_fetches, 1);
}

#[tokio::test]
async fn test_reader_fetch_backend_error_is_degenerate() {
    let server = MockBackend::start_with(Duration::ZERO, |req| match req.path.as_str() {
        "/paths" => (StatusCode::OK, json!([{"path": "a.b.c", "leaf": true}])),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})),
    })
    .await;
    let finder = finder_for(&[&server]);

    let nodes = finder.find_nodes(&FindQuery::new("a.b.c", 100, 400)).await.unwrap();
    let result = nodes[0].reader().unwrap().fetch(100, 400).await.unwrap();

    assert_eq!(result, Some((TimeInfo::new(100, 400, 300), vec![])));
}

#[tokio::test]
async fn test_reader_fetch_no_series_is_none() {
    let server = MockBackend::start(|req| match req.path.as_str() {
        "/paths" => json!([{"path": "a.b.c", "leaf": true}]),
        _ => json!({"from": 0, "to": 60, "step": 60, "series": {}}),
    })
    .await;
    let finder = finder_for(&[&server]);

    let nodes = finder.find_nodes(&FindQuery::new("a.b.c", 0, 60)).await.unwrap();
    let result = nodes[0].reader().unwrap().fetch(0, 60).await.unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_reader_fetch_other_series_only_is_empty() {
    let server = MockBackend::start(|req| match req.path.as_str() {
        "/paths" => json!([{"path": "a.b.c", "leaf": true}]),
        _ => json!({"from": 0, "to": 60, "step": 60, "series": {"x.y.z": [1]}}),
    })
    .await;
    let finder = finder_for(&[&server]);

    let nodes = finder.find_nodes(&FindQuery::new("a.b.c", 0, 60)).await.unwrap();
    let result = nodes[0].reader().unwrap().fetch(0, 60).await.unwrap();
    assert_eq!(result, Some((TimeInfo::new(0, 60, 60), vec![])));
}

#[tokio::test]
async fn test_reader_fetch_malformed() {
    let server = MockBackend::start(|req| match req.path.as_str() {
        "/paths" => json!([{"path": "a.b.c", "leaf": true}]),
        _ => json!({"from": 0}),
    })
    .await;
    let finder = finder_for(&[&server]);

    let nodes = finder.find_nodes(&FindQuery::new("a.b.c", 0, 60)).await.unwrap();
    let result = nodes[0].reader().unwrap().fetch(0, 60).await;
    assert!(matches!(result, Err(FinderError::MalformedResponse(_))));
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[tokio::test]
async fn test_finder_from_json_config() {
    let server = MockBackend::start(echo_handler(vec!["a.b.c"])).await;
    let config = FinderConfig::from_value(&json!({
        "url": format!("{}/", server.base_url()),
        "urllength": 100,
        "fetch_timeout": 2
    }))
    .unwrap();
    let finder = Finder::new(config).unwrap();

    let nodes = finder.find_nodes(&FindQuery::new("a.*", 0, 60)).await.unwrap();
    let (_, series) = finder.fetch_multi(&nodes, 0, 60).await.unwrap();

    assert_eq!(series["a.b.c"], vec![Some(5.0)]);
    assert_eq!(server.requests_to("/paths").len(), 1);
}
