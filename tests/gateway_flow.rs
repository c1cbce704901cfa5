//! End-to-end behavior of the layered router against the in-memory store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::Path;
use axum::http::{Method, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use ip_audit_gateway::config::GatewayConfig;
use ip_audit_gateway::http::demo_routes;
use ip_audit_gateway::security::FORBIDDEN_BODY;

mod common;
use common::{get_from, request_from, TestGateway};

const WAIT: Duration = Duration::from_secs(2);

async fn send(gateway: &TestGateway, request: axum::http::Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = gateway.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn counting_app(hits: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/",
        get(move || {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                "ok"
            }
        }),
    )
}

#[tokio::test]
async fn request_and_response_rows_share_an_id() {
    let gateway = TestGateway::new(demo_routes());

    let (status, body) = send(&gateway, get_from("/test?a=1&a=2&b=x", "203.0.113.7:5000")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
        json!({ "message": "Test endpoint working!" })
    );

    let responses = gateway.store.wait_for_responses(1, WAIT).await;
    let requests = gateway.store.request_logs();
    assert_eq!(requests.len(), 1);
    assert_eq!(responses.len(), 1);

    let request = &requests[0];
    let response = &responses[0];
    assert_eq!(request.request_id, response.request_id);
    assert_eq!(request.http_method, "GET");
    assert_eq!(request.request_path, "/test");
    assert_eq!(request.query_string, Some(json!({ "a": ["1", "2"], "b": "x" })));
    assert_eq!(request.client_ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(request.http_version, "1.1");

    assert_eq!(response.status_code, 200);
    assert_eq!(response.response_size_in_bytes, body.len() as u64);
    assert_eq!(response.server_ip.as_deref(), Some("gateway.test"));
    assert_eq!(response.response_headers["content-type"], json!("application/json"));
    assert!(response.response_time >= request.request_time);
}

#[tokio::test]
async fn blocked_client_gets_403_and_is_still_logged() {
    let hits = Arc::new(AtomicUsize::new(0));
    let gateway = TestGateway::new(counting_app(hits.clone()));
    gateway.block("10.0.0.9").await;

    let (status, body) = send(&gateway, get_from("/", "10.0.0.9:40000")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, FORBIDDEN_BODY.as_bytes());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let responses = gateway.store.wait_for_responses(1, WAIT).await;
    let requests = gateway.store.request_logs();
    assert_eq!(requests[0].client_ip.as_deref(), Some("10.0.0.9"));
    assert_eq!(responses[0].request_id, requests[0].request_id);
    assert_eq!(responses[0].status_code, 403);
    assert_eq!(responses[0].response_size_in_bytes, FORBIDDEN_BODY.len() as u64);
}

#[tokio::test]
async fn other_clients_pass_while_one_is_blocked() {
    let hits = Arc::new(AtomicUsize::new(0));
    let gateway = TestGateway::new(counting_app(hits.clone()));
    gateway.block("10.0.0.9").await;

    let (status, _) = send(&gateway, get_from("/", "10.0.0.10:40000")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inactive_records_do_not_block() {
    let hits = Arc::new(AtomicUsize::new(0));
    let gateway = TestGateway::new(counting_app(hits.clone()));
    gateway.store.set_blocked("10.0.0.9", false);
    gateway.blocklist.refresh(&*gateway.store).await.unwrap();

    let (status, _) = send(&gateway, get_from("/", "10.0.0.9:40000")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ipv4_mapped_peer_matches_ipv4_entry() {
    let hits = Arc::new(AtomicUsize::new(0));
    let gateway = TestGateway::new(counting_app(hits.clone()));
    gateway.block("192.0.2.1").await;

    let (status, _) = send(&gateway, get_from("/", "[::ffff:192.0.2.1]:40000")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn store_write_failures_do_not_reach_the_client() {
    let gateway = TestGateway::new(demo_routes());
    gateway.store.set_fail_writes(true);

    let mut request = request_from(
        Method::POST,
        "/test",
        "198.51.100.4:1234",
        Body::from(r#"{"k":"v"}"#),
    );
    request
        .headers_mut()
        .insert("content-type", "application/json".parse().unwrap());

    let (status, body) = send(&gateway, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
        json!({ "message": "Post request received!", "data": { "k": "v" } })
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(gateway.store.request_logs().is_empty());
    assert!(gateway.store.response_logs().is_empty());
}

#[tokio::test]
async fn response_size_counts_forwarded_bytes() {
    let app = Router::new().route(
        "/bytes/{n}",
        get(|Path(n): Path<usize>| async move { vec![b'x'; n] }),
    );
    let gateway = TestGateway::new(app);

    for (i, n) in [0usize, 1, 64 * 1024].into_iter().enumerate() {
        let (status, body) = send(&gateway, get_from(&format!("/bytes/{n}"), "192.0.2.50:1000")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.len(), n);

        let responses = gateway.store.wait_for_responses(i + 1, WAIT).await;
        let requests = gateway.store.request_logs();
        let id = requests[i].request_id;
        let row = responses
            .iter()
            .find(|r| r.request_id == id)
            .expect("response row for request");
        assert_eq!(row.response_size_in_bytes, n as u64);
    }
}

#[tokio::test]
async fn abandoned_response_is_still_logged() {
    let app = Router::new().route("/", get(|| async { "never read" }));
    let gateway = TestGateway::new(app);

    let response = gateway
        .router
        .clone()
        .oneshot(get_from("/", "192.0.2.60:1000"))
        .await
        .unwrap();
    drop(response);

    let responses = gateway.store.wait_for_responses(1, WAIT).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status_code, 200);
    assert_eq!(responses[0].response_size_in_bytes, 0);
}

#[tokio::test]
async fn duration_covers_handler_time() {
    let app = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            "done"
        }),
    );
    let gateway = TestGateway::new(app);

    let started = Instant::now();
    send(&gateway, get_from("/slow", "192.0.2.70:1000")).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let responses = gateway.store.wait_for_responses(1, WAIT).await;
    let duration = responses[0].duration_ms;
    assert!(duration >= 200, "duration {duration}ms shorter than handler sleep");
    // Measured inside the client's window, so at most one ms of rounding above it
    assert!(
        duration <= elapsed_ms + 1,
        "duration {duration}ms exceeds measured {elapsed_ms}ms"
    );
    assert!(
        elapsed_ms.saturating_sub(duration) <= 10,
        "duration {duration}ms too far below measured {elapsed_ms}ms"
    );
}

#[tokio::test]
async fn timed_out_request_gets_a_response_row() {
    let mut config = GatewayConfig::default();
    config.timeouts.request_secs = 1;
    let app = Router::new().route(
        "/hang",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            "late"
        }),
    );
    let gateway = TestGateway::with_config(config, app);

    let (status, _) = send(&gateway, get_from("/hang", "192.0.2.80:1000")).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    let responses = gateway.store.wait_for_responses(1, WAIT).await;
    assert_eq!(responses[0].status_code, 408);
}

#[tokio::test]
async fn concurrent_requests_get_distinct_ids() {
    let gateway = Arc::new(TestGateway::new(demo_routes()));

    let mut tasks = Vec::new();
    for i in 0..100u16 {
        let gateway = Arc::clone(&gateway);
        tasks.push(tokio::spawn(async move {
            let peer = format!("192.0.2.{}:{}", i % 250 + 1, 10_000 + i);
            send(&gateway, get_from("/test", &peer)).await.0
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    let responses = gateway.store.wait_for_responses(100, Duration::from_secs(5)).await;
    let requests = gateway.store.request_logs();
    assert_eq!(requests.len(), 100);
    assert_eq!(responses.len(), 100);

    let request_ids: HashSet<_> = requests.iter().map(|r| r.request_id).collect();
    let response_ids: HashSet<_> = responses.iter().map(|r| r.request_id).collect();
    assert_eq!(request_ids.len(), 100);
    assert_eq!(request_ids, response_ids);
}

#[tokio::test]
async fn blocklist_readers_never_see_partial_sets() {
    use ip_audit_gateway::security::BlocklistCache;

    let cache = Arc::new(BlocklistCache::new());
    let even: HashSet<String> = (0..50).map(|i| format!("10.0.0.{}", i * 2)).collect();
    let odd: HashSet<String> = (0..50).map(|i| format!("10.0.0.{}", i * 2 + 1)).collect();

    let writer = {
        let cache = Arc::clone(&cache);
        let (even, odd) = (even.clone(), odd.clone());
        tokio::spawn(async move {
            for round in 0..500 {
                cache.replace(if round % 2 == 0 { even.clone() } else { odd.clone() });
                tokio::task::yield_now().await;
            }
        })
    };

    let reader = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            for _ in 0..500 {
                let snapshot = cache.snapshot();
                assert!(
                    snapshot.is_empty() || *snapshot == even || *snapshot == odd,
                    "observed a mixed snapshot"
                );
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
}
