//! End-to-end tests for the HTTP gateway, driven through the router in-process.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use heartbeat_ledger::{
    apply_middleware,
    chain::{is_valid, validate_chain},
    config::Config,
    create_router,
    ledger::LedgerStore,
    model::{compute_block_hash, Block},
    routes::{HealthResp, ValidateResp, VersionResp},
    AppState,
};
use tower::ServiceExt;

fn test_state() -> AppState {
    AppState::new(LedgerStore::new().unwrap())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn post(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn get_returns_genesis_chain() {
    let app = create_router(test_state());
    let (status, body) = send(app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    let chain: Vec<Block> = serde_json::from_slice(&body).unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].index, 0);
    assert_eq!(chain[0].value, 0);
    assert_eq!(chain[0].prev_hash, "");

    // Pretty-printed, stable field order.
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains('\n'));
    let order: Vec<usize> = ["\"index\"", "\"timestamp\"", "\"bpm\"", "\"hash\"", "\"prevHash\""]
        .iter()
        .map(|k| text.find(k).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn post_appends_block() {
    let state = test_state();
    let genesis = state.ledger.last_block().unwrap();
    let app = create_router(state.clone());

    let (status, body) = send(app.clone(), post(r#"{"bpm": 65}"#)).await;
    assert_eq!(status, StatusCode::CREATED);

    let block: Block = serde_json::from_slice(&body).unwrap();
    assert_eq!(block.index, 1);
    assert_eq!(block.value, 65);
    assert_eq!(block.prev_hash, genesis.hash);
    assert_eq!(block.hash, compute_block_hash(&block));

    let (_, body) = send(app, get("/")).await;
    let chain: Vec<Block> = serde_json::from_slice(&body).unwrap();
    assert_eq!(chain.len(), 2);
    assert!(is_valid(&chain[1], &chain[0]));
}

#[tokio::test]
async fn post_accepts_field_aliases() {
    let state = test_state();
    let app = create_router(state.clone());

    let (status, _) = send(app.clone(), post(r#"{"BPM": 70}"#)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(app, post(r#"{"value": 71}"#)).await;
    assert_eq!(status, StatusCode::CREATED);

    let chain = state.ledger.read();
    assert_eq!(chain[1].value, 70);
    assert_eq!(chain[2].value, 71);
}

#[tokio::test]
async fn malformed_body_is_echoed_with_400() {
    let state = test_state();
    let app = create_router(state.clone());

    let raw = r#"{"bpm": "fast"}"#;
    let (status, body) = send(app, post(raw)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, raw.as_bytes());
    assert_eq!(state.ledger.len(), 1);
}

#[tokio::test]
async fn validate_reports_clean_chain() {
    let state = test_state();
    let app = create_router(state.clone());
    for bpm in [60, 61, 62] {
        state.ledger.try_append(bpm).unwrap();
    }

    let (status, body) = send(app, get("/validate")).await;
    assert_eq!(status, StatusCode::OK);
    let resp: ValidateResp = serde_json::from_slice(&body).unwrap();
    assert!(resp.ok);
    assert_eq!(resp.length, 4);
    assert!(resp.errors.is_empty());
}

#[tokio::test]
async fn health_and_version() {
    let state = test_state();
    state.ledger.try_append(72).unwrap();
    let app = create_router(state);

    let (status, body) = send(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResp = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.length, 2);

    let (status, body) = send(app, get("/version")).await;
    assert_eq!(status, StatusCode::OK);
    let version: VersionResp = serde_json::from_slice(&body).unwrap();
    assert_eq!(version.name, "heartbeat-ledger");
    assert_eq!(version.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let config = Config::from_lookup(|k| match k {
        "ADDR" => Some("0".into()),
        "LEDGER_MAX_BODY_BYTES" => Some("16".into()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.request_timeout, Duration::from_secs(10));

    let state = test_state();
    let app = apply_middleware(create_router(state.clone()), &config);

    let raw = format!(r#"{{"bpm": 65, "padding": "{}"}}"#, "x".repeat(64));
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, raw.len())
        .body(Body::from(raw))
        .unwrap();
    let (status, _) = send(app.clone(), request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(state.ledger.len(), 1);

    let (status, _) = send(app, post(r#"{"bpm":65}"#)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn concurrent_posts_all_land_on_one_valid_chain() {
    const K: usize = 24;
    let state = test_state();
    let app = create_router(state.clone());

    let mut tasks = Vec::with_capacity(K);
    for k in 0..K {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            send(app, post(&format!(r#"{{"bpm": {k}}}"#))).await.0
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::CREATED);
    }

    let chain = state.ledger.read();
    assert_eq!(chain.len(), K + 1);
    assert!(validate_chain(&chain).is_empty());

    let mut values: Vec<i64> = chain[1..].iter().map(|b| b.value).collect();
    values.sort_unstable();
    assert_eq!(values, (0..K as i64).collect::<Vec<_>>());
}
