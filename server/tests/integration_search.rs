use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use selfindex::{
    Compression, Document, EngineConfig, IndexDescriptor, Optimization, QueryStrategy, Representation, SearchEngine,
    SimpleTokenizer, Storage,
};
use selfindex_server::{router, AppState};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn tiny_engine(root: &Path) -> Arc<SearchEngine> {
    let d = IndexDescriptor::new(
        Representation::TfIdf,
        Storage::CustomInMemory,
        Compression::CodecA,
        QueryStrategy::DocumentAtATime,
        Optimization::EarlyStopping,
    )
    .unwrap();
    let engine = SearchEngine::new(d, EngineConfig::with_root(root), Box::new(SimpleTokenizer));
    engine
        .build(vec![
            Document::new("doc0", "rust is great, rust systems programming").with_title("Doc 0"),
            Document::new("doc1", "learning rust").with_title("Doc 1"),
            Document::new("doc2", "gardening notes"),
        ])
        .unwrap();
    Arc::new(engine)
}

fn app(engine: Arc<SearchEngine>) -> Router {
    router(AppState { engine, admin_token: Some("secret".into()) })
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn post(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .header("X-ADMIN-TOKEN", token)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let app = app(tiny_engine(dir.path()));

    let (status, json) = get(app, "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"], "doc0");
    assert_eq!(arr[0]["title"], "Doc 0");
    assert_eq!(arr[1]["doc_id"], "doc1");
    assert!(arr[0]["score"].as_f64().unwrap() > arr[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn malformed_query_is_bad_request() {
    let dir = tempdir().unwrap();
    let (status, json) = get(app(tiny_engine(dir.path())), "/search?q=rust%20AND").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("malformed"));
}

#[tokio::test]
async fn unloaded_engine_is_unavailable() {
    let dir = tempdir().unwrap();
    let engine = SearchEngine::new(IndexDescriptor::default(), EngineConfig::with_root(dir.path()), Box::new(SimpleTokenizer));
    let (status, _) = get(app(Arc::new(engine)), "/search?q=rust").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn doc_and_stats_endpoints() {
    let dir = tempdir().unwrap();
    let engine = tiny_engine(dir.path());
    let (status, json) = get(app(engine.clone()), "/doc/doc1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Doc 1");
    let (status, _) = get(app(engine.clone()), "/doc/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get(app(engine), "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_docs"], 3);
    assert_eq!(json["state"], "Ready");
}

#[tokio::test]
async fn batch_and_commit_require_token() {
    let dir = tempdir().unwrap();
    let engine = tiny_engine(dir.path());
    let batch = serde_json::json!({ "add": [{ "doc_id": "doc3", "content": "rust gardening" }], "remove": ["doc0"] });

    let (status, _) = send(app(engine.clone()), post("/index/batch", "wrong", batch.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = send(app(engine.clone()), post("/index/batch", "secret", batch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["processed"], 1);
    assert_eq!(json["removed"], 1);

    let (_, json) = get(app(engine.clone()), "/search?q=rust").await;
    let ids: Vec<&str> = json["results"].as_array().unwrap().iter().map(|h| h["doc_id"].as_str().unwrap()).collect();
    assert!(!ids.contains(&"doc0"));
    assert!(ids.contains(&"doc3"));

    let (status, json) = send(app(engine.clone()), post("/index/commit", "secret", Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["committed"], engine.descriptor().short_id());
    assert!(selfindex::footprint(dir.path(), engine.descriptor()).unwrap() > 0);
}
