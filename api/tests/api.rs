use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use ai_llm_service::{AiLlmError, BoxFuture, ChatModel, EmbeddingModel, LlmServiceProfiles};
use api::core::{app_state::AppState, config::AppConfig};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use rag_store::{RagError, TextExtractor, VectorIndex};
use storage::{LocalObjectStore, ObjectStore, StorageError};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const PAGES: [&str; 3] = [
    "Rust guarantees memory safety through ownership.",
    "Borrowing lets code use a value without taking ownership.",
    "Lifetimes describe how long references stay valid.",
];

struct StubExtractor;

impl TextExtractor for StubExtractor {
    fn extract_pages<'a>(&'a self, _path: &'a Path) -> BoxFuture<'a, Result<Vec<String>, RagError>> {
        Box::pin(async { Ok(PAGES.iter().map(|p| p.to_string()).collect()) })
    }
}

/// Vowel histogram: similar wording lands close together.
struct VowelEmbedder;

impl EmbeddingModel for VowelEmbedder {
    fn model_id(&self) -> &str {
        "vowel-embed"
    }

    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, AiLlmError>> {
        Box::pin(async move {
            let lower = text.to_lowercase();
            Ok("aeiou"
                .chars()
                .map(|v| lower.chars().filter(|c| *c == v).count() as f32)
                .collect())
        })
    }
}

#[derive(Default)]
struct CountingChat {
    calls: AtomicUsize,
}

impl ChatModel for CountingChat {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        _max_tokens: Option<u32>,
    ) -> BoxFuture<'a, Result<String, AiLlmError>> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let grounded = prompt.contains("<context>") && prompt.contains("ownership");
            Ok(format!("answer {n} grounded={grounded}"))
        })
    }
}

struct Harness {
    dir: TempDir,
    state: Arc<AppState>,
    app: Router,
}

fn config(root: &Path, extra: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = [
        ("OLLAMA_URL", "http://127.0.0.1:9"),
        ("CHAT_MODEL", "test-chat"),
        ("EMBEDDING_MODEL", "vowel-embed"),
        ("CHUNK_SIZE", "200"),
        ("CHUNK_OVERLAP", "20"),
        ("RAG_TOP_K", "2"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in [
        ("DATA_DIR", root.join("data")),
        ("INDEX_DIR", root.join("vector_index")),
        ("HISTORY_FILE", root.join("chat_history.json")),
    ] {
        vars.insert(k.to_string(), v.display().to_string());
    }
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    let lookup = move |name: &str| vars.get(name).cloned();
    AppConfig::from_lookup(&lookup).unwrap()
}

/// Local bucket that starts rejecting writes after `puts_left` of them.
struct FlakyStore {
    inner: LocalObjectStore,
    puts_left: AtomicUsize,
}

impl FlakyStore {
    fn new(root: &Path, puts_left: usize) -> Arc<dyn ObjectStore> {
        Arc::new(Self {
            inner: LocalObjectStore::new(root.join("bucket"), "learn-smart").unwrap(),
            puts_left: AtomicUsize::new(puts_left),
        })
    }
}

impl ObjectStore for FlakyStore {
    fn describe(&self) -> String {
        format!("flaky {}", self.inner.describe())
    }

    fn put<'a>(&'a self, key: &'a str, body: Vec<u8>) -> BoxFuture<'a, Result<(), StorageError>> {
        let allowed = self
            .puts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if allowed {
            return self.inner.put(key, body);
        }
        Box::pin(async move {
            Err(StorageError::HttpStatus {
                status: 503,
                url: format!("http://bucket/{key}"),
            })
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>, StorageError>> {
        self.inner.get(key)
    }
}

fn local_bucket(root: &Path) -> Arc<dyn ObjectStore> {
    FlakyStore::new(root, usize::MAX)
}

fn state_in(dir: &TempDir, extra: &[(&str, &str)], store: Option<Arc<dyn ObjectStore>>) -> AppState {
    AppState::new(
        config(dir.path(), extra),
        Arc::new(VowelEmbedder),
        Arc::new(CountingChat::default()),
        Arc::new(StubExtractor),
        store,
    )
}

fn harness_in(
    dir: TempDir,
    extra: &[(&str, &str)],
    store: Option<Arc<dyn ObjectStore>>,
) -> Harness {
    let state = Arc::new(state_in(&dir, extra, store));
    let app = api::router(state.clone());
    Harness { dir, state, app }
}

fn harness() -> Harness {
    harness_in(tempfile::tempdir().unwrap(), &[], None)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn upload(file_name: &str, content: &[u8]) -> Request<Body> {
    let boundary = "learnsmartboundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send(app, post("/sessions")).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn upload_and_index(app: &Router) -> Value {
    let (status, _) = send(app, upload("paper.pdf", b"%PDF-1.4 fake body")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(app, post("/index")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn root_serves_the_page() {
    let h = harness();
    let res = h.app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8_lossy(&html);
    assert!(html.contains("Vectors Update"));
    assert!(html.contains("Get answer"));
    assert!(html.contains("End chat"));
}

#[tokio::test]
async fn asking_before_any_index_is_a_conflict() {
    let h = harness();
    let id = new_session(&h.app).await;
    let (status, body) = send(
        &h.app,
        post_json(&format!("/sessions/{id}/ask"), r#"{"question":"what?"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INDEX_MISSING");
}

#[tokio::test]
async fn upload_rejects_non_pdf_content() {
    let h = harness();
    let (status, body) = send(&h.app, upload("notes.pdf", b"plain text")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(!h.dir.path().join("data/uploaded_file.pdf").exists());
}

#[tokio::test]
async fn upload_overwrites_the_stored_pdf() {
    let h = harness();
    send(&h.app, upload("a.pdf", b"%PDF-1.4 first")).await;
    let (status, body) = send(&h.app, upload("b.pdf", b"%PDF-1.7 second")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bytes"], 15);

    let stored = std::fs::read(h.dir.path().join("data/uploaded_file.pdf")).unwrap();
    assert_eq!(stored, b"%PDF-1.7 second");

    // Written through a temporary file that is renamed into place.
    let names: Vec<String> = std::fs::read_dir(h.dir.path().join("data"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["uploaded_file.pdf"]);
}

#[tokio::test]
async fn index_with_no_pdf_is_rejected() {
    let h = harness();
    let (status, body) = send(&h.app, post("/index")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "NOTHING_TO_INDEX");
}

#[tokio::test]
async fn upload_index_ask_and_end_chat() {
    let h = harness();
    let built = upload_and_index(&h.app).await;
    assert_eq!(built["data"]["chunks"], 3);
    assert_eq!(built["data"]["dimension"], 5);
    assert_eq!(built["data"]["embedding_model"], "vowel-embed");
    assert!(h.dir.path().join("vector_index/index.json").exists());

    let id = new_session(&h.app).await;
    let (status, body) = send(
        &h.app,
        post_json(
            &format!("/sessions/{id}/ask"),
            r#"{"question":"  What does ownership guarantee?  "}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["answer"], "answer 1 grounded=true");
    assert_eq!(body["data"]["context"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["turns"], 1);

    let (_, session) = send(&h.app, get(&format!("/sessions/{id}"))).await;
    let turns = session["data"]["turns"].as_array().unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0]["prompt"], "What does ownership guarantee?");

    let (status, ended) = send(&h.app, post(&format!("/sessions/{id}/end"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["data"]["flushed"], 1);

    let saved: Value =
        serde_json::from_slice(&std::fs::read(h.dir.path().join("chat_history.json")).unwrap())
            .unwrap();
    assert_eq!(saved[0]["answer"], "answer 1 grounded=true");

    let (_, session) = send(&h.app, get(&format!("/sessions/{id}"))).await;
    assert!(session["data"]["turns"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn end_chat_without_persist_discards() {
    let h = harness();
    upload_and_index(&h.app).await;
    let id = new_session(&h.app).await;
    send(
        &h.app,
        post_json(&format!("/sessions/{id}/ask"), r#"{"question":"borrowing?"}"#),
    )
    .await;

    let (status, body) = send(&h.app, post(&format!("/sessions/{id}/end?persist=false"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["flushed"], 0);
    assert_eq!(body["data"]["discarded"], 1);
    assert!(!h.dir.path().join("chat_history.json").exists());
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let h = harness();
    let missing = "00000000-0000-4000-8000-000000000000";
    let (status, body) = send(&h.app, get(&format!("/sessions/{missing}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&h.app, post(&format!("/sessions/{missing}/end"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_ask_body_gets_the_error_envelope() {
    let h = harness();
    let id = new_session(&h.app).await;
    let (status, body) = send(
        &h.app,
        post_json(&format!("/sessions/{id}/ask"), r#"{"text":"hi"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let h = harness();
    upload_and_index(&h.app).await;
    let id = new_session(&h.app).await;
    let (status, _) = send(
        &h.app,
        post_json(&format!("/sessions/{id}/ask"), r#"{"question":"   "}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let session = h.state.sessions.get(id.parse().unwrap()).await.unwrap();
    assert!(session.is_empty());
}

#[tokio::test]
async fn fresh_process_loads_the_persisted_index() {
    let first = harness();
    upload_and_index(&first.app).await;

    // Same directories, empty cache.
    let second = harness_in(first.dir, &[], None);
    let id = new_session(&second.app).await;
    let (status, body) = send(
        &second.app,
        post_json(&format!("/sessions/{id}/ask"), r#"{"question":"lifetimes?"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(second.state.index.read().await.is_some());
}

#[tokio::test]
async fn index_is_published_and_restored_from_the_object_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = local_bucket(dir.path());
    let h = harness_in(dir, &[], Some(store));
    let built = upload_and_index(&h.app).await;
    let uploaded = built["data"]["uploaded"].as_array().unwrap();
    assert_eq!(uploaded.len(), 2);
    assert!(
        h.dir
            .path()
            .join("bucket/learn-smart/vector_index/index.json")
            .exists()
    );

    // Local index directory gone: the next ask pulls it back from the bucket.
    std::fs::remove_dir_all(h.dir.path().join("vector_index")).unwrap();
    let store = local_bucket(h.dir.path());
    let restored = harness_in(h.dir, &[], Some(store));
    let id = new_session(&restored.app).await;
    let (status, body) = send(
        &restored.app,
        post_json(&format!("/sessions/{id}/ask"), r#"{"question":"ownership?"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(restored.dir.path().join("vector_index/docstore.json").exists());
}

#[tokio::test]
async fn health_without_providers_is_ok() {
    let h = harness();
    let (status, body) = send(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn failed_publish_still_serves_the_rebuilt_index() {
    let dir = tempfile::tempdir().unwrap();
    // Two artifacts for the first publish, one more for the second.
    let store = FlakyStore::new(dir.path(), 3);
    let h = harness_in(dir, &[], Some(store));
    upload_and_index(&h.app).await;
    let first = h.state.index.read().await.clone().unwrap();

    let (status, body) = send(&h.app, post("/index")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "OBJECT_STORE_ERROR");

    // Objects written before the failure stay in the bucket.
    assert!(
        h.dir
            .path()
            .join("bucket/learn-smart/vector_index/docstore.json")
            .exists()
    );

    let cached = h.state.index.read().await.clone().unwrap();
    let on_disk = VectorIndex::load(&h.dir.path().join("vector_index"), None)
        .await
        .unwrap();
    assert_eq!(cached.manifest().built_at, on_disk.manifest().built_at);
    assert_ne!(cached.manifest().built_at, first.manifest().built_at);
}

#[tokio::test]
async fn history_upload_failure_is_reported_without_duplicating_turns() {
    let dir = tempfile::tempdir().unwrap();
    // Enough writes for the index artifacts, none for the history.
    let store = FlakyStore::new(dir.path(), 2);
    let h = harness_in(dir, &[], Some(store));
    upload_and_index(&h.app).await;

    let id = new_session(&h.app).await;
    send(
        &h.app,
        post_json(&format!("/sessions/{id}/ask"), r#"{"question":"ownership?"}"#),
    )
    .await;

    let (status, body) = send(&h.app, post(&format!("/sessions/{id}/end"))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["flushed"], 1);
    assert!(body["data"]["mirror_error"].as_str().unwrap().contains("503"));

    let (_, again) = send(&h.app, post(&format!("/sessions/{id}/end"))).await;
    assert_eq!(again["data"]["flushed"], 0);
    assert!(again["data"].get("mirror_error").is_none());

    let saved: Vec<Value> =
        serde_json::from_slice(&std::fs::read(h.dir.path().join("chat_history.json")).unwrap())
            .unwrap();
    assert_eq!(saved.len(), 1);
}

#[tokio::test]
async fn idle_sessions_are_dropped() {
    let h = harness_in(
        tempfile::tempdir().unwrap(),
        &[("SESSION_IDLE_TTL_SECS", "0")],
        None,
    );
    let stale = new_session(&h.app).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let fresh = new_session(&h.app).await;

    assert_eq!(h.state.sessions.len().await, 1);
    let (status, _) = send(&h.app, get(&format!("/sessions/{stale}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&h.app, get(&format!("/sessions/{fresh}"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_is_unavailable_when_a_model_is_missing() {
    let ollama = axum::Router::new().route(
        "/api/tags",
        axum::routing::get(|| async {
            axum::Json(serde_json::json!({ "models": [{ "name": "other" }] }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, ollama).await.unwrap() });

    let dir = tempfile::tempdir().unwrap();
    let url = format!("http://{addr}");
    let mut state = state_in(&dir, &[("OLLAMA_URL", url.as_str())], None);
    state.profiles = Some(Arc::new(
        LlmServiceProfiles::new(state.config.chat.clone(), state.config.embedding.clone(), Some(2))
            .unwrap(),
    ));
    let app = api::router(Arc::new(state));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let probes = body["data"].as_array().unwrap();
    assert_eq!(probes.len(), 2);
    assert!(probes.iter().all(|p| p["ok"] == false));
}
