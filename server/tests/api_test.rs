//! HTTP tests against a server bound to an ephemeral port.

use axum::http::request::Parts;
use mockbase_engine::{Schema, Store};
use mockbase_server::{
    build_app, config::Config, error::AppError, hooks::RequestHook, models, now_millis, AppState,
};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MODELS: &str = r#"[
    {
        "resource": "users",
        "fields": [
            {"name": "id", "type": "number", "autoIncrement": true},
            {"name": "name", "type": "string", "required": true, "min": 2, "max": 50},
            {"name": "age", "type": "number", "min": 0, "max": 150}
        ]
    },
    {
        "resource": "notes",
        "strict": true,
        "fields": [{"name": "text", "type": "string", "required": true}],
        "seed": [{"text": "welcome"}]
    }
]"#;

struct TestServer {
    base: String,
    client: Client,
    storage: PathBuf,
    _dir: TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post(&self, path: &str, body: Value, token: Option<&str>) -> reqwest::Response {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }

    async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }

    async fn token(&self, sub: &str) -> String {
        let res = self.post("/api/auth/token", json!({ "sub": sub }), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }
}

fn schema() -> Schema {
    Schema::from_models(models::parse_models(MODELS).unwrap()).unwrap()
}

fn config(storage: &Path, auth_secret: Option<&str>) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        models_path: PathBuf::new(),
        storage_path: storage.to_path_buf(),
        auth_secret: auth_secret.map(String::from),
        token_ttl_secs: Some(3600),
        api_prefix: "/api".to_string(),
    }
}

async fn spawn_with(auth_secret: Option<&str>, customize: impl FnOnce(AppState) -> AppState) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let storage = dir.path().join("db.json");
    let store = Store::open(schema(), &storage, now_millis()).unwrap();
    let state = customize(AppState::new(store, config(&storage, auth_secret)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        client: Client::new(),
        storage,
        _dir: dir,
    }
}

async fn spawn(auth_secret: Option<&str>) -> TestServer {
    spawn_with(auth_secret, |state| state).await
}

#[tokio::test]
async fn health_and_root() {
    let server = spawn(None).await;

    let res = server.get("/health", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let body: Value = server.get("/", None).await.json().await.unwrap();
    assert_eq!(body["resources"], json!(["users", "notes"]));
    assert_eq!(body["auth"], false);
}

#[tokio::test]
async fn crud_lifecycle() {
    let server = spawn(None).await;

    let res = server.post("/api/users", json!({"name": "Ann", "age": 30}), None).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["data"]["id"], 1);
    assert_eq!(created["data"]["name"], "Ann");
    assert!(created["data"]["createdAt"].is_u64());
    assert!(created["data"].get("createdBy").is_none());

    let res = server.get("/api/users/1", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched, created);

    let res = server
        .client
        .patch(server.url("/api/users/1"))
        .json(&json!({"age": 31}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["data"]["name"], "Ann");
    assert_eq!(updated["data"]["age"], 31);
    assert_eq!(updated["data"]["createdAt"], created["data"]["createdAt"]);
    assert!(updated["data"]["updatedAt"].as_u64() > created["data"]["updatedAt"].as_u64());

    let res = server.client.delete(server.url("/api/users/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = server.get("/api/users/1", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.post("/api/users", json!({"name": "Bob"}), None).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["id"], 2);
}

#[tokio::test]
async fn validation_errors_list_details() {
    let server = spawn(None).await;

    let res = server.post("/api/users", json!({"name": "A"}), None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["details"], json!(["name must be at least 2 characters"]));

    let res = server.post("/api/users", json!({"name": "Ann", "age": 200}), None).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["details"], json!(["age must be at most 150"]));

    let res = server.post("/api/users", json!({"name": "Ann", "id": 9}), None).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["details"], json!(["id is read-only"]));

    let res = server.post("/api/notes", json!({"text": "hi", "color": "red"}), None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .post(server.url("/api/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_resources_and_bad_ids() {
    let server = spawn(None).await;

    let res = server.get("/api/ghosts", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.post("/api/ghosts", json!({"a": 1}), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.get("/api/users/abc", None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.client.delete(server.url("/api/users/99")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_sorts_and_paginates() {
    let server = spawn(None).await;
    for (name, age) in [("Ann", 30), ("Bob", 45), ("Cid", 18), ("Dee", 60), ("Eve", 45)] {
        server.post("/api/users", json!({"name": name, "age": age}), None).await;
    }
    server.post("/api/users", json!({"name": "Fay"}), None).await;

    let body: Value = server.get("/api/users", None).await.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 6);
    assert_eq!(
        body["pagination"],
        json!({"total": 6, "current_page": 1, "per_page": 10, "total_pages": 1})
    );

    let body: Value = server
        .get("/api/users?age__gte=30&sort_by=age&order=desc&page_size=2", None)
        .await
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Dee", "Bob"]);
    assert_eq!(
        body["pagination"],
        json!({"total": 4, "current_page": 1, "per_page": 2, "total_pages": 2})
    );

    let body: Value = server.get("/api/users?age=45", None).await.json().await.unwrap();
    assert_eq!(body["pagination"]["total"], 2);

    // Records without `age` never satisfy a comparison.
    let body: Value = server.get("/api/users?age__lt=100", None).await.json().await.unwrap();
    assert_eq!(body["pagination"]["total"], 5);

    let body: Value = server
        .get("/api/users?name__contains=e&current_page=9", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["pagination"]["total"], 2);

    let res = server.get("/api/users?page_size=lots", None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn changes_are_persisted() {
    let server = spawn(None).await;
    server.post("/api/users", json!({"name": "Ann"}), None).await;
    server.post("/api/users", json!({"name": "Bob"}), None).await;
    server.client.delete(server.url("/api/users/2")).send().await.unwrap();

    let reopened = Store::open(schema(), &server.storage, now_millis()).unwrap();
    let users = reopened.collection("users").unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users.counter(), 2);
    assert_eq!(reopened.collection("notes").unwrap().len(), 1);
}

#[tokio::test]
async fn auth_guards_routes_and_ownership() {
    let server = spawn(Some("test-secret")).await;

    let res = server.get("/api/users", None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server.get("/api/users", Some("garbage")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/api/users"))
        .header("authorization", "Basic abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server.post("/api/auth/token", json!({"role": "admin"}), None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let alice = server.token("alice").await;
    let bob = server.token("bob").await;

    let res = server.post("/api/users", json!({"name": "Alice"}), Some(&alice)).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["createdBy"], "alice");

    // Reads are not ownership restricted.
    let res = server.get("/api/users/1", Some(&bob)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .put(server.url("/api/users/1"))
        .bearer_auth(&bob)
        .json(&json!({"name": "Mallory"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .delete(server.url("/api/users/1"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .put(server.url("/api/users/1"))
        .bearer_auth(&alice)
        .json(&json!({"name": "Alicia"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Seeded records have no owner.
    let res = server
        .client
        .patch(server.url("/api/notes/1"))
        .bearer_auth(&bob)
        .json(&json!({"text": "edited"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn token_endpoint_signs_any_subject() {
    let server = spawn(Some("test-secret")).await;

    let alice = server.token("alice").await;
    server.post("/api/users", json!({"name": "Alice"}), Some(&alice)).await;

    // No credentials are needed to mint a token for an existing owner.
    let impostor = server.token("alice").await;
    let res = server
        .client
        .delete(server.url("/api/users/1"))
        .bearer_auth(&impostor)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn token_endpoint_absent_without_auth() {
    let server = spawn(None).await;
    let res = server.post("/api/auth/token", json!({"sub": "alice"}), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_id_header() {
    let server = spawn(None).await;

    let res = server.get("/health", None).await;
    let id = res.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());

    let res = server
        .client
        .get(server.url("/health"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers().get("x-request-id").unwrap(), "abc-123");
}

struct DenyReadOnly;

impl RequestHook for DenyReadOnly {
    fn before(&self, parts: &mut Parts) -> Result<(), AppError> {
        if parts.headers.contains_key("x-read-only") && parts.method != axum::http::Method::GET {
            return Err(AppError::BadRequest("read-only client".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn custom_hook_can_reject() {
    let server = spawn_with(None, |state| state.with_hook(DenyReadOnly)).await;

    let res = server
        .client
        .post(server.url("/api/users"))
        .header("x-read-only", "1")
        .json(&json!({"name": "Ann"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = server.get("/api/users", None).await.json().await.unwrap();
    assert_eq!(body["pagination"]["total"], 0);
}
