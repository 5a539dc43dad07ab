use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use deckscribe_server::{http, AppState, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self { router: http::router(AppState::in_memory(ServerConfig::default())) }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Bytes) {
        let mut request = Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header("content-type", "application/json");
        }
        let request = request.body(body.map_or_else(Body::empty, |b| Body::from(b.to_string()))).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes)
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|b| b.to_string());
        let (status, bytes) = self.send(method, uri, body.as_deref()).await;
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, value)
    }

    async fn create(&self, name: &str) -> u64 {
        let (status, body) = self.json(Method::POST, "/document", Some(json!({"name": name}))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_u64().unwrap()
    }
}

#[tokio::test]
async fn create_then_read_default_deck() {
    let app = TestApp::new();
    let id = app.create("Goblins").await;

    let (status, body) = app.json(Method::GET, &format!("/document/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], json!(1));
    assert_eq!(body["snapshot"]["imagePrefix"], json!("/"));
    assert_eq!(body["snapshot"]["files"], json!({}));

    let (status, body) = app.json(Method::GET, &format!("/document/{id}/version"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"version": 1}));
}

#[tokio::test]
async fn duplicate_name_is_rejected() {
    let app = TestApp::new();
    app.create("Goblins").await;
    let (status, bytes) = app.send(Method::POST, "/document", Some(r#"{"name":"Goblins"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(&bytes[..], b"Deck with that name already exists.");
}

#[tokio::test]
async fn patch_flow() {
    let app = TestApp::new();
    let id = app.create("Goblins").await;
    let uri = format!("/document/{id}?version=1");

    let patch = json!([{"op": "replace", "path": "/scriptText", "value": "card()"}]);
    let (status, body) = app.json(Method::PATCH, &uri, Some(patch.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], json!(2));
    assert_eq!(body["snapshot"]["scriptText"], json!("card()"));

    // same expected version again
    let (status, bytes) = app.send(Method::PATCH, &uri, Some(&patch.to_string())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(&bytes[..], b"Version mismatch");

    let (_, body) = app.json(Method::GET, &format!("/document/{id}"), None).await;
    assert_eq!(body["version"], json!(2));
}

#[tokio::test]
async fn patch_rejections() {
    let app = TestApp::new();
    let id = app.create("Goblins").await;

    let ok_patch = r#"[{"op":"add","path":"/files/a.csv","value":"x"}]"#;
    let (status, _) = app.send(Method::PATCH, &format!("/document/{id}"), Some(ok_patch)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "missing version");

    let (status, _) = app.send(Method::PATCH, &format!("/document/{id}?version=1"), Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "malformed body");

    let (status, _) = app
        .send(Method::PATCH, &format!("/document/{id}?version=1"), Some(r#"[{"op":"remove","path":"/nope"}]"#))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.send(Method::PATCH, "/document/999?version=1", Some(ok_patch)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.json(Method::GET, &format!("/document/{id}"), None).await;
    assert_eq!(body["version"], json!(1));
    assert_eq!(body["snapshot"]["files"], json!({}));
}

#[tokio::test]
async fn replace_and_rename() {
    let app = TestApp::new();
    let id = app.create("Goblins").await;

    let (status, body) = app
        .json(Method::PUT, &format!("/document/{id}"), Some(json!({"version": 1, "snapshot": {"cardDPI": 600}})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"version": 2}));

    let (status, _) = app
        .json(Method::PUT, &format!("/document/{id}"), Some(json!({"version": 1, "snapshot": {}})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.json(Method::PUT, &format!("/document/{id}/name"), Some(json!({"name": "Orcs"}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = app.json(Method::GET, &format!("/document/{id}/name"), None).await;
    assert_eq!(body, json!({"name": "Orcs"}));

    let (status, _) = app.json(Method::GET, "/document/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
