//! Integration tests for the HTTP API using tower's oneshot.

use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode},
    routing::post,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use askarr::Config;
use askarr::api::{create_app_state_from_config, router};

/// Default API key seeded by migration (must match m20240101_initial.rs)
const DEFAULT_API_KEY: &str = "askarr_default_api_key_please_regenerate";

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;
    config
}

async fn spawn_app() -> Router {
    spawn_app_with(test_config()).await
}

async fn spawn_app_with(config: Config) -> Router {
    let state = create_app_state_from_config(config, None)
        .await
        .expect("failed to build app state");
    router(state).await
}

/// App wired to a stub provider that answers every completion request.
async fn spawn_app_with_provider_stub() -> Router {
    let body = serde_json::json!({
        "choices": [
            {"message": {"role": "assistant", "content": "Rust 1.88 is the latest release."}}
        ],
        "citations": ["https://blog.rust-lang.org/"]
    });

    let stub = Router::new().route(
        "/chat/completions",
        post(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind stub listener");
    let addr = listener.local_addr().expect("stub has no local addr");
    tokio::spawn(async move {
        axum::serve(listener, stub).await.expect("stub server failed");
    });

    let mut config = test_config();
    config.provider.base_url = format!("http://{addr}");
    config.provider.api_key = "test-key".to_string();

    spawn_app_with(config).await
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

fn get_with_key(uri: &str, api_key: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-Api-Key", api_key)
        .body(Body::empty())
        .expect("failed to build request")
}

fn post_json(uri: &str, api_key: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("X-Api-Key", api_key)
        .header("content-type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

#[tokio::test]
async fn protected_routes_require_credentials() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/system/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get_with_key("/api/system/status", "not-a-real-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn seeded_api_key_grants_access() {
    let app = spawn_app().await;

    let response = app
        .oneshot(get_with_key("/api/system/status", DEFAULT_API_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["database"], true);
    assert_eq!(json["data"]["provider_model"], "sonar");
}

#[tokio::test]
async fn bearer_token_is_accepted() {
    let app = spawn_app().await;

    let request = Request::builder()
        .uri("/api/auth/me")
        .header("Authorization", format!("Bearer {DEFAULT_API_KEY}"))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["username"], "admin");
    assert_eq!(json["data"]["must_change_password"], true);
}

#[tokio::test]
async fn query_parameter_key_is_accepted() {
    let app = spawn_app().await;

    let response = app
        .oneshot(get(&format!("/api/searches?api_key={DEFAULT_API_KEY}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_probes_are_public() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/system/health/live"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/system/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["ready"], true);
    assert_eq!(json["data"]["checks"]["database"], true);
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = spawn_app().await;

    let request = Request::builder()
        .uri("/api/auth/login")
        .method("POST")
        .header("content-type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(
            serde_json::json!({"username": "admin", "password": "wrong"}).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_returns_user_profile() {
    let app = spawn_app().await;

    let request = Request::builder()
        .uri("/api/auth/login")
        .method("POST")
        .header("content-type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(
            serde_json::json!({"username": "admin", "password": "password"}).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["username"], "admin");
    assert_eq!(json["data"]["must_change_password"], true);
    assert_eq!(json["data"]["api_key"], DEFAULT_API_KEY);
}

#[tokio::test]
async fn short_password_change_is_rejected() {
    let app = spawn_app().await;

    let request = Request::builder()
        .uri("/api/auth/password")
        .method("PUT")
        .header("X-Api-Key", DEFAULT_API_KEY)
        .header("content-type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(
            serde_json::json!({"current_password": "password", "new_password": "short"})
                .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn regenerated_key_replaces_the_old_one() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/api-key/regenerate")
                .method("POST")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let new_key = json["data"]["api_key"].as_str().unwrap().to_string();
    assert_eq!(new_key.len(), 64);

    // The old key no longer authenticates, the new one does
    let response = app
        .clone()
        .oneshot(get_with_key("/api/auth/api-key", DEFAULT_API_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get_with_key("/api/auth/api-key", &new_key))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_search_query_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .oneshot(post_json(
            "/api/search",
            DEFAULT_API_KEY,
            serde_json::json!({"query": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn search_without_provider_key_names_the_misconfiguration() {
    let app = spawn_app().await;

    let response = app
        .oneshot(post_json(
            "/api/search",
            DEFAULT_API_KEY,
            serde_json::json!({"query": "anything"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Provider API key is not configured");
}

#[tokio::test]
async fn search_and_history_flow() {
    let app = spawn_app_with_provider_stub().await;

    // Search
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/search",
            DEFAULT_API_KEY,
            serde_json::json!({"query": "latest rust release"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["response"], "Rust 1.88 is the latest release.");
    assert_eq!(json["data"]["sources"][0]["title"], "Source 1");
    assert_eq!(
        json["data"]["sources"][0]["url"],
        "https://blog.rust-lang.org/"
    );

    // The record shows up in both history views
    let response = app
        .clone()
        .oneshot(get_with_key("/api/searches", DEFAULT_API_KEY))
        .await
        .unwrap();
    let json = body_json(response).await;
    let records = json["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["query"], "latest rust release");
    let record_id = records[0]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(get_with_key("/api/searches/recent?limit=5", DEFAULT_API_KEY))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    // Delete it, then a second delete is a 404
    let delete = |id: i64| {
        Request::builder()
            .uri(format!("/api/searches/{id}"))
            .method("DELETE")
            .header("X-Api-Key", DEFAULT_API_KEY)
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(delete(record_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(delete(record_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get_with_key("/api/searches", DEFAULT_API_KEY))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn security_headers_are_set() {
    let app = spawn_app().await;

    let response = app.oneshot(get("/api/system/health/live")).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn metrics_endpoint_requires_auth() {
    let app = spawn_app().await;

    let response = app.clone().oneshot(get("/api/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get_with_key("/api/metrics", DEFAULT_API_KEY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
