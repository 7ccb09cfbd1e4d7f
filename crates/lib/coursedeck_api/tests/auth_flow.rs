//! End-to-end auth flows against the router with in-memory stores:
//! register, login, session resolution, logout, and the OAuth dance.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use coursedeck_api::config::ApiConfig;
use coursedeck_api::{AppState, router};
use coursedeck_core::auth::oauth::StateStore;
use coursedeck_core::auth::token;
use coursedeck_core::models::{Identity, Role};
use coursedeck_core::store::memory::MemoryStore;
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        users: store.clone(),
        sessions: store.clone(),
        oauth_states: Arc::new(StateStore::new()),
        config: ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            database_url: String::new(),
            session_secret: SECRET.into(),
            secure_cookies: false,
            allow_weak_decode: true,
            oauth: Default::default(),
        },
    };
    (router(state), store)
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Pull the value of a named cookie out of the Set-Cookie headers.
fn set_cookie_value(resp: &axum::http::Response<Body>, name: &str) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .and_then(|v| v.split(';').next())
        .and_then(|kv| kv.split_once('=').map(|(_, val)| val.to_string()))
}

async fn body_json(resp: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

#[tokio::test]
async fn register_login_session_round_trip() {
    let (app, _) = test_app();

    // Register alice.
    let resp = app
        .clone()
        .oneshot(json_post(
            "/auth/register",
            serde_json::json!({"email": "alice@example.com", "name": "Alice", "password": "secret1"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookie_value(&resp, "coursedeck_session").is_some());
    assert!(set_cookie_value(&resp, "coursedeck_sid").is_some());

    // Login with the same credentials.
    let resp = app
        .clone()
        .oneshot(json_post(
            "/auth/login",
            serde_json::json!({"email": "alice@example.com", "password": "secret1"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session_cookie = set_cookie_value(&resp, "coursedeck_session").expect("session cookie");

    // The session endpoint reflects the identity.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/session")
                .header(header::COOKIE, format!("coursedeck_session={session_cookie}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["email"], "alice@example.com");
    assert_eq!(json["role"], "user");
}

#[tokio::test]
async fn login_failures_are_constant_shape() {
    let (app, _) = test_app();
    app.clone()
        .oneshot(json_post(
            "/auth/register",
            serde_json::json!({"email": "alice@example.com", "password": "secret1"}),
        ))
        .await
        .unwrap();

    let wrong_pw = app
        .clone()
        .oneshot(json_post(
            "/auth/login",
            serde_json::json!({"email": "alice@example.com", "password": "wrong1"}),
        ))
        .await
        .unwrap();
    let unknown = app
        .clone()
        .oneshot(json_post(
            "/auth/login",
            serde_json::json!({"email": "ghost@example.com", "password": "secret1"}),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_pw.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    // Identical bodies: nothing reveals which part failed.
    assert_eq!(body_json(wrong_pw).await, body_json(unknown).await);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (app, _) = test_app();
    let first = app
        .clone()
        .oneshot(json_post(
            "/auth/register",
            serde_json::json!({"email": "alice@example.com", "password": "secret1"}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(json_post(
            "/auth/register",
            serde_json::json!({"email": "ALICE@example.com", "password": "other99"}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn short_password_is_a_validation_error() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(json_post(
            "/auth/register",
            serde_json::json!({"email": "bob@example.com", "password": "tiny"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rejects_non_post_methods() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/register")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = resp.headers().get(header::ALLOW).expect("Allow header");
    assert!(allow.to_str().unwrap().contains("POST"));
}

#[tokio::test]
async fn logout_rejects_non_post_methods() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = resp.headers().get(header::ALLOW).expect("Allow header");
    assert!(allow.to_str().unwrap().contains("POST"));
}

#[tokio::test]
async fn logout_is_idempotent_and_invalidates_the_handle() {
    let (app, store) = test_app();
    let resp = app
        .clone()
        .oneshot(json_post(
            "/auth/register",
            serde_json::json!({"email": "alice@example.com", "password": "secret1"}),
        ))
        .await
        .unwrap();
    let handle = set_cookie_value(&resp, "coursedeck_sid").expect("handle cookie");

    let logout = |cookie: String| {
        let app = app.clone();
        async move {
            app.oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/logout")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
        }
    };

    let first = logout(format!("coursedeck_sid={handle}")).await;
    assert_eq!(first.status(), StatusCode::OK);
    // Clearing cookies come back expired.
    let cleared = set_cookie_value(&first, "coursedeck_session").expect("cleared cookie");
    assert!(cleared.is_empty());

    // Handle is gone from the mapping.
    use coursedeck_core::store::SessionHandleStore;
    assert!(store.get(&handle).await.unwrap().is_none());

    // Second logout is a no-op, not an error.
    let second = logout(format!("coursedeck_sid={handle}")).await;
    assert_eq!(second.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_endpoint_returns_null_without_cookies() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(Request::builder().uri("/auth/session").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, serde_json::Value::Null);
}

#[tokio::test]
async fn expired_primary_cookie_falls_back_to_legacy() {
    let (app, _) = test_app();
    let identity = Identity {
        id: "id-b".into(),
        email: "bob@example.com".into(),
        display_name: None,
        role: Role::User,
    };
    let expired = token::issue_with_ttl(SECRET.as_bytes(), &identity, -3600).unwrap();
    let legacy = token::issue(SECRET.as_bytes(), &identity).unwrap();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/auth/session")
                .header(
                    header::COOKIE,
                    format!("coursedeck_session={expired}; coursedeck_token={legacy}"),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["email"], "bob@example.com");
}

#[tokio::test]
async fn oauth_provider_error_redirects_without_cookie() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/auth/oauth/callback?error=access_denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert_eq!(location, "/signin?error=access_denied");
    assert!(set_cookie_value(&resp, "coursedeck_session").is_none());
}

#[tokio::test]
async fn oauth_provider_error_with_control_characters_still_redirects() {
    let (app, _) = test_app();
    // Decoded query value carries CRLF and an ampersand; both must be
    // re-encoded rather than reaching the Location header raw.
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/auth/oauth/callback?error=denied%0D%0AInjected%26admin%3D1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert_eq!(location, "/signin?error=denied%0D%0AInjected%26admin%3D1");
    assert!(set_cookie_value(&resp, "coursedeck_session").is_none());
}

#[tokio::test]
async fn oauth_callback_without_code_fails() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/auth/oauth/callback?state=whatever")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert_eq!(location, "/signin?error=missing_code");
}

#[tokio::test]
async fn degraded_oauth_dance_signs_in_the_demo_identity() {
    let (app, _) = test_app();

    // No provider configured: login redirects straight to our callback.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/oauth/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let callback = resp
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(callback.starts_with("/auth/oauth/callback?code=demo&state="));

    // Following the redirect resolves the demo identity and sets a cookie.
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(callback.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");
    let cookie = set_cookie_value(&resp, "coursedeck_session").expect("cookie set");

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/session")
                .header(header::COOKIE, format!("coursedeck_session={cookie}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["email"], "demo@coursedeck.dev");
    assert_eq!(json["role"], "user");

    // The correlation state was consumed: replaying the callback fails.
    let resp = app
        .oneshot(Request::builder().uri(callback.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert_eq!(location, "/signin?error=state_mismatch");
}
