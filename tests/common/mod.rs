#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{HeaderMap, Request, Response, header},
};
use sessionguard::{
    ServerConfig,
    auth::{CSRF_HEADER, SESSION_COOKIE_NAME, SessionManager, get_cookie},
    create_app,
    db::Database,
    token::SigningKey,
};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";

pub fn test_key() -> SigningKey {
    SigningKey::from_secret(TEST_SECRET).expect("test secret is long enough")
}

/// A session manager sharing the app's key, for minting tokens at arbitrary times.
pub fn test_sessions() -> SessionManager {
    SessionManager::new(test_key())
}

pub struct TestApp {
    pub router: Router,
    pub db: Database,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let config = ServerConfig {
            db: db.clone(),
            signing_key: test_key(),
            secure_cookies: false,
            cookie_max_age_secs: 7 * 24 * 60 * 60,
        };
        let router = create_app(&config).layer(MockConnectInfo(SocketAddr::from((
            [127, 0, 0, 1],
            40000,
        ))));
        Self { router, db }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn signup(&self, username: &str, name: &str, password: &str) -> Response<Body> {
        self.send(json_request(
            "POST",
            "/api/auth/signup",
            None,
            serde_json::json!({ "username": username, "name": name, "password": password }),
        ))
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Response<Body> {
        self.send(json_request(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "username": username, "password": password }),
        ))
        .await
    }

    /// Sign up and return the session token from the response cookie.
    pub async fn signup_token(&self, username: &str, password: &str) -> String {
        let response = self.signup(username, "Test User", password).await;
        assert_eq!(response.status(), 201, "signup failed");
        session_token(&response).expect("signup sets a session cookie")
    }

    /// Sign up and return the session token together with its CSRF token.
    pub async fn signup_session(&self, username: &str, password: &str) -> (String, String) {
        let response = self.signup(username, "Test User", password).await;
        assert_eq!(response.status(), 201, "signup failed");
        (
            session_token(&response).expect("signup sets a session cookie"),
            csrf_token(&response).expect("signup sends a CSRF token"),
        )
    }

    pub async fn me(&self, token: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Same as [`json_request`], echoing `csrf` in the CSRF header.
pub fn csrf_request(
    method: &str,
    uri: &str,
    token: &str,
    csrf: &str,
    body: serde_json::Value,
) -> Request<Body> {
    let mut request = json_request(method, uri, Some(token), body);
    request
        .headers_mut()
        .insert(CSRF_HEADER, csrf.parse().unwrap());
    request
}

pub fn csrf_token<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get(CSRF_HEADER)
        .map(|v| v.to_str().unwrap().to_string())
}

pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Token carried by the response's session `Set-Cookie`, if any and not a clearing cookie.
pub fn session_token<B>(response: &Response<B>) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, cookie.parse().ok()?);
        get_cookie(&headers, SESSION_COOKIE_NAME)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
