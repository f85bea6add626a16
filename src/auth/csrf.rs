//! Anti-forgery tokens for state-changing routes.
//!
//! The token travels in the `X-CSRF-Token` response header whenever a session
//! is issued, and must be echoed back in the same request header. A cross-site
//! form can ride along on the cookie but cannot read or send the header.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::errors::{ApiAuthError, CsrfRejection};
use super::session::unix_now;
use super::state::HasAuthBackend;
use super::types::AuthenticatedIdentity;
use crate::error::CsrfError;

/// Request and response header carrying the token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Put `token` on a response and expose it to browser scripts.
pub fn set_csrf_header(headers: &mut HeaderMap, token: &str) {
    match HeaderValue::from_str(token) {
        Ok(value) => {
            headers.insert(CSRF_HEADER, value);
            headers.insert(
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                HeaderValue::from_static("X-CSRF-Token"),
            );
        }
        Err(e) => tracing::error!(error = %e, "Refusing to set invalid CSRF header"),
    }
}

/// Require a CSRF token bound to the current session's account.
///
/// Must run behind [`super::require_session`], which supplies the identity.
/// Failures are 403 and leave the session cookie alone.
pub async fn require_csrf<S: HasAuthBackend>(
    State(state): State<S>,
    request: Request,
    next: Next,
) -> Response {
    let Some(identity) = request.extensions().get::<AuthenticatedIdentity>() else {
        return ApiAuthError::missing_identity().into_response();
    };

    let checked = match request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(token) => state.sessions().verify_csrf_at(token, identity, unix_now()),
        None => Err(CsrfError::Missing),
    };

    if let Err(kind) = checked {
        return CsrfRejection(kind).into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::post,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::auth::session::tests::{MemoryUsers, test_manager, test_user};
    use crate::auth::session::{CSRF_TTL_SECS, SessionManager};
    use crate::auth::{CookiePolicy, SESSION_COOKIE_NAME, require_session};
    use crate::db::UserRecord;
    use crate::token::SigningKey;

    #[derive(Clone)]
    struct TestState {
        sessions: Arc<SessionManager>,
        users: MemoryUsers,
        cookies: CookiePolicy,
    }

    impl HasAuthBackend for TestState {
        type Users = MemoryUsers;

        fn sessions(&self) -> &SessionManager {
            &self.sessions
        }
        fn user_lookup(&self) -> &MemoryUsers {
            &self.users
        }
        fn cookie_policy(&self) -> &CookiePolicy {
            &self.cookies
        }
    }

    fn test_app() -> (Router, TestState, UserRecord) {
        let state = TestState {
            sessions: Arc::new(test_manager()),
            users: MemoryUsers::default(),
            cookies: CookiePolicy::default(),
        };
        let user = test_user("user1", 1);
        state.users.insert(user.clone());

        let app = Router::new()
            .route("/mutate", post(|| async { StatusCode::OK }))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                require_csrf::<TestState>,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                require_session::<TestState>,
            ));
        (app, state, user)
    }

    fn identity(user: &UserRecord) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            user_id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }

    fn request(session: &str, csrf: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mutate")
            .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={session}"));
        if let Some(csrf) = csrf {
            builder = builder.header(CSRF_HEADER, csrf);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn error_of(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_valid_csrf_passes() {
        let (app, state, user) = test_app();
        let session = state.sessions.issue(&user).unwrap();
        let csrf = state.sessions.issue_csrf(&identity(&user)).unwrap();

        let response = app.oneshot(request(&session.token, Some(&csrf))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_csrf_is_forbidden() {
        let (app, state, user) = test_app();
        let session = state.sessions.issue(&user).unwrap();

        let response = app.oneshot(request(&session.token, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(error_of(response).await, "Invalid CSRF token");
    }

    #[tokio::test]
    async fn test_malformed_csrf_is_forbidden() {
        let (app, state, user) = test_app();
        let session = state.sessions.issue(&user).unwrap();

        let response = app
            .oneshot(request(&session.token, Some("garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_other_accounts_csrf_is_forbidden() {
        let (app, state, user) = test_app();
        let session = state.sessions.issue(&user).unwrap();
        let other = test_user("user2", 1);
        let csrf = state.sessions.issue_csrf(&identity(&other)).unwrap();

        let response = app.oneshot(request(&session.token, Some(&csrf))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_expired_csrf_is_forbidden() {
        let (app, state, user) = test_app();
        let session = state.sessions.issue(&user).unwrap();
        let csrf = state
            .sessions
            .issue_csrf_at(&identity(&user), unix_now() - CSRF_TTL_SECS - 60)
            .unwrap();

        let response = app.oneshot(request(&session.token, Some(&csrf))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(error_of(response).await, "CSRF token expired");
    }

    #[tokio::test]
    async fn test_csrf_signed_with_another_key_is_forbidden() {
        let (app, state, user) = test_app();
        let session = state.sessions.issue(&user).unwrap();
        let other = SessionManager::new(SigningKey::generate().unwrap());
        let csrf = other.issue_csrf(&identity(&user)).unwrap();

        let response = app.oneshot(request(&session.token, Some(&csrf))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_session_token_as_csrf_is_forbidden() {
        let (app, state, user) = test_app();
        let session = state.sessions.issue(&user).unwrap();

        let response = app
            .oneshot(request(&session.token, Some(&session.token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_session_is_checked_first() {
        let (app, state, user) = test_app();
        let csrf = state.sessions.issue_csrf(&identity(&user)).unwrap();

        let response = app.oneshot(request("garbage", Some(&csrf))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_set_csrf_header_exposes_it() {
        let mut headers = HeaderMap::new();
        set_csrf_header(&mut headers, "a.b.c");

        assert_eq!(headers.get(CSRF_HEADER).unwrap(), "a.b.c");
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_EXPOSE_HEADERS).unwrap(),
            "X-CSRF-Token"
        );
    }
}
