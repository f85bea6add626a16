//! HTTP rejections for failed session and CSRF checks.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use super::cookie::{CookiePolicy, append_set_cookie};
use crate::error::{AuthError, CsrfError};

/// Uniform 401 rejection.
///
/// The response never says which check failed: forged, malformed, outdated and
/// missing tokens all look the same to the client. The specific kind only
/// reaches the log.
#[derive(Debug)]
pub struct ApiAuthError {
    kind: AuthError,
    clear_cookie: Option<String>,
}

impl ApiAuthError {
    /// Reject and tell the client to drop its session cookie.
    pub fn new(kind: AuthError, policy: &CookiePolicy) -> Self {
        Self {
            kind,
            clear_cookie: Some(policy.clear_cookie()),
        }
    }

    /// Rejection used when a handler expects an identity but no session
    /// middleware ran in front of it.
    pub fn missing_identity() -> Self {
        Self {
            kind: AuthError::NoSessionCookie,
            clear_cookie: None,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    status: &'static str,
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        match &self.kind {
            AuthError::LookupFailed => error!(reason = %self.kind, "Session rejected"),
            kind => debug!(reason = %kind, "Session rejected"),
        }

        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Unauthorized",
                status: "error",
            }),
        )
            .into_response();

        if let Some(cookie) = &self.clear_cookie {
            append_set_cookie(response.headers_mut(), cookie);
        }

        response
    }
}

/// 403 for a state-changing request without a valid CSRF token.
///
/// The session stays intact, so no cookie is cleared.
#[derive(Debug)]
pub struct CsrfRejection(pub CsrfError);

impl IntoResponse for CsrfRejection {
    fn into_response(self) -> Response {
        debug!(reason = %self.0, "CSRF check failed");

        let error = match self.0 {
            CsrfError::Expired => "CSRF token expired",
            _ => "Invalid CSRF token",
        };
        (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error,
                status: "error",
            }),
        )
            .into_response()
    }
}
