//! Session middleware for protected routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use super::cookie::{SESSION_COOKIE_NAME, append_set_cookie};
use super::csrf::{CSRF_HEADER, set_csrf_header};
use super::errors::ApiAuthError;
use super::state::{HasAuthBackend, UserLookup};
use super::types::AuthenticatedIdentity;
use crate::error::AuthError;

/// Require a valid session before running the wrapped handler.
///
/// - valid token: the identity is stored in the request extensions;
/// - expired token: a replacement is minted from a freshly fetched user
///   record and set as a new cookie on the response along with a fresh CSRF
///   token, then the handler runs;
/// - anything else, including a failed renewal: uniform 401.
pub async fn require_session<S: HasAuthBackend>(
    State(state): State<S>,
    mut request: Request,
    next: Next,
) -> Response {
    let validated = state
        .sessions()
        .validate(request.headers(), state.user_lookup())
        .await;

    let (identity, renewed_cookie) = match validated {
        Ok(identity) => (identity, None),
        Err(AuthError::TokenExpired { subject }) => match renew(&state, &subject).await {
            Ok((identity, cookie)) => (identity, Some(cookie)),
            Err(kind) => return reject(&state, kind),
        },
        Err(kind) => return reject(&state, kind),
    };

    request.extensions_mut().insert(identity.clone());
    let mut response = next.run(request).await;

    // A handler that rotated or cleared the session itself has the last word.
    if let Some(cookie) = renewed_cookie {
        if !sets_session_cookie(&response) {
            append_set_cookie(response.headers_mut(), &cookie);
            if !response.headers().contains_key(CSRF_HEADER) {
                match state.sessions().issue_csrf(&identity) {
                    Ok(csrf) => set_csrf_header(response.headers_mut(), &csrf),
                    Err(e) => error!(error = %e, "Failed to issue CSRF token"),
                }
            }
        }
    }

    response
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{SESSION_COOKIE_NAME}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.to_str().is_ok_and(|v| v.starts_with(&prefix)))
}

async fn renew<S: HasAuthBackend>(
    state: &S,
    subject: &str,
) -> Result<(AuthenticatedIdentity, String), AuthError> {
    let user = state.user_lookup().find_user(subject).await?;
    let issued = state.sessions().issue(&user)?;
    info!(username = %user.username, "Session token expired, issued a replacement");

    let cookie = state.cookie_policy().session_cookie(&issued.token);
    Ok((AuthenticatedIdentity::from(&issued.payload), cookie))
}

fn reject<S: HasAuthBackend>(state: &S, kind: AuthError) -> Response {
    ApiAuthError::new(kind, state.cookie_policy()).into_response()
}
