//! Session cookie parsing and construction.

use axum::http::{HeaderMap, HeaderValue, header};

/// Cookie name carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "access_token";

/// Client-side retention of the session cookie: 7 days.
/// Independent of the token's own 24 hour expiry.
pub const DEFAULT_COOKIE_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Extract a cookie value from the Cookie header(s).
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie_header| cookie_header.split(';'))
        .find_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
}

/// Attributes applied to every session cookie the server sets.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    /// Add the Secure attribute (deployments behind HTTPS)
    pub secure: bool,
    /// Max-Age in seconds
    pub max_age_secs: u64,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            secure: false,
            max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
        }
    }
}

impl CookiePolicy {
    fn secure_suffix(&self) -> &'static str {
        if self.secure { "; Secure" } else { "" }
    }

    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
            SESSION_COOKIE_NAME,
            token,
            self.max_age_secs,
            self.secure_suffix()
        )
    }

    /// `Set-Cookie` value that makes the client drop the session cookie.
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{}",
            SESSION_COOKIE_NAME,
            self.secure_suffix()
        )
    }
}

/// Append a `Set-Cookie` header. Values that are not valid header text are dropped.
pub fn append_set_cookie(headers: &mut HeaderMap, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "Refusing to set invalid cookie header"),
    }
}
