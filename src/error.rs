//! Failure kinds of the session core.

use thiserror::Error;

/// Every way issuing or validating a session can fail.
///
/// Only `TokenExpired` is recoverable: the middleware reissues a token for
/// `subject` instead of rejecting the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no session cookie")]
    NoSessionCookie,
    #[error("malformed token")]
    MalformedToken,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("user not found")]
    UserNotFound,
    #[error("token version is outdated")]
    TokenOutdated,
    #[error("token expired")]
    TokenExpired { subject: String },
    #[error("Username is already taken")]
    Conflict,
    #[error("user lookup failed")]
    LookupFailed,
    #[error("failed to encode token")]
    Encoding,
}

/// Why a state-changing request was refused its anti-forgery check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CsrfError {
    #[error("no CSRF token")]
    Missing,
    #[error("malformed CSRF token")]
    Malformed,
    #[error("invalid CSRF token signature")]
    InvalidSignature,
    #[error("CSRF token belongs to another account")]
    Mismatch,
    #[error("CSRF token expired")]
    Expired,
}

/// Failure to build a signing key.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("secure random source unavailable: {0}")]
    Entropy(String),
    #[error("secret must be at least {min} bytes, got {actual}")]
    TooShort { min: usize, actual: usize },
}
