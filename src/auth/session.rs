//! Session issuance and validation.
//!
//! Tokens are stateless: the only server-side revocation lever is the user's
//! version counter. Validation runs the cheap checks first (cookie, format,
//! signature), then the store lookup (version), and expiry last so that an
//! expired but otherwise sound token can be told apart from a forged one.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;

use super::cookie::{SESSION_COOKIE_NAME, get_cookie};
use super::state::UserLookup;
use super::types::AuthenticatedIdentity;
use crate::db::UserRecord;
use crate::error::{AuthError, CsrfError};
use crate::token::{self, ALG, CsrfPayload, SigningKey, TokenHeader, TokenPayload};

/// Token lifetime: 24 hours.
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// CSRF token lifetime, counted from issue and independent of the session.
pub const CSRF_TTL_SECS: i64 = 24 * 60 * 60;

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// A freshly minted token together with the payload it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub payload: TokenPayload,
}

/// Issues and validates session tokens with an injected signing key.
#[derive(Debug, Clone)]
pub struct SessionManager {
    key: SigningKey,
}

impl SessionManager {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Mint a token for `user`, expiring `TOKEN_TTL_SECS` from now.
    pub fn issue(&self, user: &UserRecord) -> Result<IssuedToken, AuthError> {
        self.issue_at(user, unix_now())
    }

    /// Mint a token as if the current time were `now`.
    pub fn issue_at(&self, user: &UserRecord, now: i64) -> Result<IssuedToken, AuthError> {
        let payload = TokenPayload {
            sub: user.username.clone(),
            name: user.display_name.clone(),
            id: user.id,
            version: user.version,
            exp: now + TOKEN_TTL_SECS,
        };

        let (header, body) = token::encode(&TokenHeader::default(), &payload)?;
        let signature = self.key.sign(&header, &body);

        Ok(IssuedToken {
            token: format!("{header}.{body}.{signature}"),
            payload,
        })
    }

    /// Validate the session cookie in `headers` against the current user record.
    pub async fn validate<U: UserLookup>(
        &self,
        headers: &HeaderMap,
        users: &U,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        self.validate_at(headers, users, unix_now()).await
    }

    /// Same as [`validate`](Self::validate) with an explicit clock.
    pub async fn validate_at<U: UserLookup>(
        &self,
        headers: &HeaderMap,
        users: &U,
        now: i64,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let token =
            get_cookie(headers, SESSION_COOKIE_NAME).ok_or(AuthError::NoSessionCookie)?;
        self.validate_token_at(token, users, now).await
    }

    /// Validate a raw token string.
    pub async fn validate_token_at<U: UserLookup>(
        &self,
        token: &str,
        users: &U,
        now: i64,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let parts = token::split(token)?;
        let header = token::decode_header(parts.header)?;
        if header.alg != ALG {
            return Err(AuthError::MalformedToken);
        }
        let payload = token::decode_payload(parts.payload)?;

        if !self.key.verify(parts.header, parts.payload, parts.signature) {
            return Err(AuthError::InvalidSignature);
        }

        let user = users.find_user(&payload.sub).await?;

        // A recreated account reuses the username but not the id.
        if payload.version != user.version || payload.id != user.id {
            return Err(AuthError::TokenOutdated);
        }

        if payload.exp < now {
            return Err(AuthError::TokenExpired {
                subject: payload.sub,
            });
        }

        Ok(AuthenticatedIdentity::from(&payload))
    }

    /// Mint an anti-forgery token bound to `identity`.
    pub fn issue_csrf(&self, identity: &AuthenticatedIdentity) -> Result<String, AuthError> {
        self.issue_csrf_at(identity, unix_now())
    }

    pub fn issue_csrf_at(
        &self,
        identity: &AuthenticatedIdentity,
        now: i64,
    ) -> Result<String, AuthError> {
        let payload = CsrfPayload {
            sub: identity.username.clone(),
            id: identity.user_id,
            exp: now + CSRF_TTL_SECS,
        };

        let (header, body) = token::encode(&TokenHeader::default(), &payload)?;
        let signature = self.key.sign(&header, &body);
        Ok(format!("{header}.{body}.{signature}"))
    }

    /// Check a CSRF token against the identity of the session it arrived with.
    ///
    /// Signature comes before the account and expiry checks, so a forged
    /// token is always reported as forged.
    pub fn verify_csrf_at(
        &self,
        token: &str,
        identity: &AuthenticatedIdentity,
        now: i64,
    ) -> Result<(), CsrfError> {
        let parts = token::split(token).map_err(|_| CsrfError::Malformed)?;
        let header = token::decode_header(parts.header).map_err(|_| CsrfError::Malformed)?;
        if header.alg != ALG {
            return Err(CsrfError::Malformed);
        }
        let payload =
            token::decode_csrf_payload(parts.payload).map_err(|_| CsrfError::Malformed)?;

        if !self.key.verify(parts.header, parts.payload, parts.signature) {
            return Err(CsrfError::InvalidSignature);
        }

        if payload.sub != identity.username || payload.id != identity.user_id {
            return Err(CsrfError::Mismatch);
        }

        if payload.exp < now {
            return Err(CsrfError::Expired);
        }

        Ok(())
    }
}
