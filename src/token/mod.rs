//! Compact three-segment session tokens.
//!
//! A token is `base64url(header).base64url(payload).base64url(hmac)`. The codec
//! only deals with the wire format; expiry and version checks belong to
//! [`crate::auth::SessionManager`].

mod codec;
mod signer;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use codec::{TokenParts, decode_csrf_payload, decode_header, decode_payload, encode, split};
pub use signer::{MIN_SECRET_LEN, SigningKey};

/// Algorithm tag carried in every header.
pub const ALG: &str = "HS256";

/// Token type tag carried in every header.
pub const TYP: &str = "JWT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: ALG.to_string(),
            typ: TYP.to_string(),
        }
    }
}

/// Claims embedded verbatim in the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Subject (username)
    pub sub: String,
    /// Display name
    pub name: String,
    /// User UUID
    pub id: Uuid,
    /// User version at issue time
    #[serde(rename = "vrs")]
    pub version: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims of an anti-forgery token. Bound to one account, never to a version,
/// so it survives session renewal.
///
/// Unknown fields are refused: a session token is not a valid CSRF token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsrfPayload {
    pub sub: String,
    pub id: Uuid,
    pub exp: i64,
}
