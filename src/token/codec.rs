use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Serialize, de::DeserializeOwned};

use super::{CsrfPayload, TokenHeader, TokenPayload};
use crate::error::AuthError;

/// The three raw segments of a token, borrowed from the token string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value).map_err(|_| AuthError::Encoding)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn b64d_json<T: DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)
}

/// Serialize header and payload into their base64url segments.
pub fn encode<P: Serialize>(
    header: &TokenHeader,
    payload: &P,
) -> Result<(String, String), AuthError> {
    Ok((b64e_json(header)?, b64e_json(payload)?))
}

/// Split a token into exactly three non-empty segments.
pub fn split(token: &str) -> Result<TokenParts<'_>, AuthError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok(TokenParts {
                header,
                payload,
                signature,
            })
        }
        _ => Err(AuthError::MalformedToken),
    }
}

pub fn decode_header(segment: &str) -> Result<TokenHeader, AuthError> {
    b64d_json(segment)
}

pub fn decode_payload(segment: &str) -> Result<TokenPayload, AuthError> {
    b64d_json(segment)
}

pub fn decode_csrf_payload(segment: &str) -> Result<CsrfPayload, AuthError> {
    b64d_json(segment)
}
