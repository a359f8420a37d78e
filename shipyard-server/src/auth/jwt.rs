//! Access-token verification
//!
//! The auth provider issues compact JWTs signed with HS256 using a secret
//! shared with this service. Only HS256 is accepted; the `alg` header is
//! checked before the signature so `none` and asymmetric algorithms are
//! rejected outright.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const MAX_TOKEN_LEN: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("audience mismatch")]
    AudienceMismatch,
    #[error("token has no email claim")]
    MissingEmail,
}

#[derive(Debug, Deserialize, Serialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Claims Shipyard reads from the access token
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Claims {
    /// Stable user id at the auth provider
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
    /// String or array of strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<Value>,
}

impl Claims {
    /// Provider-supplied display name, if any
    pub fn display_name(&self) -> Option<String> {
        let from_metadata = || {
            let metadata = self.user_metadata.as_ref()?;
            metadata
                .get("full_name")
                .or_else(|| metadata.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        self.name
            .clone()
            .or_else(from_metadata)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
    }

    fn audience_matches(&self, expected: &str) -> bool {
        match &self.aud {
            Some(Value::String(aud)) => aud == expected,
            Some(Value::Array(values)) => values.iter().any(|v| v.as_str() == Some(expected)),
            _ => false,
        }
    }
}

/// Verify an HS256 token and return its claims
///
/// `now` is seconds since the Unix epoch; a token whose `exp` is at or before
/// `now` is expired.
pub fn verify_token(
    token: &str,
    secret: &[u8],
    audience: Option<&str>,
    now: i64,
) -> Result<Claims, TokenError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(TokenError::Malformed);
    }

    let mut parts = token.split('.');
    let (header_part, claims_part, sig_part) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) if !h.is_empty() && !c.is_empty() && !s.is_empty() => {
            (h, c, s)
        }
        _ => return Err(TokenError::Malformed),
    };

    let header: Header = decode_part(header_part)?;
    if header.alg != "HS256" {
        return Err(TokenError::UnsupportedAlgorithm(header.alg));
    }

    let signature = URL_SAFE_NO_PAD
        .decode(sig_part)
        .map_err(|_| TokenError::Malformed)?;
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::BadSignature)?;
    mac.update(header_part.as_bytes());
    mac.update(b".");
    mac.update(claims_part.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    let claims: Claims = decode_part(claims_part)?;

    if claims.exp <= now {
        return Err(TokenError::Expired);
    }
    if let Some(expected) = audience {
        if !claims.audience_matches(expected) {
            return Err(TokenError::AudienceMismatch);
        }
    }
    if claims.email.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        return Err(TokenError::MissingEmail);
    }

    Ok(claims)
}

/// Sign claims with HS256
///
/// The service never issues tokens itself; this exists for local tooling and
/// tests that need a token the verifier accepts.
pub fn sign_token(claims: &Claims, secret: &[u8]) -> Result<String, TokenError> {
    let header = Header {
        alg: "HS256".to_string(),
        typ: Some("JWT".to_string()),
    };
    let header_part = encode_part(&header)?;
    let claims_part = encode_part(claims)?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::BadSignature)?;
    mac.update(header_part.as_bytes());
    mac.update(b".");
    mac.update(claims_part.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}.{}", header_part, claims_part, signature))
}

fn decode_part<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

fn encode_part<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let bytes = serde_json::to_vec(value).map_err(|_| TokenError::Malformed)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
