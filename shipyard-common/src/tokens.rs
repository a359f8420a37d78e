//! Invitation token helpers
//!
//! The raw token is handed to the invitee exactly once (email + API response).
//! Only its SHA-256 digest is persisted, so a database read never yields a
//! usable token.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes per token (hex-encoded to 64 chars)
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh invitation token
pub fn generate_invitation_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest stored in `invitations.token_hash`
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    hex::encode(hasher.finalize())
}

/// Cheap shape check before touching the database
pub fn looks_like_token(token: &str) -> bool {
    let token = token.trim();
    token.len() == TOKEN_BYTES * 2 && token.chars().all(|c| c.is_ascii_hexdigit())
}
