//! Session token generation
//!
//! A token is an HMAC-SHA256 keyed with the registry secret over fresh bytes
//! from the OS random source plus the current timestamp, encoded with the
//! standard base64 alphabet (padded).

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use ring::rand::SecureRandom;
use sha2::Sha256;

use crate::errors::RegistryError;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 32;

/// Produce a fresh session token.
///
/// The secret only keys the MAC; unpredictability comes from the random nonce,
/// so an empty secret still yields distinct tokens.
pub fn generate_token(secret: &str) -> Result<String, RegistryError> {
    let rng = ring::rand::SystemRandom::new();
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut nonce)
        .map_err(|_| RegistryError::Crypto("Failed to generate random nonce".to_string()))?;

    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| RegistryError::Crypto(format!("Failed to key HMAC: {e}")))?;
    mac.update(&nonce);
    mac.update(timestamp.as_bytes());
    let digest = mac.finalize().into_bytes();

    Ok(STANDARD.encode(digest))
}

/// First few characters of a token, safe to put in logs.
pub(crate) fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}
