//! Secure-token issuance for recipient access
//!
//! The token is an unguessable bearer secret granting the recipient
//! token-gated access without an account. It is generated once at request
//! creation and never regenerated for the same request.

use crate::error::AccessError;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw entropy per token. 32 bytes = 256 bits, hex-encoded to 64 chars.
const TOKEN_BYTES: usize = 32;

/// Opaque recipient-access token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecureToken(String);

impl SecureToken {
    /// Generate a fresh token from the OS CSPRNG.
    pub fn issue() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Accept an inbound token string after a shape check.
    ///
    /// Malformed input is rejected here, before any store lookup, so a
    /// scanner learns nothing about which tokens exist.
    pub fn parse(raw: &str) -> Result<Self, AccessError> {
        if raw.len() == TOKEN_BYTES * 2 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(AccessError::MalformedToken)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short digest safe for logs. Raw tokens never reach the log stream.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..6])
    }
}

/// Token validity policy.
#[derive(Debug, Clone, Copy)]
pub struct TokenConfig {
    /// How long past the deadline the token stays valid. The recipient must
    /// always be able to act at least through the deadline itself.
    pub validity_floor: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            validity_floor: Duration::days(30),
        }
    }
}

impl TokenConfig {
    /// Expiry for a token issued at `now` for a request due at `deadline`.
    ///
    /// Always >= deadline: the floor extends past whichever of the two
    /// instants is later.
    pub fn expiry_for(&self, deadline: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        deadline.max(now) + self.validity_floor
    }
}
