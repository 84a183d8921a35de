//! Signed stream tokens.
//!
//! A token binds a resource identifier to an expiry with HMAC-SHA256:
//!
//! ```text
//! signature = HMAC_SHA256(secret, "{resource_id}:{expires_at}")
//! ```
//!
//! Tokens are self-contained. Nothing is stored server-side; every request
//! recomputes the signature from the path segments it carries.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 digest in bytes.
pub const SIGNATURE_LEN: usize = 32;

/// Source of the current UNIX time in seconds.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_unix(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// A freshly minted token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub resource_id: String,
    pub expires_at: i64,
    pub signature: [u8; SIGNATURE_LEN],
}

impl AccessToken {
    /// Lowercase hex form used in URLs.
    pub fn signature_hex(&self) -> String {
        hex::encode(self.signature)
    }
}

/// A resource identifier whose token checked out.
///
/// Only [`TokenCodec::verify`] can produce one, so anything holding it was
/// authorized for exactly this identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedResource {
    resource_id: String,
    expires_at: i64,
}

impl VerifiedResource {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }
}

/// Result of checking a token.
///
/// `Expired` and `Forged` are kept apart for logging only; callers must map
/// both to the same response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid(VerifiedResource),
    Expired,
    Forged,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }
}

/// Mints and verifies tokens under one secret key.
#[derive(Clone)]
pub struct TokenCodec {
    key: Vec<u8>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").field("key", &"<redacted>").finish()
    }
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    /// Mint a token for `resource_id` valid for `ttl_secs` from `now`.
    pub fn mint(&self, resource_id: &str, ttl_secs: i64, now: i64) -> AccessToken {
        let expires_at = now.saturating_add(ttl_secs);
        AccessToken {
            resource_id: resource_id.to_string(),
            expires_at,
            signature: self.sign(resource_id, expires_at),
        }
    }

    /// Check a token presented as path segments.
    ///
    /// Expiry is checked first. The signature comparison is constant-time and
    /// accepts either hex case; anything that does not decode to a full digest
    /// is treated as forged.
    pub fn verify(&self, resource_id: &str, expires_at: i64, signature_hex: &str, now: i64) -> Verdict {
        if now > expires_at {
            return Verdict::Expired;
        }

        let provided = match decode_signature(signature_hex) {
            Some(sig) => sig,
            None => return Verdict::Forged,
        };
        let expected = self.sign(resource_id, expires_at);

        if bool::from(provided.ct_eq(&expected)) {
            Verdict::Valid(VerifiedResource {
                resource_id: resource_id.to_string(),
                expires_at,
            })
        } else {
            Verdict::Forged
        }
    }

    /// The signature a caller should have presented, for diagnostics.
    pub fn expected_signature_hex(&self, resource_id: &str, expires_at: i64) -> String {
        hex::encode(self.sign(resource_id, expires_at))
    }

    fn sign(&self, resource_id: &str, expires_at: i64) -> [u8; SIGNATURE_LEN] {
        // HMAC accepts keys of any length.
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(resource_id.as_bytes());
        mac.update(b":");
        mac.update(expires_at.to_string().as_bytes());
        let digest = mac.finalize().into_bytes();
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&digest);
        out
    }
}

fn decode_signature(signature_hex: &str) -> Option<[u8; SIGNATURE_LEN]> {
    if signature_hex.len() != SIGNATURE_LEN * 2 {
        return None;
    }
    let mut out = [0u8; SIGNATURE_LEN];
    hex::decode_to_slice(signature_hex, &mut out).ok()?;
    Some(out)
}
