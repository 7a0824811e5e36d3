//! Short-lived signed stream URLs
//!
//! A capability grants access to exactly one file for a small time
//! window: `sig = base64url(HMAC-SHA256(secret, "{file_id}.{exp_ms}"))`,
//! carried as `?s=<sig>&exp=<exp_ms>` on the stream URL. Capabilities
//! are always signed with the current secret; they expire well before
//! any secret rotation completes.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::constant_time_eq;
use super::tokens::SigningSecret;

type HmacSha256 = Hmac<Sha256>;

/// A minted stream URL and its expiry
#[derive(Debug, Clone)]
pub struct SignedStreamUrl {
    pub url: String,
    pub expires_at_ms: i64,
}

/// Mints and verifies stream capabilities
#[derive(Debug)]
pub struct StreamUrlSigner {
    secret: SigningSecret,
    ttl_ms: i64,
}

impl StreamUrlSigner {
    pub fn new(secret: impl Into<String>, ttl_ms: i64) -> Self {
        Self {
            secret: SigningSecret::new(secret),
            ttl_ms,
        }
    }

    /// Mint a signed URL for `file_id`, valid for the configured window.
    ///
    /// The signature alphabet is URL-safe, so the query string needs no
    /// further encoding.
    pub fn mint(&self, base_url: &str, file_id: &str) -> SignedStreamUrl {
        let expires_at_ms = Utc::now().timestamp_millis() + self.ttl_ms;
        let signature = self.signature_for(file_id, expires_at_ms);
        SignedStreamUrl {
            url: format!("{base_url}/stream/{file_id}?s={signature}&exp={expires_at_ms}"),
            expires_at_ms,
        }
    }

    /// Check a capability presented on a stream request.
    ///
    /// Expiry is checked first, so an expired capability never reaches
    /// the signature comparison. The comparison itself is constant-time
    /// and a length mismatch is an ordinary failure, not an error.
    pub fn verify(&self, file_id: &str, expires_at_ms: i64, signature: &str) -> bool {
        if expires_at_ms <= 0 || Utc::now().timestamp_millis() > expires_at_ms {
            return false;
        }
        let expected = self.signature_for(file_id, expires_at_ms);
        constant_time_eq(expected.as_bytes(), signature.as_bytes())
    }

    fn signature_for(&self, file_id: &str, expires_at_ms: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(format!("{file_id}.{expires_at_ms}").as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}
