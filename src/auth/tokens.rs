//! Bearer session tokens
//!
//! A token is `base64url(claims) "." base64url(mac)` where the claims
//! are JSON `{"u": subject, "exp": epoch_ms}` and the MAC is
//! HMAC-SHA256 over the encoded claims. Verification accepts the
//! current secret and, during rotation, one previous secret.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::constant_time_eq;

type HmacSha256 = Hmac<Sha256>;

/// Signing secret with a redacted Debug representation
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(..)")
    }
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (username)
    pub u: String,
    /// Expiry, epoch milliseconds
    pub exp: i64,
}

/// A freshly issued token together with its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at_ms: i64,
}

/// Issues and verifies session tokens
#[derive(Debug)]
pub struct TokenAuthority {
    current: SigningSecret,
    previous: Option<SigningSecret>,
}

impl TokenAuthority {
    /// An empty previous secret means no rotation is in progress.
    pub fn new(current: impl Into<String>, previous: Option<String>) -> Self {
        Self {
            current: SigningSecret::new(current),
            previous: previous.filter(|s| !s.is_empty()).map(SigningSecret::new),
        }
    }

    /// Issue a token for `subject`, valid for `ttl_ms` from now.
    pub fn issue(&self, subject: &str, ttl_ms: i64) -> IssuedToken {
        let expires_at_ms = Utc::now().timestamp_millis() + ttl_ms;
        let claims = TokenClaims {
            u: subject.to_string(),
            exp: expires_at_ms,
        };
        let payload = URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&claims).expect("token claims serialize to JSON"));
        let signature = sign(&self.current, &payload);
        IssuedToken {
            token: format!("{payload}.{signature}"),
            expires_at_ms,
        }
    }

    /// Verify a token and return its claims.
    ///
    /// Returns `None` for anything that is not a currently valid token:
    /// wrong structure, unknown signature, undecodable claims, expired.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let (payload, signature) = token.split_once('.')?;
        let provided = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let signed_by_known_secret = self.candidate_secrets().any(|secret| {
            let expected = hmac_bytes(secret, payload);
            constant_time_eq(&expected, &provided)
        });
        if !signed_by_known_secret {
            return None;
        }

        let claims_bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: TokenClaims = serde_json::from_slice(&claims_bytes).ok()?;
        if Utc::now().timestamp_millis() >= claims.exp {
            return None;
        }
        Some(claims)
    }

    fn candidate_secrets(&self) -> impl Iterator<Item = &SigningSecret> {
        std::iter::once(&self.current).chain(self.previous.as_ref())
    }
}

fn hmac_bytes(secret: &SigningSecret, payload: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn sign(secret: &SigningSecret, payload: &str) -> String {
    URL_SAFE_NO_PAD.encode(hmac_bytes(secret, payload))
}
