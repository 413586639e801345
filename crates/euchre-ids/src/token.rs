//! Reconnect token issuance and verification.
//!
//! Ref: spec §4.1 Identifier Service, §8.6 Reconnect token integrity,
//! Open Question (a) — legacy unsigned tokens are accepted for parsing only.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::id::is_valid_id;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm tag for the current signed-token format.
const ALG_V1: &str = "v1";

/// Secret value that, when configured, permits legacy unsigned tokens to
/// verify. Never used outside of local development.
pub const DEV_SENTINEL_SECRET: &str = "dev-insecure-sentinel-secret";

/// Claims bound into a signed reconnect token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub session_id: String,
    pub player_id: String,
    pub lobby_id: String,
    pub issued_at_ms: i64,
}

/// A parsed, not-yet-verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedToken {
    /// `v1.<base64url(payload)>.<base64url(mac)>`
    Signed {
        alg: String,
        payload_b64: String,
        mac_b64: String,
    },
    /// A bare opaque id, accepted for parsing only (§4.1).
    Legacy(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed reconnect token")]
    Malformed,
    #[error("unknown token algorithm tag")]
    UnknownAlgorithm,
    #[error("mac verification failed")]
    MacMismatch,
    #[error("token is expired")]
    Expired,
    #[error("token claims do not match the expected binding")]
    FieldMismatch,
    #[error("token is unsigned")]
    Unsigned,
}

/// Parse a token string into its structural form without verifying it.
pub fn parse(token: &str) -> Result<ParsedToken, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    match segments.as_slice() {
        [alg, payload_b64, mac_b64] => Ok(ParsedToken::Signed {
            alg: (*alg).to_string(),
            payload_b64: (*payload_b64).to_string(),
            mac_b64: (*mac_b64).to_string(),
        }),
        [single] if is_valid_id(single) => Ok(ParsedToken::Legacy((*single).to_string())),
        _ => Err(TokenError::Malformed),
    }
}

/// Expected binding a verified token must satisfy.
#[derive(Debug, Clone)]
pub struct ExpectedBinding {
    pub session_id: String,
    pub lobby_id: Option<String>,
    pub player_id: Option<String>,
}

/// Signs and verifies reconnect tokens with `HMAC-SHA256`.
pub struct ReconnectTokenManager {
    secret: String,
    max_age_ms: i64,
}

impl ReconnectTokenManager {
    pub fn new(secret: impl Into<String>, max_age_ms: i64) -> Self {
        Self {
            secret: secret.into(),
            max_age_ms,
        }
    }

    /// Issue a `v1.<payload>.<mac>` token for the given claims.
    pub fn issue(&self, claims: &TokenClaims) -> String {
        let payload_json = serde_json::to_vec(claims).expect("TokenClaims serialize");
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);
        let signing_input = format!("{ALG_V1}.{payload_b64}");
        let mac_b64 = self.mac_b64(signing_input.as_bytes());
        format!("{ALG_V1}.{payload_b64}.{mac_b64}")
    }

    fn mac_b64(&self, signing_input: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts a key of any length");
        mac.update(signing_input);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Verify a token string against an expected binding and clock.
    ///
    /// Rejects (in order): malformed tokens, unknown algorithm tags, mac
    /// mismatches (computed in constant time via `hmac`'s own comparison),
    /// malformed payloads, binding mismatches, and expiry.
    pub fn verify(
        &self,
        token: &str,
        expected: &ExpectedBinding,
        now_ms: i64,
    ) -> Result<TokenClaims, TokenError> {
        match parse(token)? {
            ParsedToken::Legacy(session_id) => {
                if self.secret != DEV_SENTINEL_SECRET {
                    return Err(TokenError::Unsigned);
                }
                if session_id != expected.session_id {
                    return Err(TokenError::FieldMismatch);
                }
                Ok(TokenClaims {
                    session_id,
                    player_id: expected.player_id.clone().unwrap_or_default(),
                    lobby_id: expected.lobby_id.clone().unwrap_or_default(),
                    issued_at_ms: now_ms,
                })
            }
            ParsedToken::Signed {
                alg,
                payload_b64,
                mac_b64,
            } => {
                if alg != ALG_V1 {
                    return Err(TokenError::UnknownAlgorithm);
                }

                let signing_input = format!("{alg}.{payload_b64}");
                let expected_mac_b64 = self.mac_b64(signing_input.as_bytes());

                // Constant-time comparison over decoded mac bytes.
                let provided = URL_SAFE_NO_PAD
                    .decode(mac_b64.as_bytes())
                    .map_err(|_| TokenError::Malformed)?;
                let expected_mac = URL_SAFE_NO_PAD
                    .decode(expected_mac_b64.as_bytes())
                    .map_err(|_| TokenError::Malformed)?;
                if !constant_time_eq(&provided, &expected_mac) {
                    return Err(TokenError::MacMismatch);
                }

                let payload_bytes = URL_SAFE_NO_PAD
                    .decode(payload_b64.as_bytes())
                    .map_err(|_| TokenError::Malformed)?;
                let claims: TokenClaims = serde_json::from_slice(&payload_bytes)
                    .map_err(|_| TokenError::Malformed)?;

                if claims.session_id != expected.session_id {
                    return Err(TokenError::FieldMismatch);
                }
                if let Some(lobby_id) = &expected.lobby_id {
                    if &claims.lobby_id != lobby_id {
                        return Err(TokenError::FieldMismatch);
                    }
                }
                if let Some(player_id) = &expected.player_id {
                    if &claims.player_id != player_id {
                        return Err(TokenError::FieldMismatch);
                    }
                }

                if now_ms.saturating_sub(claims.issued_at_ms) > self.max_age_ms {
                    return Err(TokenError::Expired);
                }

                Ok(claims)
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
