//! Read claims out of the bearer token issued at login.
//!
//! The token is a JWT; only the payload segment is decoded. The signature is
//! the backend's business and is never checked here.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Claims {
    /// Backend user id; may be a number or a string depending on the issuer.
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    sub: Option<serde_json::Value>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub exp: Option<u64>,
}

impl Claims {
    /// User id from `id`, falling back to the standard `sub` claim.
    pub fn user_id(&self) -> Option<String> {
        self.id
            .as_ref()
            .or(self.sub.as_ref())
            .and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}

/// Decode the payload segment of a JWT.
pub fn decode(token: &str) -> Result<Claims> {
    let payload = token
        .split('.')
        .nth(1)
        .context("Token is not a JWT (missing payload segment)")?;
    // Some issuers keep the padding; the no-pad engine rejects it.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("Token payload is not valid base64url")?;
    serde_json::from_slice(&bytes).context("Token payload is not a JSON claims object")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.sig", header, body)
    }

    #[test]
    fn test_decode_role_claim() {
        let token = jwt(&serde_json::json!({
            "id": "u1",
            "role": "admin",
            "exp": 1_900_000_000u64
        }));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.user_id().as_deref(), Some("u1"));
        assert_eq!(claims.role.as_deref(), Some("admin"));
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn test_decode_sub_fallback() {
        let claims = decode(&jwt(&serde_json::json!({ "sub": 42 }))).unwrap();
        assert_eq!(claims.user_id().as_deref(), Some("42"));
        assert_eq!(claims.role, None);
    }

    #[test]
    fn test_decode_rejects_opaque_token() {
        assert!(decode("opaque-token").is_err());
        assert!(decode("a.!!!.c").is_err());
    }
}
