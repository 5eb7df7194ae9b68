use anyhow::{Context, Result, bail};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh pair issued by `/auth/login` and `/auth/refresh`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "bearer".to_string()
}

/// The JWT claims the backend puts in both token kinds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    /// The account email.
    pub sub: String,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// `"access"` or `"refresh"`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Read the payload of a JWT.
///
/// The signature is NOT verified; the server stays the authority on whether a
/// token is valid. This is only used to show who is logged in and when the
/// current tokens lapse.
pub fn decode_claims(token: &str) -> Result<Claims> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        bail!(
            "malformed token: expected 3 segments, found {}",
            segments.len()
        );
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("token payload is not base64url")?;
    serde_json::from_slice(&bytes).context("token payload is not a claims object")
}
