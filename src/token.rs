use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token is not a JWT (expected three dot separated segments)")]
    Malformed,
    #[error("Token payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("Token payload is not valid JSON: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Claims read from the stored token. The signature is not verified,
/// this is only used to warn about stale sessions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenInfo {
    pub exp: Option<u64>,
    pub sub: Option<String>,
    pub username: Option<String>,
}

impl TokenInfo {
    pub fn parse(token: &str) -> Result<Self, TokenError> {
        let mut segments = token.trim().split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
            _ => return Err(TokenError::Malformed),
        };

        // Some issuers pad anyway
        let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&decoded)?)
    }

    pub fn user(&self) -> Option<&str> {
        self.username.as_deref().or(self.sub.as_deref())
    }

    pub fn is_expired_at(&self, now_secs: u64) -> bool {
        self.exp.map(|exp| exp <= now_secs).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }

    /// Seconds left before expiry, `None` without an `exp` claim
    pub fn remaining_secs(&self) -> Option<u64> {
        self.exp.map(|exp| exp.saturating_sub(unix_now()))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
