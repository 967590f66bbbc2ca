//! Failure taxonomy for backend calls.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The stored token was rejected or has expired. The session must be
    /// dropped; retrying with the same token is pointless.
    #[error("session expired or rejected by {url}")]
    SessionExpired { url: String },

    /// Authenticated, but the role may not perform this call.
    #[error("access denied by {url}")]
    Forbidden { url: String },

    #[error("HTTP {status} for {url}: {message}")]
    Http {
        status: u16,
        url: String,
        message: String,
    },

    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response body from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Classify a non-success response.
///
/// A 401 always means the stored token is no good. A 403 only counts as
/// expiry when the backend says so in the body.
pub fn classify(status: u16, body: &str, url: &str) -> ApiError {
    let mentions_expiry = body.to_ascii_lowercase().contains("expired");
    match status {
        401 => ApiError::SessionExpired {
            url: url.to_string(),
        },
        403 if mentions_expiry => ApiError::SessionExpired {
            url: url.to_string(),
        },
        403 => ApiError::Forbidden {
            url: url.to_string(),
        },
        _ => ApiError::Http {
            status,
            url: url.to_string(),
            message: error_message(body),
        },
    }
}

/// Pull a human message out of an error body (`{"message": ...}` or
/// `{"error": ...}`), falling back to the raw text.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.get("message")
            .or_else(|| v.get("error"))
            .and_then(|m| m.as_str())
            .map(String::from)
    });
    from_json.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.chars().count() > 200 {
            format!("{}...", trimmed.chars().take(197).collect::<String>())
        } else {
            trimmed.to_string()
        }
    })
}
