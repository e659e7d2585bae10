//! Retry policy and response classification.

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum number of attempts for a network operation.
pub const MAX_RETRIES: usize = 3;

/// Delay between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Responses that will not get better by asking again.
#[derive(Debug, Error)]
pub enum NonRetryableError {
    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("access forbidden: {url}. You may need to set GITHUB_TOKEN")]
    Forbidden { url: String },

    #[error("authentication failed for {url}. Check your GITHUB_TOKEN")]
    Unauthorized { url: String },

    #[error("rate limit exceeded for {url}. Try again later or set GITHUB_TOKEN")]
    RateLimited { url: String },

    #[error("HTTP {status} from {url}")]
    ClientError { url: String, status: u16 },
}

impl NonRetryableError {
    /// 404 and 403 both mean "the asset isn't there for us".
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            NonRetryableError::NotFound { .. } | NonRetryableError::Forbidden { .. }
        )
    }
}

/// Error for a non-success status. 4xx responses become [`NonRetryableError`];
/// anything else stays a plain, retryable error.
pub fn status_error(url: &str, status: StatusCode) -> anyhow::Error {
    let url = url.to_string();
    match status {
        StatusCode::NOT_FOUND => NonRetryableError::NotFound { url }.into(),
        StatusCode::FORBIDDEN => NonRetryableError::Forbidden { url }.into(),
        StatusCode::UNAUTHORIZED => NonRetryableError::Unauthorized { url }.into(),
        StatusCode::TOO_MANY_REQUESTS => NonRetryableError::RateLimited { url }.into(),
        s if s.is_client_error() => NonRetryableError::ClientError {
            url,
            status: s.as_u16(),
        }
        .into(),
        s => anyhow::anyhow!("HTTP {} from {}", s.as_u16(), url),
    }
}

/// Whether another attempt may succeed.
pub fn is_retryable(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NonRetryableError>().is_none()
}
