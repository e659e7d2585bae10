//! HTTP client module with retry logic and error handling.

mod client;
mod retry;

pub use client::{HttpClient, USER_AGENT};
pub use retry::{MAX_RETRIES, NonRetryableError, RETRY_DELAY_MS, is_retryable, status_error};
