//! HTTP client with built-in retry logic and error handling.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::de::DeserializeOwned;
use std::io::Write;
use std::time::Duration;

use super::retry::{MAX_RETRIES, RETRY_DELAY_MS, is_retryable, status_error};
use crate::runtime::Runtime;

pub const USER_AGENT: &str = "toolman-cli";

/// Shared HTTP client. Cloning is cheap; all clones share one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Build the client used by every command: toolman user agent, the
    /// per-request timeout, and a bearer token when `GITHUB_TOKEN` is set.
    pub fn build<R: Runtime>(runtime: &R, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(token) = runtime.env_var("GITHUB_TOKEN") {
            if !token.is_empty() {
                let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("GITHUB_TOKEN is not a valid header value")?;
                auth_value.set_sensitive(true);
                headers.insert(AUTHORIZATION, auth_value);
                debug!("Using GITHUB_TOKEN for authentication");
            }
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// GET `url` and deserialize the JSON body.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET JSON from {}...", url);

        self.with_retry("GET JSON", || async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .context("Failed to send request")?;
            if !response.status().is_success() {
                return Err(status_error(url, response.status()));
            }
            response
                .json::<T>()
                .await
                .context("Failed to parse JSON response")
        })
        .await
    }

    /// GET `url` and return the body as text.
    #[tracing::instrument(skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET text from {}...", url);

        self.with_retry("GET text", || async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .context("Failed to send request")?;
            if !response.status().is_success() {
                return Err(status_error(url, response.status()));
            }
            response.text().await.context("Failed to read response body")
        })
        .await
    }

    /// Stream `url` into the writer produced by `create_writer`, calling
    /// `on_progress(downloaded, total)` after every chunk. The writer is
    /// recreated on each attempt so a retry starts from an empty file.
    #[tracing::instrument(skip(self, create_writer, on_progress))]
    pub async fn download_file<W, F, P>(
        &self,
        url: &str,
        create_writer: F,
        on_progress: P,
    ) -> Result<u64>
    where
        W: Write + Send,
        F: Fn() -> Result<W> + Sync,
        P: Fn(u64, Option<u64>) + Sync,
    {
        debug!("Downloading file from {}...", url);

        self.with_retry("Download", || self.download_file_once(url, &create_writer, &on_progress))
            .await
    }

    async fn download_file_once<W, F, P>(
        &self,
        url: &str,
        create_writer: &F,
        on_progress: &P,
    ) -> Result<u64>
    where
        W: Write + Send,
        F: Fn() -> Result<W> + Sync,
        P: Fn(u64, Option<u64>) + Sync,
    {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to start download request")?;
        if !response.status().is_success() {
            return Err(status_error(url, response.status()));
        }

        let total = response.content_length();
        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from download stream")?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
            on_progress(downloaded_bytes, total);
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );
        Ok(downloaded_bytes)
    }

    async fn with_retry<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if !is_retryable(&e) => {
                    debug!("{}: non-retryable error: {}", operation_name, e);
                    return Err(e);
                }
                Err(e) if attempt >= MAX_RETRIES => return Err(e),
                Err(e) => {
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {:?}...",
                        operation_name, attempt, MAX_RETRIES, e, self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
