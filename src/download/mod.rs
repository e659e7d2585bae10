//! Asset download into the temp directory.

use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use crate::error::InstallError;
use crate::http::{HttpClient, NonRetryableError};
use crate::runtime::Runtime;

/// What is being fetched, for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct AssetRef<'a> {
    pub package: &'a str,
    pub version: &'a str,
    pub url: &'a str,
}

/// Stream `asset.url` into `dest`, reporting `(downloaded, total)` bytes.
///
/// 404/403 become [`InstallError::AssetNotFound`]; every other failure is
/// [`InstallError::DownloadFailed`]. A partially written `dest` is removed.
#[tracing::instrument(skip(runtime, http, on_progress))]
pub async fn download_asset<R, P>(
    runtime: &R,
    http: &HttpClient,
    asset: AssetRef<'_>,
    dest: &Path,
    on_progress: P,
) -> Result<u64>
where
    R: Runtime,
    P: Fn(u64, Option<u64>) + Sync,
{
    info!("Downloading {} to {:?}", asset.url, dest);

    let result = http
        .download_file(
            asset.url,
            || {
                runtime
                    .create_file(dest)
                    .with_context(|| format!("Failed to create temporary file at {:?}", dest))
            },
            on_progress,
        )
        .await;

    match result {
        Ok(bytes) => {
            info!("Download of {} complete ({} bytes)", asset.url, bytes);
            Ok(bytes)
        }
        Err(e) => {
            if runtime.exists(dest) {
                let _ = runtime.remove_file(dest);
            }
            let missing = e
                .downcast_ref::<NonRetryableError>()
                .is_some_and(NonRetryableError::is_missing);
            if missing {
                Err(InstallError::AssetNotFound {
                    package: asset.package.to_string(),
                    version: asset.version.to_string(),
                    url: asset.url.to_string(),
                }
                .into())
            } else {
                Err(InstallError::DownloadFailed {
                    url: asset.url.to_string(),
                    reason: format!("{:#}", e),
                }
                .into())
            }
        }
    }
}
