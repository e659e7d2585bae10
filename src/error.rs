//! Error taxonomy for package operations.
//!
//! Components return `anyhow::Result`; the variants below are raised with
//! `anyhow::Error::from` and recovered with `downcast_ref` wherever the
//! category matters (result classification, HTTP status mapping, tests).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("unable to parse package recipe for {package}: {message}")]
    ConfigParse { package: String, message: String },

    #[error("no package recipe exists for {0}")]
    RecipeNotFound(String),

    #[error("invalid package recipe for {package}: {message}")]
    InvalidRecipe { package: String, message: String },

    #[error("package {package} has no binary for {os}/{arch}")]
    UnsupportedPlatform {
        package: String,
        os: String,
        arch: String,
    },

    #[error("package {package} is explicitly unsupported on {os}/{arch}")]
    PlatformIgnored {
        package: String,
        os: String,
        arch: String,
    },

    #[error("unable to find latest version tag: {0}")]
    VersionResolution(String),

    #[error("found no qualifying releases for {0}")]
    NoQualifyingRelease(String),

    #[error("failed to match version {tag:?} with version format {format:?}")]
    VersionFormatMismatch { tag: String, format: String },

    #[error("{package} requires using the latest version, which is currently {latest}")]
    PinnedVersionNotLatest { package: String, latest: String },

    #[error("unable to find {package}@{version} on the web at {url}")]
    AssetNotFound {
        package: String,
        version: String,
        url: String,
    },

    #[error("download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("unexpected archive layout: expected a single root entry, found {found}")]
    UnexpectedArchiveLayout { found: usize },

    #[error("no unpack strategy for extension {0:?}")]
    UnsupportedArchive(String),

    #[error("bin path {0:?} had no executable files")]
    NoExecutablesFound(PathBuf),

    #[error("failed to create link {link:?} -> {target:?}: {reason}")]
    LinkCreationFailed {
        target: PathBuf,
        link: PathBuf,
        reason: String,
    },

    #[error("{package} has no installed version {stem}")]
    NotInstalled { package: String, stem: String },

    #[error("packages should be in format 'pkg' or 'pkg@version', got {0:?}")]
    InvalidPackageArg(String),
}

impl InstallError {
    /// Platform errors mean the package is skipped rather than failed.
    pub fn is_platform_skip(&self) -> bool {
        matches!(
            self,
            InstallError::UnsupportedPlatform { .. } | InstallError::PlatformIgnored { .. }
        )
    }
}

/// Finds the taxonomy variant inside an `anyhow` chain, if any.
pub fn classify(err: &anyhow::Error) -> Option<&InstallError> {
    err.chain().find_map(|cause| cause.downcast_ref::<InstallError>())
}
