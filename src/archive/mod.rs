//! Unpacking downloaded assets into version directories.

mod tar;
mod zip;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{debug, info};
use std::path::Path;
use xz2::read::XzDecoder;

use crate::error::InstallError;
use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    Zip,
}

impl ArchiveFormat {
    /// Format for a recipe `ext` value such as `tar.gz` or `zip`.
    pub fn from_ext(ext: &str) -> Result<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "tar.gz" | "tgz" => Ok(ArchiveFormat::TarGz),
            "tar.xz" | "txz" => Ok(ArchiveFormat::TarXz),
            "zip" => Ok(ArchiveFormat::Zip),
            _ => Err(InstallError::UnsupportedArchive(ext.to_string()).into()),
        }
    }
}

/// Unpack `archive` into `dest`, creating `dest` if needed.
#[tracing::instrument(skip(runtime))]
pub fn unpack<R: Runtime>(
    runtime: &R,
    format: ArchiveFormat,
    archive: &Path,
    dest: &Path,
) -> Result<()> {
    runtime.create_dir_all(dest)?;
    match format {
        ArchiveFormat::TarGz => {
            let file = runtime
                .open(archive)
                .with_context(|| format!("Failed to open archive at {:?}", archive))?;
            tar::unpack_tar(runtime, GzDecoder::new(file), dest)
        }
        ArchiveFormat::TarXz => {
            let file = runtime
                .open(archive)
                .with_context(|| format!("Failed to open archive at {:?}", archive))?;
            tar::unpack_tar(runtime, XzDecoder::new(file), dest)
        }
        ArchiveFormat::Zip => zip::unpack_zip(runtime, archive, dest),
    }
}

/// Where and how to extract one downloaded asset.
#[derive(Debug)]
pub struct ExtractPlan<'a> {
    pub archive: &'a Path,
    pub ext: &'a str,
    pub version_dir: &'a Path,
    /// Scratch directory for archives with a wrapping root entry.
    pub scratch_dir: &'a Path,
    pub has_root: bool,
}

/// Extract an archive into its version directory.
///
/// With `has_root`, the archive is unpacked into the scratch directory and
/// its single top-level entry becomes the version directory. Any other
/// layout is [`InstallError::UnexpectedArchiveLayout`].
#[tracing::instrument(skip(runtime))]
pub fn extract<R: Runtime>(runtime: &R, plan: &ExtractPlan<'_>) -> Result<()> {
    let format = ArchiveFormat::from_ext(plan.ext)?;

    if !plan.has_root {
        unpack(runtime, format, plan.archive, plan.version_dir)?;
        info!("Extracted {:?} into {:?}", plan.archive, plan.version_dir);
        return Ok(());
    }

    if runtime.exists(plan.scratch_dir) {
        runtime.remove_dir_all(plan.scratch_dir)?;
    }
    let result = unpack(runtime, format, plan.archive, plan.scratch_dir)
        .and_then(|()| promote_single_root(runtime, plan.scratch_dir, plan.version_dir));
    if runtime.exists(plan.scratch_dir) {
        let _ = runtime.remove_dir_all(plan.scratch_dir);
    }
    result?;

    info!("Extracted {:?} into {:?}", plan.archive, plan.version_dir);
    Ok(())
}

fn promote_single_root<R: Runtime>(runtime: &R, scratch: &Path, version_dir: &Path) -> Result<()> {
    let entries = runtime
        .read_dir(scratch)
        .context("Failed to read scratch extraction directory")?;
    let [root] = entries.as_slice() else {
        return Err(InstallError::UnexpectedArchiveLayout {
            found: entries.len(),
        }
        .into());
    };

    debug!("Moving archive root {:?} to {:?}", root, version_dir);
    if let Some(parent) = version_dir.parent() {
        runtime.create_dir_all(parent)?;
    }
    runtime.rename(root, version_dir)
}
