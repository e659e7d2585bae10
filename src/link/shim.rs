//! The two ways an executable can be exposed in the bin directory.

use anyhow::{Context, Result};
use log::debug;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;
use crate::runtime::path::resolve_link_target;

const TRIAL_LINK_NAME: &str = ".toolman-link-check";

/// How links are materialised in the bin directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `<bin>/<name>` is a symlink to the real executable.
    Symlink,
    /// `<bin>/<name>.bat` forwards its arguments to the real executable.
    Shim,
}

impl LinkKind {
    /// Try a throwaway symlink in `bin_dir`; fall back to shims when the
    /// platform refuses (Windows without developer mode or elevation).
    pub fn detect<R: Runtime>(runtime: &R, bin_dir: &Path) -> Self {
        let trial = bin_dir.join(TRIAL_LINK_NAME);
        let _ = runtime.remove_file(&trial);
        match runtime.symlink(bin_dir, &trial) {
            Ok(()) => {
                let _ = runtime.remove_file(&trial);
                LinkKind::Symlink
            }
            Err(e) => {
                debug!("Symlinks unavailable in {:?} ({}), using shims", bin_dir, e);
                LinkKind::Shim
            }
        }
    }

    /// Path the link for `name` occupies.
    pub fn link_path(&self, bin_dir: &Path, name: &str) -> PathBuf {
        match self {
            LinkKind::Symlink => bin_dir.join(name),
            LinkKind::Shim => shim_path(&bin_dir.join(name)),
        }
    }
}

/// `<link>.bat`
pub fn shim_path(link: &Path) -> PathBuf {
    let mut name = OsString::from(link.as_os_str());
    name.push(".bat");
    PathBuf::from(name)
}

pub fn shim_content(target: &Path) -> String {
    format!("@echo off\r\n{} %*\r\n", target.display())
}

/// Point `link` at `target` using `kind`, replacing whatever is there.
pub fn create_executable_link<R: Runtime>(
    runtime: &R,
    kind: LinkKind,
    target: &Path,
    link: &Path,
) -> Result<()> {
    if runtime.is_symlink(link) || runtime.exists(link) {
        runtime
            .remove_file(link)
            .with_context(|| format!("Failed to replace existing {:?}", link))?;
    }
    match kind {
        LinkKind::Symlink => runtime.symlink(target, link),
        LinkKind::Shim => runtime.write(link, shim_content(target).as_bytes()),
    }
}

/// Where the link or shim at `path` points, if it is one of ours.
pub fn link_target<R: Runtime>(runtime: &R, path: &Path) -> Option<PathBuf> {
    if runtime.is_symlink(path) {
        let target = runtime.read_link(path).ok()?;
        return Some(resolve_link_target(path, &target));
    }
    if path.extension().is_some_and(|ext| ext == "bat") && runtime.exists(path) {
        let content = runtime.read_to_string(path).ok()?;
        let line = content.lines().nth(1)?;
        return line.strip_suffix(" %*").map(PathBuf::from);
    }
    None
}
