//! The immutable environment every component is handed.
//!
//! Layout under the root:
//!
//! ```text
//! <root>/
//!   bin/                      stable links (or shims) to active executables
//!   pkg/<package>/<stem>/     one directory per installed version
//!   pkg/<package>/using.yaml  the active-version pointer
//!   recipes/<repo>/pkgs/      synced recipe repositories
//!   tmp/                      downloads and scratch extraction
//! ```

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::platform::Platform;
use crate::runtime::Runtime;

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_ARCH_PKGBUILD_BASE: &str =
    "https://raw.githubusercontent.com/archlinux/svntogit-community/master";
pub const USING_FILE_NAME: &str = "using.yaml";

/// Remote endpoints used by latest-version lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub github_api: String,
    pub arch_pkgbuild_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github_api: DEFAULT_GITHUB_API.to_string(),
            arch_pkgbuild_base: DEFAULT_ARCH_PKGBUILD_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Environment {
    pub root: PathBuf,
    pub pkg_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub recipe_dirs: Vec<PathBuf>,
    pub platform: Platform,
    pub endpoints: Endpoints,
    pub http_timeout: Duration,
}

impl Environment {
    /// Environment rooted at `root` for the detected platform.
    pub fn new(root: PathBuf) -> Self {
        Self {
            pkg_dir: root.join("pkg"),
            bin_dir: root.join("bin"),
            tmp_dir: root.join("tmp"),
            recipe_dirs: Vec::new(),
            platform: Platform::detect(),
            endpoints: Endpoints::default(),
            http_timeout: Duration::from_secs(300),
            root,
        }
    }

    pub fn with_recipe_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.recipe_dirs = dirs;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Fill `recipe_dirs` from `<root>/recipes/*` when none were given explicitly.
    pub fn discover_recipe_dirs<R: Runtime>(mut self, runtime: &R) -> Self {
        if self.recipe_dirs.is_empty() {
            let recipes_root = self.root.join("recipes");
            if let Ok(entries) = runtime.read_dir(&recipes_root) {
                self.recipe_dirs = entries
                    .into_iter()
                    .filter(|p| runtime.is_dir(p))
                    .collect();
            }
            debug!("Discovered recipe dirs: {:?}", self.recipe_dirs);
        }
        self
    }

    /// `<pkg_dir>/<package>`
    pub fn package_dir(&self, package: &str) -> PathBuf {
        self.pkg_dir.join(package)
    }

    /// `<pkg_dir>/<package>/<stem>`
    pub fn version_dir(&self, package: &str, stem: &str) -> PathBuf {
        self.package_dir(package).join(stem)
    }

    /// `<pkg_dir>/<package>/using.yaml`
    pub fn using_path(&self, package: &str) -> PathBuf {
        self.package_dir(package).join(USING_FILE_NAME)
    }

    /// Create the bin, pkg and tmp directories.
    #[tracing::instrument(skip(self, runtime))]
    pub fn ensure_dirs<R: Runtime>(&self, runtime: &R) -> Result<()> {
        for dir in [&self.bin_dir, &self.pkg_dir, &self.tmp_dir] {
            runtime
                .create_dir_all(dir)
                .with_context(|| format!("Failed to create {:?}", dir))?;
        }
        Ok(())
    }
}

/// `<home>/.toolman`
#[tracing::instrument(skip(runtime))]
pub fn default_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home_dir = runtime
        .home_dir()
        .context("Could not find home directory")?;
    Ok(home_dir.join(".toolman"))
}

/// Pick the explicit root if given, else the default one.
pub fn resolve_root<R: Runtime>(runtime: &R, root: Option<&Path>) -> Result<PathBuf> {
    match root {
        Some(path) => Ok(path.to_path_buf()),
        None => default_root(runtime),
    }
}
