//! Installed package state under `<root>/pkg`.
//!
//! Each package owns `pkg/<package>/`, holding one directory per installed
//! version (named by its stem) and the `using.yaml` pointer.

mod arg;
mod using;

use anyhow::{Context, Result, bail};
use log::debug;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::runtime::{Runtime, is_path_under};

pub use arg::{PackageArg, RunTarget, create_stem, is_single_component};

pub struct PackageStore<'a, R: Runtime> {
    runtime: &'a R,
    env: &'a Environment,
}

impl<'a, R: Runtime> PackageStore<'a, R> {
    pub fn new(runtime: &'a R, env: &'a Environment) -> Self {
        Self { runtime, env }
    }

    pub fn version_dir(&self, package: &str, stem: &str) -> PathBuf {
        self.env.version_dir(package, stem)
    }

    pub fn is_installed(&self, package: &str, stem: &str) -> bool {
        self.runtime.is_dir(&self.version_dir(package, stem))
    }

    /// Names of every package with a directory under `pkg/`.
    pub fn list_packages(&self) -> Result<Vec<String>> {
        if !self.runtime.exists(&self.env.pkg_dir) {
            return Ok(vec![]);
        }
        Ok(self
            .runtime
            .read_dir(&self.env.pkg_dir)?
            .into_iter()
            .filter(|p| self.runtime.is_dir(p))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect())
    }

    /// Stems of every installed version of `package`, sorted.
    pub fn installed_versions(&self, package: &str) -> Result<Vec<String>> {
        let package_dir = self.env.package_dir(package);
        if !self.runtime.exists(&package_dir) {
            return Ok(vec![]);
        }
        Ok(self
            .runtime
            .read_dir(&package_dir)?
            .into_iter()
            .filter(|p| self.runtime.is_dir(p))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect())
    }

    /// Delete one version directory. The package directory goes too once
    /// no version is left.
    #[tracing::instrument(skip(self))]
    pub fn discard_version(&self, package: &str, stem: &str) -> Result<()> {
        let package_dir = self.contained_package_dir(package)?;
        let version_dir = self.version_dir(package, stem);
        if !is_single_component(stem)
            || version_dir == package_dir
            || !is_path_under(&version_dir, &package_dir)
        {
            bail!("Refusing to remove {:?}: not a version of {}", version_dir, package);
        }
        if self.runtime.exists(&version_dir) || self.runtime.is_symlink(&version_dir) {
            self.runtime
                .remove_dir_all(&version_dir)
                .with_context(|| format!("Failed to remove {:?}", version_dir))?;
        }
        if self.installed_versions(package)?.is_empty() {
            self.remove_package_dir(package)?;
        }
        Ok(())
    }

    pub fn remove_package_dir(&self, package: &str) -> Result<()> {
        let package_dir = self.contained_package_dir(package)?;
        if self.runtime.exists(&package_dir) {
            debug!("Removing package directory {:?}", package_dir);
            self.runtime.remove_dir_all(&package_dir)?;
        }
        Ok(())
    }

    /// `pkg/<package>`, provided `package` names a single entry below `pkg/`.
    fn contained_package_dir(&self, package: &str) -> Result<PathBuf> {
        let package_dir = self.env.package_dir(package);
        if !is_single_component(package) || !is_path_under(&package_dir, &self.env.pkg_dir) {
            bail!("Refusing to remove {:?}: not a package directory", package_dir);
        }
        Ok(package_dir)
    }
}
