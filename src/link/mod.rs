//! Exposing installed executables in the bin directory.

mod shim;

use anyhow::Result;
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::InstallError;
use crate::recipe::RenameItem;
use crate::runtime::{Runtime, is_path_under};

pub use shim::{LinkKind, create_executable_link, link_target, shim_content, shim_path};

/// A configured bin path, classified against an installed version tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinPath {
    /// The sole candidate is this file.
    File(PathBuf),
    /// Every non-directory entry is a candidate.
    Directory(PathBuf),
}

impl BinPath {
    /// Classify one recipe `bin_path` entry. `""`, `"."` and entries ending
    /// in `/` are directories by construction; anything else is a file when
    /// `<entry><exe_suffix>` is one.
    pub fn resolve<R: Runtime>(runtime: &R, version_dir: &Path, entry: &str, exe_suffix: &str) -> Self {
        if entry.is_empty() || entry == "." || entry.ends_with('/') {
            return BinPath::Directory(version_dir.join(entry.trim_end_matches('/')));
        }
        let file = version_dir.join(format!("{}{}", entry, exe_suffix));
        if runtime.exists(&file) && !runtime.is_dir(&file) {
            BinPath::File(file)
        } else {
            BinPath::Directory(version_dir.join(entry))
        }
    }
}

pub fn resolve_bin_paths<R: Runtime>(
    runtime: &R,
    version_dir: &Path,
    entries: &[String],
    exe_suffix: &str,
) -> Vec<BinPath> {
    entries
        .iter()
        .map(|entry| BinPath::resolve(runtime, version_dir, entry, exe_suffix))
        .collect()
}

/// One executable and where it is exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMapping {
    pub target: PathBuf,
    pub link: PathBuf,
}

/// Link name for an executable: base name without extension, renames applied.
pub fn link_name(target: &Path, renames: &[RenameItem]) -> String {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    renames
        .iter()
        .fold(stem, |name, rename| name.replace(&rename.from, &rename.to))
}

pub struct LinkManager<'a, R: Runtime> {
    runtime: &'a R,
    bin_dir: &'a Path,
    kind: LinkKind,
}

impl<'a, R: Runtime> LinkManager<'a, R> {
    pub fn new(runtime: &'a R, bin_dir: &'a Path, kind: LinkKind) -> Self {
        Self {
            runtime,
            bin_dir,
            kind,
        }
    }

    /// Compute the link set for `bins`. A bin path without a single
    /// executable candidate is [`InstallError::NoExecutablesFound`]; two
    /// executables claiming one link name is
    /// [`InstallError::LinkCreationFailed`].
    #[tracing::instrument(skip(self))]
    pub fn plan(&self, bins: &[BinPath], renames: &[RenameItem]) -> Result<Vec<LinkMapping>> {
        let mut mappings = Vec::new();
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
        for bin in bins {
            let candidates = match bin {
                BinPath::File(file) => vec![file.clone()],
                BinPath::Directory(dir) => {
                    if !self.runtime.is_dir(dir) {
                        return Err(InstallError::NoExecutablesFound(dir.clone()).into());
                    }
                    self.runtime
                        .read_dir(dir)?
                        .into_iter()
                        .filter(|p| !self.runtime.is_dir(p))
                        .collect()
                }
            };

            let before = mappings.len();
            for target in candidates {
                if !self.runtime.is_executable(&target) {
                    debug!("Skipping non-executable {:?}", target);
                    continue;
                }
                let name = link_name(&target, renames);
                let link = self.kind.link_path(self.bin_dir, &name);
                if let Some(other) = claimed.insert(link.clone(), target.clone()) {
                    return Err(InstallError::LinkCreationFailed {
                        target,
                        link,
                        reason: format!("{:?} is exposed under the same name", other),
                    }
                    .into());
                }
                mappings.push(LinkMapping { link, target });
            }

            if mappings.len() == before {
                let path = match bin {
                    BinPath::File(p) | BinPath::Directory(p) => p.clone(),
                };
                return Err(InstallError::NoExecutablesFound(path).into());
            }
        }
        Ok(mappings)
    }

    /// Create every link in parallel. Either all succeed or the ones that
    /// did are removed again and the first failure is returned.
    #[tracing::instrument(skip(self, mappings))]
    pub fn create(&self, mappings: &[LinkMapping]) -> Result<()> {
        self.runtime.create_dir_all(self.bin_dir)?;

        let results: Vec<Result<()>> = std::thread::scope(|scope| {
            let handles: Vec<_> = mappings
                .iter()
                .map(|m| {
                    scope.spawn(move || {
                        create_executable_link(self.runtime, self.kind, &m.target, &m.link)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| Err(anyhow::anyhow!("link worker panicked")))
                })
                .collect()
        });

        let mut first_error = None;
        for (mapping, result) in mappings.iter().zip(results) {
            match result {
                Ok(()) => debug!("Linked {:?} -> {:?}", mapping.link, mapping.target),
                Err(e) if first_error.is_none() => first_error = Some((mapping, e)),
                Err(_) => {}
            }
        }

        let Some((failed, e)) = first_error else {
            return Ok(());
        };
        self.remove(mappings)?;
        Err(InstallError::LinkCreationFailed {
            target: failed.target.clone(),
            link: failed.link.clone(),
            reason: format!("{:#}", e),
        }
        .into())
    }

    /// Remove the links in `mappings` that still point at their target.
    /// Links since taken over by something else are left alone.
    #[tracing::instrument(skip(self, mappings))]
    pub fn remove(&self, mappings: &[LinkMapping]) -> Result<()> {
        for mapping in mappings {
            if link_target(self.runtime, &mapping.link).as_deref() == Some(&mapping.target) {
                self.runtime.remove_file(&mapping.link)?;
            }
        }
        Ok(())
    }

    /// Remove every link or shim in the bin directory that points inside
    /// `version_dir`. Returns how many were removed.
    #[tracing::instrument(skip(self))]
    pub fn remove_into(&self, version_dir: &Path) -> Result<usize> {
        if !self.runtime.exists(self.bin_dir) {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in self.runtime.read_dir(self.bin_dir)? {
            let Some(target) = link_target(self.runtime, &entry) else {
                continue;
            };
            if is_path_under(&target, version_dir) {
                match self.runtime.remove_file(&entry) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove link {:?}: {}", entry, e),
                }
            }
        }
        Ok(removed)
    }
}
