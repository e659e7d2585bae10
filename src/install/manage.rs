//! Operations on already installed versions: remove, switch, using, list,
//! and locating a binary to run.

use anyhow::{Result, anyhow, bail};
use log::{debug, info};
use std::path::PathBuf;

use super::Engine;
use crate::error::InstallError;
use crate::link::{BinPath, resolve_bin_paths};
use crate::package::{RunTarget, create_stem};
use crate::recipe::load_recipe;
use crate::runtime::Runtime;

/// What [`Engine::remove`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub stem: String,
    /// The removed version was the active one.
    pub was_active: bool,
    /// Links removed from the bin directory.
    pub links_removed: usize,
    pub notes: Vec<String>,
}

/// One row of [`Engine::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageListing {
    pub name: String,
    pub versions: Vec<String>,
    pub using: Option<String>,
}

impl<R: Runtime> Engine<R> {
    /// Uninstall one version of `package`.
    ///
    /// `version` may be a full stem (`rg-13.0.0`) or just the version
    /// (`13.0.0`). Without it the package must have exactly one version.
    #[tracing::instrument(skip(self))]
    pub fn remove(&self, package: &str, version: Option<&str>) -> Result<RemoveOutcome> {
        let store = self.store();
        let installed = store.installed_versions(package)?;

        let stem = match version {
            Some(v) => self.find_stem(package, v, &installed)?,
            None => match installed.as_slice() {
                [only] => only.clone(),
                [] => bail!(InstallError::NotInstalled {
                    package: package.to_string(),
                    stem: package.to_string(),
                }),
                many => bail!(
                    "{} has {} versions installed ({}); pick one to remove",
                    package,
                    many.len(),
                    many.join(", ")
                ),
            },
        };

        let (was_active, links_removed) = {
            let _active = self.lock_activation();
            let was_active = store.currently_using(package)?.as_deref() == Some(stem.as_str());
            (was_active, self.remove_stem_inner(package, &stem)?)
        };

        let notes = match load_recipe(&self.runtime, &self.env, package) {
            Ok(config) => config.remove_notes(&self.env.platform),
            Err(e) => {
                debug!("No remove notes for {}: {:#}", package, e);
                vec![]
            }
        };

        info!("Removed {}", stem);
        Ok(RemoveOutcome {
            stem,
            was_active,
            links_removed,
            notes,
        })
    }

    /// Remove `stem`, unlinking it first if it is active. Callers hold the
    /// activation lock.
    pub(crate) fn remove_stem(&self, package: &str, stem: &str) -> Result<()> {
        self.remove_stem_inner(package, stem).map(|_| ())
    }

    fn remove_stem_inner(&self, package: &str, stem: &str) -> Result<usize> {
        let store = self.store();
        let mut links_removed = 0;
        if store.currently_using(package)?.as_deref() == Some(stem) {
            links_removed = self.links().remove_into(&store.version_dir(package, stem))?;
            store.clear_using(package)?;
        }
        if store.installed_versions(package)? == [stem] {
            store.remove_package_dir(package)?;
        } else {
            store.discard_version(package, stem)?;
        }
        Ok(links_removed)
    }

    /// Make an installed version the active one.
    #[tracing::instrument(skip(self))]
    pub fn switch_active(&self, package: &str, version: &str) -> Result<String> {
        let installed = self.store().installed_versions(package)?;
        let stem = self.find_stem(package, version, &installed)?;
        let config = load_recipe(&self.runtime, &self.env, package)?;
        let _active = self.lock_activation();
        self.activate(&config, &stem)?;
        info!("Switched {} to {}", package, stem);
        Ok(stem)
    }

    /// Active stem of `package`, if any.
    pub fn currently_using(&self, package: &str) -> Result<Option<String>> {
        self.store().currently_using(package)
    }

    /// Every installed package with its versions and active stem.
    pub fn list(&self) -> Result<Vec<PackageListing>> {
        let store = self.store();
        store
            .list_packages()?
            .into_iter()
            .map(|name| {
                Ok(PackageListing {
                    versions: store.installed_versions(&name)?,
                    using: store.currently_using(&name)?,
                    name,
                })
            })
            .collect()
    }

    /// Executable behind `target`: the pinned version, or the active one,
    /// and the binary named `target.bin` (the package name by default).
    ///
    /// Bin paths are searched in recipe order. A file bin path is the binary
    /// itself, so naming a different one is an error.
    #[tracing::instrument(skip(self))]
    pub fn resolve_run_binary(&self, target: &RunTarget) -> Result<PathBuf> {
        let package = target.package.name.as_str();
        let store = self.store();
        let stem = match target.package.version.as_deref() {
            Some(v) => self.find_stem(package, v, &store.installed_versions(package)?)?,
            None => store
                .currently_using(package)?
                .ok_or_else(|| anyhow!("Not currently using any {} version", package))?,
        };

        let config = load_recipe(&self.runtime, &self.env, package)?;
        let platform = &self.env.platform;
        let exe_suffix = platform.exe_suffix();
        let bins = resolve_bin_paths(
            &self.runtime,
            &store.version_dir(package, &stem),
            &config.bin_paths(platform)?,
            exe_suffix,
        );
        let bin_name = target.bin.as_deref().unwrap_or(package);

        for bin in bins {
            match bin {
                BinPath::File(file) if target.bin.is_none() => return Ok(file),
                BinPath::File(file) => bail!(
                    "bin path {:?} of {} is a file, so a different binary cannot be selected",
                    file,
                    package
                ),
                BinPath::Directory(dir) => {
                    let found = [format!("{}{}", bin_name, exe_suffix), bin_name.to_string()]
                        .into_iter()
                        .map(|name| dir.join(name))
                        .find(|path| self.runtime.exists(path) && !self.runtime.is_dir(path));
                    if let Some(path) = found {
                        return Ok(path);
                    }
                }
            }
        }
        bail!("No {} binary exists for {}", bin_name, stem)
    }

    fn find_stem(&self, package: &str, version: &str, installed: &[String]) -> Result<String> {
        let as_stem = create_stem(package, version);
        for candidate in [version, as_stem.as_str()] {
            if installed.iter().any(|s| s == candidate) {
                return Ok(candidate.to_string());
            }
        }
        bail!(InstallError::NotInstalled {
            package: package.to_string(),
            stem: as_stem,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{engine_with, write_recipe};
    use super::*;
    use crate::error::classify;
    use crate::provider::MockLatestVersionSource;
    use crate::runtime::RealRuntime;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const RG: &str = "os_map:\n  linux:\n    name: linux\n    bin_path: rg\n    remove_note: Bye\narch_map:\n  amd64: x86_64\n";

    fn setup() -> (TempDir, Engine<RealRuntime>) {
        let dir = tempdir().unwrap();
        let recipes = dir.path().join("recipes");
        write_recipe(&recipes, "rg", RG);
        let engine = engine_with(&dir.path().join("root"), &recipes, MockLatestVersionSource::new());
        (dir, engine)
    }

    fn fake_install(engine: &Engine<RealRuntime>, stem: &str) {
        let binary = engine.env().version_dir("rg", stem).join("rg");
        fs::create_dir_all(binary.parent().unwrap()).unwrap();
        fs::write(&binary, "#!/bin/sh\n").unwrap();
        engine.runtime().set_permissions(&binary, 0o755).unwrap();
    }

    fn link(engine: &Engine<RealRuntime>) -> std::path::PathBuf {
        engine.env().bin_dir.join("rg")
    }

    fn points_into(engine: &Engine<RealRuntime>, stem: &str) -> bool {
        let target = fs::read_link(link(engine)).unwrap();
        target.starts_with(engine.env().version_dir("rg", stem))
    }

    #[cfg(unix)]
    #[test]
    fn test_switch_relinks_and_records() {
        let (_dir, engine) = setup();
        fake_install(&engine, "rg-1.0");
        fake_install(&engine, "rg-2.0");

        assert_eq!(engine.switch_active("rg", "1.0").unwrap(), "rg-1.0");
        assert!(points_into(&engine, "rg-1.0"));

        assert_eq!(engine.switch_active("rg", "rg-2.0").unwrap(), "rg-2.0");
        assert!(points_into(&engine, "rg-2.0"));
        assert_eq!(engine.currently_using("rg").unwrap().as_deref(), Some("rg-2.0"));
    }

    #[test]
    fn test_switch_to_missing_version() {
        let (_dir, engine) = setup();
        fake_install(&engine, "rg-1.0");

        let err = engine.switch_active("rg", "3.0").unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(InstallError::NotInstalled { stem, .. }) if stem == "rg-3.0"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_active_version_unlinks() {
        let (_dir, engine) = setup();
        fake_install(&engine, "rg-1.0");
        fake_install(&engine, "rg-2.0");
        engine.switch_active("rg", "2.0").unwrap();

        let outcome = engine.remove("rg", Some("2.0")).unwrap();

        assert!(outcome.was_active);
        assert_eq!(outcome.links_removed, 1);
        assert_eq!(outcome.notes, vec!["Bye".to_string()]);
        assert!(!link(&engine).exists() && fs::symlink_metadata(link(&engine)).is_err());
        assert_eq!(engine.currently_using("rg").unwrap(), None);
        assert!(engine.env().version_dir("rg", "rg-1.0").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_inactive_version_keeps_links() {
        let (_dir, engine) = setup();
        fake_install(&engine, "rg-1.0");
        fake_install(&engine, "rg-2.0");
        engine.switch_active("rg", "1.0").unwrap();

        let outcome = engine.remove("rg", Some("rg-2.0")).unwrap();

        assert!(!outcome.was_active);
        assert_eq!(outcome.links_removed, 0);
        assert!(points_into(&engine, "rg-1.0"));
    }

    #[test]
    fn test_remove_only_version_removes_package_dir() {
        let (_dir, engine) = setup();
        fake_install(&engine, "rg-1.0");
        engine.switch_active("rg", "1.0").unwrap();

        engine.remove("rg", None).unwrap();

        assert!(!engine.env().package_dir("rg").exists());
        assert!(engine.list().unwrap().is_empty());
    }

    #[test]
    fn test_remove_requires_version_when_ambiguous() {
        let (_dir, engine) = setup();
        fake_install(&engine, "rg-1.0");
        fake_install(&engine, "rg-2.0");

        let err = engine.remove("rg", None).unwrap_err();
        assert!(err.to_string().contains("rg-1.0, rg-2.0"));

        let err = engine.remove("fd", None).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(InstallError::NotInstalled { .. })
        ));
    }

    #[test]
    fn test_list() {
        let (_dir, engine) = setup();
        fake_install(&engine, "rg-1.0");
        fake_install(&engine, "rg-2.0");
        engine.switch_active("rg", "2.0").unwrap();
        fs::create_dir_all(engine.env().version_dir("fd", "fd-8.0")).unwrap();

        let listing = engine.list().unwrap();

        assert_eq!(
            listing,
            vec![
                PackageListing {
                    name: "fd".into(),
                    versions: vec!["fd-8.0".into()],
                    using: None,
                },
                PackageListing {
                    name: "rg".into(),
                    versions: vec!["rg-1.0".into(), "rg-2.0".into()],
                    using: Some("rg-2.0".into()),
                },
            ]
        );
    }

    const NODE: &str = "os_map:\n  linux:\n    name: linux\n    bin_path: bin/\narch_map:\n  amd64: x86_64\n";

    /// Install `stem` of `node` with one executable per name under `bin/`.
    fn fake_multi_install(engine: &Engine<RealRuntime>, stem: &str, names: &[&str]) {
        let bin = engine.env().version_dir("node", stem).join("bin");
        fs::create_dir_all(&bin).unwrap();
        for name in names {
            fs::write(bin.join(name), "#!/bin/sh\n").unwrap();
            engine.runtime().set_permissions(&bin.join(name), 0o755).unwrap();
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_switch_replaces_the_whole_link_set() {
        let (dir, engine) = setup();
        write_recipe(&dir.path().join("recipes"), "node", NODE);
        fake_multi_install(&engine, "node-1", &["a", "b"]);
        fake_multi_install(&engine, "node-2", &["a", "c"]);
        let bin_dir = engine.env().bin_dir.clone();

        engine.switch_active("node", "1").unwrap();
        assert!(fs::symlink_metadata(bin_dir.join("b")).is_ok());
        assert!(fs::symlink_metadata(bin_dir.join("c")).is_err());

        engine.switch_active("node", "2").unwrap();

        assert!(fs::symlink_metadata(bin_dir.join("b")).is_err());
        assert_eq!(
            fs::read_link(bin_dir.join("c")).unwrap(),
            engine.env().version_dir("node", "node-2").join("bin/c")
        );
        assert_eq!(
            fs::read_link(bin_dir.join("a")).unwrap(),
            engine.env().version_dir("node", "node-2").join("bin/a")
        );
    }

    #[test]
    fn test_resolve_run_binary_uses_active_version() {
        let (_dir, engine) = setup();
        fake_install(&engine, "rg-1.0");
        fake_install(&engine, "rg-2.0");

        let err = engine.resolve_run_binary(&"rg".parse().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Not currently using any rg version"));

        engine.switch_active("rg", "2.0").unwrap();
        assert_eq!(
            engine.resolve_run_binary(&"rg".parse().unwrap()).unwrap(),
            engine.env().version_dir("rg", "rg-2.0").join("rg")
        );
        assert_eq!(
            engine.resolve_run_binary(&"rg@1.0".parse().unwrap()).unwrap(),
            engine.env().version_dir("rg", "rg-1.0").join("rg")
        );

        let err = engine.resolve_run_binary(&"rg@3.0".parse().unwrap()).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(InstallError::NotInstalled { .. })
        ));
        // The bin path is a file, so no other binary can be picked.
        let err = engine.resolve_run_binary(&"rg:other".parse().unwrap()).unwrap_err();
        assert!(err.to_string().contains("is a file"));
    }

    #[test]
    fn test_resolve_run_binary_selects_from_directory() {
        let (dir, engine) = setup();
        write_recipe(&dir.path().join("recipes"), "node", NODE);
        fake_multi_install(&engine, "node-17", &["node", "npm"]);

        let bin = engine.env().version_dir("node", "node-17").join("bin");
        assert_eq!(
            engine.resolve_run_binary(&"node@17".parse().unwrap()).unwrap(),
            bin.join("node")
        );
        assert_eq!(
            engine.resolve_run_binary(&"node@17:npm".parse().unwrap()).unwrap(),
            bin.join("npm")
        );
        let err = engine.resolve_run_binary(&"node@17:npx".parse().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "No npx binary exists for node-17");
    }

    #[test]
    fn test_find_stem_accepts_both_forms() {
        let (_dir, engine) = setup();
        let installed = vec!["rg-13.0.0".to_string()];
        assert_eq!(engine.find_stem("rg", "13.0.0", &installed).unwrap(), "rg-13.0.0");
        assert_eq!(engine.find_stem("rg", "rg-13.0.0", &installed).unwrap(), "rg-13.0.0");
        assert!(engine.find_stem("rg", "14", &installed).is_err());
    }
}
