//! The install engine.
//!
//! [`Engine`] bundles the injected runtime, environment and network
//! collaborators. Install runs one coordinator per package (see
//! `coordinator`), fanned out concurrently by `fanout`; `manage` holds the
//! remove/switch/query operations on already installed versions.

mod coordinator;
mod fanout;
mod manage;
mod rollback;

use anyhow::Result;
use log::{debug, warn};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::environment::Environment;
use crate::http::HttpClient;
use crate::link::{LinkKind, LinkManager, resolve_bin_paths};
use crate::package::PackageStore;
use crate::provider::LatestVersionSource;
use crate::recipe::PackageConfig;
use crate::runtime::Runtime;

pub use fanout::{InstallResult, InstallStatus, exit_code};
pub use manage::{PackageListing, RemoveOutcome};

/// Per-invocation install behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Link the new version even when another one is active.
    pub activate: bool,
    /// After activating, remove the previously active version.
    pub remove_old: bool,
}

/// Coordinator progress, used to say where an install failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    ResolvingConfig,
    ResolvingVersion,
    ResolvingAsset,
    CheckingExisting,
    Downloading,
    Extracting,
    DecidingActivation,
    Linking,
    Done,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallState::ResolvingConfig => "resolving recipe",
            InstallState::ResolvingVersion => "resolving version",
            InstallState::ResolvingAsset => "resolving asset",
            InstallState::CheckingExisting => "checking existing install",
            InstallState::Downloading => "downloading",
            InstallState::Extracting => "extracting",
            InstallState::DecidingActivation => "deciding activation",
            InstallState::Linking => "linking",
            InstallState::Done => "finishing",
        };
        f.write_str(name)
    }
}

/// What a successful coordinator run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed {
        stem: String,
        activated: bool,
        notes: Vec<String>,
    },
    AlreadyInstalled {
        stem: String,
    },
}

impl InstallOutcome {
    pub fn stem(&self) -> &str {
        match self {
            InstallOutcome::Installed { stem, .. } | InstallOutcome::AlreadyInstalled { stem } => {
                stem
            }
        }
    }
}

pub struct Engine<R: Runtime> {
    runtime: R,
    env: Environment,
    http: HttpClient,
    versions: Arc<dyn LatestVersionSource>,
    link_kind: LinkKind,
    /// Serializes changes to which version of a package is active.
    activation: Mutex<()>,
}

impl<R: Runtime> Engine<R> {
    /// Create the root directories and detect how links can be made.
    pub fn new(
        runtime: R,
        env: Environment,
        http: HttpClient,
        versions: Arc<dyn LatestVersionSource>,
    ) -> Result<Self> {
        env.ensure_dirs(&runtime)?;
        let link_kind = LinkKind::detect(&runtime, &env.bin_dir);
        debug!("Link kind for {:?}: {:?}", env.bin_dir, link_kind);
        Ok(Self {
            runtime,
            env,
            http,
            versions,
            link_kind,
            activation: Mutex::new(()),
        })
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub(crate) fn store(&self) -> PackageStore<'_, R> {
        PackageStore::new(&self.runtime, &self.env)
    }

    pub(crate) fn links(&self) -> LinkManager<'_, R> {
        LinkManager::new(&self.runtime, &self.env.bin_dir, self.link_kind)
    }

    /// Held while reading and rewriting `using.yaml` and the bin links, so
    /// concurrent installs of one package settle on a single active version.
    pub(crate) fn lock_activation(&self) -> MutexGuard<'_, ()> {
        self.activation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `stem` the active version of `config`'s package.
    ///
    /// The new link set is computed first, so a version without executables
    /// fails before anything is touched. The previous version's links are
    /// removed, the new ones created, and the pointer rewritten. If creation
    /// fails the previous version is re-linked.
    #[tracing::instrument(skip(self, config), fields(package = %config.title))]
    pub(crate) fn activate(&self, config: &PackageConfig, stem: &str) -> Result<()> {
        let package = config.title.as_str();
        let store = self.store();
        let links = self.links();

        let mappings = self.plan_links(config, stem)?;
        let previous = store.currently_using(package)?;

        if let Some(prev) = previous.as_deref().filter(|p| *p != stem) {
            links.remove_into(&store.version_dir(package, prev))?;
        }
        store.clear_using(package)?;

        if let Err(e) = links.create(&mappings) {
            if let Some(prev) = previous.as_deref().filter(|p| *p != stem) {
                self.restore(config, prev);
            }
            return Err(e);
        }
        store.write_using(package, stem)
    }

    fn plan_links(
        &self,
        config: &PackageConfig,
        stem: &str,
    ) -> Result<Vec<crate::link::LinkMapping>> {
        let platform = &self.env.platform;
        let version_dir = self.env.version_dir(&config.title, stem);
        let bins = resolve_bin_paths(
            &self.runtime,
            &version_dir,
            &config.bin_paths(platform)?,
            platform.exe_suffix(),
        );
        self.links().plan(&bins, &config.renames(platform)?)
    }

    /// Best-effort re-link of a previously active version.
    fn restore(&self, config: &PackageConfig, stem: &str) {
        let result = self
            .plan_links(config, stem)
            .and_then(|mappings| self.links().create(&mappings))
            .and_then(|()| self.store().write_using(&config.title, stem));
        if let Err(e) = result {
            warn!("Failed to restore links for {}: {:#}", stem, e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::platform::Platform;
    use crate::provider::MockLatestVersionSource;
    use crate::runtime::RealRuntime;
    use reqwest::Client;
    use std::path::Path;
    use std::time::Duration;

    /// Engine rooted at `root` for linux/amd64 with the given version source.
    pub(crate) fn engine_with(
        root: &Path,
        recipes: &Path,
        versions: MockLatestVersionSource,
    ) -> Engine<RealRuntime> {
        let env = Environment::new(root.to_path_buf())
            .with_recipe_dirs(vec![recipes.to_path_buf()])
            .with_platform(Platform::new("linux", "amd64"));
        let http = HttpClient::new(Client::new()).with_retry_delay(Duration::from_millis(1));
        Engine::new(RealRuntime, env, http, Arc::new(versions)).unwrap()
    }

    pub(crate) fn write_recipe(recipes: &Path, name: &str, yaml: &str) {
        let pkgs = recipes.join("pkgs");
        std::fs::create_dir_all(&pkgs).unwrap();
        std::fs::write(pkgs.join(format!("{}{}", name, crate::recipe::RECIPE_EXT)), yaml).unwrap();
    }

    #[test]
    fn test_state_display() {
        assert_eq!(InstallState::Downloading.to_string(), "downloading");
        assert_eq!(InstallState::Linking.to_string(), "linking");
    }

    #[test]
    fn test_outcome_stem() {
        let outcome = InstallOutcome::AlreadyInstalled {
            stem: "rg-1".into(),
        };
        assert_eq!(outcome.stem(), "rg-1");
    }
}
