//! Package recipes.
//!
//! A recipe is a YAML document at `<repo>/pkgs/<name>.toolman-pkg.yml`
//! describing where a package's assets live and how to expose them. Recipes
//! are parsed and validated once per install attempt and never mutated.

mod asset;
mod version;

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::InstallError;
use crate::platform::Platform;
use crate::runtime::Runtime;

pub use asset::AssetDescriptor;
pub use version::parse_version;

pub const RECIPE_EXT: &str = ".toolman-pkg.yml";

/// A rewrite applied to an executable's base name before linking.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenameItem {
    pub from: String,
    pub to: String,
}

/// An (os, arch) pair the recipe declares unsupported.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OsArchPair {
    pub os: String,
    pub arch: String,
}

/// Per-OS asset metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OsInfo {
    pub name: String,
    pub ext: String,
    #[serde(rename = "bin_path", deserialize_with = "single_or_multi")]
    pub bin_paths: Vec<String>,
    pub extract_has_root: bool,
    pub is_raw_binary: bool,
    pub filename_format_override: String,
    pub renames: Vec<RenameItem>,
    pub install_note: String,
    pub remove_note: String,
}

/// How the latest version of a package is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatestStrategy {
    GithubRelease,
    GiteaRelease,
    ArchLinuxCommunity,
}

impl std::str::FromStr for LatestStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github-release" => Ok(LatestStrategy::GithubRelease),
            "gitea-release" => Ok(LatestStrategy::GiteaRelease),
            "arch-linux-community" => Ok(LatestStrategy::ArchLinuxCommunity),
            other => Err(format!("unknown latest_strategy {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    #[serde(skip)]
    pub title: String,
    pub tagline: String,
    pub about: String,
    pub install_note: String,
    pub remove_note: String,

    pub info_url: String,
    pub base_download_url: String,
    pub git_user: String,
    pub git_repo: String,
    pub gitea_url: String,
    pub source_url: String,

    pub filename_format: String,
    pub version_format: String,
    pub latest_strategy: String,
    #[serde(skip)]
    pub strategy: Option<LatestStrategy>,
    pub force_latest: bool,
    pub allow_prerelease: bool,
    pub arch_linux_pkg_name: String,

    pub os_map: BTreeMap<String, OsInfo>,
    pub arch_map: BTreeMap<String, String>,
    pub ignore: Vec<OsArchPair>,
}

fn single_or_multi<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

impl PackageConfig {
    /// Parse and validate a recipe. `name` becomes the package title.
    #[tracing::instrument(skip(yaml))]
    pub fn parse(name: &str, yaml: &str) -> Result<Self> {
        let mut config: PackageConfig =
            serde_yaml::from_str(yaml).map_err(|e| InstallError::ConfigParse {
                package: name.to_string(),
                message: e.to_string(),
            })?;
        config.title = name.to_string();

        let expand = |s: &str| {
            s.replace("[GIT_USER]", &config.git_user)
                .replace("[GIT_REPO]", &config.git_repo)
        };
        config.base_download_url = expand(&config.base_download_url);
        config.info_url = expand(&config.info_url);
        config.source_url = expand(&config.source_url);
        config.gitea_url = config.gitea_url.trim_end_matches('/').to_string();

        config.validate()?;
        Ok(config)
    }

    /// Reject contradictions up front instead of discovering them during
    /// asset resolution.
    fn validate(&mut self) -> Result<()> {
        let invalid = |message: String| InstallError::InvalidRecipe {
            package: self.title.clone(),
            message,
        };

        if !self.latest_strategy.is_empty() {
            self.strategy = Some(self.latest_strategy.parse().map_err(invalid)?);
        }

        for pair in &self.ignore {
            if !self.os_map.contains_key(&pair.os) {
                return Err(invalid(format!(
                    "ignore entry {}/{} names an OS absent from os_map",
                    pair.os, pair.arch
                ))
                .into());
            }
            if !self.arch_map.contains_key(&pair.arch) {
                return Err(invalid(format!(
                    "ignore entry {}/{} names an arch absent from arch_map",
                    pair.os, pair.arch
                ))
                .into());
            }
        }
        Ok(())
    }

    /// OS metadata for `platform`, or the platform error that makes the
    /// package uninstallable there.
    pub fn os_info(&self, platform: &Platform) -> Result<&OsInfo> {
        if self
            .ignore
            .iter()
            .any(|pair| pair.os == platform.os && pair.arch == platform.arch)
        {
            return Err(InstallError::PlatformIgnored {
                package: self.title.clone(),
                os: platform.os.clone(),
                arch: platform.arch.clone(),
            }
            .into());
        }
        self.os_map.get(&platform.os).ok_or_else(|| {
            InstallError::UnsupportedPlatform {
                package: self.title.clone(),
                os: platform.os.clone(),
                arch: platform.arch.clone(),
            }
            .into()
        })
    }

    /// Configured bin paths relative to the version directory.
    /// Raw binaries always expose the single file named after the package.
    pub fn bin_paths(&self, platform: &Platform) -> Result<Vec<String>> {
        let info = self.os_info(platform)?;
        if info.is_raw_binary {
            return Ok(vec![self.title.clone()]);
        }
        if info.bin_paths.is_empty() {
            return Ok(vec![String::new()]);
        }
        Ok(info.bin_paths.clone())
    }

    pub fn renames(&self, platform: &Platform) -> Result<Vec<RenameItem>> {
        Ok(self.os_info(platform)?.renames.clone())
    }

    /// Combined package-level and OS-level install notes.
    pub fn install_notes(&self, platform: &Platform) -> Vec<String> {
        let os_note = self.os_map.get(&platform.os).map(|i| i.install_note.as_str());
        [Some(self.install_note.as_str()), os_note]
            .into_iter()
            .flatten()
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Combined package-level and OS-level removal notes.
    pub fn remove_notes(&self, platform: &Platform) -> Vec<String> {
        let os_note = self.os_map.get(&platform.os).map(|i| i.remove_note.as_str());
        [Some(self.remove_note.as_str()), os_note]
            .into_iter()
            .flatten()
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Path of the first recipe file for `name` across the environment's recipe dirs.
pub fn find_recipe<R: Runtime>(runtime: &R, env: &Environment, name: &str) -> Option<PathBuf> {
    env.recipe_dirs
        .iter()
        .map(|dir| dir.join("pkgs").join(format!("{}{}", name, RECIPE_EXT)))
        .find(|path| runtime.exists(path))
}

/// Locate, read and parse the recipe for `name`.
#[tracing::instrument(skip(runtime, env))]
pub fn load_recipe<R: Runtime>(runtime: &R, env: &Environment, name: &str) -> Result<PackageConfig> {
    let path = find_recipe(runtime, env, name)
        .ok_or_else(|| InstallError::RecipeNotFound(name.to_string()))?;
    debug!("Loading recipe for {} from {:?}", name, path);
    let content = runtime.read_to_string(&path)?;
    PackageConfig::parse(name, &content)
}
