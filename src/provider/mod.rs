//! Latest-version lookup.
//!
//! A recipe's `latest_strategy` picks where the newest release tag comes
//! from; the recipe's `version_format` then turns that tag into a version.

mod archlinux;
mod github;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use crate::environment::Endpoints;
use crate::error::InstallError;
use crate::http::HttpClient;
use crate::recipe::{LatestStrategy, PackageConfig, parse_version};

/// Source of a package's newest release tag.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LatestVersionSource: Send + Sync {
    /// Raw tag of the newest qualifying release.
    async fn latest_tag(&self, config: &PackageConfig) -> Result<String>;
}

/// The network-backed source: GitHub, Gitea or Arch Linux.
pub struct HttpVersionSource {
    http: HttpClient,
    endpoints: Endpoints,
}

impl HttpVersionSource {
    pub fn new(http: HttpClient, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }
}

fn require_git_coords(config: &PackageConfig) -> Result<()> {
    if config.git_user.is_empty() || config.git_repo.is_empty() {
        return Err(InstallError::VersionResolution(format!(
            "{} needs git_user and git_repo for its latest_strategy",
            config.title
        ))
        .into());
    }
    Ok(())
}

#[async_trait]
impl LatestVersionSource for HttpVersionSource {
    #[tracing::instrument(skip(self, config), fields(package = %config.title))]
    async fn latest_tag(&self, config: &PackageConfig) -> Result<String> {
        let label = format!("{}/{}", config.git_user, config.git_repo);
        match config.strategy {
            Some(LatestStrategy::GithubRelease) => {
                require_git_coords(config)?;
                let url = github::github_releases_url(
                    &self.endpoints.github_api,
                    &config.git_user,
                    &config.git_repo,
                );
                github::latest_release_tag(&self.http, &url, &label, config.allow_prerelease).await
            }
            Some(LatestStrategy::GiteaRelease) => {
                require_git_coords(config)?;
                if config.gitea_url.is_empty() {
                    return Err(InstallError::VersionResolution(format!(
                        "{} uses gitea-release without a gitea_url",
                        config.title
                    ))
                    .into());
                }
                let url = github::gitea_releases_url(
                    &config.gitea_url,
                    &config.git_user,
                    &config.git_repo,
                );
                github::latest_release_tag(&self.http, &url, &label, config.allow_prerelease).await
            }
            Some(LatestStrategy::ArchLinuxCommunity) => {
                let package = if config.arch_linux_pkg_name.is_empty() {
                    &config.title
                } else {
                    &config.arch_linux_pkg_name
                };
                archlinux::latest_pkgver(&self.http, &self.endpoints.arch_pkgbuild_base, package)
                    .await
            }
            None => Err(InstallError::VersionResolution(format!(
                "{} has no latest_strategy; install a specific version with {}@<version>",
                config.title, config.title
            ))
            .into()),
        }
    }
}

/// Version to install for `config`, given the user's optional pin.
///
/// A pin is used as-is unless the recipe sets `force_latest`, in which case
/// it must equal the latest version.
#[tracing::instrument(skip(source, config), fields(package = %config.title))]
pub async fn resolve_version<S>(
    source: &S,
    config: &PackageConfig,
    pinned: Option<&str>,
) -> Result<String>
where
    S: LatestVersionSource + ?Sized,
{
    if let Some(version) = pinned
        && !config.force_latest
    {
        return Ok(version.to_string());
    }

    let tag = source.latest_tag(config).await?;
    let latest = parse_version(&config.title, &tag, &config.version_format)?;
    debug!("Latest {} is {} (tag {})", config.title, latest, tag);

    match pinned {
        Some(version) if version != latest => Err(InstallError::PinnedVersionNotLatest {
            package: config.title.clone(),
            latest,
        }
        .into()),
        _ => Ok(latest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use reqwest::Client;

    fn config(yaml: &str) -> PackageConfig {
        PackageConfig::parse("tool", yaml).unwrap()
    }

    #[tokio::test]
    async fn test_pinned_version_skips_lookup() {
        // Strict mock: any lookup would panic.
        let source = MockLatestVersionSource::new();
        let version = resolve_version(&source, &config("{}"), Some("1.0.0"))
            .await
            .unwrap();
        assert_eq!(version, "1.0.0");
    }

    #[tokio::test]
    async fn test_latest_goes_through_version_format() {
        let mut source = MockLatestVersionSource::new();
        source
            .expect_latest_tag()
            .times(1)
            .returning(|_| Ok("v1.2.3".to_string()));

        let version = resolve_version(&source, &config("version_format: v[VER]\n"), None)
            .await
            .unwrap();
        assert_eq!(version, "1.2.3");
    }

    #[tokio::test]
    async fn test_bad_version_format_is_blamed_on_the_recipe() {
        let mut source = MockLatestVersionSource::new();
        source
            .expect_latest_tag()
            .returning(|_| Ok("v1.2.3".to_string()));

        let err = resolve_version(&source, &config("version_format: \"v([VER]\"\n"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(InstallError::InvalidRecipe { package, .. }) if package == "tool"
        ));
    }

    #[tokio::test]
    async fn test_force_latest_rejects_stale_pin() {
        let mut source = MockLatestVersionSource::new();
        source
            .expect_latest_tag()
            .returning(|_| Ok("2.0.0".to_string()));
        let cfg = config("force_latest: true\n");

        let err = resolve_version(&source, &cfg, Some("1.0.0"))
            .await
            .unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(InstallError::PinnedVersionNotLatest { latest, .. }) if latest == "2.0.0"
        ));

        assert_eq!(
            resolve_version(&source, &cfg, Some("2.0.0")).await.unwrap(),
            "2.0.0"
        );
    }

    #[tokio::test]
    async fn test_http_source_dispatch() {
        let mut server = mockito::Server::new_async().await;
        let _github = server
            .mock("GET", "/repos/BurntSushi/ripgrep/releases")
            .with_status(200)
            .with_body(r#"[{"tag_name": "14.1.0"}]"#)
            .create_async()
            .await;
        let _gitea = server
            .mock("GET", "/api/v1/repos/u/r/releases")
            .with_status(200)
            .with_body(r#"[{"tag_name": "v0.5.0"}]"#)
            .create_async()
            .await;
        let _arch = server
            .mock("GET", "/helix/trunk/PKGBUILD")
            .with_status(200)
            .with_body("pkgver=23.10\n")
            .create_async()
            .await;

        let source = HttpVersionSource::new(
            HttpClient::new(Client::new()),
            Endpoints {
                github_api: server.url(),
                arch_pkgbuild_base: server.url(),
            },
        );

        let gh = config("git_user: BurntSushi\ngit_repo: ripgrep\nlatest_strategy: github-release\n");
        assert_eq!(source.latest_tag(&gh).await.unwrap(), "14.1.0");

        let gitea = config(&format!(
            "git_user: u\ngit_repo: r\ngitea_url: {}/\nlatest_strategy: gitea-release\n",
            server.url()
        ));
        assert_eq!(source.latest_tag(&gitea).await.unwrap(), "v0.5.0");

        let arch = config("arch_linux_pkg_name: helix\nlatest_strategy: arch-linux-community\n");
        assert_eq!(source.latest_tag(&arch).await.unwrap(), "23.10");
    }

    #[tokio::test]
    async fn test_missing_strategy_is_resolution_error() {
        let source = HttpVersionSource::new(HttpClient::new(Client::new()), Endpoints::default());
        let err = source.latest_tag(&config("{}")).await.unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(InstallError::VersionResolution(_))
        ));
    }
}
