//! Release listings from GitHub and Gitea. Both speak the same JSON shape.

use anyhow::Result;
use log::debug;
use serde::Deserialize;

use crate::error::InstallError;
use crate::http::HttpClient;

#[derive(Debug, Deserialize)]
struct ReleaseTag {
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    draft: bool,
}

pub(crate) fn github_releases_url(api: &str, user: &str, repo: &str) -> String {
    format!("{}/repos/{}/{}/releases", api.trim_end_matches('/'), user, repo)
}

pub(crate) fn gitea_releases_url(gitea: &str, user: &str, repo: &str) -> String {
    format!(
        "{}/api/v1/repos/{}/{}/releases",
        gitea.trim_end_matches('/'),
        user,
        repo
    )
}

/// Tag of the first release, in API order, that is not a draft and, unless
/// `allow_prerelease`, not a prerelease.
#[tracing::instrument(skip(http))]
pub(crate) async fn latest_release_tag(
    http: &HttpClient,
    url: &str,
    repo_label: &str,
    allow_prerelease: bool,
) -> Result<String> {
    let releases: Vec<ReleaseTag> = http.get_json(url).await.map_err(|e| {
        InstallError::VersionResolution(format!("failed to list releases at {}: {:#}", url, e))
    })?;
    debug!("Fetched {} releases for {}", releases.len(), repo_label);

    releases
        .into_iter()
        .find(|r| !r.draft && (allow_prerelease || !r.prerelease))
        .map(|r| r.tag_name)
        .ok_or_else(|| InstallError::NoQualifyingRelease(repo_label.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use reqwest::Client;
    use std::time::Duration;

    const RELEASES: &str = r#"[
        {"tag_name": "v3.0.0-rc1", "prerelease": true, "draft": false},
        {"tag_name": "v2.9.9", "prerelease": false, "draft": true},
        {"tag_name": "v2.1.0", "prerelease": false, "draft": false},
        {"tag_name": "v2.0.0", "prerelease": false, "draft": false}
    ]"#;

    fn http() -> HttpClient {
        HttpClient::new(Client::new()).with_retry_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_release_urls() {
        assert_eq!(
            github_releases_url("https://api.github.com/", "BurntSushi", "ripgrep"),
            "https://api.github.com/repos/BurntSushi/ripgrep/releases"
        );
        assert_eq!(
            gitea_releases_url("https://codeberg.org", "u", "r"),
            "https://codeberg.org/api/v1/repos/u/r/releases"
        );
    }

    #[tokio::test]
    async fn test_skips_drafts_and_prereleases() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/o/r/releases")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(RELEASES)
            .expect(2)
            .create_async()
            .await;

        let url = github_releases_url(&server.url(), "o", "r");
        assert_eq!(
            latest_release_tag(&http(), &url, "o/r", false).await.unwrap(),
            "v2.1.0"
        );
        assert_eq!(
            latest_release_tag(&http(), &url, "o/r", true).await.unwrap(),
            "v3.0.0-rc1"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_qualifying_release() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/o/r/releases")
            .with_status(200)
            .with_body(r#"[{"tag_name": "v1-beta", "prerelease": true}]"#)
            .create_async()
            .await;

        let url = github_releases_url(&server.url(), "o", "r");
        let err = latest_release_tag(&http(), &url, "o/r", false)
            .await
            .unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(InstallError::NoQualifyingRelease(_))
        ));

        let _empty = server
            .mock("GET", "/repos/o/empty/releases")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let url = github_releases_url(&server.url(), "o", "empty");
        assert!(latest_release_tag(&http(), &url, "o/empty", true).await.is_err());
    }

    #[tokio::test]
    async fn test_http_failure_is_version_resolution_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/o/r/releases")
            .with_status(404)
            .create_async()
            .await;

        let url = github_releases_url(&server.url(), "o", "r");
        let err = latest_release_tag(&http(), &url, "o/r", false)
            .await
            .unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(InstallError::VersionResolution(_))
        ));
    }
}
