//! Latest version from an Arch Linux PKGBUILD.

use anyhow::Result;

use crate::error::InstallError;
use crate::http::HttpClient;

pub(crate) fn pkgbuild_url(base: &str, package: &str) -> String {
    format!("{}/{}/trunk/PKGBUILD", base.trim_end_matches('/'), package)
}

/// Value of the first `pkgver=` line.
pub(crate) fn parse_pkgver(pkgbuild: &str) -> Option<&str> {
    pkgbuild
        .lines()
        .find_map(|line| line.strip_prefix("pkgver="))
        .map(|v| v.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|v| !v.is_empty())
}

#[tracing::instrument(skip(http))]
pub(crate) async fn latest_pkgver(http: &HttpClient, base: &str, package: &str) -> Result<String> {
    let url = pkgbuild_url(base, package);
    let body = http.get_text(&url).await.map_err(|e| {
        InstallError::VersionResolution(format!("failed to fetch {}: {:#}", url, e))
    })?;
    parse_pkgver(&body).map(str::to_string).ok_or_else(|| {
        InstallError::VersionResolution(format!("PKGBUILD at {} has no pkgver field", url)).into()
    })
}
