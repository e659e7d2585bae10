use anyhow::Result;
use regex::Regex;

use crate::error::InstallError;

const VER_PLACEHOLDER: &str = "[VER]";

/// Extract a version from a release tag of `package` using its recipe's
/// `version_format`.
///
/// The first `[VER]` in the format becomes a capture group; the rest of the
/// format is used as a regular expression. An empty format returns the tag
/// unchanged.
pub fn parse_version(package: &str, tag: &str, format: &str) -> Result<String> {
    if format.is_empty() {
        return Ok(tag.to_string());
    }

    let mismatch = || InstallError::VersionFormatMismatch {
        tag: tag.to_string(),
        format: format.to_string(),
    };

    let pattern = format.replacen(VER_PLACEHOLDER, "(.+)", 1);
    let re = Regex::new(&pattern).map_err(|e| InstallError::InvalidRecipe {
        package: package.to_string(),
        message: format!("version_format {:?} is not a valid pattern: {}", format, e),
    })?;

    let version = re
        .captures(tag)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|v| !v.is_empty())
        .ok_or_else(mismatch)?;
    Ok(version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    #[test]
    fn test_empty_format_is_identity() {
        assert_eq!(parse_version("tool", "13.0.0", "").unwrap(), "13.0.0");
    }

    #[test]
    fn test_prefix_format() {
        assert_eq!(parse_version("tool", "v1.2.3", "v[VER]").unwrap(), "1.2.3");
        assert_eq!(parse_version("tool", "jq-1.7", "jq-[VER]").unwrap(), "1.7");
    }

    #[test]
    fn test_mismatch() {
        let err = parse_version("tool", "release-2", "v[VER]").unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(InstallError::VersionFormatMismatch { .. })
        ));
    }

    #[test]
    fn test_format_without_placeholder_mismatches() {
        assert!(parse_version("tool", "v1.0", "v").is_err());
    }

    #[test]
    fn test_version_format_round_trip() {
        // A version rendered through the format parses back to itself.
        let format = "cli-v[VER]";
        for version in ["0.1.0", "2.10.3-beta.1", "2024.01.05"] {
            let tag = format.replace("[VER]", version);
            assert_eq!(parse_version("cli", &tag, format).unwrap(), version);
        }
    }

    #[test]
    fn test_invalid_format_names_the_package() {
        let err = parse_version("jq", "jq-1.7", "jq-([VER]").unwrap_err();
        match classify(&err) {
            Some(InstallError::InvalidRecipe { package, message }) => {
                assert_eq!(package, "jq");
                assert!(message.contains("jq-([VER]"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
