use anyhow::Result;

use super::PackageConfig;
use crate::error::InstallError;
use crate::platform::Platform;

/// The concrete downloadable artifact for one package, version and platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// File name without extension.
    pub stem: String,
    /// Extension without the leading dot, possibly empty.
    pub ext: String,
    pub url: String,
}

impl AssetDescriptor {
    /// Name the asset is saved under while downloading.
    pub fn file_name(&self) -> String {
        if self.ext.is_empty() {
            self.stem.clone()
        } else {
            format!("{}.{}", self.stem, self.ext)
        }
    }
}

impl PackageConfig {
    /// Expand the download templates for `version` on `platform`.
    pub fn locate_asset(&self, version: &str, platform: &Platform) -> Result<AssetDescriptor> {
        let info = self.os_info(platform)?;
        let arch = self.arch_map.get(&platform.arch).ok_or_else(|| {
            InstallError::UnsupportedPlatform {
                package: self.title.clone(),
                os: platform.os.clone(),
                arch: platform.arch.clone(),
            }
        })?;

        let substitute = |template: &str| {
            template
                .replace("[VER]", version)
                .replace("[OS]", &info.name)
                .replace("[ARCH]", arch)
        };

        let filename_format = if info.filename_format_override.is_empty() {
            &self.filename_format
        } else {
            &info.filename_format_override
        };
        let stem = substitute(&filename_format.replace(".[EXT]", "")).replace("[EXT]", &info.ext);

        let mut url = substitute(&self.base_download_url).replace("[EXT]", &info.ext);
        url.push_str(&stem);
        if !info.ext.is_empty() {
            url.push('.');
            url.push_str(&info.ext);
        }

        Ok(AssetDescriptor {
            stem,
            ext: info.ext.clone(),
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use crate::recipe::tests::RG_RECIPE;

    #[test]
    fn test_locate_rg_linux() {
        let config = PackageConfig::parse("rg", RG_RECIPE).unwrap();
        let asset = config
            .locate_asset("13.0.0", &Platform::new("linux", "amd64"))
            .unwrap();
        assert_eq!(asset.stem, "ripgrep-13.0.0-x86_64-unknown-linux-musl");
        assert_eq!(asset.ext, "tar.gz");
        assert_eq!(
            asset.url,
            "https://github.com/BurntSushi/ripgrep/releases/download/13.0.0/ripgrep-13.0.0-x86_64-unknown-linux-musl.tar.gz"
        );
        assert_eq!(
            asset.file_name(),
            "ripgrep-13.0.0-x86_64-unknown-linux-musl.tar.gz"
        );
    }

    #[test]
    fn test_os_override_and_ext_placeholder() {
        let yaml = r#"
base_download_url: "https://dl.example.com/[VER]/[OS]/"
filename_format: "tool-[VER]-[OS]-[ARCH].[EXT]"
os_map:
  linux:
    name: linux
    ext: tar.xz
  macos:
    name: darwin
    ext: zip
    filename_format_override: "tool_[ARCH]_[OS]"
arch_map:
  arm64: aarch64
"#;
        let config = PackageConfig::parse("tool", yaml).unwrap();

        let linux = config
            .locate_asset("2.0", &Platform::new("linux", "arm64"))
            .unwrap();
        assert_eq!(linux.stem, "tool-2.0-linux-aarch64");
        assert_eq!(
            linux.url,
            "https://dl.example.com/2.0/linux/tool-2.0-linux-aarch64.tar.xz"
        );

        let mac = config
            .locate_asset("2.0", &Platform::new("macos", "arm64"))
            .unwrap();
        assert_eq!(mac.stem, "tool_aarch64_darwin");
        assert_eq!(mac.url, "https://dl.example.com/2.0/darwin/tool_aarch64_darwin.zip");
    }

    #[test]
    fn test_raw_binary_has_no_extension() {
        let yaml = r#"
base_download_url: "https://dl.example.com/"
filename_format: "jq-[OS]-[ARCH]"
os_map:
  linux: { name: linux, is_raw_binary: true }
arch_map:
  amd64: amd64
"#;
        let config = PackageConfig::parse("jq", yaml).unwrap();
        let asset = config
            .locate_asset("1.7", &Platform::new("linux", "amd64"))
            .unwrap();
        assert_eq!(asset.url, "https://dl.example.com/jq-linux-amd64");
        assert_eq!(asset.file_name(), "jq-linux-amd64");
    }

    #[test]
    fn test_missing_arch_is_unsupported() {
        let config = PackageConfig::parse("rg", RG_RECIPE).unwrap();
        let err = config
            .locate_asset("13.0.0", &Platform::new("linux", "riscv64"))
            .unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(InstallError::UnsupportedPlatform { .. })
        ));
    }
}
