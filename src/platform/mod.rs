//! Platform detection.
//!
//! Recipes key their `os_map` by `linux`/`macos`/`win` and their `arch_map`
//! by Go-style architecture names (`amd64`, `arm64`, ...). The tables below
//! translate Rust's target names into that vocabulary.

use std::fmt;

/// Rust `target_os` -> recipe OS key.
const OS_TABLE: &[(&str, &str)] = &[("linux", "linux"), ("macos", "macos"), ("windows", "win")];

/// Rust `target_arch` -> recipe architecture key.
const ARCH_TABLE: &[(&str, &str)] = &[
    ("x86_64", "amd64"),
    ("aarch64", "arm64"),
    ("x86", "386"),
    ("arm", "arm"),
    ("riscv64", "riscv64"),
    ("powerpc64", "ppc64"),
    ("s390x", "s390x"),
];

/// Recipe-vocabulary OS key for a Rust `target_os` value.
pub fn translate_os(target_os: &str) -> Option<&'static str> {
    OS_TABLE
        .iter()
        .find(|(rust, _)| *rust == target_os)
        .map(|(_, recipe)| *recipe)
}

/// Recipe-vocabulary architecture key for a Rust `target_arch` value.
pub fn translate_arch(target_arch: &str) -> Option<&'static str> {
    ARCH_TABLE
        .iter()
        .find(|(rust, _)| *rust == target_arch)
        .map(|(_, recipe)| *recipe)
}

/// The OS/architecture pair assets are resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detect the current platform. Unknown targets keep their Rust name,
    /// which simply won't match any recipe map.
    pub fn detect() -> Self {
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        Self {
            os: translate_os(os).unwrap_or(os).to_string(),
            arch: translate_arch(arch).unwrap_or(arch).to_string(),
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == "win"
    }

    /// Suffix executables carry on this platform.
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_tables() {
        assert_eq!(translate_os("macos"), Some("macos"));
        assert_eq!(translate_os("windows"), Some("win"));
        assert_eq!(translate_os("haiku"), None);
        assert_eq!(translate_arch("x86_64"), Some("amd64"));
        assert_eq!(translate_arch("aarch64"), Some("arm64"));
        assert_eq!(translate_arch("mips"), None);
    }

    #[test]
    fn test_platform_detect() {
        let platform = Platform::detect();
        assert!(!platform.os.is_empty());
        assert!(!platform.arch.is_empty());

        #[cfg(target_os = "linux")]
        assert_eq!(platform.os, "linux");
        #[cfg(target_arch = "x86_64")]
        assert_eq!(platform.arch, "amd64");
    }

    #[test]
    fn test_exe_suffix() {
        assert_eq!(Platform::new("win", "amd64").exe_suffix(), ".exe");
        assert_eq!(Platform::new("linux", "amd64").exe_suffix(), "");
        assert_eq!(Platform::new("linux", "arm64").to_string(), "linux/arm64");
    }
}
