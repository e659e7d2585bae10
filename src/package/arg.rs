use std::fmt;
use std::str::FromStr;

use crate::error::InstallError;

/// A command-line package argument: `pkg` or `pkg@version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageArg {
    pub name: String,
    pub version: Option<String>,
}

impl FromStr for PackageArg {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InstallError::InvalidPackageArg(s.to_string());
        let mut parts = s.split('@');
        let name = parts
            .next()
            .filter(|n| is_single_component(n))
            .ok_or_else(invalid)?;
        let version = match parts.next() {
            None => None,
            Some(v) if is_single_component(v) => Some(v.to_string()),
            Some(_) => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for PackageArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The `run` argument: `pkg[@version][:bin]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTarget {
    pub package: PackageArg,
    pub bin: Option<String>,
}

impl FromStr for RunTarget {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (package, bin) = match s.split_once(':') {
            Some((package, bin)) if is_single_component(bin) && !bin.contains(':') => {
                (package, Some(bin.to_string()))
            }
            Some(_) => return Err(InstallError::InvalidPackageArg(s.to_string())),
            None => (s, None),
        };
        Ok(Self {
            package: package.parse()?,
            bin,
        })
    }
}

/// True when `s` can name exactly one directory entry: not empty, not `.`
/// or `..`, and free of path separators.
pub fn is_single_component(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\'])
}

/// Directory name for one installed version.
pub fn create_stem(package: &str, version: &str) -> String {
    format!("{}-{}", package, version)
}
