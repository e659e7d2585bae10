//! The active-version pointer, `pkg/<package>/using.yaml`.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use super::PackageStore;
use crate::runtime::Runtime;

#[derive(Debug, Serialize, Deserialize)]
struct UsingFile {
    using: String,
}

impl<R: Runtime> PackageStore<'_, R> {
    /// Stem of the active version, if any.
    pub fn currently_using(&self, package: &str) -> Result<Option<String>> {
        let path = self.env.using_path(package);
        if !self.runtime.exists(&path) {
            return Ok(None);
        }
        let content = self.runtime.read_to_string(&path)?;
        let file: UsingFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse using pointer {:?}", path))?;
        Ok(Some(file.using).filter(|stem| !stem.is_empty()))
    }

    /// Record `stem` as active. Written to a sibling file and renamed into place.
    #[tracing::instrument(skip(self))]
    pub fn write_using(&self, package: &str, stem: &str) -> Result<()> {
        let path = self.env.using_path(package);
        let tmp_path = path.with_extension("yaml.tmp");
        let content = serde_yaml::to_string(&UsingFile {
            using: stem.to_string(),
        })?;

        self.runtime.create_dir_all(&self.env.package_dir(package))?;
        self.runtime
            .write(&tmp_path, content.as_bytes())
            .with_context(|| format!("Failed to write using pointer {:?}", tmp_path))?;
        self.runtime.rename(&tmp_path, &path)?;
        debug!("{} now using {}", package, stem);
        Ok(())
    }

    /// Forget the active version. Missing pointer is fine.
    pub fn clear_using(&self, package: &str) -> Result<()> {
        let path = self.env.using_path(package);
        if self.runtime.exists(&path) {
            self.runtime.remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::runtime::{MockRuntime, RealRuntime};
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_using_round_trip() {
        let dir = tempdir().unwrap();
        let env = Environment::new(dir.path().to_path_buf());
        let store = PackageStore::new(&RealRuntime, &env);

        assert_eq!(store.currently_using("rg").unwrap(), None);

        store.write_using("rg", "rg-13.0.0").unwrap();
        assert_eq!(
            store.currently_using("rg").unwrap().as_deref(),
            Some("rg-13.0.0")
        );
        let raw = std::fs::read_to_string(env.using_path("rg")).unwrap();
        assert_eq!(raw.trim(), "using: rg-13.0.0");
        assert!(!env.package_dir("rg").join("using.yaml.tmp").exists());

        store.clear_using("rg").unwrap();
        assert_eq!(store.currently_using("rg").unwrap(), None);
        store.clear_using("rg").unwrap();
    }

    #[test]
    fn test_corrupt_pointer_is_an_error() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("- not\n- a map\n".to_string()));

        let env = Environment::new(PathBuf::from("/root"));
        let store = PackageStore::new(&runtime, &env);
        assert!(store.currently_using("rg").is_err());
    }
}
