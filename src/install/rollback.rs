use log::{debug, warn};

use crate::package::PackageStore;
use crate::runtime::Runtime;

/// Removes a freshly created version directory unless committed.
///
/// Armed before the first write into `pkg/<package>/<stem>`; the package
/// directory goes too when this was its only version.
pub struct VersionRollback<'a, R: Runtime> {
    store: &'a PackageStore<'a, R>,
    package: String,
    stem: String,
    armed: bool,
}

impl<'a, R: Runtime> VersionRollback<'a, R> {
    pub fn new(store: &'a PackageStore<'a, R>, package: &str, stem: &str) -> Self {
        Self {
            store,
            package: package.to_string(),
            stem: stem.to_string(),
            armed: true,
        }
    }

    /// Keep the installed version.
    pub fn commit(mut self) {
        self.armed = false;
    }
}

impl<R: Runtime> Drop for VersionRollback<'_, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!("Rolling back {}/{}", self.package, self.stem);
        if let Err(e) = self.store.discard_version(&self.package, &self.stem) {
            warn!(
                "Failed to clean up {}/{} after failed install: {:#}",
                self.package, self.stem, e
            );
        }
    }
}
