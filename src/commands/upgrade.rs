use anyhow::Result;
use log::debug;

use crate::install::InstallOptions;
use crate::runtime::Runtime;

use super::config::Config;
use super::run_installs;

/// Install the latest version of each package, activate it and remove the
/// version it replaces. Without packages, every installed package with an
/// active version is upgraded.
#[tracing::instrument(skip(runtime, config))]
pub async fn upgrade<R: Runtime + 'static>(
    runtime: R,
    config: &Config,
    packages: &[String],
) -> Result<i32> {
    let engine = config.engine(runtime)?;

    let packages = if packages.is_empty() {
        engine
            .list()?
            .into_iter()
            .filter(|p| p.using.is_some())
            .map(|p| p.name)
            .collect()
    } else {
        packages.to_vec()
    };
    if packages.is_empty() {
        println!("No packages installed.");
        return Ok(0);
    }

    debug!("Upgrading {:?}", packages);
    let opts = InstallOptions {
        activate: true,
        remove_old: true,
    };
    Ok(run_installs(engine, config, &packages, opts).await)
}
