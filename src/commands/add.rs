use anyhow::Result;
use log::debug;

use crate::install::InstallOptions;
use crate::runtime::Runtime;

use super::config::Config;
use super::run_installs;

/// Install packages. A package becomes active if it is the first version
/// installed or `switch` is set.
#[tracing::instrument(skip(runtime, config))]
pub async fn add<R: Runtime + 'static>(
    runtime: R,
    config: &Config,
    packages: &[String],
    switch: bool,
) -> Result<i32> {
    let engine = config.engine(runtime)?;
    debug!("Adding {} package(s)", packages.len());
    let opts = InstallOptions {
        activate: switch,
        remove_old: false,
    };
    Ok(run_installs(engine, config, packages, opts).await)
}
