use anyhow::Result;
use colored::Colorize;
use log::debug;

use crate::runtime::Runtime;

use super::config::Config;

/// Remove one installed version of a package.
#[tracing::instrument(skip(runtime, config))]
pub fn remove<R: Runtime>(
    runtime: R,
    config: &Config,
    package: &str,
    version: Option<&str>,
) -> Result<()> {
    let engine = config.engine(runtime)?;
    let outcome = engine.remove(package, version)?;
    debug!("Removed {} link(s)", outcome.links_removed);

    println!("Removed {}", outcome.stem.cyan());
    if outcome.was_active {
        println!(
            "{}",
            format!("No version of {} is active now", package).yellow()
        );
    }
    for note in &outcome.notes {
        println!("{}", note);
    }
    Ok(())
}
