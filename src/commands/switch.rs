use anyhow::Result;
use colored::Colorize;

use crate::runtime::Runtime;

use super::config::Config;

/// Make an installed version the active one.
#[tracing::instrument(skip(runtime, config))]
pub fn switch<R: Runtime>(runtime: R, config: &Config, package: &str, version: &str) -> Result<()> {
    let engine = config.engine(runtime)?;
    let stem = engine.switch_active(package, version)?;
    println!("Now using {}", stem.cyan());
    Ok(())
}
