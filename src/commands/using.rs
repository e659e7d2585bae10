use anyhow::Result;

use crate::runtime::Runtime;

use super::config::Config;

/// Print the active version of a package.
#[tracing::instrument(skip(runtime, config))]
pub fn using<R: Runtime>(runtime: R, config: &Config, package: &str) -> Result<()> {
    let engine = config.engine(runtime)?;
    match engine.currently_using(package)? {
        Some(stem) => println!("{}", stem),
        None => println!("No version of {} is active.", package),
    }
    Ok(())
}
