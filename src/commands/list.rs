use anyhow::Result;
use colored::Colorize;
use log::debug;

use crate::install::PackageListing;
use crate::runtime::Runtime;

use super::config::Config;

/// List installed packages and their versions, marking the active one.
#[tracing::instrument(skip(runtime, config))]
pub fn list<R: Runtime>(runtime: R, config: &Config) -> Result<()> {
    let engine = config.engine(runtime)?;
    let packages = engine.list()?;
    debug!("Found {} package(s)", packages.len());

    if packages.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }
    for package in &packages {
        println!("{}", format_listing(package));
    }
    Ok(())
}

fn format_listing(package: &PackageListing) -> String {
    let versions: Vec<String> = package
        .versions
        .iter()
        .map(|stem| {
            if package.using.as_deref() == Some(stem.as_str()) {
                format!("{}*", stem).green().to_string()
            } else {
                stem.clone()
            }
        })
        .collect();
    format!("{} {}", package.name.cyan(), versions.join(" "))
}
