//! Subcommand entry points. Each builds what it needs from [`Config`],
//! runs the engine and prints results to stdout.

use colored::Colorize;
use std::sync::Arc;

use crate::install::{Engine, InstallOptions, InstallResult, InstallStatus, exit_code};
use crate::report::Reporter;
use crate::runtime::Runtime;

pub mod config;
mod add;
mod list;
mod remove;
mod run;
mod switch;
mod upgrade;
mod using;

pub use add::add;
pub use list::list;
pub use remove::remove;
pub use run::run;
pub use switch::switch;
pub use upgrade::upgrade;
pub use using::using;

use config::Config;

/// Install `packages` concurrently with one reporter line each, print the
/// summary, and return the process exit code.
pub(crate) async fn run_installs<R: Runtime + 'static>(
    engine: Engine<R>,
    config: &Config,
    packages: &[String],
    opts: InstallOptions,
) -> i32 {
    let engine = Arc::new(engine);
    let reporter = Reporter::stdout(packages.len(), config.ansi);
    let results = engine
        .install_many(packages, opts, &reporter, config.jobs)
        .await;
    reporter.finish();

    for line in summary_lines(&results) {
        println!("{}", line);
    }
    exit_code(&results)
}

/// Notes of freshly installed packages, then one tally line.
fn summary_lines(results: &[InstallResult]) -> Vec<String> {
    let mut lines = Vec::new();
    let (mut installed, mut skipped, mut failed) = (0, 0, 0);

    for result in results {
        match &result.status {
            InstallStatus::Installed { notes, .. } => {
                installed += 1;
                for note in notes {
                    lines.push(format!("{}: {}", result.arg.cyan(), note));
                }
            }
            InstallStatus::AlreadyInstalled { .. } => installed += 1,
            InstallStatus::Skipped(_) => skipped += 1,
            InstallStatus::Failed(_) => failed += 1,
        }
    }

    let mut tally = vec![format!("{} installed", installed).green().to_string()];
    if skipped > 0 {
        tally.push(format!("{} skipped", skipped).yellow().to_string());
    }
    if failed > 0 {
        tally.push(format!("{} failed", failed).red().to_string());
    }
    lines.push(tally.join(", "));
    lines
}
