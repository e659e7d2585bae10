use anyhow::{Context, Result};
use log::debug;
use std::process::{Command, ExitStatus};

use crate::package::RunTarget;
use crate::runtime::Runtime;

use super::config::Config;

/// Run an installed binary with `args`, inheriting stdio and the
/// environment. Returns the child's exit code.
#[tracing::instrument(skip(runtime, config, args))]
pub fn run<R: Runtime>(runtime: R, config: &Config, target: &str, args: &[String]) -> Result<i32> {
    let target: RunTarget = target.parse()?;
    let engine = config.engine(runtime)?;
    let binary = engine.resolve_run_binary(&target)?;

    debug!("Running {:?} with {:?}", binary, args);
    let status = Command::new(&binary)
        .args(args)
        .status()
        .with_context(|| format!("Failed to run {:?}", binary))?;
    Ok(child_exit_code(status))
}

/// Exit code to pass on; a signal-terminated child maps to `128 + signal`.
fn child_exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(1)
}
