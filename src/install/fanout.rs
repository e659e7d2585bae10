//! Concurrent installs, one task and one reporter line per argument.

use colored::Colorize;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::{Engine, InstallOptions, InstallOutcome};
use crate::error::classify;
use crate::package::PackageArg;
use crate::report::Reporter;
use crate::runtime::Runtime;

/// Per-argument result of [`Engine::install_many`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub arg: String,
    pub status: InstallStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStatus {
    Installed {
        stem: String,
        activated: bool,
        notes: Vec<String>,
    },
    AlreadyInstalled {
        stem: String,
    },
    /// The recipe does not support this platform.
    Skipped(String),
    Failed(String),
}

impl InstallStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, InstallStatus::Failed(_))
    }
}

impl From<InstallOutcome> for InstallStatus {
    fn from(outcome: InstallOutcome) -> Self {
        match outcome {
            InstallOutcome::Installed {
                stem,
                activated,
                notes,
            } => InstallStatus::Installed {
                stem,
                activated,
                notes,
            },
            InstallOutcome::AlreadyInstalled { stem } => InstallStatus::AlreadyInstalled { stem },
        }
    }
}

/// 0 when nothing failed, 2 when everything failed, 1 otherwise.
/// Platform skips are not failures.
pub fn exit_code(results: &[InstallResult]) -> i32 {
    let failed = results.iter().filter(|r| r.status.is_failure()).count();
    match failed {
        0 => 0,
        n if n == results.len() => 2,
        _ => 1,
    }
}

impl<R: Runtime + 'static> Engine<R> {
    /// Install every argument concurrently.
    ///
    /// Argument `i` reports on reporter line `i`. With `jobs`, at most that
    /// many installs run at once. Results come back in argument order; one
    /// failure never cancels the others.
    pub async fn install_many(
        self: &Arc<Self>,
        args: &[String],
        opts: InstallOptions,
        reporter: &Reporter,
        jobs: Option<usize>,
    ) -> Vec<InstallResult> {
        let limit = jobs.filter(|n| *n > 0).map(|n| Arc::new(Semaphore::new(n)));

        let mut tasks = Vec::with_capacity(args.len());
        for (index, raw) in args.iter().enumerate() {
            let engine = Arc::clone(self);
            let mut line = reporter.line(index);
            let limit = limit.clone();
            let raw = raw.clone();
            tasks.push(tokio::spawn(async move {
                let arg = match raw.parse::<PackageArg>() {
                    Ok(arg) => arg,
                    Err(e) => {
                        line.print(format!("{}: {}", raw, e).red());
                        return InstallStatus::Failed(e.to_string());
                    }
                };
                line.set_prefix(format!("{}: ", arg.to_string().cyan()));

                let _permit = match &limit {
                    Some(semaphore) => {
                        line.print("Waiting".bright_black());
                        semaphore.clone().acquire_owned().await.ok()
                    }
                    None => None,
                };

                match engine.install_one(&arg, opts, &line).await {
                    Ok(outcome) => outcome.into(),
                    Err(e) => {
                        let message = format!("{:#}", e);
                        if classify(&e).is_some_and(|c| c.is_platform_skip()) {
                            line.print(format!("Skipped: {}", message).yellow());
                            InstallStatus::Skipped(message)
                        } else {
                            line.print(message.red());
                            InstallStatus::Failed(message)
                        }
                    }
                }
            }));
        }

        let mut results = Vec::with_capacity(args.len());
        for (raw, task) in args.iter().zip(tasks) {
            let status = match task.await {
                Ok(status) => status,
                Err(e) => {
                    warn!("Install task for {} ended abnormally: {}", raw, e);
                    InstallStatus::Failed(format!("install task ended abnormally: {}", e))
                }
            };
            results.push(InstallResult {
                arg: raw.clone(),
                status,
            });
        }

        let tmp_dir = &self.env().tmp_dir;
        if self.runtime().exists(tmp_dir) {
            debug!("Removing {:?}", tmp_dir);
            if let Err(e) = self.runtime().remove_dir_all(tmp_dir) {
                warn!("Failed to remove temp directory {:?}: {}", tmp_dir, e);
            }
        }
        results
    }
}
