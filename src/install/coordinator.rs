//! The per-package install state machine.
//!
//! `ResolvingConfig -> ResolvingVersion -> ResolvingAsset -> CheckingExisting
//! -> Downloading -> Extracting -> DecidingActivation -> Linking -> Done`.
//! Any error aborts; the version directory is rolled back if it was created.

use anyhow::{Context, Result};
use colored::Colorize;
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};

use super::rollback::VersionRollback;
use super::{Engine, InstallOptions, InstallOutcome, InstallState};
use crate::archive::{self, ExtractPlan};
use crate::download::{AssetRef, download_asset};
use crate::error::InstallError;
use crate::package::{PackageArg, create_stem, is_single_component};
use crate::provider::resolve_version;
use crate::recipe::load_recipe;
use crate::report::LineHandle;
use crate::runtime::{Runtime, is_path_under};

impl<R: Runtime> Engine<R> {
    /// Install one package argument, reporting progress on `line`.
    ///
    /// Errors carry the state they happened in as context; the
    /// [`InstallError`](crate::error::InstallError) category stays
    /// reachable through [`classify`](crate::error::classify).
    pub async fn install_one(
        &self,
        arg: &PackageArg,
        opts: InstallOptions,
        line: &LineHandle,
    ) -> Result<InstallOutcome> {
        let mut state = InstallState::ResolvingConfig;
        let result = self.run_install(arg, opts, line, &mut state).await;
        result.with_context(|| format!("failed while {}", state))
    }

    #[tracing::instrument(skip(self, line, state), fields(package = %arg))]
    async fn run_install(
        &self,
        arg: &PackageArg,
        opts: InstallOptions,
        line: &LineHandle,
        state: &mut InstallState,
    ) -> Result<InstallOutcome> {
        let platform = &self.env.platform;
        let package = arg.name.as_str();

        let spinner = line.spinner(format!("Finding package recipe for {}", package.cyan()));
        let config = load_recipe(&self.runtime, &self.env, package);
        spinner.stop();
        let config = config?;
        let os_info = config.os_info(platform)?.clone();

        *state = InstallState::ResolvingVersion;
        let needs_lookup = arg.version.is_none() || config.force_latest;
        let version = if needs_lookup {
            let spinner = line.spinner(format!("Finding latest {} version tag", package.cyan()));
            let version = resolve_version(&*self.versions, &config, arg.version.as_deref()).await;
            spinner.stop();
            let version = version?;
            line.print(format!(
                "Found {} version tag: {}",
                package.cyan(),
                version.magenta()
            ));
            version
        } else {
            resolve_version(&*self.versions, &config, arg.version.as_deref()).await?
        };

        if !is_single_component(&version) {
            return Err(InstallError::VersionResolution(format!(
                "{:?} is not usable as a version of {}",
                version, package
            ))
            .into());
        }

        *state = InstallState::ResolvingAsset;
        let asset = config.locate_asset(&version, platform)?;
        debug!("Resolved {}@{} to {}", package, version, asset.url);

        *state = InstallState::CheckingExisting;
        let stem = create_stem(package, &version);
        let store = self.store();
        if store.is_installed(package, &stem) {
            line.print("Already installed!".bright_black());
            return Ok(InstallOutcome::AlreadyInstalled { stem });
        }

        *state = InstallState::Downloading;
        let work_dir = self.env.tmp_dir.join(&stem);
        self.runtime.create_dir_all(&work_dir)?;
        let download_path = work_dir.join(asset.file_name());
        let last_percent = AtomicU64::new(u64::MAX);
        let file_name = asset.file_name();
        download_asset(
            &self.runtime,
            &self.http,
            AssetRef {
                package,
                version: &version,
                url: &asset.url,
            },
            &download_path,
            |done, total| {
                let message = match total {
                    Some(total) if total > 0 => {
                        let percent = done * 100 / total;
                        if last_percent.swap(percent, Ordering::Relaxed) == percent {
                            return;
                        }
                        format!("Downloading {} {:>3}%", file_name, percent)
                    }
                    _ => format!("Downloading {} ({} KiB)", file_name, done / 1024),
                };
                line.print(message);
            },
        )
        .await?;

        let version_dir = store.version_dir(package, &stem);
        let rollback = VersionRollback::new(&store, package, &stem);

        *state = InstallState::Extracting;
        let unpacked = if os_info.is_raw_binary {
            let bin_path = version_dir.join(format!("{}{}", config.title, platform.exe_suffix()));
            self.runtime
                .set_permissions(&download_path, 0o755)
                .and_then(|()| self.runtime.create_dir_all(&version_dir))
                .and_then(|()| self.runtime.rename(&download_path, &bin_path))
                .context("Failed to move downloaded binary into place")
        } else {
            let spinner = line.spinner(format!("Unpacking {}", file_name));
            let extracted = archive::extract(
                &self.runtime,
                &ExtractPlan {
                    archive: &download_path,
                    ext: &asset.ext,
                    version_dir: &version_dir,
                    scratch_dir: &work_dir.join("unpack"),
                    has_root: os_info.extract_has_root,
                },
            );
            spinner.stop();
            extracted
        };
        let _ = self.runtime.remove_dir_all(&work_dir);
        unpacked?;
        if !os_info.is_raw_binary {
            line.print(format!(
                "Completed unpacking {}@{}",
                package.cyan(),
                version.magenta()
            ));
        }

        *state = InstallState::DecidingActivation;
        let activate = {
            let _active = self.lock_activation();
            let previous = store.currently_using(package)?;
            let activate = previous.is_none() || opts.activate;

            if activate {
                *state = InstallState::Linking;
                self.activate(&config, &stem)?;
                line.print(format!("Now using {}@{}", package.cyan(), version.magenta()));
            }
            rollback.commit();

            *state = InstallState::Done;
            if activate
                && opts.remove_old
                && let Some(old) = previous.as_deref().filter(|old| *old != stem)
            {
                match self.remove_stem(package, old) {
                    Ok(()) => info!("Removed old version {}", old),
                    Err(e) => line.print(
                        format!("Failed to remove old version {}: {:#}", old, e).red(),
                    ),
                }
            }
            activate
        };

        let mut done = "Successfully installed!".green().to_string();
        if activate && let Some(other) = self.shadowing_binary(package) {
            done = format!(
                "{} {}",
                done,
                format!("Found another binary at {:?} that may interfere", other).yellow()
            );
        }
        line.print(done);

        Ok(InstallOutcome::Installed {
            stem,
            activated: activate,
            notes: config.install_notes(platform),
        })
    }

    /// First `name` on PATH, if it is not one of our links.
    fn shadowing_binary(&self, name: &str) -> Option<std::path::PathBuf> {
        let found = which::which(name).ok()?;
        (!is_path_under(&found, &self.env.bin_dir)).then_some(found)
    }
}
