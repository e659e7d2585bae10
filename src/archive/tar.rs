use anyhow::{Context, Result};
use log::debug;
use std::io::Read;
use std::path::Path;
use tar::{Archive, EntryType};

use crate::runtime::{Runtime, is_path_under};
use crate::runtime::path::resolve_link_target;

/// Unpack a (decompressed) tar stream into `dest`.
///
/// Entries escaping `dest` are skipped. Unix modes are preserved; symlinks
/// are recreated only when their target stays inside `dest`.
pub(crate) fn unpack_tar<R: Runtime, S: Read>(runtime: &R, stream: S, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(stream);

    for entry in archive.entries().context("Failed to read tar entries")? {
        let mut entry = entry.context("Failed to read tar entry")?;
        let entry_path = entry.path().context("Invalid tar entry path")?.into_owned();
        let full_path = dest.join(&entry_path);

        if entry_path.is_absolute() || !is_path_under(&full_path, dest) {
            debug!("Skipping tar entry outside destination: {:?}", entry_path);
            continue;
        }

        match entry.header().entry_type() {
            EntryType::Directory => runtime.create_dir_all(&full_path)?,
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = full_path.parent() {
                    runtime.create_dir_all(parent)?;
                }
                let mut out = runtime.create_file(&full_path)?;
                std::io::copy(&mut entry, &mut out)
                    .with_context(|| format!("Failed to extract file {:?}", full_path))?;
                drop(out);

                if let Ok(mode) = entry.header().mode()
                    && let Err(e) = runtime.set_permissions(&full_path, mode)
                {
                    debug!("Failed to set permissions on {:?}: {}", full_path, e);
                }
            }
            EntryType::Symlink => {
                let Some(target) = entry.link_name().context("Invalid symlink target")? else {
                    continue;
                };
                if !is_path_under(&resolve_link_target(&full_path, &target), dest) {
                    debug!("Skipping symlink escaping destination: {:?}", entry_path);
                    continue;
                }
                if let Some(parent) = full_path.parent() {
                    runtime.create_dir_all(parent)?;
                }
                runtime.symlink(&target, &full_path)?;
            }
            other => debug!("Skipping tar entry {:?} of type {:?}", entry_path, other),
        }
    }
    Ok(())
}
