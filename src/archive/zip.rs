use anyhow::{Context, Result};
use log::debug;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use crate::runtime::Runtime;

/// Unpack a zip archive into `dest`. Entries with unsafe names are skipped.
pub(crate) fn unpack_zip<R: Runtime>(runtime: &R, archive_path: &Path, dest: &Path) -> Result<()> {
    // ZipArchive needs Seek; Runtime::open only hands out a reader.
    let mut buffer = Vec::new();
    runtime
        .open(archive_path)
        .with_context(|| format!("Failed to open archive at {:?}", archive_path))?
        .read_to_end(&mut buffer)
        .with_context(|| format!("Failed to read archive {:?}", archive_path))?;

    let mut archive =
        ZipArchive::new(std::io::Cursor::new(buffer)).context("Failed to parse ZIP archive")?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read ZIP entry {}", i))?;

        let Some(entry_path) = entry.enclosed_name() else {
            debug!("Skipping ZIP entry with unsafe path: {}", entry.name());
            continue;
        };
        let full_path = dest.join(entry_path);

        if entry.is_dir() {
            runtime.create_dir_all(&full_path)?;
            continue;
        }

        if let Some(parent) = full_path.parent() {
            runtime.create_dir_all(parent)?;
        }
        let mut out = runtime.create_file(&full_path)?;
        std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to extract file {:?}", full_path))?;
        drop(out);

        if let Some(mode) = entry.unix_mode()
            && let Err(e) = runtime.set_permissions(&full_path, mode)
        {
            debug!("Failed to set permissions on {:?}: {}", full_path, e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    #[test]
    fn test_unpack_zip_with_modes() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("tool.zip");
        let dest = dir.path().join("out");

        let mut zip = ZipWriter::new(std::fs::File::create(&archive_path).unwrap());
        let exec = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o755);
        zip.add_directory("tool-1.0/", SimpleFileOptions::default())
            .unwrap();
        zip.start_file("tool-1.0/tool", exec).unwrap();
        zip.write_all(b"binary").unwrap();
        zip.finish().unwrap();

        unpack_zip(&RealRuntime, &archive_path, &dest).unwrap();

        let tool = dest.join("tool-1.0/tool");
        assert_eq!(std::fs::read_to_string(&tool).unwrap(), "binary");
        #[cfg(unix)]
        assert!(RealRuntime.is_executable(&tool));
    }

    #[test]
    fn test_unpack_zip_rejects_garbage() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("bad.zip");
        std::fs::write(&archive_path, "not a zip").unwrap();

        let err = unpack_zip(&RealRuntime, &archive_path, dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse ZIP archive"));
    }
}
