use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use log::{info, warn};

use crate::document::CanvasDocument;
use crate::error::PersistenceResult;
use crate::util::time;

/// Write `document` as JSON to `path`, replacing any existing file.
///
/// The previous file stays untouched unless the new one was written completely.
pub fn save_document(document: &CanvasDocument, path: &Path) -> PersistenceResult<()> {
    let json = document.to_json()?;
    replace_entry(path, |writer| {
        writer.write_all(json.as_bytes())?;
        Ok(())
    })?;
    info!("Saved drawing with {} strokes to {}", document.strokes().len(), path.display());
    Ok(())
}

/// Read a document previously written by [`save_document`]
pub fn load_document(path: &Path) -> PersistenceResult<CanvasDocument> {
    let json = fs::read_to_string(path)?;
    let document = CanvasDocument::from_json(&json)?;
    info!("Loaded drawing with {} strokes from {}", document.strokes().len(), path.display());
    Ok(document)
}

/// Encode `image` as PNG into a new timestamp-named file inside `dir`.
///
/// `dir` must exist. If anything fails after the file was created, the partial
/// file is removed before the error is returned.
pub fn save_png(image: &DynamicImage, dir: &Path) -> PersistenceResult<PathBuf> {
    let path = dir.join(format!("{}.png", time::timestamp_nanos()));
    write_new_entry(&path, |writer| {
        image.write_to(writer, ImageFormat::Png)?;
        Ok(())
    })?;
    info!("Saved {}x{} image to {}", image.width(), image.height(), path.display());
    Ok(path)
}

/// Create `path` (it must not exist yet) and fill it with `write`.
/// On failure the new file is deleted so no orphan is left behind.
fn write_new_entry<F>(path: &Path, write: F) -> PersistenceResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> PersistenceResult<()>,
{
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut writer = BufWriter::new(file);

    let result = write(&mut writer).and_then(|()| writer.flush().map_err(Into::into));
    if let Err(err) = result {
        drop(writer);
        if let Err(cleanup) = fs::remove_file(path) {
            warn!("Failed to remove partial file {}: {}", path.display(), cleanup);
        }
        return Err(err);
    }
    Ok(())
}

/// Fill a sibling temporary file with `write`, then move it over `path`.
/// On failure the temporary file is removed and `path` keeps its old content.
fn replace_entry<F>(path: &Path, write: F) -> PersistenceResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> PersistenceResult<()>,
{
    let file_name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    let staging = path.with_file_name(format!(".{}.{}.tmp", file_name, time::timestamp_nanos()));

    write_new_entry(&staging, write)?;
    if let Err(err) = fs::rename(&staging, path) {
        if let Err(cleanup) = fs::remove_file(&staging) {
            warn!("Failed to remove staging file {}: {}", staging.display(), cleanup);
        }
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("canvas_paint_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_failed_write_removes_entry() {
        let dir = scratch_dir();
        let path = dir.join("partial.bin");

        let result = write_new_entry(&path, |writer| {
            writer.write_all(b"half of it")?;
            writer.flush()?;
            Err(PersistenceError::Io(std::io::Error::other("disk full")))
        });

        assert!(result.is_err());
        assert!(!path.exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_existing_entry_is_not_overwritten() {
        let dir = scratch_dir();
        let path = dir.join("taken.bin");
        fs::write(&path, b"keep me").unwrap();

        let result = write_new_entry(&path, |writer| {
            writer.write_all(b"new")?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
        fs::remove_dir_all(dir).unwrap();
    }

    fn entries(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir).unwrap().map(|entry| entry.unwrap().path()).collect()
    }

    #[test]
    fn test_failed_replace_keeps_previous_file() {
        let dir = scratch_dir();
        let path = dir.join("drawing.json");
        fs::write(&path, b"previous save").unwrap();

        let result = replace_entry(&path, |writer| {
            writer.write_all(b"{ \"strokes\": [")?;
            Err(PersistenceError::Io(std::io::Error::other("disk full")))
        });

        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap(), b"previous save");
        assert_eq!(entries(&dir), vec![path]);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_replace_overwrites_existing_file() {
        let dir = scratch_dir();
        let path = dir.join("drawing.json");
        fs::write(&path, b"previous save").unwrap();

        replace_entry(&path, |writer| {
            writer.write_all(b"new save")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new save");
        assert_eq!(entries(&dir), vec![path]);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_failed_rename_cleans_up_staging_file() {
        let dir = scratch_dir();
        // A non-empty directory cannot be replaced by a file
        let path = dir.join("drawing.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inside"), b"x").unwrap();

        let result = replace_entry(&path, |writer| {
            writer.write_all(b"new save")?;
            Ok(())
        });

        assert!(matches!(result, Err(PersistenceError::Io(_))));
        assert_eq!(entries(&dir), vec![path]);
        fs::remove_dir_all(dir).unwrap();
    }
}
