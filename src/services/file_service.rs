use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::AppError;
use crate::models::file_entry::FileEntry;

fn entry_from_metadata(name: String, path: &Path, metadata: &fs::Metadata) -> FileEntry {
    let extension = Path::new(&name)
        .extension()
        .map(|e| e.to_string_lossy().to_string());
    let mime_type = extension
        .as_ref()
        .and_then(|ext| mime_guess::from_ext(ext).first())
        .map(|m| m.to_string());

    FileEntry {
        path: path.to_string_lossy().to_string(),
        name,
        extension,
        mime_type,
        size: metadata.len(),
        is_file: metadata.is_file(),
        is_directory: metadata.is_dir(),
        modified_at: metadata
            .modified()
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339()),
    }
}

/// Snapshot one directory level. Entries whose metadata cannot be read are
/// skipped with a warning rather than failing the whole listing.
pub fn list_directory(path: &Path) -> Result<Vec<FileEntry>, AppError> {
    if !path.is_dir() {
        return Err(AppError::General(format!(
            "not a directory: {}",
            path.display()
        )));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable directory entry: {err}");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        match entry.metadata() {
            Ok(metadata) => entries.push(entry_from_metadata(name, &entry.path(), &metadata)),
            Err(err) => {
                warn!("skipping {name}: {err}");
            }
        }
    }

    Ok(entries)
}

/// Idempotent recursive directory creation.
pub fn ensure_dir(path: &Path) -> Result<(), AppError> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Move one file. The source must exist; an existing destination fails the
/// move instead of overwriting it.
pub fn move_file(source: &Path, destination: &Path) -> Result<(), AppError> {
    if !source.exists() {
        return Err(AppError::General(format!(
            "source does not exist: {}",
            source.display()
        )));
    }
    if destination.exists() {
        return Err(AppError::General(format!(
            "destination already exists: {}",
            destination.display()
        )));
    }

    fs::rename(source, destination)?;
    Ok(())
}

pub fn desktop_dir() -> Result<PathBuf, AppError> {
    dirs::desktop_dir()
        .ok_or_else(|| AppError::General("could not resolve desktop directory".to_string()))
}
