use serde::{Deserialize, Serialize};

/// Immutable snapshot of one directory entry at read time. Produced by
/// `file_service::list_directory` and never retained across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub extension: Option<String>,
    pub mime_type: Option<String>,
    pub size: u64,
    pub is_file: bool,
    pub is_directory: bool,
    pub modified_at: Option<String>,
}

#[cfg(test)]
impl FileEntry {
    /// Minimal entry for tests that only need name/path/file-ness.
    pub fn stub(name: &str, path: &str, size: u64, is_file: bool) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            extension: std::path::Path::new(name)
                .extension()
                .map(|e| e.to_string_lossy().to_string()),
            mime_type: None,
            size,
            is_file,
            is_directory: !is_file,
            modified_at: None,
        }
    }
}
