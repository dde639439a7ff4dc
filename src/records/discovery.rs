use super::LoadError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively list every `.json` file under `root`, sorted by path.
pub fn find_json_files(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| LoadError::Discovery {
            root: root.to_path_buf(),
            source,
        })?;
        let is_json = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
