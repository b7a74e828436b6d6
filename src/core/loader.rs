//! Entity file loading utilities
//!
//! Generic helpers for reading `<ID>.dlab.yaml` files from an entity
//! directory. [`crate::core::lab::Lab`] builds its typed store on top of these.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::lab::LabError;

/// Suffix of every entity file
pub const ENTITY_SUFFIX: &str = ".dlab.yaml";

/// Entity files in a directory, sorted by file name (and therefore by ULID)
pub fn entity_files(dir: &Path) -> Result<Vec<PathBuf>, LabError> {
    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }

    for entry in walkdir::WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|e| LabError::Io(e.to_string()))?;
        if entry.file_type().is_file()
            && entry.file_name().to_string_lossy().ends_with(ENTITY_SUFFIX)
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Read and deserialize one entity file
pub fn read_entity<T: DeserializeOwned>(path: &Path) -> Result<T, LabError> {
    let content = fs::read_to_string(path).map_err(|e| LabError::Io(e.to_string()))?;
    serde_yml::from_str(&content).map_err(|e| LabError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load all entities of type T from a directory
///
/// Files that fail to parse are skipped with a warning.
pub fn load_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, LabError> {
    let mut entities = Vec::new();
    for path in entity_files(dir)? {
        match read_entity::<T>(&path) {
            Ok(entity) => entities.push(entity),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable entity file"),
        }
    }
    Ok(entities)
}

/// Entity files whose id starts with `reference`
///
/// The reference may be a full id, an id prefix like `WS-01HC2J`, or a bare
/// ULID prefix. Matching is case-insensitive.
pub fn find_entity_files(dir: &Path, reference: &str) -> Result<Vec<PathBuf>, LabError> {
    let needle = reference.to_uppercase();
    let matches = entity_files(dir)?
        .into_iter()
        .filter(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let id = name.trim_end_matches(ENTITY_SUFFIX).to_uppercase();
            let ulid = id.split_once('-').map(|(_, u)| u).unwrap_or("");
            id.starts_with(&needle) || ulid.starts_with(&needle)
        })
        .collect();
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_all_nonexistent_dir() {
        let result: Vec<serde_json::Value> = load_all(Path::new("/nonexistent/path")).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_load_all_skips_bad_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("WS-01A.dlab.yaml"), "id: WS-01A\n").unwrap();
        fs::write(dir.path().join("WS-01B.dlab.yaml"), "id: [unclosed\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result: Vec<serde_json::Value> = load_all(dir.path()).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_find_entity_files_by_prefix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("WS-01HC2JB7AAAA.dlab.yaml"), "").unwrap();
        fs::write(dir.path().join("WS-01HC2JB7BBBB.dlab.yaml"), "").unwrap();

        assert_eq!(find_entity_files(dir.path(), "WS-01HC2JB7").unwrap().len(), 2);
        assert_eq!(find_entity_files(dir.path(), "ws-01hc2jb7a").unwrap().len(), 1);
        assert_eq!(find_entity_files(dir.path(), "01HC2JB7B").unwrap().len(), 1);
        assert!(find_entity_files(dir.path(), "WS-99").unwrap().is_empty());
    }
}
