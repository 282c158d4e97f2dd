use crate::data::Error;
use glob::{glob_with, MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Every `.csv` file (any case) under `root`, recursively, in sorted order.
pub(crate) fn discover(root: &Path) -> Result<Vec<PathBuf>, Error> {
    if !root.is_dir() {
        return Err(Error::InvalidRoot(root.to_path_buf()));
    }
    let pattern = format!("{}/**/*.csv", Pattern::escape(&root.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let entries =
        glob_with(&pattern, options).map_err(|_| Error::InvalidRoot(root.to_path_buf()))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => debug!("skipping {}: {}", e.path().display(), e.error()),
        }
    }
    files.sort();
    Ok(files)
}
