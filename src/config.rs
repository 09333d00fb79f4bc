use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glob::glob;
use tracing::{debug, warn};

use crate::error::{Result, TrackerError};

pub const FILE_ENV: &str = "COST_TRACKER_FILE";
pub const DIR_ENV: &str = "COST_TRACKER_DIR";
const EXPORT_PATTERN: &str = "costs*.json";

/// Picks the export to load: explicit path, then `COST_TRACKER_FILE`, then
/// the newest `costs*.json` in the search directories.
pub fn resolve_input(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    if let Ok(path) = std::env::var(FILE_ENV) {
        let path = PathBuf::from(path.trim());
        if !path.as_os_str().is_empty() {
            debug!("Using {} from {}", path.display(), FILE_ENV);
            return Ok(path);
        }
    }

    newest_export(&search_dirs()).ok_or(TrackerError::NoSource)
}

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(env_dirs) = std::env::var(DIR_ENV) {
        for dir in env_dirs.split(',') {
            let dir = PathBuf::from(dir.trim());
            if dir.is_dir() {
                dirs.push(dir);
            }
        }
    }

    if let Some(base) = directories::BaseDirs::new() {
        dirs.push(base.data_dir().join("cost-tracker"));
        dirs.push(base.home_dir().join(".cost-tracker"));
    }

    dirs
}

/// Most recently modified export across `dirs`. Only one file is returned.
pub fn newest_export(dirs: &[PathBuf]) -> Option<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for dir in dirs {
        for path in exports_in(dir) {
            let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Cannot stat {:?}: {}", path, e);
                    continue;
                }
            };
            if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }
    }

    newest.map(|(_, path)| path)
}

fn exports_in(dir: &Path) -> Vec<PathBuf> {
    let pattern = dir.join(EXPORT_PATTERN);
    let Some(pattern) = pattern.to_str() else {
        warn!("Skipping non UTF-8 directory {:?}", dir);
        return Vec::new();
    };

    match glob(pattern) {
        Ok(paths) => paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Error reading path: {}", e);
                    None
                }
            })
            .collect(),
        Err(e) => {
            warn!("Bad search pattern {}: {}", pattern, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn explicit_path_wins() {
        let path = PathBuf::from("/tmp/some.json");
        assert_eq!(resolve_input(Some(path.clone())).unwrap(), path);
    }

    #[test]
    fn newest_matching_export_is_picked() {
        let dir = tempdir().expect("temp dir");
        let old = dir.path().join("costs-2023.json");
        let new = dir.path().join("costs-2024.json");
        fs::write(&old, "[]").unwrap();
        fs::write(&new, "[]").unwrap();
        fs::write(dir.path().join("other.json"), "[]").unwrap();

        let now = SystemTime::now();
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(now - Duration::from_secs(3600))
            .unwrap();
        File::options()
            .write(true)
            .open(&new)
            .unwrap()
            .set_modified(now)
            .unwrap();

        assert_eq!(newest_export(&[dir.path().to_path_buf()]), Some(new));
    }

    #[test]
    fn no_exports_found() {
        let dir = tempdir().expect("temp dir");
        fs::write(dir.path().join("notes.json"), "[]").unwrap();
        assert_eq!(newest_export(&[dir.path().to_path_buf()]), None);
    }
}
