//! Configuration loading and resolution.

use std::path::PathBuf;

/// Data file used when neither `--data` nor `CURRICULUM_DATA` is given.
pub const DEFAULT_DATA_FILE: &str = "curriculum_data.json";

/// Resolve the data file path: explicit flag, then `CURRICULUM_DATA`, then
/// `./curriculum_data.json`.
pub fn resolve_data_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var("CURRICULUM_DATA") {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }

    PathBuf::from(DEFAULT_DATA_FILE)
}

/// Console history file in the home directory.
pub fn history_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".curriculum_history")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(
            resolve_data_path(Some("/tmp/usp.json")),
            PathBuf::from("/tmp/usp.json")
        );
    }

    #[test]
    fn test_history_file_name() {
        assert!(history_path().ends_with(".curriculum_history"));
    }
}
