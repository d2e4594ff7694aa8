use glob::glob;
use std::path::{Component, Path, PathBuf};

/// Whether a CLI argument should be treated as a glob pattern
pub fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

/// Expand glob patterns into the files they match
pub fn expand_paths(patterns: &[String]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for pattern in patterns {
        match glob(pattern) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    if entry.is_file() {
                        paths.push(entry);
                    }
                }
            }
            Err(err) => eprintln!("Invalid pattern '{}': {}", pattern, err),
        }
    }
    paths
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Location of a file's backup copy inside a backup session.
///
/// Paths under `base` are stored relative to it; anything else keeps only its
/// normal components so the copy can never escape the session directory.
pub fn backup_relative_path(path: &Path, base: &Path) -> PathBuf {
    let relative = path.strip_prefix(base).unwrap_or(path);

    let mut result = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => result.push(part),
            Component::ParentDir => result.push("__parent__"),
            Component::Prefix(prefix) => {
                let label: String = prefix
                    .as_os_str()
                    .to_string_lossy()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect();
                if !label.is_empty() {
                    result.push(label);
                }
            }
            Component::RootDir | Component::CurDir => {}
        }
    }
    result
}
