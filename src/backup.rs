use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::utils::path::backup_relative_path;

const SESSION_FORMAT: &str = "%Y%m%d-%H%M%S";

/// A timestamped directory holding the backups taken during one run
#[derive(Debug)]
pub struct BackupStore {
    session_dir: PathBuf,
    base_dir: PathBuf,
}

impl BackupStore {
    /// Create a new session under `root`, storing copies relative to the
    /// current working directory.
    pub fn create(root: &Path) -> Result<Self> {
        let base_dir = std::env::current_dir().context("Failed to read working directory")?;
        Self::with_base(root, base_dir)
    }

    pub fn with_base(root: &Path, base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create backup root: {}", root.display()))?;

        let stamp = chrono::Local::now().format(SESSION_FORMAT).to_string();
        let mut attempt = 0;
        let session_dir = loop {
            let name = if attempt == 0 {
                stamp.clone()
            } else {
                format!("{stamp}-{attempt}")
            };
            let candidate = root.join(name);
            match fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to create backup session: {}", candidate.display())
                    });
                }
            }
        };

        log::debug!("backup session at {}", session_dir.display());
        Ok(Self {
            session_dir,
            base_dir,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Copy `path` into the session and return a guard that discards the copy
    /// unless the original has changed by the time the guard goes away.
    pub fn backup(&self, path: &Path) -> Result<BackupGuard> {
        let copy = self
            .session_dir
            .join(backup_relative_path(path, &self.base_dir));
        if let Some(parent) = copy.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create backup directory: {}", parent.display())
            })?;
        }
        fs::copy(path, &copy).with_context(|| {
            format!(
                "Failed to back up {} to {}",
                path.display(),
                copy.display()
            )
        })?;

        Ok(BackupGuard {
            original: path.to_path_buf(),
            copy,
            settled: false,
        })
    }

    /// Remove directories left empty by discarded backups. Returns the session
    /// directory if any backup was kept.
    pub fn finish(self) -> Result<Option<PathBuf>> {
        for entry in WalkDir::new(&self.session_dir).contents_first(true) {
            let entry = entry.with_context(|| {
                format!("Failed to scan backup session: {}", self.session_dir.display())
            })?;
            if entry.file_type().is_dir() {
                // Fails on non-empty directories, which is what we want.
                let _ = fs::remove_dir(entry.path());
            }
        }

        Ok(self.session_dir.exists().then_some(self.session_dir))
    }
}

/// Scoped backup of a single file.
///
/// Dropping the guard compares the original with its copy and deletes the copy
/// when they are identical, so error paths never leave stale backups behind
/// and never lose the backup of a file that was already rewritten.
#[derive(Debug)]
pub struct BackupGuard {
    original: PathBuf,
    copy: PathBuf,
    settled: bool,
}

impl BackupGuard {
    pub fn copy_path(&self) -> &Path {
        &self.copy
    }

    /// Decide the backup's fate now. Returns the copy's path if it was kept.
    pub fn settle(mut self) -> Result<Option<PathBuf>> {
        self.settled = true;
        if self.original_unchanged()? {
            fs::remove_file(&self.copy).with_context(|| {
                format!("Failed to remove backup: {}", self.copy.display())
            })?;
            Ok(None)
        } else {
            Ok(Some(self.copy.clone()))
        }
    }

    fn original_unchanged(&self) -> Result<bool> {
        let current = fs::read(&self.original)
            .with_context(|| format!("Failed to read file: {}", self.original.display()))?;
        let saved = fs::read(&self.copy)
            .with_context(|| format!("Failed to read backup: {}", self.copy.display()))?;
        Ok(current == saved)
    }
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match self.original_unchanged() {
            Ok(true) => {
                if let Err(e) = fs::remove_file(&self.copy) {
                    log::warn!("could not remove backup {}: {e}", self.copy.display());
                }
            }
            Ok(false) => log::debug!("kept backup {}", self.copy.display()),
            Err(e) => log::warn!("keeping backup {}: {e:#}", self.copy.display()),
        }
    }
}
