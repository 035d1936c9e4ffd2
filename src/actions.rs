use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;
use serde::Serialize;

use crate::error::{Result, SortError};

/// Why a file was deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    /// Platform thumbnail or cache artifact
    Cleanup,
    /// Identical copy already at the target
    Duplicate,
}

/// A filesystem change decided during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateDir { path: PathBuf },
    Move { from: PathBuf, to: PathBuf },
    DeleteFile { path: PathBuf, reason: DeleteReason },
    RemoveDir { path: PathBuf },
    WriteNote { path: PathBuf, original: PathBuf },
}

/// The only place that mutates the filesystem.
///
/// Every action is logged and journaled. With `dry_run` set nothing is changed on disk.
#[derive(Debug, Default)]
pub struct Executor {
    dry_run: bool,
    actions: Vec<Action>,
    /// Directories a dry run pretends to have created
    planned_dirs: HashSet<PathBuf>,
    /// Files a dry run pretends to have written
    planned_files: Vec<PathBuf>,
}

impl Executor {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    fn prefix(&self) -> &'static str {
        if self.dry_run { "[dry-run] " } else { "" }
    }

    pub fn create_dir_all(&mut self, path: &Path) -> Result<()> {
        if path.is_dir() || self.planned_dirs.contains(path) {
            return Ok(());
        }

        tracing::info!("{}Creating directory {}", self.prefix(), path.display());
        self.actions.push(Action::CreateDir {
            path: path.to_path_buf(),
        });

        if self.dry_run {
            self.planned_dirs.insert(path.to_path_buf());
            return Ok(());
        }
        fs::create_dir_all(path).map_err(|e| SortError::io(path, e))
    }

    pub fn move_file(&mut self, from: &Path, to: &Path) -> Result<()> {
        tracing::info!(
            "{}Moving {} to {}",
            self.prefix(),
            from.display(),
            to.display()
        );
        self.actions.push(Action::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });

        if self.dry_run {
            self.planned_files.push(to.to_path_buf());
            return Ok(());
        }
        rename_or_copy(from, to).map_err(|e| SortError::io(from, e))
    }

    pub fn delete_file(&mut self, path: &Path, reason: DeleteReason) -> Result<()> {
        tracing::info!("{}Deleting file {}", self.prefix(), path.display());
        self.actions.push(Action::DeleteFile {
            path: path.to_path_buf(),
            reason,
        });

        if self.dry_run {
            return Ok(());
        }
        fs::remove_file(path).map_err(|e| SortError::io(path, e))
    }

    /// Remove an empty directory. Never removes a directory with contents.
    pub fn remove_dir(&mut self, path: &Path) -> Result<()> {
        tracing::info!("{}Removing directory {}", self.prefix(), path.display());
        self.actions.push(Action::RemoveDir {
            path: path.to_path_buf(),
        });

        if self.dry_run {
            return Ok(());
        }
        fs::remove_dir(path).map_err(|e| SortError::io(path, e))
    }

    /// Write a sidecar note recording where a moved file came from.
    ///
    /// An existing file at `path` is never overwritten; the note is skipped instead.
    pub fn write_note(&mut self, path: &Path, original: &Path) -> Result<()> {
        if path.symlink_metadata().is_ok() || self.planned_files.iter().any(|p| p == path) {
            tracing::warn!(
                "{}Not writing note {}, the name is already taken",
                self.prefix(),
                path.display()
            );
            return Ok(());
        }

        tracing::info!("{}Writing note {}", self.prefix(), path.display());
        self.actions.push(Action::WriteNote {
            path: path.to_path_buf(),
            original: original.to_path_buf(),
        });

        if self.dry_run {
            self.planned_files.push(path.to_path_buf());
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| SortError::io(path, e))?;
        writeln!(file, "Original path = {}", original.display()).map_err(|e| SortError::io(path, e))
    }

    /// Check a directory has no entries left.
    ///
    /// A dry run trusts the plan: nothing actually left the directory, so it only
    /// checks that nothing was planned to arrive below it.
    pub fn dir_is_empty(&self, path: &Path) -> Result<bool> {
        if self.dry_run {
            let arrived = self
                .planned_files
                .iter()
                .chain(self.planned_dirs.iter())
                .any(|p| p.starts_with(path));
            return Ok(!arrived);
        }
        let mut entries = fs::read_dir(path).map_err(|e| SortError::io(path, e))?;
        Ok(entries.next().is_none())
    }
}

/// Rename, falling back to copy + delete across filesystems.
fn rename_or_copy(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_with_mtime(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Copy a file and carry its modified time over to the copy.
fn copy_with_mtime(from: &Path, to: &Path) -> io::Result<()> {
    let modified = fs::metadata(from)?.modified()?;
    fs::copy(from, to)?;
    filetime::set_file_mtime(to, FileTime::from_system_time(modified))
}
