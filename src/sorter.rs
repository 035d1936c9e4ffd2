use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use indicatif::ProgressBar;

use crate::actions::{DeleteReason, Executor};
use crate::compare::{self, Comparison};
use crate::error::{Result, SortError};
use crate::media::{Classification, Classifier, MediaFile};
use crate::metadata::MetadataSource;
use crate::output::{RunReport, RunStatistics};
use crate::resolver::{self, ResolveOptions, SkipReason, TargetFolder};

/// Identical duplicates are kept here, below the target folder. Never descended into.
pub const DUPLICATES_FOLDER: &str = "ms-duplicates";

/// Settings for one run
#[derive(Debug, Clone)]
pub struct SortOptions {
    pub destination: PathBuf,
    pub photos: bool,
    pub videos: bool,
    /// Log and journal actions without touching the filesystem
    pub dry_run: bool,
    /// Move identical duplicates to `ms-duplicates` instead of deleting them
    pub keep_duplicates: bool,
    /// Write a note next to moved files whose old folder was not their date folder
    pub write_notes: bool,
    pub resolve: ResolveOptions,
    /// Extra cleanup globs on top of the built-in ones
    pub cleanup_patterns: Vec<String>,
}

/// What to do with a source file when something already exists at its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateDecision {
    IdenticalDelete,
    IdenticalKeepCopy,
    DifferentRename,
}

impl DuplicateDecision {
    pub fn new(comparison: Comparison, keep_duplicates: bool) -> Self {
        match comparison {
            Comparison::Different => DuplicateDecision::DifferentRename,
            Comparison::Identical if keep_duplicates => DuplicateDecision::IdenticalKeepCopy,
            Comparison::Identical => DuplicateDecision::IdenticalDelete,
        }
    }
}

/// What happened to a visited file
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileOutcome {
    Moved,
    Deleted,
    Skipped,
}

impl FileOutcome {
    fn left_directory(&self) -> bool {
        !matches!(self, FileOutcome::Skipped)
    }
}

struct DirListing {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
    /// Every entry, including symlinks and other special files
    total: usize,
}

fn list_dir(dir: &Path) -> Result<DirListing> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let mut total = 0;

    for entry in fs::read_dir(dir).map_err(|e| SortError::io(dir, e))? {
        let entry = entry.map_err(|e| SortError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| SortError::io(entry.path(), e))?;
        total += 1;

        // Symlinks are never followed
        if file_type.is_dir() {
            dirs.push(entry.path());
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }

    dirs.sort();
    files.sort();
    Ok(DirListing { dirs, files, total })
}

fn is_duplicates_folder(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case(DUPLICATES_FOLDER))
}

/// Walks the source tree and files every media file under the destination.
struct Sorter<'a, M: MetadataSource + ?Sized> {
    destination: PathBuf,
    options: &'a SortOptions,
    classifier: Classifier,
    metadata: &'a M,
    executor: Executor,
    stats: RunStatistics,
    progress: ProgressBar,
}

impl<'a, M: MetadataSource + ?Sized> Sorter<'a, M> {
    /// Depth-first: subfolders, then files. Returns whether `dir` ended up empty.
    fn process_dir(&mut self, dir: &Path) -> Result<bool> {
        let listing = list_dir(dir)?;
        let mut remaining = listing.total;
        self.progress.set_message(dir.display().to_string());

        for subdir in &listing.dirs {
            self.stats.folders += 1;

            // Sorted duplicates stay put so the output can be re-run
            if is_duplicates_folder(subdir) {
                continue;
            }

            if self.process_dir(subdir)? && self.executor.dir_is_empty(subdir)? {
                self.executor.remove_dir(subdir)?;
                self.stats.folders_removed += 1;
                remaining -= 1;
            }
        }

        for file in listing.files {
            self.stats.files += 1;
            self.progress.inc(1);

            if self.process_file(file)?.left_directory() {
                remaining -= 1;
            }
        }

        Ok(remaining == 0)
    }

    fn process_file(&mut self, path: PathBuf) -> Result<FileOutcome> {
        let kind = match self.classifier.classify(&path) {
            Classification::Cleanup => {
                self.executor.delete_file(&path, DeleteReason::Cleanup)?;
                self.stats.cleaned_up += 1;
                return Ok(FileOutcome::Deleted);
            }
            Classification::Unsupported => return Ok(self.skip(&path, SkipReason::Unsupported)),
            Classification::Media(kind) => kind,
        };

        let file = MediaFile::from_path(path.clone()).map_err(|e| SortError::io(&path, e))?;

        let target = match resolver::resolve(&file, kind, self.metadata, &self.options.resolve) {
            Ok(target) => target,
            Err(reason) => return Ok(self.skip(&file.path, reason)),
        };

        let Some(file_name) = file.path.file_name() else {
            return Ok(self.skip(&file.path, SkipReason::Unsupported));
        };
        let target_dir = self.destination.join(target.to_path());
        let target_path = target_dir.join(file_name);

        if target_path == file.path {
            return Ok(self.skip(&file.path, SkipReason::AlreadyInPlace));
        }

        // Dangling symlinks count as taken
        if target_path.symlink_metadata().is_err() {
            self.executor.create_dir_all(&target_dir)?;
            self.executor.move_file(&file.path, &target_path)?;
            self.stats.moved += 1;
            self.write_note(&file.path, &target, &target_path)?;
            return Ok(FileOutcome::Moved);
        }

        let decision = if target_path.is_file() {
            let comparison = compare::compare_files(&target_path, &file.path)
                .map_err(|e| SortError::io(&file.path, e))?;
            DuplicateDecision::new(comparison, self.options.keep_duplicates)
        } else {
            tracing::info!(
                "{} is not a regular file, using another name for {}",
                target_path.display(),
                file.path.display()
            );
            DuplicateDecision::DifferentRename
        };

        match decision {
            DuplicateDecision::DifferentRename => {
                let renamed = compare::duplicate_file_name(file_name, &target_dir);
                self.executor.move_file(&file.path, &renamed)?;
                self.stats.renamed += 1;
                self.write_note(&file.path, &target, &renamed)?;
                Ok(FileOutcome::Moved)
            }
            DuplicateDecision::IdenticalKeepCopy => {
                let duplicates_dir = target_dir.join(DUPLICATES_FOLDER);
                self.executor.create_dir_all(&duplicates_dir)?;
                let kept = compare::duplicate_file_name(file_name, &duplicates_dir);
                self.executor.move_file(&file.path, &kept)?;
                self.stats.duplicates_kept += 1;
                self.write_note(&file.path, &target, &kept)?;
                Ok(FileOutcome::Moved)
            }
            DuplicateDecision::IdenticalDelete => {
                tracing::info!(
                    "Detected duplicate {} of {}",
                    file.path.display(),
                    target_path.display()
                );
                self.executor
                    .delete_file(&file.path, DeleteReason::Duplicate)?;
                self.stats.duplicates_deleted += 1;
                self.stats.bytes_reclaimed += file.size;
                Ok(FileOutcome::Deleted)
            }
        }
    }

    /// Record where a file came from when its old folder was not its date folder.
    fn write_note(&mut self, original: &Path, target: &TargetFolder, moved_to: &Path) -> Result<()> {
        if !self.options.write_notes {
            return Ok(());
        }

        let old_folder = original
            .parent()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned());
        if old_folder.as_deref() == Some(target.date_segment()) {
            return Ok(());
        }

        let mut note_name = moved_to.file_name().unwrap_or_default().to_os_string();
        note_name.push(".txt");
        self.executor
            .write_note(&moved_to.with_file_name(note_name), original)
    }

    fn skip(&mut self, path: &Path, reason: SkipReason) -> FileOutcome {
        self.stats.skipped += 1;
        match &reason {
            SkipReason::Unsupported => {
                tracing::info!("Skipping unsupported file: {}", path.display());
            }
            SkipReason::AlreadyInPlace => {
                tracing::info!("Skipping {} - already in correct directory", path.display());
            }
            SkipReason::NoTarget => {
                tracing::info!("Could not determine destination for {}", path.display());
            }
            SkipReason::DecodeError(message) => {
                self.stats.decode_errors += 1;
                tracing::warn!(
                    "Skipping file due to metadata error ({message}): {}",
                    path.display()
                );
            }
        }
        FileOutcome::Skipped
    }
}

/// Sort every media file below `source` into `options.destination`.
///
/// The source root itself is never removed. Filesystem failures abort the run;
/// everything done so far stays done.
pub fn sort_media<M>(
    source: &Path,
    options: &SortOptions,
    metadata: &M,
    progress: ProgressBar,
) -> Result<RunReport>
where
    M: MetadataSource + ?Sized,
{
    let start = Instant::now();

    if !source.is_dir() {
        return Err(SortError::SourceNotFound {
            path: source.to_path_buf(),
        });
    }
    let source = source
        .canonicalize()
        .map_err(|e| SortError::io(source, e))?;

    let mut executor = Executor::new(options.dry_run);
    let destination = match options.destination.canonicalize() {
        Ok(destination) => destination,
        Err(_) => {
            let destination = std::path::absolute(&options.destination)
                .map_err(|e| SortError::io(&options.destination, e))?;
            executor.create_dir_all(&destination)?;
            if executor.is_dry_run() {
                destination
            } else {
                destination
                    .canonicalize()
                    .map_err(|e| SortError::io(&destination, e))?
            }
        }
    };

    tracing::info!(
        "Sorting {} into {}{}",
        source.display(),
        destination.display(),
        if options.dry_run { " (dry run)" } else { "" }
    );

    let mut sorter = Sorter {
        destination,
        options,
        classifier: Classifier::new(options.photos, options.videos, &options.cleanup_patterns)?,
        metadata,
        executor,
        stats: RunStatistics::default(),
        progress,
    };

    sorter.process_dir(&source)?;

    tracing::debug!("{} actions journaled", sorter.executor.actions().len());

    let mut stats = sorter.stats;
    stats.elapsed_secs = start.elapsed().as_secs_f64();
    Ok(RunReport {
        dry_run: options.dry_run,
        stats,
        actions: sorter.executor.into_actions(),
    })
}
