use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Serialize;

const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "tif", "tiff", "cr2", "nef", "dng", "heic", "heif",
];

const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v", "3gp", "mpg", "mpeg"];

/// Platform thumbnail/cache files that are removed on sight
const DEFAULT_CLEANUP_PATTERNS: &[&str] = &["Thumbs.db", "ZbThumbnail.info", ".DS_Store", "*.thm"];

/// Kind of media a file holds. Each kind has its own target resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_ascii_lowercase();
        if PHOTO_EXTENSIONS.contains(&extension.as_str()) {
            Some(MediaKind::Photo)
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// A file under the source tree, as seen on this visit
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub size: u64,
    /// Last-modified time, in local time
    pub modified: NaiveDateTime,
}

impl MediaFile {
    pub fn from_path(path: PathBuf) -> io::Result<Self> {
        let metadata = fs::metadata(&path)?;
        let modified: DateTime<Local> = metadata.modified()?.into();
        Ok(Self {
            path,
            size: metadata.len(),
            modified: modified.naive_local(),
        })
    }
}

/// What the walker should do with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Platform artifact, deleted unconditionally
    Cleanup,
    Media(MediaKind),
    Unsupported,
}

/// Classifies files by name and extension.
pub struct Classifier {
    cleanup: GlobSet,
    photos: bool,
    videos: bool,
}

impl Classifier {
    /// Build a classifier from the enabled media kinds and extra cleanup globs.
    ///
    /// Exact names are matched case-sensitively, `*.ext` patterns ignore case.
    pub fn new(photos: bool, videos: bool, extra_cleanup: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        let patterns = DEFAULT_CLEANUP_PATTERNS
            .iter()
            .copied()
            .chain(extra_cleanup.iter().map(String::as_str));

        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(pattern.starts_with("*."))
                .literal_separator(true)
                .build()?;
            builder.add(glob);
        }

        Ok(Self {
            cleanup: builder.build()?,
            photos,
            videos,
        })
    }

    /// Cleanup takes precedence over the photo/video switches.
    pub fn classify(&self, path: &Path) -> Classification {
        let Some(file_name) = path.file_name() else {
            return Classification::Unsupported;
        };
        if self.cleanup.is_match(file_name) {
            return Classification::Cleanup;
        }

        let kind = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MediaKind::from_extension);

        match kind {
            Some(MediaKind::Photo) if self.photos => Classification::Media(MediaKind::Photo),
            Some(MediaKind::Video) if self.videos => Classification::Media(MediaKind::Video),
            _ => Classification::Unsupported,
        }
    }
}
