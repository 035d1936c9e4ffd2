use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::media::{MediaFile, MediaKind};
use crate::metadata::{CaptureMetadata, MetadataSource};

/// Options that change how a target folder is derived
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Skip files without a metadata date instead of using the modified time
    pub metadata_only: bool,
    /// Use EXIF DateTime when DateTimeOriginal is missing
    pub use_secondary_date: bool,
    /// Append a camera folder for photos
    pub use_camera_name: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            metadata_only: false,
            use_secondary_date: true,
            use_camera_name: false,
        }
    }
}

/// Destination folder relative to the destination root: `year/date[/camera]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFolder {
    year: String,
    date: String,
    camera: Option<String>,
}

impl TargetFolder {
    /// Year and date always come from the same timestamp.
    pub fn from_timestamp(timestamp: NaiveDateTime, camera: Option<String>) -> Self {
        Self {
            year: timestamp.format("%Y").to_string(),
            date: timestamp.format("%Y-%m-%d").to_string(),
            camera,
        }
    }

    pub fn date_segment(&self) -> &str {
        &self.date
    }

    pub fn to_path(&self) -> PathBuf {
        let mut path = PathBuf::from(&self.year);
        path.push(&self.date);
        if let Some(camera) = &self.camera {
            path.push(camera);
        }
        path
    }
}

impl fmt::Display for TargetFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path().display())
    }
}

/// Why a file was left where it is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum SkipReason {
    Unsupported,
    AlreadyInPlace,
    /// No metadata date and metadata-only mode is on
    NoTarget,
    /// The metadata stream could not be decoded
    DecodeError(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unsupported => write!(f, "unsupported file"),
            SkipReason::AlreadyInPlace => write!(f, "already in correct directory"),
            SkipReason::NoTarget => write!(f, "could not determine destination"),
            SkipReason::DecodeError(message) => write!(f, "metadata decode error ({message})"),
        }
    }
}

/// Merge make and model into one folder name.
///
/// Most vendors repeat the make in the model (`Canon` / `Canon EOS 90D`), in which
/// case the model is used alone.
pub fn camera_label(make: &str, model: &str) -> String {
    let label = if model.starts_with(make) {
        model.trim().to_string()
    } else {
        format!("{} {}", make.trim(), model.trim())
    };
    label.replace(['/', '\\'], "_")
}

fn resolve_photo(meta: &CaptureMetadata, options: &ResolveOptions) -> Option<TargetFolder> {
    let timestamp = meta.original_capture.or_else(|| {
        if options.use_secondary_date {
            meta.secondary_capture
        } else {
            None
        }
    })?;

    let camera = match (&meta.camera_make, &meta.camera_model) {
        (Some(make), Some(model)) if options.use_camera_name => Some(camera_label(make, model)),
        _ => None,
    };

    Some(TargetFolder::from_timestamp(timestamp, camera))
}

fn resolve_video(meta: &CaptureMetadata) -> Option<TargetFolder> {
    meta.container_created
        .map(|timestamp| TargetFolder::from_timestamp(timestamp, None))
}

/// Compute the target folder for a media file.
///
/// Precedence: original capture, secondary capture (photos), container creation
/// (videos), then the file's modified time unless `metadata_only` is set.
pub fn resolve<M>(
    file: &MediaFile,
    kind: MediaKind,
    source: &M,
    options: &ResolveOptions,
) -> Result<TargetFolder, SkipReason>
where
    M: MetadataSource + ?Sized,
{
    let meta = source
        .read(&file.path, kind)
        .map_err(|e| SkipReason::DecodeError(e.to_string()))?;

    let from_metadata = match kind {
        MediaKind::Photo => resolve_photo(&meta, options),
        MediaKind::Video => resolve_video(&meta),
    };

    match from_metadata {
        Some(target) => Ok(target),
        None if options.metadata_only => Err(SkipReason::NoTarget),
        None => Ok(TargetFolder::from_timestamp(file.modified, None)),
    }
}
