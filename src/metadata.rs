use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{Exif, In, Tag, Value};
use thiserror::Error;

use crate::media::MediaKind;
use crate::quicktime;

/// Video containers that carry a QuickTime movie header
const QUICKTIME_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v", "3gp"];

/// Capture information read from a media file. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureMetadata {
    /// EXIF DateTimeOriginal
    pub original_capture: Option<NaiveDateTime>,
    /// EXIF DateTime
    pub secondary_capture: Option<NaiveDateTime>,
    /// QuickTime movie header creation time, in local time
    pub container_created: Option<NaiveDateTime>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
}

/// The metadata stream of a file could not be decoded.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("EXIF: {0}")]
    Exif(#[from] exif::Error),

    #[error("QuickTime: {0}")]
    QuickTime(String),

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Looks up capture metadata for a file.
///
/// A missing tag is an ordinary, empty field. Only undecodable files are errors.
pub trait MetadataSource {
    fn read(&self, path: &Path, kind: MediaKind) -> Result<CaptureMetadata, MetadataError>;
}

/// Reads EXIF from image containers and the movie header from QuickTime files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerMetadata;

impl MetadataSource for ContainerMetadata {
    fn read(&self, path: &Path, kind: MediaKind) -> Result<CaptureMetadata, MetadataError> {
        match kind {
            MediaKind::Photo => read_photo(path),
            MediaKind::Video => read_video(path),
        }
    }
}

fn read_photo(path: &Path) -> Result<CaptureMetadata, MetadataError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(CaptureMetadata::default()),
        Err(e) => return Err(e.into()),
    };

    Ok(CaptureMetadata {
        original_capture: exif_datetime(&exif, Tag::DateTimeOriginal),
        secondary_capture: exif_datetime(&exif, Tag::DateTime),
        container_created: None,
        camera_make: exif_text(&exif, Tag::Make),
        camera_model: exif_text(&exif, Tag::Model),
    })
}

fn read_video(path: &Path) -> Result<CaptureMetadata, MetadataError> {
    let is_quicktime = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| QUICKTIME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
    if !is_quicktime {
        return Ok(CaptureMetadata::default());
    }

    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let created = quicktime::movie_creation_time(&mut reader, len).map_err(|e| {
        if e.kind() == io::ErrorKind::InvalidData || e.kind() == io::ErrorKind::UnexpectedEof {
            MetadataError::QuickTime(e.to_string())
        } else {
            MetadataError::Io(e)
        }
    })?;

    Ok(CaptureMetadata {
        container_created: created.and_then(unix_to_local),
        ..CaptureMetadata::default()
    })
}

fn unix_to_local(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|utc| utc.with_timezone(&Local).naive_local())
}

fn exif_datetime(exif: &Exif, tag: Tag) -> Option<NaiveDateTime> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Ascii(ref values) = field.value else {
        return None;
    };
    let dt = exif::DateTime::from_ascii(values.first()?).ok()?;

    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_opt(u32::from(dt.hour), u32::from(dt.minute), u32::from(dt.second))
}

fn exif_text(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Ascii(ref values) = field.value else {
        return None;
    };
    let text = String::from_utf8_lossy(values.first()?);
    let text = text.trim_end_matches('\0');
    (!text.trim().is_empty()).then(|| text.to_string())
}
