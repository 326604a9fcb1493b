//! Conversion requests and file classification.

use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::converter::MediaCategory;
use crate::options::OptionsRecord;

/// Extension to category table. Lookups are case-insensitive.
pub const EXTENSION_CATEGORIES: &[(&str, MediaCategory)] = &[
    ("png", MediaCategory::Image),
    ("jpg", MediaCategory::Image),
    ("jpeg", MediaCategory::Image),
    ("bmp", MediaCategory::Image),
    ("gif", MediaCategory::Image),
    ("tiff", MediaCategory::Image),
    ("tif", MediaCategory::Image),
    ("webp", MediaCategory::Image),
    ("mp3", MediaCategory::Audio),
    ("wav", MediaCategory::Audio),
    ("flac", MediaCategory::Audio),
    ("ogg", MediaCategory::Audio),
    ("aac", MediaCategory::Audio),
    ("m4a", MediaCategory::Audio),
    ("opus", MediaCategory::Audio),
    ("mp4", MediaCategory::Video),
    ("avi", MediaCategory::Video),
    ("mkv", MediaCategory::Video),
    ("mov", MediaCategory::Video),
    ("wmv", MediaCategory::Video),
    ("mpeg", MediaCategory::Video),
    ("mpg", MediaCategory::Video),
    ("webm", MediaCategory::Video),
    ("doc", MediaCategory::Document),
    ("docx", MediaCategory::Document),
    ("odt", MediaCategory::Document),
    ("txt", MediaCategory::Document),
    ("html", MediaCategory::Document),
    ("md", MediaCategory::Document),
    ("pdf", MediaCategory::Document),
    ("xls", MediaCategory::Document),
    ("xlsx", MediaCategory::Document),
    ("ppt", MediaCategory::Document),
    ("pptx", MediaCategory::Document),
    ("csv", MediaCategory::Document),
    ("rtf", MediaCategory::Document),
    ("epub", MediaCategory::Document),
];

/// Returns the category for an extension (without dot).
pub fn classify_extension(extension: &str) -> MediaCategory {
    let ext = extension.trim_start_matches('.');
    EXTENSION_CATEGORIES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, category)| *category)
        .unwrap_or(MediaCategory::Opaque)
}

/// Lowercase extension of a path, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// One conversion to perform.
///
/// Paths must already be resolved and validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionRequest {
    /// Correlates events and job records.
    pub id: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: MediaCategory,
    /// Destination extension, lowercase.
    pub format: String,
    pub compress: bool,
    pub advanced: bool,
    pub options: OptionsRecord,
    /// Delete the source once the conversion has ended, whatever the result.
    pub cleanup_source: bool,
}

impl ConversionRequest {
    /// Builds a request, classifying the destination extension.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        let destination = destination.into();
        let format = extension_of(&destination);
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            category: classify_extension(&format),
            format,
            destination,
            compress: false,
            advanced: false,
            options: OptionsRecord::default(),
            cleanup_source: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_advanced(mut self, advanced: bool) -> Self {
        self.advanced = advanced;
        self
    }

    pub fn with_options(mut self, options: OptionsRecord) -> Self {
        self.options = options;
        self
    }

    pub fn with_cleanup_source(mut self, cleanup_source: bool) -> Self {
        self.cleanup_source = cleanup_source;
        self
    }

    /// Size ceiling for the ladder search, if this request asks for one.
    pub fn size_ceiling(&self) -> Option<u64> {
        if self.advanced {
            self.options.target_size_bytes.filter(|b| *b > 0)
        } else {
            None
        }
    }
}
