//! Upload and converted-file directories.
//!
//! Every name coming from a client passes through [`secure_filename`] before
//! it touches the filesystem, so paths handed to the core always stay inside
//! the configured directories.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use sizefit_core::StorageConfig;

/// Prefix for output names derived from the upload name.
pub const DEFAULT_OUTPUT_PREFIX: &str = "converted_";

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").unwrap());

/// Reduces a client-supplied name to a safe single path component.
///
/// Directory parts are discarded, runs of unsafe characters become `_`, and
/// leading dots are stripped. Returns `None` when nothing usable remains.
pub fn secure_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = UNSAFE_CHARS.replace_all(base.trim(), "_");
    let cleaned = cleaned.trim_start_matches(['.', '_']).trim_end_matches('_');

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Resolved storage directories.
#[derive(Debug, Clone)]
pub struct Storage {
    upload_dir: PathBuf,
    converted_dir: PathBuf,
}

impl Storage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            converted_dir: config.converted_dir.clone(),
        }
    }

    /// Creates both directories if missing.
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.converted_dir).await
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn converted_dir(&self) -> &Path {
        &self.converted_dir
    }

    /// Path for a new upload. A random prefix keeps concurrent uploads with
    /// the same name apart.
    pub fn upload_path(&self, safe_name: &str) -> PathBuf {
        self.upload_dir
            .join(format!("{}_{}", Uuid::new_v4().simple(), safe_name))
    }

    pub fn output_path(&self, safe_name: &str) -> PathBuf {
        self.converted_dir.join(safe_name)
    }

    /// Resolves a download name, rejecting anything that is not already a
    /// plain safe file name.
    pub fn download_path(&self, name: &str) -> Option<PathBuf> {
        match secure_filename(name) {
            Some(safe) if safe == name => Some(self.converted_dir.join(safe)),
            _ => None,
        }
    }
}

/// Output name for an upload: the requested one if given, otherwise the
/// upload name with [`DEFAULT_OUTPUT_PREFIX`].
pub fn output_name(requested: Option<&str>, upload_name: &str) -> Option<String> {
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => secure_filename(name),
        None => secure_filename(&format!("{}{}", DEFAULT_OUTPUT_PREFIX, upload_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename_plain() {
        assert_eq!(secure_filename("photo.png").as_deref(), Some("photo.png"));
        assert_eq!(secure_filename("My Song.mp3").as_deref(), Some("My_Song.mp3"));
    }

    #[test]
    fn test_secure_filename_strips_directories() {
        assert_eq!(
            secure_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            secure_filename("C:\\Users\\me\\clip.mkv").as_deref(),
            Some("clip.mkv")
        );
    }

    #[test]
    fn test_secure_filename_rejects_empty() {
        assert_eq!(secure_filename(""), None);
        assert_eq!(secure_filename(".."), None);
        assert_eq!(secure_filename("dir/"), None);
        assert_eq!(secure_filename("???"), None);
    }

    #[test]
    fn test_secure_filename_hidden_file() {
        assert_eq!(secure_filename(".bashrc").as_deref(), Some("bashrc"));
    }

    #[test]
    fn test_output_name() {
        assert_eq!(
            output_name(Some("out.jpg"), "in.png").as_deref(),
            Some("out.jpg")
        );
        assert_eq!(
            output_name(Some("  "), "in.png").as_deref(),
            Some("converted_in.png")
        );
        assert_eq!(
            output_name(None, "in.png").as_deref(),
            Some("converted_in.png")
        );
    }

    #[test]
    fn test_download_path_rejects_traversal() {
        let storage = Storage::new(&StorageConfig::default());
        assert!(storage.download_path("out.jpg").is_some());
        assert!(storage.download_path("../config.toml").is_none());
        assert!(storage.download_path("a b.jpg").is_none());
    }

    #[test]
    fn test_ensure_dirs_creates_both() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(&StorageConfig {
            upload_dir: dir.path().join("in"),
            converted_dir: dir.path().join("nested/out"),
        });

        tokio_test::block_on(storage.ensure_dirs()).unwrap();
        assert!(storage.upload_dir().is_dir());
        assert!(storage.converted_dir().is_dir());
    }

    #[test]
    fn test_upload_paths_are_unique() {
        let storage = Storage::new(&StorageConfig::default());
        let a = storage.upload_path("x.png");
        let b = storage.upload_path("x.png");
        assert_ne!(a, b);
        assert!(a.starts_with(storage.upload_dir()));
        assert!(a.to_string_lossy().ends_with("_x.png"));
    }
}
