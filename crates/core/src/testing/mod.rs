//! Testing utilities and mock implementations.
//!
//! [`MockEncoder`] stands in for every encoder adapter so the search engine,
//! dispatcher and job runner can be exercised without ffmpeg, pandoc or real
//! media files.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sizefit_core::testing::MockEncoder;
//! use sizefit_core::{Dispatcher, NullSink};
//!
//! let encoder = MockEncoder::new();
//! let dispatcher = Dispatcher::with_encoder(encoder.clone(), Arc::new(NullSink));
//! ```

mod mock_encoder;

pub use mock_encoder::{MockEncoder, RecordedEncode, RecordedParams};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    /// Write a small placeholder source file and return its path.
    pub fn source_file(dir: &Path, name: &str) -> std::io::Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, b"source bytes")?;
        Ok(path)
    }

    /// Sorted file names in a directory.
    pub fn dir_listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
