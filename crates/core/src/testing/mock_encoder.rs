//! Mock encoder for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{
    AudioParams, DocumentParams, EncodeError, Encoder, ImageParams, VideoParams,
};

/// Parameters of one recorded call, tagged by media kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedParams {
    Image(ImageParams),
    Audio(AudioParams),
    Video(VideoParams),
    Document(DocumentParams),
}

/// A recorded encode call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedEncode {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub params: RecordedParams,
}

type SizeFn = dyn Fn(&RecordedParams) -> u64 + Send + Sync;

/// Mock implementation of every `Encoder<P>`.
///
/// Each call writes a deterministic number of bytes to the destination,
/// computed from the parameters, and records the call. By default:
/// - image: `quality * 1000` bytes (50 000 without a quality)
/// - audio and video: `kbps * 100` bytes (10 000 without a bitrate)
/// - document: 2 048 bytes
///
/// Clones share their recorded state.
///
/// # Example
///
/// ```rust,ignore
/// use sizefit_core::testing::MockEncoder;
///
/// let encoder = MockEncoder::new().fail_on_call(2);
/// // ... run a search ...
/// assert_eq!(encoder.call_count().await, 2);
/// ```
#[derive(Clone)]
pub struct MockEncoder {
    calls: Arc<RwLock<Vec<RecordedEncode>>>,
    size_fn: Arc<SizeFn>,
    /// 1-based call number that fails, if any.
    fail_on: Option<usize>,
    delay: Duration,
}

impl Default for MockEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEncoder {
    /// Create a new mock encoder with the default size model.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            size_fn: Arc::new(default_size),
            fail_on: None,
            delay: Duration::ZERO,
        }
    }

    /// Replace the size model.
    pub fn with_size_fn(
        mut self,
        size_fn: impl Fn(&RecordedParams) -> u64 + Send + Sync + 'static,
    ) -> Self {
        self.size_fn = Arc::new(size_fn);
        self
    }

    /// Make the nth call (1-based) fail with an encode error.
    pub fn fail_on_call(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Sleep before every encode.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedEncode> {
        self.calls.read().await.clone()
    }

    /// Get the number of encode calls performed.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    async fn run(
        &self,
        source: &Path,
        destination: &Path,
        params: RecordedParams,
    ) -> Result<u64, EncodeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let size = (self.size_fn)(&params);
        let call_number = {
            let mut calls = self.calls.write().await;
            calls.push(RecordedEncode {
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
                params,
            });
            calls.len()
        };

        if self.fail_on == Some(call_number) {
            // Leave a partial file behind like a crashed encoder would.
            tokio::fs::write(destination, b"partial").await?;
            return Err(EncodeError::encode_failed(
                "mock encoder failure",
                Some("simulated stderr".to_string()),
            ));
        }

        tokio::fs::write(destination, vec![0u8; size as usize]).await?;
        Ok(size)
    }
}

fn default_size(params: &RecordedParams) -> u64 {
    match params {
        RecordedParams::Image(p) => p.quality.map(|q| q as u64 * 1000).unwrap_or(50_000),
        RecordedParams::Audio(AudioParams { bitrate, .. })
        | RecordedParams::Video(VideoParams { bitrate, .. }) => {
            bitrate.map(|b| b.as_kbps() as u64 * 100).unwrap_or(10_000)
        }
        RecordedParams::Document(_) => 2048,
    }
}

#[async_trait]
impl Encoder<ImageParams> for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn encode(
        &self,
        source: &Path,
        destination: &Path,
        params: &ImageParams,
    ) -> Result<u64, EncodeError> {
        self.run(source, destination, RecordedParams::Image(params.clone()))
            .await
    }
}

#[async_trait]
impl Encoder<AudioParams> for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn encode(
        &self,
        source: &Path,
        destination: &Path,
        params: &AudioParams,
    ) -> Result<u64, EncodeError> {
        self.run(source, destination, RecordedParams::Audio(params.clone()))
            .await
    }
}

#[async_trait]
impl Encoder<VideoParams> for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn encode(
        &self,
        source: &Path,
        destination: &Path,
        params: &VideoParams,
    ) -> Result<u64, EncodeError> {
        self.run(source, destination, RecordedParams::Video(params.clone()))
            .await
    }
}

#[async_trait]
impl Encoder<DocumentParams> for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn encode(
        &self,
        source: &Path,
        destination: &Path,
        params: &DocumentParams,
    ) -> Result<u64, EncodeError> {
        self.run(source, destination, RecordedParams::Document(params.clone()))
            .await
    }
}
