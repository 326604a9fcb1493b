//! Routes a conversion request to the right strategy.
//!
//! The dispatcher is the error boundary of the core: every request ends in a
//! [`ConversionOutcome`], never an error. Encoder failures become
//! `success = false` with the adapter's short message.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::converter::{
    is_jpeg_family, AudioParams, ConverterConfig, DocumentParams, EncodeError, Encoder,
    FfmpegEncoder, ImageEncoder, ImageParams, MediaCategory, PandocConverter, VideoParams,
};
use crate::events::{ConversionEvent, EventSink, Strategy};
use crate::ladder::{CandidateLadder, ParameterValue};
use crate::metrics;
use crate::request::ConversionRequest;
use crate::search::{remove_staged, staging_path, SearchEngine, SearchOutcome};

/// Quality used for JPEG compression without a size target.
pub const DEFAULT_BASIC_QUALITY: u8 = 85;

/// Message returned for unrecognized destination types.
pub const COPY_FALLBACK_MESSAGE: &str = "File copied without conversion (unsupported file type)";

/// Final result of one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_parameter: Option<ParameterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u64>,
    /// Encode calls performed. Zero for copies.
    pub attempts: usize,
    /// A ladder search fell back to its minimum candidate.
    pub forced: bool,
}

impl ConversionOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            chosen_parameter: None,
            output_size: None,
            attempts: 0,
            forced: false,
        }
    }

    fn direct(category: MediaCategory, output_size: u64) -> Self {
        Self {
            success: true,
            message: format!("{} conversion successful", category.label()),
            chosen_parameter: None,
            output_size: Some(output_size),
            attempts: 1,
            forced: false,
        }
    }

    fn from_search(category: MediaCategory, outcome: SearchOutcome) -> Self {
        Self {
            success: outcome.succeeded,
            message: format!(
                "{} converted with advanced compression ({})",
                category.label(),
                outcome.status_message
            ),
            chosen_parameter: outcome.chosen_parameter,
            output_size: outcome.output_size,
            attempts: outcome.attempts,
            forced: outcome.forced,
        }
    }
}

/// Classifies requests and drives the encoder adapters.
#[derive(Clone)]
pub struct Dispatcher {
    image: Arc<dyn Encoder<ImageParams>>,
    audio: Arc<dyn Encoder<AudioParams>>,
    video: Arc<dyn Encoder<VideoParams>>,
    document: Arc<dyn Encoder<DocumentParams>>,
    sink: Arc<dyn EventSink>,
    search: SearchEngine,
}

impl Dispatcher {
    pub fn new(
        image: Arc<dyn Encoder<ImageParams>>,
        audio: Arc<dyn Encoder<AudioParams>>,
        video: Arc<dyn Encoder<VideoParams>>,
        document: Arc<dyn Encoder<DocumentParams>>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            image,
            audio,
            video,
            document,
            search: SearchEngine::new(Arc::clone(&sink)),
            sink,
        }
    }

    /// Dispatcher backed by the real adapters.
    pub fn from_config(config: &ConverterConfig, sink: Arc<dyn EventSink>) -> Self {
        let ffmpeg = Arc::new(FfmpegEncoder::new(config.clone()));
        Self::new(
            Arc::new(ImageEncoder::new()),
            ffmpeg.clone(),
            ffmpeg,
            Arc::new(PandocConverter::new(config.clone())),
            sink,
        )
    }

    /// Dispatcher using one encoder for every category.
    pub fn with_encoder<E>(encoder: E, sink: Arc<dyn EventSink>) -> Self
    where
        E: Encoder<ImageParams>
            + Encoder<AudioParams>
            + Encoder<VideoParams>
            + Encoder<DocumentParams>
            + 'static,
    {
        let shared = Arc::new(encoder);
        Self::new(shared.clone(), shared.clone(), shared.clone(), shared, sink)
    }

    /// Strategy a request will be handled with.
    pub fn strategy_for(request: &ConversionRequest) -> Strategy {
        let searchable = request.size_ceiling().is_some();
        match request.category {
            MediaCategory::Image if searchable && is_jpeg_family(&request.format) => {
                Strategy::Search
            }
            MediaCategory::Audio | MediaCategory::Video if searchable => Strategy::Search,
            MediaCategory::Image | MediaCategory::Audio | MediaCategory::Video => Strategy::Direct,
            MediaCategory::Document => Strategy::PassThrough,
            MediaCategory::Opaque => Strategy::Copy,
        }
    }

    /// Performs the conversion described by `request`.
    pub async fn dispatch(&self, request: &ConversionRequest) -> ConversionOutcome {
        let start = Instant::now();
        let strategy = Self::strategy_for(request);

        tracing::info!(
            request_id = %request.id,
            category = %request.category,
            format = %request.format,
            strategy = strategy.as_str(),
            "Dispatching conversion"
        );
        self.sink.record(ConversionEvent::ConversionStarted {
            request_id: request.id.clone(),
            category: request.category,
            format: request.format.clone(),
            strategy,
        });

        let result = match strategy {
            Strategy::Search => self.run_search(request).await,
            other => {
                // Single-shot strategies write beside the destination and
                // only replace it once they succeed.
                let staging = staging_path(&request.destination, &request.id, "partial");
                let result = match other {
                    Strategy::Direct => self.run_direct(request, &staging).await,
                    Strategy::PassThrough => self
                        .document
                        .encode(
                            &request.source,
                            &staging,
                            &DocumentParams::new(request.format.clone()),
                        )
                        .await
                        .map(|size| ConversionOutcome::direct(request.category, size)),
                    _ => self.run_copy(request, &staging).await,
                };
                commit_staged(result, &staging, &request.destination).await
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    request_id = %request.id,
                    error = %e,
                    stderr = e.stderr().unwrap_or(""),
                    "Conversion failed"
                );
                ConversionOutcome::failed(e.to_string())
            }
        };

        let elapsed = start.elapsed();
        let result_label = if outcome.success { "success" } else { "failed" };
        metrics::CONVERSIONS_TOTAL
            .with_label_values(&[request.category.as_str(), strategy.as_str(), result_label])
            .inc();
        metrics::CONVERSION_DURATION
            .with_label_values(&[request.category.as_str()])
            .observe(elapsed.as_secs_f64());

        tracing::info!(
            request_id = %request.id,
            success = outcome.success,
            attempts = outcome.attempts,
            forced = outcome.forced,
            elapsed_ms = elapsed.as_millis() as u64,
            "{}",
            outcome.message
        );
        self.sink.record(ConversionEvent::ConversionFinished {
            request_id: request.id.clone(),
            category: request.category,
            success: outcome.success,
            message: outcome.message.clone(),
            attempts: outcome.attempts,
            forced: outcome.forced,
            duration_ms: elapsed.as_millis() as u64,
        });

        outcome
    }

    async fn run_search(&self, request: &ConversionRequest) -> Result<ConversionOutcome, EncodeError> {
        let ceiling = request
            .size_ceiling()
            .ok_or_else(|| EncodeError::invalid_params("size ceiling required for search"))?;
        let format = request.format.as_str();
        let options = &request.options;

        let outcome = match request.category {
            MediaCategory::Image => {
                self.search
                    .search(
                        &request.id,
                        self.image.as_ref(),
                        &request.source,
                        &request.destination,
                        CandidateLadder::image(),
                        ceiling,
                        |value| ImageParams {
                            format: format.to_string(),
                            quality: value.as_quality(),
                        },
                    )
                    .await?
            }
            MediaCategory::Audio => {
                self.search
                    .search(
                        &request.id,
                        self.audio.as_ref(),
                        &request.source,
                        &request.destination,
                        CandidateLadder::audio(),
                        ceiling,
                        |value| AudioParams {
                            format: format.to_string(),
                            bitrate: value.as_bitrate(),
                        },
                    )
                    .await?
            }
            MediaCategory::Video => {
                // Only the bitrate varies; resolution and GPU stay fixed.
                let fixed = VideoParams {
                    container: format.to_string(),
                    bitrate: None,
                    resolution: options.target_resolution,
                    gpu: options.gpu,
                };
                self.search
                    .search(
                        &request.id,
                        self.video.as_ref(),
                        &request.source,
                        &request.destination,
                        CandidateLadder::video(),
                        ceiling,
                        |value| VideoParams {
                            bitrate: value.as_bitrate(),
                            ..fixed.clone()
                        },
                    )
                    .await?
            }
            MediaCategory::Document | MediaCategory::Opaque => {
                return Err(EncodeError::invalid_params(format!(
                    "{} files are not searchable",
                    request.category
                )));
            }
        };

        metrics::SEARCH_ATTEMPTS
            .with_label_values(&[request.category.as_str()])
            .observe(outcome.attempts as f64);
        if outcome.forced {
            metrics::FORCED_RESULTS
                .with_label_values(&[request.category.as_str()])
                .inc();
        }

        Ok(ConversionOutcome::from_search(request.category, outcome))
    }

    async fn run_direct(
        &self,
        request: &ConversionRequest,
        destination: &Path,
    ) -> Result<ConversionOutcome, EncodeError> {
        let options = &request.options;
        let source = &request.source;
        let format = request.format.clone();

        let size = match request.category {
            MediaCategory::Image => {
                let quality = (request.compress && is_jpeg_family(&format))
                    .then(|| options.basic_quality.unwrap_or(DEFAULT_BASIC_QUALITY));
                let params = ImageParams { format, quality };
                self.image.encode(source, destination, &params).await?
            }
            MediaCategory::Audio => {
                let params = AudioParams {
                    format,
                    bitrate: options.target_bitrate,
                };
                self.audio.encode(source, destination, &params).await?
            }
            MediaCategory::Video => {
                let mut params = VideoParams::new(format).with_gpu(options.gpu);
                if request.advanced {
                    params.bitrate = options.target_bitrate;
                    params.resolution = options.target_resolution;
                }
                self.video.encode(source, destination, &params).await?
            }
            MediaCategory::Document | MediaCategory::Opaque => {
                return Err(EncodeError::invalid_params(format!(
                    "no direct encoder for {} files",
                    request.category
                )));
            }
        };

        Ok(ConversionOutcome::direct(request.category, size))
    }

    async fn run_copy(
        &self,
        request: &ConversionRequest,
        destination: &Path,
    ) -> Result<ConversionOutcome, EncodeError> {
        if !tokio::fs::try_exists(&request.source).await.unwrap_or(false) {
            return Err(EncodeError::InputNotFound {
                path: request.source.clone(),
            });
        }
        let size = tokio::fs::copy(&request.source, destination).await?;
        Ok(ConversionOutcome {
            success: true,
            message: COPY_FALLBACK_MESSAGE.to_string(),
            chosen_parameter: None,
            output_size: Some(size),
            attempts: 0,
            forced: false,
        })
    }
}

/// Moves a staged output into place, or discards it if the run failed.
async fn commit_staged(
    result: Result<ConversionOutcome, EncodeError>,
    staging: &Path,
    destination: &Path,
) -> Result<ConversionOutcome, EncodeError> {
    match result {
        Ok(outcome) => match tokio::fs::rename(staging, destination).await {
            Ok(()) => Ok(outcome),
            Err(e) => {
                remove_staged(staging).await;
                Err(EncodeError::Io(e))
            }
        },
        Err(e) => {
            remove_staged(staging).await;
            Err(e)
        }
    }
}
