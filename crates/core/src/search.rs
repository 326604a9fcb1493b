//! Size-constrained ladder search.
//!
//! The engine walks a [`CandidateLadder`] from the largest expected output to
//! the smallest, encoding once per candidate, and keeps the first output whose
//! size fits the ceiling. When nothing fits, the output of the last candidate
//! is kept as a forced result.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::converter::{EncodeError, Encoder};
use crate::events::{ConversionEvent, EventSink};
use crate::ladder::{CandidateLadder, ParameterValue};

/// Result of one search run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub succeeded: bool,
    pub chosen_parameter: Option<ParameterValue>,
    pub output_size: Option<u64>,
    /// No candidate fit and the minimum was used.
    pub forced: bool,
    /// Number of encode calls performed.
    pub attempts: usize,
    /// Describes the chosen parameter, e.g. "quality=70" or "minimum quality=20".
    pub status_message: String,
}

/// Runs ladder searches and reports each attempt to an event sink.
#[derive(Clone)]
pub struct SearchEngine {
    sink: Arc<dyn EventSink>,
}

impl SearchEngine {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Searches `ladder` for the first candidate whose output fits `ceiling`.
    ///
    /// `make_params` turns a ladder value into the full parameter record for
    /// one attempt. Anything it sets besides the ladder value stays the same
    /// on every attempt.
    ///
    /// An encode failure aborts the search and is returned as-is. No trial
    /// file is left behind in any case.
    #[allow(clippy::too_many_arguments)]
    pub async fn search<E, P, F>(
        &self,
        request_id: &str,
        encoder: &E,
        source: &Path,
        destination: &Path,
        ladder: &CandidateLadder,
        ceiling: u64,
        make_params: F,
    ) -> Result<SearchOutcome, EncodeError>
    where
        E: Encoder<P> + ?Sized,
        P: Send + Sync,
        F: Fn(ParameterValue) -> P,
    {
        if ceiling == 0 {
            return Err(EncodeError::invalid_params("size ceiling must be positive"));
        }

        let last = ladder.len();
        for (index, candidate) in ladder.iter().copied().enumerate() {
            let attempt = index + 1;
            let trial = trial_path(destination, request_id, attempt);
            let params = make_params(candidate);

            let size = match encoder.encode(source, &trial, &params).await {
                Ok(size) => size,
                Err(e) => {
                    remove_staged(&trial).await;
                    tracing::debug!(
                        request_id,
                        attempt,
                        parameter = %candidate,
                        error = %e,
                        "Candidate encode failed, aborting search"
                    );
                    return Err(e);
                }
            };

            let fits = size <= ceiling;
            tracing::debug!(
                request_id,
                encoder = encoder.name(),
                attempt,
                parameter = %candidate,
                size,
                ceiling,
                fits,
                "Candidate tried"
            );
            self.sink.record(ConversionEvent::CandidateTried {
                request_id: request_id.to_string(),
                attempt,
                parameter: candidate,
                size_bytes: size,
                ceiling_bytes: ceiling,
                fits,
            });

            let is_last = attempt == last;
            if fits || is_last {
                if let Err(e) = tokio::fs::rename(&trial, destination).await {
                    remove_staged(&trial).await;
                    return Err(EncodeError::Io(e));
                }
                let forced = !fits;
                let status_message = if forced {
                    format!("minimum {}", candidate)
                } else {
                    candidate.to_string()
                };
                return Ok(SearchOutcome {
                    succeeded: true,
                    chosen_parameter: Some(candidate),
                    output_size: Some(size),
                    forced,
                    attempts: attempt,
                    status_message,
                });
            }

            remove_staged(&trial).await;
        }

        // Unreachable for a ladder built through `CandidateLadder::new`.
        Err(EncodeError::invalid_params("candidate ladder is empty"))
    }
}

/// Per-run scratch path next to the destination: `<stem>.<run_id>.<tag>.<ext>`.
///
/// The run id keeps requests that share a destination name apart. The
/// extension is kept so ffmpeg and pandoc can infer the output format.
pub fn staging_path(destination: &Path, run_id: &str, tag: &str) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match destination.extension() {
        Some(ext) => format!("{}.{}.{}.{}", stem, run_id, tag, ext.to_string_lossy()),
        None => format!("{}.{}.{}", stem, run_id, tag),
    };
    destination.with_file_name(name)
}

/// Trial output path for one search attempt.
pub fn trial_path(destination: &Path, run_id: &str, attempt: usize) -> PathBuf {
    staging_path(destination, run_id, &format!("trial-{}", attempt))
}

pub(crate) async fn remove_staged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove staging file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{AudioParams, Bitrate, ImageParams};
    use crate::events::NullSink;
    use crate::testing::MockEncoder;

    fn engine() -> SearchEngine {
        SearchEngine::new(Arc::new(NullSink))
    }

    fn image_params(value: ParameterValue) -> ImageParams {
        ImageParams::new("jpg").with_quality(value.as_quality().unwrap_or(85))
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_trial_path_keeps_extension() {
        assert_eq!(
            trial_path(Path::new("/out/clip.mp4"), "r1", 3),
            PathBuf::from("/out/clip.r1.trial-3.mp4")
        );
        assert_eq!(
            trial_path(Path::new("/out/noext"), "r1", 1),
            PathBuf::from("/out/noext.r1.trial-1")
        );
    }

    #[test]
    fn test_trial_paths_differ_between_runs() {
        let dest = Path::new("/out/converted_photo.jpg");
        assert_ne!(trial_path(dest, "a", 1), trial_path(dest, "b", 1));
    }

    #[tokio::test]
    async fn test_concurrent_searches_share_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.jpg");
        let encoder = MockEncoder::new().with_delay(std::time::Duration::from_millis(20));
        let engine = engine();

        let first = engine.search(
            "first",
            &encoder,
            Path::new("/in.png"),
            &dest,
            CandidateLadder::image(),
            60_000,
            image_params,
        );
        let second = engine.search(
            "second",
            &encoder,
            Path::new("/in.png"),
            &dest,
            CandidateLadder::image(),
            60_000,
            image_params,
        );
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().chosen_parameter, Some(ParameterValue::Quality(60)));
        assert_eq!(second.unwrap().chosen_parameter, Some(ParameterValue::Quality(60)));
        assert_eq!(encoder.call_count().await, 16);
        assert_eq!(dir_entries(dir.path()), vec!["out.jpg"]);
    }

    #[tokio::test]
    async fn test_large_ceiling_takes_first_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.jpg");
        let encoder = MockEncoder::new();

        let outcome = engine()
            .search(
                "req",
                &encoder,
                Path::new("/in.png"),
                &dest,
                CandidateLadder::image(),
                u64::MAX,
                image_params,
            )
            .await
            .unwrap();

        assert_eq!(outcome.chosen_parameter, Some(ParameterValue::Quality(95)));
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.forced);
        assert_eq!(outcome.status_message, "quality=95");
        assert_eq!(encoder.call_count().await, 1);
        assert_eq!(dir_entries(dir.path()), vec!["out.jpg"]);
    }

    #[tokio::test]
    async fn test_tiny_ceiling_forces_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.mp3");
        let encoder = MockEncoder::new();

        let outcome = engine()
            .search(
                "req",
                &encoder,
                Path::new("/in.wav"),
                &dest,
                CandidateLadder::audio(),
                1,
                |v| AudioParams::new("mp3").with_bitrate(v.as_bitrate().unwrap_or(Bitrate::kbps(128))),
            )
            .await
            .unwrap();

        assert!(outcome.succeeded);
        assert!(outcome.forced);
        assert_eq!(outcome.attempts, 5);
        assert_eq!(outcome.status_message, "minimum bitrate=96k");
        assert_eq!(encoder.call_count().await, 5);
        assert_eq!(
            std::fs::metadata(&dest).unwrap().len(),
            outcome.output_size.unwrap()
        );
        assert_eq!(dir_entries(dir.path()), vec!["out.mp3"]);
    }

    #[tokio::test]
    async fn test_encode_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.jpg");
        let encoder = MockEncoder::new().fail_on_call(3);

        let result = engine()
            .search(
                "req",
                &encoder,
                Path::new("/in.png"),
                &dest,
                CandidateLadder::image(),
                1,
                image_params,
            )
            .await;

        assert!(matches!(result, Err(EncodeError::EncodeFailed { .. })));
        assert_eq!(encoder.call_count().await, 3);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_zero_ceiling_rejected_without_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = MockEncoder::new();

        let result = engine()
            .search(
                "req",
                &encoder,
                Path::new("/in.png"),
                &dir.path().join("out.jpg"),
                CandidateLadder::image(),
                0,
                image_params,
            )
            .await;

        assert!(matches!(result, Err(EncodeError::InvalidParams { .. })));
        assert_eq!(encoder.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_single_candidate_ladder_is_forced_path() {
        let dir = tempfile::tempdir().unwrap();
        let ladder = CandidateLadder::new(vec![ParameterValue::Quality(50)]).unwrap();
        let encoder = MockEncoder::new();

        let outcome = engine()
            .search(
                "req",
                &encoder,
                Path::new("/in.png"),
                &dir.path().join("out.jpg"),
                &ladder,
                1,
                image_params,
            )
            .await
            .unwrap();

        assert!(outcome.forced);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(encoder.call_count().await, 1);
    }
}
