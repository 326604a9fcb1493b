//! Dispatcher scenario tests.
//!
//! These tests drive full requests through the dispatcher with a mock encoder:
//! - A: image ceiling equal to the quality 70 output
//! - B: audio ceiling below the smallest bitrate
//! - C: video search on NVIDIA with a fixed resolution
//! - D: advanced request without a size target
//! - E: unrecognized destination extension
//! plus idempotence and job runner timeouts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use sizefit_core::{
    converter::{Bitrate, GpuVendor, Resolution},
    events::{create_event_system, EventFilter, MemoryEventStore, NullSink},
    testing::{fixtures, MockEncoder, RecordedParams},
    ConversionRequest, Dispatcher, EventStore, JobError, JobRunner, JobsConfig, OptionsRecord,
    ParameterValue, RawOptions,
};

struct TestHarness {
    dispatcher: Dispatcher,
    encoder: MockEncoder,
    dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let encoder = MockEncoder::new();
        let dispatcher = Dispatcher::with_encoder(encoder.clone(), Arc::new(NullSink));
        Self {
            dispatcher,
            encoder,
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn source(&self, name: &str) -> PathBuf {
        fixtures::source_file(self.dir.path(), name).expect("write source")
    }

    fn dest(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn sized(bytes: u64) -> OptionsRecord {
    OptionsRecord::default().with_target_size(bytes)
}

#[tokio::test]
async fn scenario_a_image_stops_at_quality_70() {
    let h = TestHarness::new();
    let request = ConversionRequest::new(h.source("photo.png"), h.dest("photo.jpg"))
        .with_advanced(true)
        .with_options(sized(70_000));

    let outcome = h.dispatcher.dispatch(&request).await;

    assert!(outcome.success);
    assert_eq!(outcome.chosen_parameter, Some(ParameterValue::Quality(70)));
    assert_eq!(outcome.attempts, 6);
    assert_eq!(h.encoder.call_count().await, 6);
    assert_eq!(
        outcome.message,
        "Image converted with advanced compression (quality=70)"
    );
    assert_eq!(std::fs::metadata(h.dest("photo.jpg")).unwrap().len(), 70_000);
}

#[tokio::test]
async fn scenario_b_audio_forced_at_96k() {
    let h = TestHarness::new();
    let request = ConversionRequest::new(h.source("song.wav"), h.dest("song.mp3"))
        .with_advanced(true)
        .with_options(sized(9_599));

    let outcome = h.dispatcher.dispatch(&request).await;

    assert!(outcome.success);
    assert!(outcome.forced);
    assert_eq!(h.encoder.call_count().await, 5);
    assert_eq!(
        outcome.chosen_parameter,
        Some(ParameterValue::Bitrate(Bitrate::kbps(96)))
    );
    assert_eq!(
        outcome.message,
        "Audio converted with advanced compression (minimum bitrate=96k)"
    );
}

#[tokio::test]
async fn scenario_c_video_nvidia_resolution_fixed() {
    let h = TestHarness::new();
    let options = sized(150_000)
        .with_gpu(GpuVendor::Nvidia)
        .with_target_resolution(Resolution::new(1280, 720))
        .with_target_bitrate(Bitrate::kbps(8000));
    let request = ConversionRequest::new(h.source("clip.mkv"), h.dest("clip.mp4"))
        .with_advanced(true)
        .with_options(options);

    let outcome = h.dispatcher.dispatch(&request).await;

    assert!(outcome.success);
    assert_eq!(
        outcome.chosen_parameter,
        Some(ParameterValue::Bitrate(Bitrate::kbps(1500)))
    );

    let calls = h.encoder.recorded_calls().await;
    assert_eq!(calls.len(), 3);
    let bitrates: Vec<u32> = calls
        .iter()
        .map(|call| match &call.params {
            RecordedParams::Video(p) => {
                assert_eq!(p.ffmpeg_codec(), "h264_nvenc");
                assert_eq!(p.resolution, Some(Resolution::new(1280, 720)));
                p.bitrate.map(|b| b.as_kbps()).unwrap_or(0)
            }
            other => panic!("unexpected params {:?}", other),
        })
        .collect();
    // The ladder value replaces the requested bitrate on every attempt.
    assert_eq!(bitrates, vec![2500, 2000, 1500]);
}

#[tokio::test]
async fn scenario_d_no_target_size_single_encode() {
    let h = TestHarness::new();
    let raw = RawOptions {
        target_size: Some("".to_string()),
        target_bitrate: Some("192k".to_string()),
        ..RawOptions::default()
    };
    let request = ConversionRequest::new(h.source("song.flac"), h.dest("song.ogg"))
        .with_advanced(true)
        .with_options(OptionsRecord::from_raw(&raw));

    let outcome = h.dispatcher.dispatch(&request).await;

    assert!(outcome.success);
    assert_eq!(outcome.message, "Audio conversion successful");
    assert_eq!(outcome.chosen_parameter, None);
    assert_eq!(h.encoder.call_count().await, 1);
}

#[tokio::test]
async fn scenario_e_unknown_extension_copied() {
    let h = TestHarness::new();
    let source = h.source("archive.bin");
    let request = ConversionRequest::new(&source, h.dest("archive.xyz"))
        .with_advanced(true)
        .with_options(sized(1));

    let outcome = h.dispatcher.dispatch(&request).await;

    assert!(outcome.success);
    assert_eq!(
        outcome.message,
        "File copied without conversion (unsupported file type)"
    );
    assert_eq!(h.encoder.call_count().await, 0);
    assert_eq!(
        std::fs::read(h.dest("archive.xyz")).unwrap(),
        std::fs::read(&source).unwrap()
    );
}

#[tokio::test]
async fn dispatch_is_idempotent() {
    let h = TestHarness::new();
    let request = ConversionRequest::new(h.source("photo.bmp"), h.dest("photo.jpeg"))
        .with_advanced(true)
        .with_options(sized(42_000));

    let first = h.dispatcher.dispatch(&request).await;
    let second = h.dispatcher.dispatch(&request).await;

    assert_eq!(first, second);
    assert_eq!(first.chosen_parameter, Some(ParameterValue::Quality(40)));
}

#[tokio::test]
async fn dispatch_leaves_only_destination() {
    let h = TestHarness::new();
    let source = h.source("photo.png");
    let before = fixtures::dir_listing(h.dir.path());

    let request = ConversionRequest::new(&source, h.dest("small.jpg"))
        .with_advanced(true)
        .with_options(sized(1));
    h.dispatcher.dispatch(&request).await;

    let mut expected = before;
    expected.push("small.jpg".to_string());
    expected.sort();
    assert_eq!(fixtures::dir_listing(h.dir.path()), expected);
}

#[tokio::test]
async fn dispatch_events_recorded() {
    let dir = TempDir::new().unwrap();
    let source = fixtures::source_file(dir.path(), "in.png").unwrap();

    let store = Arc::new(MemoryEventStore::new(100));
    let (handle, writer) = create_event_system(store.clone(), 64);
    let writer_task = tokio::spawn(writer.run());

    let dispatcher = Dispatcher::with_encoder(MockEncoder::new(), Arc::new(handle));
    let request = ConversionRequest::new(&source, dir.path().join("out.jpg"))
        .with_id("req-events")
        .with_advanced(true)
        .with_options(sized(85_000));
    dispatcher.dispatch(&request).await;

    drop(dispatcher);
    writer_task.await.unwrap();

    let types: Vec<String> = store
        .query(&EventFilter::new().with_request_id("req-events"))
        .into_iter()
        .rev()
        .map(|r| r.event_type)
        .collect();
    assert_eq!(
        types,
        vec![
            "conversion_started",
            "candidate_tried",
            "candidate_tried",
            "candidate_tried",
            "conversion_finished"
        ]
    );
}

#[tokio::test]
async fn job_runner_times_out_without_cancelling() {
    let dir = TempDir::new().unwrap();
    let source = fixtures::source_file(dir.path(), "in.mkv").unwrap();
    let encoder = MockEncoder::new().with_delay(Duration::from_millis(150));
    let dispatcher = Arc::new(Dispatcher::with_encoder(encoder.clone(), Arc::new(NullSink)));
    let runner = JobRunner::new(
        JobsConfig::default().with_timeout_secs(1),
        dispatcher,
        Arc::new(NullSink),
    );

    let result = runner
        .run_with_timeout(
            ConversionRequest::new(&source, dir.path().join("out.webm")),
            Duration::from_millis(10),
        )
        .await;
    assert_eq!(result, Err(JobError::Timeout { timeout_secs: 0 }));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(encoder.call_count().await, 1);
    assert!(dir.path().join("out.webm").exists());
}
