//! FFmpeg-based audio and video encoder.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::config::ConverterConfig;
use super::error::EncodeError;
use super::traits::Encoder;
use super::types::{AudioParams, VideoParams};

/// Maximum number of stderr lines kept for diagnostics.
const MAX_STDERR_LINES: usize = 20;

/// FFmpeg-based encoder for audio and video.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    config: ConverterConfig,
}

impl FfmpegEncoder {
    /// Creates a new FFmpeg encoder with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates an encoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Builds ffmpeg arguments for audio conversion.
    fn build_audio_args(&self, input: &Path, output: &Path, params: &AudioParams) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            // Drop embedded cover art so only the audio stream counts toward size
            "-vn".to_string(),
            "-c:a".to_string(),
            params.ffmpeg_codec().to_string(),
        ];

        if !params.is_lossless() {
            if let Some(bitrate) = params.bitrate {
                args.extend(["-b:a".to_string(), bitrate.to_ffmpeg_arg()]);
            }
        }

        self.push_common_args(&mut args, output);
        args
    }

    /// Builds ffmpeg arguments for video conversion.
    fn build_video_args(&self, input: &Path, output: &Path, params: &VideoParams) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-c:v".to_string(),
            params.ffmpeg_codec().to_string(),
        ];

        if let Some(bitrate) = params.bitrate {
            args.extend(["-b:v".to_string(), bitrate.to_ffmpeg_arg()]);
        }

        if let Some(resolution) = params.resolution {
            args.extend([
                "-vf".to_string(),
                format!("scale={}:{}", resolution.width, resolution.height),
            ]);
        }

        args.extend([
            "-c:a".to_string(),
            params.ffmpeg_audio_codec().to_string(),
        ]);

        self.push_common_args(&mut args, output);
        args
    }

    fn push_common_args(&self, args: &mut Vec<String>, output: &Path) {
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());
        args.push(output.to_string_lossy().to_string());
    }

    /// Runs ffmpeg with the given arguments and returns the output size.
    async fn run(&self, input: &Path, output: &Path, args: Vec<String>) -> Result<u64, EncodeError> {
        if !tokio::fs::try_exists(input).await.unwrap_or(false) {
            return Err(EncodeError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let start = Instant::now();
        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EncodeError::EncoderNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    EncodeError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EncodeError::encode_failed("ffmpeg stderr was not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut error_lines: Vec<String> = Vec::new();
            while let Ok(Some(line)) = reader.next_line().await {
                if error_lines.len() < MAX_STDERR_LINES {
                    error_lines.push(line);
                }
            }
            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, Vec<String>), std::io::Error>((status, error_lines))
        })
        .await;

        match result {
            Ok(Ok((status, error_lines))) => {
                if !status.success() {
                    let stderr = if error_lines.is_empty() {
                        None
                    } else {
                        Some(error_lines.join("\n"))
                    };
                    return Err(EncodeError::encode_failed(
                        format!("ffmpeg exited with code: {:?}", status.code()),
                        stderr,
                    ));
                }
            }
            Ok(Err(e)) => return Err(EncodeError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(EncodeError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        let meta = tokio::fs::metadata(output)
            .await
            .map_err(|_| EncodeError::encode_failed("Output file not created", None))?;

        tracing::debug!(
            output = %output.display(),
            size = meta.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ffmpeg encode finished"
        );

        Ok(meta.len())
    }
}

#[async_trait]
impl Encoder<AudioParams> for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn encode(
        &self,
        source: &Path,
        destination: &Path,
        params: &AudioParams,
    ) -> Result<u64, EncodeError> {
        let args = self.build_audio_args(source, destination, params);
        self.run(source, destination, args).await
    }
}

#[async_trait]
impl Encoder<VideoParams> for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn encode(
        &self,
        source: &Path,
        destination: &Path,
        params: &VideoParams,
    ) -> Result<u64, EncodeError> {
        let args = self.build_video_args(source, destination, params);
        self.run(source, destination, args).await
    }
}
