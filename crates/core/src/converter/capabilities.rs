//! Hardware encoder capability detection.

use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

use super::config::ConverterConfig;
use super::types::GpuVendor;

/// Hardware H.264 encoders detected on the system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderCapabilities {
    /// ffmpeg could be executed at all.
    pub ffmpeg_available: bool,
    /// NVIDIA NVENC H.264 available
    pub h264_nvenc: bool,
    /// AMD AMF H.264 available
    pub h264_amf: bool,
}

impl EncoderCapabilities {
    /// Detect available hardware encoders by probing ffmpeg.
    pub async fn detect(config: &ConverterConfig) -> Self {
        let output = Command::new(&config.ffmpeg_path)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(o) if o.status.success() => Self::from_encoder_list(&String::from_utf8_lossy(&o.stdout)),
            _ => Self::default(),
        }
    }

    /// Parses the output of `ffmpeg -encoders`.
    pub fn from_encoder_list(stdout: &str) -> Self {
        Self {
            ffmpeg_available: true,
            h264_nvenc: stdout.contains("h264_nvenc"),
            h264_amf: stdout.contains("h264_amf"),
        }
    }

    /// Whether the requested vendor's encoder is present.
    ///
    /// `GpuVendor::None` is always supported when ffmpeg is.
    pub fn supports(&self, vendor: GpuVendor) -> bool {
        match vendor {
            GpuVendor::None => self.ffmpeg_available,
            GpuVendor::Nvidia => self.h264_nvenc,
            GpuVendor::Amd => self.h264_amf,
        }
    }

    /// Check if any hardware encoder is available.
    pub fn has_hardware_encoder(&self) -> bool {
        self.h264_nvenc || self.h264_amf
    }
}
