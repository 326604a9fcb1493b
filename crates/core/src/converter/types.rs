//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::EncodeError;

/// Broad category of a file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    Image,
    Audio,
    Video,
    Document,
    /// Anything the dispatcher does not know how to transform.
    Opaque,
}

impl MediaCategory {
    /// Human-readable label used at the start of status messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Audio => "Audio",
            Self::Video => "Video",
            Self::Document => "Document",
            Self::Opaque => "File",
        }
    }

    /// Metric/event label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
            Self::Opaque => "opaque",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitrate in kilobits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bitrate(u32);

impl Bitrate {
    /// Creates a bitrate from a kbps value.
    pub const fn kbps(kbps: u32) -> Self {
        Self(kbps)
    }

    /// Returns the value in kbps.
    pub fn as_kbps(&self) -> u32 {
        self.0
    }

    /// Returns the ffmpeg-style argument (e.g. "192k").
    pub fn to_ffmpeg_arg(&self) -> String {
        format!("{}k", self.0)
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}k", self.0)
    }
}

impl FromStr for Bitrate {
    type Err = EncodeError;

    /// Accepts "192k", "192K", "2M" and bare bits-per-second values ("192000").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || EncodeError::invalid_params(format!("invalid bitrate: {:?}", s));

        let (digits, multiplier_kbps) = match s.chars().last() {
            Some('k') | Some('K') => (&s[..s.len() - 1], Some(1)),
            Some('m') | Some('M') => (&s[..s.len() - 1], Some(1000)),
            _ => (s, None),
        };

        let value: u64 = digits.parse().map_err(|_| invalid())?;
        let kbps = match multiplier_kbps {
            Some(mult) => value.checked_mul(mult).ok_or_else(invalid)?,
            // Bare numbers are bits per second.
            None => value / 1000,
        };

        if kbps == 0 || kbps > u32::MAX as u64 {
            return Err(invalid());
        }
        Ok(Self(kbps as u32))
    }
}

/// Target output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = EncodeError;

    /// Parses "1280x720" (case-insensitive separator).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EncodeError::invalid_params(format!("invalid resolution: {:?}", s));
        let lower = s.trim().to_ascii_lowercase();
        let (w, h) = lower.split_once('x').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// GPU vendor used to pick a hardware video encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuVendor {
    #[default]
    None,
    Nvidia,
    Amd,
}

impl GpuVendor {
    /// Returns the H.264 encoder for this vendor.
    pub fn h264_encoder(&self) -> &'static str {
        match self {
            Self::None => "libx264",
            Self::Nvidia => "h264_nvenc",
            Self::Amd => "h264_amf",
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for GpuVendor {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "cpu" => Ok(Self::None),
            "nvidia" | "nvenc" | "cuda" => Ok(Self::Nvidia),
            "amd" | "amf" => Ok(Self::Amd),
            other => Err(EncodeError::invalid_params(format!(
                "unknown gpu vendor: {:?}",
                other
            ))),
        }
    }
}

/// Parameters for a single image encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageParams {
    /// Destination extension (lowercase, without dot).
    pub format: String,
    /// JPEG quality (1-100). `None` means format default.
    pub quality: Option<u8>,
}

impl ImageParams {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// Parameters for a single audio encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioParams {
    /// Destination extension (lowercase, without dot).
    pub format: String,
    /// Target bitrate. `None` means codec default.
    pub bitrate: Option<Bitrate>,
}

impl AudioParams {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            bitrate: None,
        }
    }

    pub fn with_bitrate(mut self, bitrate: Bitrate) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Returns the ffmpeg audio codec for the destination format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        audio_codec_for(&self.format)
    }

    /// Whether the destination format ignores bitrate.
    pub fn is_lossless(&self) -> bool {
        matches!(self.format.as_str(), "flac" | "wav")
    }
}

/// Parameters for a single video encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoParams {
    /// Destination container extension (lowercase, without dot).
    pub container: String,
    /// Target video bitrate. `None` means codec default.
    pub bitrate: Option<Bitrate>,
    /// Output resolution. `None` keeps the source resolution.
    pub resolution: Option<Resolution>,
    /// Hardware encoder vendor.
    pub gpu: GpuVendor,
}

impl VideoParams {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            bitrate: None,
            resolution: None,
            gpu: GpuVendor::None,
        }
    }

    pub fn with_bitrate(mut self, bitrate: Bitrate) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_gpu(mut self, gpu: GpuVendor) -> Self {
        self.gpu = gpu;
        self
    }

    /// Returns the ffmpeg video codec.
    ///
    /// MP4, MOV and MKV get H.264 (vendor specific when a GPU is selected),
    /// WebM gets VP9 and the legacy containers use their native codecs.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self.container.as_str() {
            "webm" => "libvpx-vp9",
            "avi" => "mpeg4",
            "wmv" => "wmv2",
            "mpeg" | "mpg" => "mpeg2video",
            _ => self.gpu.h264_encoder(),
        }
    }

    /// Returns the ffmpeg audio codec for the container's audio track.
    pub fn ffmpeg_audio_codec(&self) -> &'static str {
        match self.container.as_str() {
            "webm" => "libopus",
            "avi" | "mpeg" | "mpg" => "libmp3lame",
            "wmv" => "wmav2",
            _ => "aac",
        }
    }
}

/// Parameters for a document pass-through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentParams {
    /// Destination extension (lowercase, without dot).
    pub format: String,
}

impl DocumentParams {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

fn audio_codec_for(format: &str) -> &'static str {
    match format {
        "mp3" => "libmp3lame",
        "ogg" => "libvorbis",
        "opus" => "libopus",
        "flac" => "flac",
        "wav" => "pcm_s16le",
        "aac" | "m4a" => "aac",
        _ => "aac",
    }
}
