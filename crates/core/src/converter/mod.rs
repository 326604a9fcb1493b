//! Encoder adapters for media conversion.
//!
//! Each media category is backed by one adapter implementing [`Encoder`]:
//!
//! - Images: [`ImageEncoder`], in-process through the `image` crate
//! - Audio and video: [`FfmpegEncoder`], an ffmpeg subprocess per attempt
//! - Documents: [`PandocConverter`], a pandoc subprocess
//!
//! Adapters never retry. The search engine calls `encode` once per ladder
//! candidate and inspects the returned byte size.
//!
//! # Example
//!
//! ```ignore
//! use sizefit_core::converter::{AudioParams, Bitrate, Encoder, FfmpegEncoder};
//!
//! let encoder = FfmpegEncoder::with_defaults();
//! let params = AudioParams::new("mp3").with_bitrate(Bitrate::kbps(192));
//! let size = encoder.encode(&input, &output, &params).await?;
//! println!("wrote {} bytes", size);
//! ```

mod capabilities;
mod config;
mod error;
mod ffmpeg;
mod pandoc;
mod raster;
mod traits;
mod types;

pub use capabilities::EncoderCapabilities;
pub use config::ConverterConfig;
pub use error::EncodeError;
pub use ffmpeg::FfmpegEncoder;
pub use pandoc::PandocConverter;
pub use raster::{is_jpeg_family, ImageEncoder};
pub use traits::Encoder;
pub use types::{
    AudioParams, Bitrate, DocumentParams, GpuVendor, ImageParams, MediaCategory, Resolution,
    VideoParams,
};
