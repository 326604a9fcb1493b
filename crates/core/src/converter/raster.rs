//! In-process image encoder built on the `image` crate.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::error::EncodeError;
use super::traits::Encoder;
use super::types::ImageParams;

/// Whether an extension belongs to the JPEG family.
pub fn is_jpeg_family(format: &str) -> bool {
    matches!(format, "jpg" | "jpeg")
}

/// Image encoder that decodes the source and re-encodes it in-process.
///
/// Decoding and encoding are CPU bound and run on the blocking thread pool.
#[derive(Debug, Clone, Default)]
pub struct ImageEncoder;

impl ImageEncoder {
    pub fn new() -> Self {
        Self
    }

    fn output_format(format: &str) -> Result<ImageFormat, EncodeError> {
        ImageFormat::from_extension(format).ok_or_else(|| EncodeError::UnsupportedFormat {
            format: format.to_string(),
        })
    }

    fn encode_blocking(
        source: PathBuf,
        destination: PathBuf,
        params: ImageParams,
    ) -> Result<u64, EncodeError> {
        if !source.exists() {
            return Err(EncodeError::InputNotFound { path: source });
        }

        let format = Self::output_format(&params.format)?;
        let img = image::open(&source)?;

        match (format, params.quality) {
            (ImageFormat::Jpeg, quality) => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                let file = BufWriter::new(File::create(&destination)?);
                let encoder = match quality {
                    Some(q) => JpegEncoder::new_with_quality(file, q.clamp(1, 100)),
                    None => JpegEncoder::new(file),
                };
                rgb.write_with_encoder(encoder)?;
            }
            (format, _) => {
                img.save_with_format(&destination, format)?;
            }
        }

        Ok(std::fs::metadata(&destination)?.len())
    }
}

#[async_trait]
impl Encoder<ImageParams> for ImageEncoder {
    fn name(&self) -> &str {
        "image"
    }

    async fn encode(
        &self,
        source: &Path,
        destination: &Path,
        params: &ImageParams,
    ) -> Result<u64, EncodeError> {
        let source = source.to_path_buf();
        let destination = destination.to_path_buf();
        let params = params.clone();

        tokio::task::spawn_blocking(move || Self::encode_blocking(source, destination, params))
            .await
            .map_err(|e| EncodeError::encode_failed(format!("image task failed: {}", e), None))?
    }
}
