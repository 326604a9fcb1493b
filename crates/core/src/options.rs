//! Conversion options as submitted by a client.
//!
//! Raw values arrive as strings from a form. Each one is parsed on its own;
//! a malformed value is logged and dropped so that one bad field never fails
//! the whole request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::converter::{Bitrate, GpuVendor, Resolution};

/// A single option value that could not be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("{field}: not a number: {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error("{field}: out of range: {value:?}")]
    OutOfRange { field: &'static str, value: String },

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Unparsed option values, exactly as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOptions {
    /// Target size in kilobytes. Fractions are allowed.
    pub target_size: Option<String>,
    pub target_bitrate: Option<String>,
    pub target_resolution: Option<String>,
    pub quality: Option<String>,
    pub gpu: Option<String>,
}

/// Validated conversion options. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsRecord {
    pub target_size_bytes: Option<u64>,
    pub target_bitrate: Option<Bitrate>,
    pub target_resolution: Option<Resolution>,
    /// Quality used when compressing without a size target (1-100).
    pub basic_quality: Option<u8>,
    pub gpu: GpuVendor,
}

impl OptionsRecord {
    /// Parses raw values, dropping any that are malformed.
    pub fn from_raw(raw: &RawOptions) -> Self {
        Self {
            target_size_bytes: keep(parse_target_size(raw.target_size.as_deref())),
            target_bitrate: keep(parse_field(
                "target_bitrate",
                raw.target_bitrate.as_deref(),
                |s| s.parse::<Bitrate>().map_err(|e| e.to_string()),
            )),
            target_resolution: keep(parse_field(
                "target_resolution",
                raw.target_resolution.as_deref(),
                |s| s.parse::<Resolution>().map_err(|e| e.to_string()),
            )),
            basic_quality: keep(parse_quality(raw.quality.as_deref())),
            gpu: keep(parse_field("gpu", raw.gpu.as_deref(), |s| {
                s.parse::<GpuVendor>().map_err(|e| e.to_string())
            }))
            .unwrap_or_default(),
        }
    }

    pub fn with_target_size(mut self, bytes: u64) -> Self {
        self.target_size_bytes = (bytes > 0).then_some(bytes);
        self
    }

    pub fn with_target_bitrate(mut self, bitrate: Bitrate) -> Self {
        self.target_bitrate = Some(bitrate);
        self
    }

    pub fn with_target_resolution(mut self, resolution: Resolution) -> Self {
        self.target_resolution = Some(resolution);
        self
    }

    pub fn with_basic_quality(mut self, quality: u8) -> Self {
        self.basic_quality = Some(quality.clamp(1, 100));
        self
    }

    pub fn with_gpu(mut self, gpu: GpuVendor) -> Self {
        self.gpu = gpu;
        self
    }
}

/// Logs and discards a rejected value.
fn keep<T>(parsed: Result<Option<T>, OptionError>) -> Option<T> {
    match parsed {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed conversion option");
            None
        }
    }
}

/// Blank and missing values are both treated as absent.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_field<T>(
    field: &'static str,
    value: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<Option<T>, OptionError> {
    match non_blank(value) {
        None => Ok(None),
        Some(s) => parse(s)
            .map(Some)
            .map_err(|reason| OptionError::Invalid { field, reason }),
    }
}

fn parse_target_size(value: Option<&str>) -> Result<Option<u64>, OptionError> {
    let Some(s) = non_blank(value) else {
        return Ok(None);
    };
    let kb: f64 = s.parse().map_err(|_| OptionError::NotANumber {
        field: "target_size",
        value: s.to_string(),
    })?;
    if !kb.is_finite() || kb < 0.0 {
        return Err(OptionError::OutOfRange {
            field: "target_size",
            value: s.to_string(),
        });
    }
    let bytes = (kb * 1024.0) as u64;
    // A zero ceiling means "no size target".
    Ok((bytes > 0).then_some(bytes))
}

fn parse_quality(value: Option<&str>) -> Result<Option<u8>, OptionError> {
    let Some(s) = non_blank(value) else {
        return Ok(None);
    };
    let quality: i64 = s.parse().map_err(|_| OptionError::NotANumber {
        field: "quality",
        value: s.to_string(),
    })?;
    if !(1..=100).contains(&quality) {
        return Err(OptionError::OutOfRange {
            field: "quality",
            value: s.to_string(),
        });
    }
    Ok(Some(quality as u8))
}
