//! Candidate ladders: ordered parameter values tried by the size search.
//!
//! A ladder is a static policy table. It runs from the value expected to
//! produce the largest output to the one expected to produce the smallest,
//! and its last element is the minimum acceptable fallback.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::converter::Bitrate;

/// A single searchable encode parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    /// JPEG-style quality percentage.
    Quality(u8),
    /// Target bitrate.
    Bitrate(Bitrate),
}

impl ParameterValue {
    /// Name of the parameter as shown in status messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Quality(_) => "quality",
            Self::Bitrate(_) => "bitrate",
        }
    }

    /// Numeric key used to check ladder ordering.
    fn magnitude(&self) -> u32 {
        match self {
            Self::Quality(q) => *q as u32,
            Self::Bitrate(b) => b.as_kbps(),
        }
    }

    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn as_quality(&self) -> Option<u8> {
        match self {
            Self::Quality(q) => Some(*q),
            Self::Bitrate(_) => None,
        }
    }

    pub fn as_bitrate(&self) -> Option<Bitrate> {
        match self {
            Self::Bitrate(b) => Some(*b),
            Self::Quality(_) => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quality(q) => write!(f, "quality={}", q),
            Self::Bitrate(b) => write!(f, "bitrate={}", b),
        }
    }
}

/// Errors raised when building a ladder that violates its invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LadderError {
    #[error("ladder must contain at least one candidate")]
    Empty,

    #[error("ladder mixes parameter kinds at position {index}")]
    MixedKinds { index: usize },

    #[error("ladder is not strictly decreasing at position {index}")]
    NotDecreasing { index: usize },
}

/// An ordered, non-empty, strictly decreasing sequence of candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateLadder {
    steps: Vec<ParameterValue>,
}

impl CandidateLadder {
    /// Builds a ladder, validating ordering and homogeneity.
    pub fn new(steps: Vec<ParameterValue>) -> Result<Self, LadderError> {
        let first = steps.first().ok_or(LadderError::Empty)?;

        for (index, pair) in steps.windows(2).enumerate() {
            if !first.same_kind(&pair[1]) {
                return Err(LadderError::MixedKinds { index: index + 1 });
            }
            if pair[1].magnitude() >= pair[0].magnitude() {
                return Err(LadderError::NotDecreasing { index: index + 1 });
            }
        }

        Ok(Self { steps })
    }

    /// JPEG quality ladder: 95 down to 20 in steps of 5.
    pub fn image() -> &'static CandidateLadder {
        &IMAGE_LADDER
    }

    /// Audio bitrate ladder: 320k, 256k, 192k, 128k, 96k.
    pub fn audio() -> &'static CandidateLadder {
        &AUDIO_LADDER
    }

    /// Video bitrate ladder: 2500k down to 500k.
    pub fn video() -> &'static CandidateLadder {
        &VIDEO_LADDER
    }

    pub fn steps(&self) -> &[ParameterValue] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Never true for a ladder built through `new`.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The minimum acceptable candidate.
    pub fn minimum(&self) -> ParameterValue {
        // Non-empty by construction.
        self.steps[self.steps.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterValue> {
        self.steps.iter()
    }
}

const IMAGE_QUALITY_MAX: u8 = 95;
const IMAGE_QUALITY_MIN: u8 = 20;
const IMAGE_QUALITY_STEP: usize = 5;

const AUDIO_BITRATES_KBPS: [u32; 5] = [320, 256, 192, 128, 96];
const VIDEO_BITRATES_KBPS: [u32; 5] = [2500, 2000, 1500, 1000, 500];

static IMAGE_LADDER: Lazy<CandidateLadder> = Lazy::new(|| CandidateLadder {
    steps: (IMAGE_QUALITY_MIN..=IMAGE_QUALITY_MAX)
        .rev()
        .step_by(IMAGE_QUALITY_STEP)
        .map(ParameterValue::Quality)
        .collect(),
});

static AUDIO_LADDER: Lazy<CandidateLadder> = Lazy::new(|| CandidateLadder {
    steps: bitrate_steps(&AUDIO_BITRATES_KBPS),
});

static VIDEO_LADDER: Lazy<CandidateLadder> = Lazy::new(|| CandidateLadder {
    steps: bitrate_steps(&VIDEO_BITRATES_KBPS),
});

fn bitrate_steps(kbps: &[u32]) -> Vec<ParameterValue> {
    kbps.iter()
        .map(|k| ParameterValue::Bitrate(Bitrate::kbps(*k)))
        .collect()
}
