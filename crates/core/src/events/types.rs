use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::converter::MediaCategory;
use crate::ladder::ParameterValue;

/// How the dispatcher decided to handle a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Size-constrained ladder search.
    Search,
    /// One encode with fixed parameters.
    Direct,
    /// External document converter.
    PassThrough,
    /// Byte-for-byte copy of the source.
    Copy,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Direct => "direct",
            Self::PassThrough => "pass_through",
            Self::Copy => "copy",
        }
    }
}

/// Conversion event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversionEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Conversion lifecycle
    ConversionStarted {
        request_id: String,
        category: MediaCategory,
        format: String,
        strategy: Strategy,
    },
    /// One encode attempt of a ladder search.
    CandidateTried {
        request_id: String,
        /// 1-based attempt number
        attempt: usize,
        parameter: ParameterValue,
        size_bytes: u64,
        ceiling_bytes: u64,
        fits: bool,
    },
    ConversionFinished {
        request_id: String,
        category: MediaCategory,
        success: bool,
        message: String,
        attempts: usize,
        forced: bool,
        duration_ms: u64,
    },

    // Background jobs
    JobSubmitted {
        job_id: String,
        request_id: String,
    },
    JobTimedOut {
        job_id: String,
        timeout_secs: u64,
    },
}

impl ConversionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::ConversionStarted { .. } => "conversion_started",
            Self::CandidateTried { .. } => "candidate_tried",
            Self::ConversionFinished { .. } => "conversion_finished",
            Self::JobSubmitted { .. } => "job_submitted",
            Self::JobTimedOut { .. } => "job_timed_out",
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::ConversionStarted { request_id, .. }
            | Self::CandidateTried { request_id, .. }
            | Self::ConversionFinished { request_id, .. }
            | Self::JobSubmitted { request_id, .. } => Some(request_id),
            _ => None,
        }
    }
}

/// A stored event with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub request_id: Option<String>,
    pub data: ConversionEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Bitrate;

    #[test]
    fn test_event_type_names() {
        let event = ConversionEvent::ServiceStopped {
            reason: "test".to_string(),
        };
        assert_eq!(event.event_type(), "service_stopped");
        assert!(event.request_id().is_none());
    }

    #[test]
    fn test_candidate_event_serialization() {
        let event = ConversionEvent::CandidateTried {
            request_id: "req-1".to_string(),
            attempt: 2,
            parameter: ParameterValue::Bitrate(Bitrate::kbps(256)),
            size_bytes: 4096,
            ceiling_bytes: 2048,
            fits: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "candidate_tried");
        assert_eq!(json["parameter"]["kind"], "bitrate");
        assert_eq!(json["parameter"]["value"], 256);
        assert_eq!(event.request_id(), Some("req-1"));
    }

    #[test]
    fn test_record_roundtrip_keeps_type() {
        let record = EventRecord {
            id: 7,
            timestamp: Utc::now(),
            event_type: "conversion_started".to_string(),
            request_id: Some("req-9".to_string()),
            data: ConversionEvent::ConversionStarted {
                request_id: "req-9".to_string(),
                category: MediaCategory::Video,
                format: "mp4".to_string(),
                strategy: Strategy::Search,
            },
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, 7);
        assert!(matches!(
            parsed.data,
            ConversionEvent::ConversionStarted {
                strategy: Strategy::Search,
                ..
            }
        ));
    }
}
