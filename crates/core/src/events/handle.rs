use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::ConversionEvent;

/// Destination for structured conversion events.
///
/// The dispatcher and search engine receive a sink instead of writing to
/// global state. Implementations must never block or fail the caller.
pub trait EventSink: Send + Sync {
    fn record(&self, event: ConversionEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: ConversionEvent) {}
}

/// Envelope wrapping an event with metadata
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: ConversionEvent,
}

/// Handle for emitting conversion events
///
/// This is cheaply cloneable and can be shared across tasks.
/// Events are sent through a bounded channel to be written by the EventWriter.
#[derive(Clone)]
pub struct EventHandle {
    tx: mpsc::Sender<EventEnvelope>,
}

impl EventHandle {
    /// Create a new event handle from a channel sender
    pub fn new(tx: mpsc::Sender<EventEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an event, waiting for channel capacity
    ///
    /// If the channel is closed, the error is logged but the caller is not failed.
    pub async fn emit(&self, event: ConversionEvent) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope).await {
            tracing::error!("Failed to emit conversion event: {}", e);
        }
    }

    /// Try to emit an event without blocking
    ///
    /// Returns true if the event was sent successfully, false otherwise.
    pub fn try_emit(&self, event: ConversionEvent) -> bool {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Dropped conversion event: {}", e);
                false
            }
        }
    }
}

impl EventSink for EventHandle {
    fn record(&self, event: ConversionEvent) {
        self.try_emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_event() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle = EventHandle::new(tx);

        handle
            .emit(ConversionEvent::ServiceStarted {
                version: "0.1.0".to_string(),
                config_hash: "abc123".to_string(),
            })
            .await;

        let envelope = rx.recv().await.expect("Should receive event");
        assert!(matches!(envelope.event, ConversionEvent::ServiceStarted { .. }));
    }

    #[test]
    fn test_record_through_sink_trait() {
        let (tx, mut rx) = mpsc::channel(10);
        let sink: Box<dyn EventSink> = Box::new(EventHandle::new(tx));

        sink.record(ConversionEvent::ServiceStopped {
            reason: "test".to_string(),
        });

        let envelope = rx.try_recv().expect("Should receive event");
        assert_eq!(envelope.event.event_type(), "service_stopped");
    }

    #[test]
    fn test_try_emit_full_channel() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = EventHandle::new(tx);

        assert!(handle.try_emit(ConversionEvent::ServiceStopped {
            reason: "first".to_string(),
        }));
        // Channel full: dropped, not blocked
        assert!(!handle.try_emit(ConversionEvent::ServiceStopped {
            reason: "second".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_emit_closed_channel() {
        let (tx, rx) = mpsc::channel::<EventEnvelope>(10);
        let handle = EventHandle::new(tx);
        drop(rx);

        // Must not panic
        handle
            .emit(ConversionEvent::ServiceStopped {
                reason: "closed".to_string(),
            })
            .await;
        assert!(!handle.try_emit(ConversionEvent::ServiceStopped {
            reason: "closed".to_string(),
        }));
    }

    #[test]
    fn test_envelope_has_timestamp() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle = EventHandle::new(tx);

        let before = Utc::now();
        handle.try_emit(ConversionEvent::ServiceStopped {
            reason: "t".to_string(),
        });
        let after = Utc::now();

        let envelope = rx.try_recv().expect("Should receive event");
        assert!(envelope.timestamp >= before);
        assert!(envelope.timestamp <= after);
    }
}
