use std::collections::VecDeque;
use std::sync::Mutex;

use super::EventRecord;

/// Filter for querying stored events
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub request_id: Option<String>,
    pub event_type: Option<String>,
    pub limit: usize,
}

impl EventFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn matches(&self, record: &EventRecord) -> bool {
        if let Some(ref id) = self.request_id {
            if record.request_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(ref event_type) = self.event_type {
            if &record.event_type != event_type {
                return false;
            }
        }
        true
    }
}

/// Trait for event storage
pub trait EventStore: Send + Sync {
    /// Insert a record, returns the assigned ID
    fn insert(&self, record: EventRecord) -> u64;

    /// Query records, newest first
    fn query(&self, filter: &EventFilter) -> Vec<EventRecord>;

    /// Number of records currently held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded in-memory store keeping the most recent events.
pub struct MemoryEventStore {
    capacity: usize,
    inner: Mutex<MemoryInner>,
}

struct MemoryInner {
    next_id: u64,
    records: VecDeque<EventRecord>,
}

impl MemoryEventStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(MemoryInner {
                next_id: 1,
                records: VecDeque::new(),
            }),
        }
    }
}

impl EventStore for MemoryEventStore {
    fn insert(&self, mut record: EventRecord) -> u64 {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = inner.next_id;
        inner.next_id += 1;
        record.id = id;
        if inner.records.len() == self.capacity {
            inner.records.pop_front();
        }
        inner.records.push_back(record);
        id
    }

    fn query(&self, filter: &EventFilter) -> Vec<EventRecord> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .records
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .take(filter.limit)
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .len()
    }
}
