use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use sizefit_core::{EventFilter, EventRecord};

use crate::state::AppState;

/// Maximum allowed limit for event queries
const MAX_LIMIT: usize = 1000;

/// Default limit for event queries
const DEFAULT_LIMIT: usize = 100;

/// Query parameters for events endpoint
#[derive(Debug, Deserialize)]
pub struct EventQueryParams {
    /// Filter by conversion request ID
    pub request_id: Option<String>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct EventQueryResponse {
    /// Matching events, newest first
    pub events: Vec<EventRecord>,
    pub count: usize,
    pub limit: usize,
}

/// GET /api/v1/events
pub async fn query_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventQueryParams>,
) -> Json<EventQueryResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let mut filter = EventFilter::new().with_limit(limit);
    if let Some(request_id) = params.request_id {
        filter = filter.with_request_id(request_id);
    }
    if let Some(event_type) = params.event_type {
        filter = filter.with_event_type(event_type);
    }

    let events = state.event_store().query(&filter);
    Json(EventQueryResponse {
        count: events.len(),
        events,
        limit,
    })
}
