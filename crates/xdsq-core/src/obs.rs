//! Structured observability hooks for stored query execution.
//!
//! This module provides:
//! - A query-scoped span carrying the request id and query id
//! - Emission functions for lifecycle events: start, phase change, finish, failure
//!
//! Events are emitted at `info!` level (failures at `warn!`). Filtering and
//! JSON output are configured through [`crate::telemetry::init_tracing`].

use tracing::{info, warn, Span};

use crate::domain::ErrorCategory;
use crate::engine::QueryPhase;

/// Build the span every event of one query execution is recorded in.
///
/// Attach it with `tracing::Instrument` so the query future stays `Send`.
pub fn query_span(request_id: &str, query_id: &str) -> Span {
    tracing::info_span!("xdsq.query", request_id = %request_id, query_id = %query_id)
}

pub fn emit_query_started(request_id: &str, query_id: &str) {
    info!(event = "query.started", request_id = %request_id, query_id = %query_id);
}

pub fn emit_phase(query_id: &str, phase: QueryPhase) {
    info!(event = "query.phase", query_id = %query_id, phase = %phase);
}

/// Emit event: query finished with its duration and result size.
pub fn emit_query_finished(
    query_id: &str,
    duration_ms: u64,
    objects: usize,
    associations: usize,
    empty_result: bool,
) {
    info!(
        event = "query.finished",
        query_id = %query_id,
        duration_ms = duration_ms,
        objects = objects,
        associations = associations,
        empty_result = empty_result,
    );
}

/// Emit event: query failed (warning level).
pub fn emit_query_failed(query_id: &str, category: ErrorCategory, error: &dyn std::fmt::Display) {
    warn!(
        event = "query.failed",
        query_id = %query_id,
        category = ?category,
        error = %error,
    );
}
