//! Span helpers for authorization flows.

use tracing::{info_span, Span};

/// Span covering one gateway operation (read/create/update/delete/list).
pub fn operation_span(operation: &str, kind: &str, principal_id: &str) -> Span {
    info_span!("authz", op = %operation, kind = %kind, principal = %principal_id)
}

/// Span covering one call to the policy decision point.
pub fn pdp_span(transport: &str, resources: usize) -> Span {
    info_span!("pdp", transport = %transport, resources = resources)
}

/// Timing utility for operations.
pub struct Timer {
    start: std::time::Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    /// Elapsed time so far.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    /// Complete the timer and record duration.
    pub fn finish(self) {
        tracing::debug!(
            operation = %self.operation,
            duration_ms = %self.start.elapsed().as_millis(),
            "operation completed"
        );
    }
}
