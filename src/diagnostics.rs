//! Diagnostic sink for non-fatal mapping events.
//!
//! Resolution misses (absent keys, out-of-range indexes) are reported here
//! as warnings and otherwise treated as absent values.

/// Receiver of non-fatal warnings emitted while applying a mapping.
pub trait Diagnostics: Send + Sync {
    fn warn(&self, message: &str);
}

/// Discards every message. The engine default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn warn(&self, _message: &str) {}
}

/// Forwards warnings to `tracing` under the `json_mapping` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "json_mapping", "{}", message);
    }
}
