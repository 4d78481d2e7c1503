//! Error types for the platemap engine.
//!
//! Only contract violations the caller controls are errors. Malformed
//! rectangles, unknown units and unresolvable element ids are skipped
//! locally and surface through the response diagnostics instead.

use thiserror::Error;

/// Primary error type for engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("remap mode requires priorOverlays")]
    MissingPriorOverlays,

    #[error("page bounds must be positive and finite, got {width}x{height}")]
    InvalidPageBounds { width: f64, height: f64 },

    #[error("padding must be non-negative and finite, got {0}")]
    InvalidPadding(f64),

    #[error("invalid engine parameter {name}: {msg}")]
    InvalidParams { name: &'static str, msg: String },
}

/// Convenience Result type alias for EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;
