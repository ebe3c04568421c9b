//! Error taxonomy for the engine, per the propagation policy: nothing on the
//! key-event path surfaces a failure to the host. Every variant here is
//! something a caller is expected to log and degrade from, not unwind on.

use std::io;

/// Top-level error kind, one variant per failure class the design calls out.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("transient I/O failure in {source_name}: {source}")]
    TransientIo {
        source_name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("malformed input in {context} at {location}: {reason}")]
    MalformedInput {
        context: &'static str,
        location: String,
        reason: String,
    },

    #[error("user database corrupted: {reason}")]
    UserDbCorruption { reason: String },

    #[error("resource limit reached for {resource}")]
    ResourceLimit { resource: &'static str },

    #[error("invariant violated in {context}: {detail}")]
    ProgrammerError {
        context: &'static str,
        detail: String,
    },
}

impl EngineError {
    pub fn transient_io(source_name: &'static str, source: io::Error) -> Self {
        Self::TransientIo { source_name, source }
    }

    pub fn malformed(context: &'static str, location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            context,
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn programmer(context: &'static str, detail: impl Into<String>) -> Self {
        Self::ProgrammerError {
            context,
            detail: detail.into(),
        }
    }

    /// Whether this error should be treated as a safe no-op at the key-event
    /// boundary (true for everything — kept as a named predicate so call
    /// sites read as a decision, not a blanket catch).
    pub fn is_recoverable(&self) -> bool {
        true
    }
}
