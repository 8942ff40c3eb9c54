use thiserror::Error;

use crate::types::Disposition;

/// Failures while reading a present trace. All of these abort the run.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Malformed trace {label} at line {line}: {reason}")]
    MalformedTrace {
        label: String,
        line: u64,
        reason: String,
    },

    #[error("Already reading frames from {label}")]
    AlreadyConsumed { label: String },

    #[error("IO error reading {label}: {error}")]
    Io {
        label: String,
        #[source]
        error: std::io::Error,
    },
}

/// Raised when the compositor is handed a frame it cannot output.
///
/// Non-fatal: the tick is skipped and the simulation continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositeError {
    #[error("Composite requested on non-captured frame {present_sequence_number} ({disposition})")]
    UnreadyFrame {
        present_sequence_number: u64,
        disposition: Disposition,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration invalid: {reason}")]
    Invalid { reason: String },

    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
