//! Error types for the trace point library

use thiserror::Error;

/// Errors reported by the tracer and its helpers
#[derive(Error, Debug)]
pub enum TraceError {
    /// `clear(name)` for a name that was never registered
    #[error("Undefined trace -- {0}")]
    UndefinedTrace(String),

    #[error("Unknown event category: {0}")]
    UnknownCategory(String),

    #[error("Invalid filter expression: {0}")]
    InvalidFilter(String),

    #[error("Invalid tracer configuration: {0}")]
    InvalidConfig(String),

    /// A captured event stream line that is not a valid raw event
    #[error("Replay line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;
