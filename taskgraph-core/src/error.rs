//! Error types.
//!
//! Nothing in the interactive path is allowed to fail loudly: model build and
//! layout are infallible, and store failures are logged and swallowed by the
//! callers. These errors exist for the seams where a failure has to be
//! described before it is dropped (store adapters, configuration parsing,
//! interaction targets that no longer resolve).

use thiserror::Error;

/// Errors produced by the graph engine and its collaborators.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A position or dependency store call failed.
    #[error("store error: {0}")]
    Store(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gesture referenced a node id that is not rendered.
    #[error("unknown node: {0}")]
    UnknownNode(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_include_context() {
        let err = GraphError::Store("connection reset".into());
        assert_eq!(err.to_string(), "store error: connection reset");

        let err = GraphError::UnknownNode("task-42".into());
        assert_eq!(err.to_string(), "unknown node: task-42");
    }

    #[test]
    fn json_errors_convert() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("nope");
        let err: GraphError = parse.unwrap_err().into();
        assert!(matches!(err, GraphError::Serialization(_)));
    }
}
