//! Error types for codegraph-pta
//!
//! Structural problems in the IR are errors; soundness gaps (unresolvable
//! dispatch, unknown callees) are logged and skipped by the analyses.

use thiserror::Error;

use crate::config::ConfigError;
use crate::features::call_graph::domain::FuncID;

/// Main error type for pointer-analysis operations
#[derive(Debug, Error)]
pub enum PtaError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A PAG node was requested for a value kind that carries no pointer
    #[error("Unsupported value kind for PAG node: {value}")]
    UnsupportedValue { value: String },

    /// A call site references a function the scene cannot resolve
    #[error("Call site {callsite} references unknown callee {callee}")]
    MissingCallee { callsite: String, callee: String },

    /// Receiver-carrying call into a body without `this = this: C`
    #[error("Method {method} has no receiver assignment")]
    MissingThisAssignment { method: String },

    /// `return` of something other than a local or constant
    #[error("Malformed return in {method}: {value}")]
    MalformedReturn { method: String, value: String },

    /// Function ID without a call-graph node
    #[error("Unknown function id {0}")]
    UnknownFunction(FuncID),

    /// Scene or report JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PtaError {
    pub fn unsupported_value(value: impl ToString) -> Self {
        PtaError::UnsupportedValue {
            value: value.to_string(),
        }
    }

    pub fn missing_callee(callsite: impl ToString, callee: impl ToString) -> Self {
        PtaError::MissingCallee {
            callsite: callsite.to_string(),
            callee: callee.to_string(),
        }
    }
}

/// Result type alias for pointer-analysis operations
pub type Result<T> = std::result::Result<T, PtaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: PtaError = ConfigError::range_with_hint("k_limit", 6, 0, 5, "too deep").into();
        assert!(matches!(err, PtaError::Config(_)));
        assert!(err.to_string().contains("k_limit"));
    }

    #[test]
    fn test_messages() {
        let err = PtaError::missing_callee("Main.main#3", "Lib.gone");
        assert_eq!(
            err.to_string(),
            "Call site Main.main#3 references unknown callee Lib.gone"
        );
    }
}
