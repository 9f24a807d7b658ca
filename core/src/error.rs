//! Error types for fabric-bench-core

use thiserror::Error;

/// Core error type
///
/// Only errors that abort a pattern or a run live here. Failures local to a
/// single flow or listener are recorded as data (see [`crate::flow::FlowOutcome`])
/// and never travel through this type.
#[derive(Error, Debug)]
pub enum FabricError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A builder was finalized without a required component
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// Pattern name not present in the catalog
    #[error("unknown pattern: {0}")]
    UnknownPattern(String),

    /// The pattern cannot be planned against the given topology
    #[error("cannot plan {pattern}: {reason}")]
    Planning {
        /// Pattern key
        pattern: String,
        /// Why planning was refused
        reason: String,
    },

    /// Topology could not be loaded or is inconsistent
    #[error("topology error: {0}")]
    Topology(String),

    /// Internal invariant violated
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Run interrupted before completion
    #[error("run cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FabricError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing-config error
    pub fn missing_config(field: &'static str) -> Self {
        Self::MissingConfig(field)
    }

    /// Create a planning error
    pub fn planning(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Planning {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a topology error
    pub fn topology(msg: impl Into<String>) -> Self {
        Self::Topology(msg.into())
    }

    /// Create an invariant error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}

/// Result type alias
pub type FabricResult<T> = std::result::Result<T, FabricError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_error_message() {
        let err = FabricError::planning("ring", "needs at least 2 hosts");
        assert_eq!(err.to_string(), "cannot plan ring: needs at least 2 hosts");
    }

    #[test]
    fn test_constructors_pick_variant() {
        assert!(matches!(FabricError::topology("duplicate host h1"), FabricError::Topology(_)));
        assert!(matches!(FabricError::invariant("index 9"), FabricError::Invariant(_)));
        assert!(matches!(
            FabricError::missing_config("meter"),
            FabricError::MissingConfig("meter")
        ));
    }

    #[test]
    fn test_unknown_pattern_message_names_pattern() {
        let err = FabricError::UnknownPattern("allscatter".into());
        assert!(err.to_string().contains("allscatter"));
    }
}
