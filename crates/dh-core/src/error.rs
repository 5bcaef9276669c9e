//! Unified error types for the DH/HP decision engine.
//!
//! This module provides a common error type [`DhError`] that every pipeline
//! stage (CHA, DHA, economics, contract assembly, decision, explanation) can
//! surface through. Each variant is a stable, testable identifier per the
//! error-handling design: failures are values, not panics or exceptions.

use thiserror::Error;

/// Unified error type for all DH/HP decision-engine operations.
#[derive(Error, Debug)]
pub enum DhError {
    /// Street/building geometry is empty or not in a projected CRS.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A coordinate reference system was required but absent or geographic.
    #[error("missing or unsupported CRS: {0}")]
    MissingCRS(String),

    /// A building's centroid is farther from the street graph than the
    /// configured attachment limit.
    #[error("building too far from network: {0}")]
    BuildingTooFar(String),

    /// An LV bus cannot reach any transformer in the undirected graph.
    #[error("unsupplied LV buses: {0}")]
    UnsuppliedBuses(String),

    /// An Option-2 boundary invariant (exactly one MV slack, >=1 transformer)
    /// was violated.
    #[error("LV grid boundary violation: {0}")]
    BoundaryViolation(String),

    /// The hydraulic or power-flow solver failed to converge.
    #[error("solver did not converge: {0}")]
    SolverNonConvergence(String),

    /// A KPI contract failed schema validation.
    #[error("contract schema validation failed: {0}")]
    SchemaValidation(String),

    /// A configuration value or an unknown configuration key was rejected.
    #[error("configuration validation failed: {0}")]
    ConfigValidation(String),

    /// A required upstream artifact (CHA/DHA/economics output) could not be
    /// located via any discovery pattern.
    #[error("missing input artifact: {0}")]
    MissingInputArtifact(String),

    /// The tabular-entailment auditor found an unresolvable contradiction
    /// after the feedback loop was exhausted.
    #[error("contradiction detected: {0}")]
    ContradictionDetected(String),

    /// The external text-generation service was unavailable, timed out, or
    /// returned an unusable response, and `--no-fallback` was set.
    #[error("external service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    /// A cooperative cancellation flag was observed between cluster or
    /// Monte Carlo sample boundaries.
    #[error("cancellation requested")]
    CancellationRequested,

    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization errors.
    #[error("parse error: {0}")]
    Parse(String),

    /// Generic errors, for wrapping external error types at a boundary.
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using [`DhError`].
pub type DhResult<T> = Result<T, DhError>;

impl DhError {
    /// Stable identifier matching the tagged variant name, for logging and
    /// for the CLI's `validation_status` / error reporting surface.
    pub fn kind(&self) -> &'static str {
        match self {
            DhError::InvalidGeometry(_) => "InvalidGeometry",
            DhError::MissingCRS(_) => "MissingCRS",
            DhError::BuildingTooFar(_) => "BuildingTooFar",
            DhError::UnsuppliedBuses(_) => "UnsuppliedBuses",
            DhError::BoundaryViolation(_) => "BoundaryViolation",
            DhError::SolverNonConvergence(_) => "SolverNonConvergence",
            DhError::SchemaValidation(_) => "SchemaValidation",
            DhError::ConfigValidation(_) => "ConfigValidation",
            DhError::MissingInputArtifact(_) => "MissingInputArtifact",
            DhError::ContradictionDetected(_) => "ContradictionDetected",
            DhError::ExternalServiceUnavailable(_) => "ExternalServiceUnavailable",
            DhError::CancellationRequested => "CancellationRequested",
            DhError::Io(_) => "Io",
            DhError::Parse(_) => "Parse",
            DhError::Other(_) => "Other",
        }
    }

    /// Exit code per spec §6: 2 invalid input, 3 validation failure,
    /// 4 non-convergence, 5 external-service failure (no-fallback), else 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            DhError::InvalidGeometry(_)
            | DhError::MissingCRS(_)
            | DhError::BuildingTooFar(_)
            | DhError::UnsuppliedBuses(_)
            | DhError::BoundaryViolation(_)
            | DhError::MissingInputArtifact(_) => 2,
            DhError::SchemaValidation(_)
            | DhError::ConfigValidation(_)
            | DhError::ContradictionDetected(_) => 3,
            DhError::SolverNonConvergence(_) => 4,
            DhError::ExternalServiceUnavailable(_) => 5,
            _ => 1,
        }
    }
}

impl From<anyhow::Error> for DhError {
    fn from(err: anyhow::Error) -> Self {
        DhError::Other(err.to_string())
    }
}

impl From<String> for DhError {
    fn from(s: String) -> Self {
        DhError::Other(s)
    }
}

impl From<&str> for DhError {
    fn from(s: &str) -> Self {
        DhError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for DhError {
    fn from(err: serde_json::Error) -> Self {
        DhError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec() {
        assert_eq!(DhError::InvalidGeometry("x".into()).exit_code(), 2);
        assert_eq!(DhError::SchemaValidation("x".into()).exit_code(), 3);
        assert_eq!(DhError::SolverNonConvergence("x".into()).exit_code(), 4);
        assert_eq!(DhError::ExternalServiceUnavailable("x".into()).exit_code(), 5);
        assert_eq!(DhError::CancellationRequested.exit_code(), 1);
    }

    #[test]
    fn kind_is_stable() {
        assert_eq!(DhError::BuildingTooFar("x".into()).kind(), "BuildingTooFar");
    }
}
