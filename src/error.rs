//! Error types for flatpattern.
//!
//! This module defines all error types used throughout the library, together
//! with the coarse [`ErrorKind`] classification the generation pipeline uses
//! to decide whether a failure drops a single panel or aborts the request.

use thiserror::Error;

/// Result type alias using [`PatternError`].
pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors that can occur while segmenting, flattening or validating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    /// The mesh has no triangles.
    #[error("mesh has no triangles")]
    EmptyMesh,

    /// The mesh violates its input contract.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// The panel geometry cannot be flattened (too few boundary vertices,
    /// no boundary, several boundary loops).
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The panel is not a single connected component.
    #[error("disconnected geometry: reached {reachable} of {total} vertices")]
    DisconnectedGeometry {
        /// Number of vertices reachable from the first vertex.
        reachable: usize,
        /// Total number of panel vertices.
        total: usize,
    },

    /// An edge has more than two incident triangles.
    #[error("edge ({v0}, {v1}) has {triangles} incident triangles")]
    NonManifoldEdge {
        /// First vertex of the edge (local index).
        v0: usize,
        /// Second vertex of the edge (local index).
        v1: usize,
        /// Number of incident triangles.
        triangles: usize,
    },

    /// The computation produced non-finite or unusable values.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// The conjugate gradient search direction collapsed before convergence.
    #[error("singular system: search direction collapsed at iteration {iteration}")]
    SingularSystem {
        /// Iteration at which the breakdown was detected.
        iteration: usize,
    },

    /// Conjugate gradient hit its iteration cap with an unacceptable residual.
    #[error("solver failed to converge after {iterations} iterations (residual {residual:e})")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
        /// Residual norm when the solver stopped.
        residual: f64,
    },

    /// The request was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Every panel failed to flatten.
    #[error("no panel survived flattening ({attempted} attempted)")]
    NoPanelsSurvived {
        /// Number of panels that were attempted.
        attempted: usize,
    },
}

/// Coarse failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller supplied an unusable argument or mesh; never retried.
    InvalidArgument,
    /// Topology is unusable (too few boundary vertices, non-manifold, ...).
    DegenerateGeometry,
    /// Panel has more than one connected component.
    DisconnectedGeometry,
    /// Non-finite output, unusable scale or a singular system.
    NumericalInstability,
    /// The caller cancelled the request.
    Cancelled,
    /// The request as a whole could not produce a result.
    RequestFailed,
}

impl PatternError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        PatternError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatternError::EmptyMesh
            | PatternError::InvalidMesh(_)
            | PatternError::InvalidParameter { .. } => ErrorKind::InvalidArgument,
            PatternError::DegenerateGeometry(_) | PatternError::NonManifoldEdge { .. } => {
                ErrorKind::DegenerateGeometry
            }
            PatternError::DisconnectedGeometry { .. } => ErrorKind::DisconnectedGeometry,
            PatternError::NumericalInstability(_)
            | PatternError::SingularSystem { .. }
            | PatternError::ConvergenceFailed { .. } => ErrorKind::NumericalInstability,
            PatternError::Cancelled => ErrorKind::Cancelled,
            PatternError::NoPanelsSurvived { .. } => ErrorKind::RequestFailed,
        }
    }

    /// Whether this failure only concerns the panel being processed.
    ///
    /// Panel-local failures drop that panel; everything else aborts the request.
    pub fn is_panel_local(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DegenerateGeometry
                | ErrorKind::DisconnectedGeometry
                | ErrorKind::NumericalInstability
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(PatternError::EmptyMesh.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            PatternError::invalid_param("target_panel_count", 0, "must be positive").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            PatternError::NonManifoldEdge { v0: 0, v1: 1, triangles: 3 }.kind(),
            ErrorKind::DegenerateGeometry
        );
        assert_eq!(
            PatternError::SingularSystem { iteration: 3 }.kind(),
            ErrorKind::NumericalInstability
        );
    }

    #[test]
    fn test_panel_local() {
        assert!(PatternError::DisconnectedGeometry { reachable: 3, total: 6 }.is_panel_local());
        assert!(PatternError::NumericalInstability("nan".into()).is_panel_local());
        assert!(!PatternError::EmptyMesh.is_panel_local());
        assert!(!PatternError::Cancelled.is_panel_local());
    }

    #[test]
    fn test_display() {
        let err = PatternError::invalid_param("fabric_width", -1.0, "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid parameter: fabric_width = -1 (must be positive)"
        );
    }
}
