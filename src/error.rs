//! Error types for the nodal circuit engine.
//!
//! This module provides a unified error type [`NodalError`] that covers
//! all error conditions that can occur while building a circuit, solving
//! the MNA system, and running an analysis.

use thiserror::Error;

/// Result type alias using [`NodalError`].
pub type Result<T> = std::result::Result<T, NodalError>;

/// Unified error type for all engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodalError {
    // ============ Construction Errors ============
    /// Invalid parameter value
    #[error("Invalid parameter '{param}' for component '{component}': {message}")]
    InvalidParameter {
        component: String,
        param: String,
        message: String,
    },

    /// Node not found in circuit
    #[error("Node '{node}' not found in circuit")]
    NodeNotFound { node: String },

    /// Component not found in circuit
    #[error("Component '{name}' not found in circuit")]
    ComponentNotFound { name: String },

    /// Duplicate component name
    #[error("Duplicate component name '{name}'")]
    DuplicateComponent { name: String },

    /// Invalid circuit topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Solver Errors ============
    /// Pivot fell below tolerance during elimination
    #[error("Singular matrix at row {row} - circuit may have a short circuit or floating node")]
    SingularMatrix { row: usize },

    /// Matrix and right-hand side do not describe a square system
    #[error("Dimension mismatch: {rows}x{cols} matrix with right-hand side of length {rhs}")]
    DimensionMismatch { rows: usize, cols: usize, rhs: usize },

    // ============ Analysis Errors ============
    /// Invalid analysis parameter
    #[error("Invalid analysis parameter: {message}")]
    InvalidAnalysisParam { message: String },
}

impl NodalError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(
        component: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            component: component.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an invalid topology error
    pub fn invalid_topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }

    /// Create an invalid analysis parameter error
    pub fn invalid_analysis(message: impl Into<String>) -> Self {
        Self::InvalidAnalysisParam {
            message: message.into(),
        }
    }

    /// Whether this error comes from the linear solver rather than the topology.
    pub fn is_solver_failure(&self) -> bool {
        matches!(
            self,
            Self::SingularMatrix { .. } | Self::DimensionMismatch { .. }
        )
    }
}
