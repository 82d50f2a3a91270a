//! Error types of the pipeline.
//!
//! [`PipelineError`] is what a single molecule can fail with. The batch driver
//! records it against that molecule and moves on; lower level errors from the
//! parser, the basis set loader and the SCF are folded into its variants.

use std::time::Duration;

use thiserror::Error;

use crate::{basis::BasisSetError, embed::EmbeddingError, hf::HartreeFockError, smiles::SmilesError};

/// Per-molecule failure of the SMILES → energy pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The SMILES string could not be turned into a 3D structure.
    #[error("geometry generation failed for '{smiles}': {reason}")]
    GeometryGenerationFailed { smiles: String, reason: String },

    /// The calculation input was rejected before the SCF started.
    #[error("could not build calculation input: {reason}")]
    SolverBuildFailed { reason: String },

    /// The SCF iteration did not converge.
    #[error("SCF did not converge after {iterations} iterations (last energy {last_energy:.8} Eh)")]
    SolverConvergenceFailed { iterations: usize, last_energy: f64 },

    /// The per-molecule deadline passed before the calculation finished.
    #[error("calculation timed out after {elapsed:.2?}")]
    CalculationTimedOut { elapsed: Duration },
}

impl PipelineError {
    /// Short name of the failure category, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GeometryGenerationFailed { .. } => "GeometryGenerationFailed",
            Self::SolverBuildFailed { .. } => "SolverBuildFailed",
            Self::SolverConvergenceFailed { .. } => "SolverConvergenceFailed",
            Self::CalculationTimedOut { .. } => "CalculationTimedOut",
        }
    }

    pub(crate) fn geometry(smiles: &str, reason: impl ToString) -> Self {
        Self::GeometryGenerationFailed {
            smiles: smiles.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn build(reason: impl ToString) -> Self {
        Self::SolverBuildFailed {
            reason: reason.to_string(),
        }
    }
}

impl From<BasisSetError> for PipelineError {
    fn from(error: BasisSetError) -> Self {
        Self::build(error)
    }
}

impl From<HartreeFockError> for PipelineError {
    fn from(error: HartreeFockError) -> Self {
        match error {
            HartreeFockError::NotConverged {
                iterations,
                last_energy,
            } => Self::SolverConvergenceFailed {
                iterations,
                last_energy,
            },
            HartreeFockError::TimedOut { elapsed } => Self::CalculationTimedOut { elapsed },
            other => Self::build(other),
        }
    }
}

impl From<(SmilesError, &str)> for PipelineError {
    fn from((error, smiles): (SmilesError, &str)) -> Self {
        Self::geometry(smiles, error)
    }
}

impl From<(EmbeddingError, &str)> for PipelineError {
    fn from((error, smiles): (EmbeddingError, &str)) -> Self {
        match error {
            EmbeddingError::TimedOut { elapsed } => Self::CalculationTimedOut { elapsed },
            other => Self::geometry(smiles, other),
        }
    }
}

/// Errors while reading configuration or molecule lists
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
