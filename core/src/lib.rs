pub mod atom;
pub mod basis;
pub mod config;
mod diis;
pub mod embed;
pub mod error;
pub mod geometry;
pub mod hf;
pub mod integrals;
pub mod molecule;
pub mod periodic_table;
pub mod pipeline;
pub mod report;
pub mod smiles;
pub mod solver;

pub use config::{CalculationConfig, Method};
pub use embed::{DistanceGeometry, EmbeddingConfig, GeometryGenerator};
pub use error::{ConfigError, PipelineError};
pub use geometry::{Geometry, GeometryAtom};
pub use pipeline::{BatchDriver, BatchReport, MoleculeOutcome, MoleculeSet, ResultRecord};
pub use report::ResultTable;
pub use solver::{QuantumSolver, RhfSolver, SolverOutput};
