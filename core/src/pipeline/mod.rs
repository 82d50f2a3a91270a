//! Batch processing of molecules: SMILES → geometry → energy and dipole.
//!
//! Every molecule is processed independently. A failure is logged and recorded
//! against its molecule, the remaining molecules are still computed.

mod molecules;

use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

pub use molecules::{MoleculeDescriptor, MoleculeSet};

use crate::{
    config::CalculationConfig,
    embed::GeometryGenerator,
    error::PipelineError,
    report::{FailureTable, ResultTable},
    solver::{QuantumSolver, SolverOutput},
};

/// Result of one successfully computed molecule
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRecord {
    pub name: String,
    pub smiles: String,
    /// Total energy in Hartree
    pub energy: f64,
    /// Dipole moment in Debye
    pub dipole: [f64; 3],
    /// Euclidean norm of `dipole`
    pub dipole_magnitude: f64,
    pub iterations: usize,
}

impl ResultRecord {
    pub fn new(molecule: &MoleculeDescriptor, output: &SolverOutput) -> Self {
        let [x, y, z] = output.dipole;
        Self {
            name: molecule.name.clone(),
            smiles: molecule.smiles.clone(),
            energy: output.energy,
            dipole: output.dipole,
            dipole_magnitude: (x * x + y * y + z * z).sqrt(),
            iterations: output.iterations,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MoleculeOutcome {
    Success(ResultRecord),
    Failure {
        name: String,
        smiles: String,
        #[serde(serialize_with = "serialize_error")]
        error: PipelineError,
    },
}

impl MoleculeOutcome {
    pub fn name(&self) -> &str {
        match self {
            MoleculeOutcome::Success(record) => &record.name,
            MoleculeOutcome::Failure { name, .. } => name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MoleculeOutcome::Success(_))
    }

    pub fn record(&self) -> Option<&ResultRecord> {
        match self {
            MoleculeOutcome::Success(record) => Some(record),
            MoleculeOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            MoleculeOutcome::Success(_) => None,
            MoleculeOutcome::Failure { error, .. } => Some(error),
        }
    }
}

fn serialize_error<S: Serializer>(error: &PipelineError, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct ErrorEntry<'a> {
        kind: &'a str,
        message: String,
    }

    ErrorEntry {
        kind: error.kind(),
        message: error.to_string(),
    }
    .serialize(serializer)
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} molecules succeeded, {} failed ({:.2?})",
            self.succeeded, self.total, self.failed, self.elapsed
        )
    }
}

fn serialize_seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// The outcome of every molecule of a batch, in input order
#[derive(Debug, Serialize)]
pub struct BatchReport {
    summary: BatchSummary,
    outcomes: Vec<MoleculeOutcome>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<MoleculeOutcome>, elapsed: Duration) -> Self {
        let succeeded = outcomes.iter().filter(|outcome| outcome.is_success()).count();
        Self {
            summary: BatchSummary {
                total: outcomes.len(),
                succeeded,
                failed: outcomes.len() - succeeded,
                elapsed,
            },
            outcomes,
        }
    }

    pub fn outcomes(&self) -> &[MoleculeOutcome] {
        &self.outcomes
    }

    /// Records of the successful molecules, in input order
    pub fn records(&self) -> impl Iterator<Item = &ResultRecord> {
        self.outcomes.iter().filter_map(MoleculeOutcome::record)
    }

    pub fn failures(&self) -> impl Iterator<Item = &MoleculeOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    pub fn summary(&self) -> BatchSummary {
        self.summary
    }

    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0
    }

    pub fn table(&self) -> ResultTable {
        ResultTable::new(self.records())
    }

    pub fn failure_table(&self) -> FailureTable {
        FailureTable::new(self.failures())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs the geometry generator and the solver over a set of molecules.
pub struct BatchDriver<G, S> {
    generator: G,
    solver: S,
    config: CalculationConfig,
    /// number of worker threads, 0 uses one per core
    jobs: usize,
}

impl<G, S> BatchDriver<G, S>
where
    G: GeometryGenerator + Sync,
    S: QuantumSolver + Sync,
{
    pub fn new(generator: G, solver: S, config: CalculationConfig) -> Self {
        Self {
            generator,
            solver,
            config,
            jobs: 1,
        }
    }

    /// Processes molecules on `jobs` threads (0 = one per core). Needs the `rayon`
    /// feature, without it the batch always runs sequentially.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn config(&self) -> &CalculationConfig {
        &self.config
    }

    pub fn run(&self, molecules: &MoleculeSet) -> BatchReport {
        let start = Instant::now();
        log::info!(
            "processing {} molecules with {:?}/{}",
            molecules.len(),
            self.config.method,
            self.config.basis
        );

        let outcomes = self.run_all(molecules);
        let report = BatchReport::new(outcomes, start.elapsed());
        log::info!("{}", report.summary());
        report
    }

    #[cfg(feature = "rayon")]
    fn run_all(&self, molecules: &MoleculeSet) -> Vec<MoleculeOutcome> {
        use rayon::prelude::*;

        if self.jobs == 1 || molecules.len() < 2 {
            return molecules.iter().map(|molecule| self.process(molecule)).collect();
        }

        match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            // indexed parallel iterators collect in input order
            Ok(pool) => pool.install(|| {
                molecules
                    .as_slice()
                    .par_iter()
                    .map(|molecule| self.process(molecule))
                    .collect()
            }),
            Err(error) => {
                log::warn!("could not start worker pool ({error}), running sequentially");
                molecules.iter().map(|molecule| self.process(molecule)).collect()
            }
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn run_all(&self, molecules: &MoleculeSet) -> Vec<MoleculeOutcome> {
        molecules.iter().map(|molecule| self.process(molecule)).collect()
    }

    /// Deadline of a molecule started at `start`. A budget reaching past what an
    /// [`Instant`] can represent means no deadline.
    fn deadline(&self, start: Instant) -> Result<Option<Instant>, PipelineError> {
        let timeout = self.config.timeout().map_err(PipelineError::build)?;
        Ok(timeout.and_then(|timeout| start.checked_add(timeout)))
    }

    /// Computes one molecule. Errors never escape, they become a failure outcome.
    pub fn process(&self, molecule: &MoleculeDescriptor) -> MoleculeOutcome {
        let start = Instant::now();
        log::info!("{} ({})", molecule.name, molecule.smiles);

        let result = self.deadline(start).and_then(|deadline| {
            let geometry = self.generator.generate(&molecule.smiles, deadline)?;
            log::debug!("geometry of {}:\n{}", molecule.name, geometry.to_xyz(&molecule.name));
            self.solver.solve(&geometry, &self.config, deadline)
        });

        match result {
            Ok(output) => {
                let record = ResultRecord::new(molecule, &output);
                log::info!(
                    "{}: E = {:.8} Eh, |mu| = {:.3} D ({:.2?})",
                    record.name,
                    record.energy,
                    record.dipole_magnitude,
                    start.elapsed()
                );
                MoleculeOutcome::Success(record)
            }
            Err(error) => {
                log::warn!("{} ({}) failed: {error}", molecule.name, molecule.smiles);
                MoleculeOutcome::Failure {
                    name: molecule.name.clone(),
                    smiles: molecule.smiles.clone(),
                    error,
                }
            }
        }
    }
}
