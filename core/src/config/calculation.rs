use std::{fs::File, io::BufReader, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{embed::EmbeddingConfig, error::ConfigError};

/// The electronic structure method used by the solver
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Restricted (closed shell) Hartree-Fock
    #[default]
    Rhf,
}

/// Settings shared by every molecule of a batch.
///
/// The defaults reproduce the reference tutorial setup: neutral, singlet,
/// def2-SVP, restricted Hartree-Fock. Every field can be overridden from a JSON
/// file (missing keys keep their default), through the `with_*` setters, or
/// from the command line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalculationConfig {
    /// Name of a built-in basis set or path to a BSE JSON file
    pub basis: String,
    /// Total molecular charge
    pub charge: i32,
    /// Number of unpaired electrons (2S). Only closed shells are supported.
    pub spin: u32,
    pub method: Method,
    /// The maximum number of SCF iterations before the system is considered to not converge
    pub max_iterations: usize,
    /// if the rms of the density matrix change drops below this, the density is considered
    /// converged
    pub density_tolerance: f64,
    /// Largest energy change between two iterations that still counts as converged
    pub energy_tolerance: f64,
    /// Wall clock budget per molecule, in seconds
    pub timeout: Option<f64>,
    pub embedding: EmbeddingConfig,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            basis: "def2svp".to_owned(),
            charge: 0,
            spin: 0,
            method: Method::Rhf,
            max_iterations: 100,
            density_tolerance: 1e-7,
            energy_tolerance: 1e-9,
            timeout: None,
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl CalculationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.basis.trim().is_empty() {
            return Err(ConfigError::Invalid("basis set name is empty".into()));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid("max_iterations must be positive".into()));
        }
        if !(self.density_tolerance > 0.0 && self.energy_tolerance > 0.0) {
            return Err(ConfigError::Invalid("tolerances must be positive".into()));
        }
        self.timeout()?;
        Ok(())
    }

    /// The per-molecule budget. Fails for budgets that are not positive or do not fit
    /// in a [`Duration`].
    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        let Some(seconds) = self.timeout else {
            return Ok(None);
        };
        if !(seconds > 0.0) {
            return Err(ConfigError::Invalid(format!("timeout must be positive, got {seconds}")));
        }
        Duration::try_from_secs_f64(seconds)
            .map(Some)
            .map_err(|error| ConfigError::Invalid(format!("timeout of {seconds} s: {error}")))
    }

    pub fn with_basis(mut self, basis: impl Into<String>) -> Self {
        self.basis = basis.into();
        self
    }

    pub fn with_charge(mut self, charge: i32) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_spin(mut self, spin: u32) -> Self {
        self.spin = spin;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout.as_secs_f64());
        self
    }
}
