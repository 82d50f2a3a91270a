pub mod properties;
pub mod rhf;
pub(super) mod utils;

use std::time::{Duration, Instant};

use thiserror::Error;

pub use rhf::{restricted_hartree_fock, RestrictedHartreeFockOutput};

use crate::{
    basis::{BasisFunction, BasisSet},
    molecule::Molecule,
    periodic_table::ElementType,
};

#[derive(Debug, Error)]
pub enum HartreeFockError {
    #[error("molecule has no atoms")]
    EmptyMolecule,

    #[error("charge {charge} leaves {electrons} electrons")]
    InvalidElectronCount { charge: i32, electrons: i64 },

    #[error("charge/spin mismatch: {electrons} electrons cannot have {spin} unpaired electrons")]
    ChargeSpinMismatch { electrons: usize, spin: u32 },

    #[error("open shell systems ({spin} unpaired electrons) are not supported by restricted hartree fock")]
    OpenShell { spin: u32 },

    #[error("basis set '{basis}' has no functions for {element}")]
    MissingBasis { basis: String, element: ElementType },

    #[error("{electrons} electrons do not fit into {n_basis} basis functions")]
    BasisTooSmall { electrons: usize, n_basis: usize },

    #[error("no convergence after {iterations} iterations, last energy {last_energy:.8}")]
    NotConverged { iterations: usize, last_energy: f64 },

    #[error("deadline exceeded after {elapsed:.2?}")]
    TimedOut { elapsed: Duration },
}

/// The charge and spin state of a molecule.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MolecularElectronConfig {
    pub molecular_charge: i32,
    /// number of unpaired electrons, 2S
    pub spin: u32,
}

impl MolecularElectronConfig {
    pub const CLOSED_SHELL_NEUTRAL: Self = Self {
        molecular_charge: 0,
        spin: 0,
    };

    /// Returns the number of total electrons in the system, checking that the charge
    /// and spin are consistent with each other.
    pub fn n_electrons(&self, molecule: &Molecule) -> Result<usize, HartreeFockError> {
        let electrons = molecule.nuclear_charge() as i64 - self.molecular_charge as i64;
        if electrons <= 0 {
            return Err(HartreeFockError::InvalidElectronCount {
                charge: self.molecular_charge,
                electrons,
            });
        }

        let electrons = electrons as usize;
        let spin = self.spin as usize;
        if spin > electrons || (electrons - spin) % 2 != 0 {
            return Err(HartreeFockError::ChargeSpinMismatch {
                electrons,
                spin: self.spin,
            });
        }

        Ok(electrons)
    }

    /// Electron count of a closed shell system; rejects inconsistent and open shell states
    pub fn closed_shell_electrons(&self, molecule: &Molecule) -> Result<usize, HartreeFockError> {
        let electrons = self.n_electrons(molecule)?;
        if self.spin != 0 {
            return Err(HartreeFockError::OpenShell { spin: self.spin });
        }
        Ok(electrons)
    }
}

/// The input to a hartree fock calculation
pub struct HartreeFockInput<'a> {
    /// the molecule to run hartree fock for
    pub molecule: &'a Molecule,
    /// the charge and spin of the molecule
    pub configuration: MolecularElectronConfig,
    /// what basis set to use
    pub basis_set: &'a BasisSet,
    /// the maximum number of iterations to try
    pub max_iterations: usize,
    /// the smallest number that isn't treated as zero. For example, if the density
    /// matrix rms changes by less than this, the system is considered converged.
    pub epsilon: f64,
    /// largest energy change between iterations that still counts as converged
    pub energy_epsilon: f64,
    /// the calculation is abandoned once this instant has passed
    pub deadline: Option<Instant>,
}

impl HartreeFockInput<'_> {
    pub(crate) fn basis(&self) -> Result<Vec<BasisFunction>, HartreeFockError> {
        if self.molecule.atoms.is_empty() {
            return Err(HartreeFockError::EmptyMolecule);
        }

        self.basis_set
            .basis_for(&self.molecule.atoms)
            .map_err(|element| HartreeFockError::MissingBasis {
                basis: self.basis_set.name().to_owned(),
                element,
            })
    }

    pub(crate) fn check_deadline(&self, start: Instant) -> Result<(), HartreeFockError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(HartreeFockError::TimedOut {
                elapsed: start.elapsed(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;
    use crate::atom::Atom;

    fn water() -> Molecule {
        Molecule::new(vec![
            Atom::new(ElementType::O, Vector3::zeros()),
            Atom::new(ElementType::H, Vector3::new(0.0, 1.43, 1.11)),
            Atom::new(ElementType::H, Vector3::new(0.0, -1.43, 1.11)),
        ])
    }

    #[test]
    fn neutral_water_is_closed_shell() {
        let config = MolecularElectronConfig::CLOSED_SHELL_NEUTRAL;
        assert_eq!(config.closed_shell_electrons(&water()).unwrap(), 10);
        assert_eq!(config.n_electrons(&water()).unwrap(), 10);
    }

    #[test]
    fn spin_must_match_electron_parity() {
        let config = MolecularElectronConfig {
            molecular_charge: 0,
            spin: 1,
        };
        assert!(matches!(
            config.n_electrons(&water()),
            Err(HartreeFockError::ChargeSpinMismatch { electrons: 10, spin: 1 })
        ));

        let cation = MolecularElectronConfig {
            molecular_charge: 1,
            spin: 0,
        };
        assert!(matches!(
            cation.n_electrons(&water()),
            Err(HartreeFockError::ChargeSpinMismatch { electrons: 9, spin: 0 })
        ));
    }

    #[test]
    fn consistent_open_shell_is_rejected_for_rhf() {
        let triplet = MolecularElectronConfig {
            molecular_charge: 0,
            spin: 2,
        };
        // ten electrons can form a triplet, rhf still refuses it
        assert_eq!(triplet.n_electrons(&water()).unwrap(), 10);
        assert!(matches!(
            triplet.closed_shell_electrons(&water()),
            Err(HartreeFockError::OpenShell { spin: 2 })
        ));
    }

    #[test]
    fn too_positive_charge_is_rejected() {
        let config = MolecularElectronConfig {
            molecular_charge: 10,
            spin: 0,
        };
        assert!(matches!(
            config.n_electrons(&water()),
            Err(HartreeFockError::InvalidElectronCount { .. })
        ));
    }
}
