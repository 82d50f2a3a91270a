//! The quantum chemistry step of the pipeline.

use std::time::Instant;

use serde::Serialize;

use crate::{
    basis::BasisSet,
    config::{CalculationConfig, Method},
    error::PipelineError,
    geometry::Geometry,
    hf::{restricted_hartree_fock, HartreeFockInput, MolecularElectronConfig},
    molecule::Molecule,
};

/// Computes the energy and dipole moment of a fixed geometry.
pub trait QuantumSolver {
    /// Inconsistent input (charge and spin, unknown basis, missing elements) is
    /// rejected with [`PipelineError::SolverBuildFailed`] before any integrals are
    /// computed.
    fn solve(
        &self,
        geometry: &Geometry,
        config: &CalculationConfig,
        deadline: Option<Instant>,
    ) -> Result<SolverOutput, PipelineError>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SolverOutput {
    /// Total energy (electronic + nuclear repulsion) in Hartree
    pub energy: f64,
    /// Dipole moment in Debye, about the center of nuclear charge
    pub dipole: [f64; 3],
    pub iterations: usize,
    /// Orbital energies in Hartree, ascending
    pub orbital_energies: Vec<f64>,
}

/// Restricted Hartree-Fock on a basis set from the built-in registry or a file
#[derive(Clone, Copy, Debug, Default)]
pub struct RhfSolver;

impl QuantumSolver for RhfSolver {
    fn solve(
        &self,
        geometry: &Geometry,
        config: &CalculationConfig,
        deadline: Option<Instant>,
    ) -> Result<SolverOutput, PipelineError> {
        match config.method {
            Method::Rhf => {}
        }

        if geometry.is_empty() {
            return Err(PipelineError::build("geometry has no atoms"));
        }
        if geometry.formal_charge() != config.charge {
            log::warn!(
                "formal charge {} of the structure differs from the configured charge {}, using {}",
                geometry.formal_charge(),
                config.charge,
                config.charge
            );
        }

        let molecule = Molecule::from(geometry);
        let configuration = MolecularElectronConfig {
            molecular_charge: config.charge,
            spin: config.spin,
        };
        configuration.closed_shell_electrons(&molecule)?;

        let basis_set = BasisSet::resolve(&config.basis)?;

        let input = HartreeFockInput {
            molecule: &molecule,
            configuration,
            basis_set: &basis_set,
            max_iterations: config.max_iterations,
            epsilon: config.density_tolerance,
            energy_epsilon: config.energy_tolerance,
            deadline,
        };
        let output = restricted_hartree_fock(&input)?;

        let dipole = output.dipole_moment(&molecule).debye();
        log::info!(
            "RHF/{}: E = {:.8} Eh, |mu| = {:.3} D after {} iterations",
            basis_set.name(),
            output.total_energy(),
            dipole.norm(),
            output.iterations
        );

        Ok(SolverOutput {
            energy: output.total_energy(),
            dipole: dipole.into(),
            iterations: output.iterations,
            orbital_energies: output.orbital_energies,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{geometry::GeometryAtom, periodic_table::ElementType};

    fn hydrogen() -> Geometry {
        Geometry::new(
            vec![
                GeometryAtom::new(ElementType::H, [0.0, 0.0, -0.37]),
                GeometryAtom::new(ElementType::H, [0.0, 0.0, 0.37]),
            ],
            0,
        )
    }

    fn water() -> Geometry {
        Geometry::new(
            vec![
                GeometryAtom::new(ElementType::O, [0.0, 0.0, 0.0]),
                GeometryAtom::new(ElementType::H, [0.0, 0.757, 0.587]),
                GeometryAtom::new(ElementType::H, [0.0, -0.757, 0.587]),
            ],
            0,
        )
    }

    fn sto_3g() -> CalculationConfig {
        CalculationConfig::default().with_basis("STO-3G")
    }

    #[test]
    fn hydrogen_molecule_sto_3g() {
        let output = RhfSolver.solve(&hydrogen(), &sto_3g(), None).unwrap();
        // Szabo & Ostlund: -1.1167 Eh at 1.4 bohr
        assert_relative_eq!(output.energy, -1.1167, epsilon = 2e-3);
        for component in output.dipole {
            assert_relative_eq!(component, 0.0, epsilon = 1e-6);
        }
        assert_eq!(output.orbital_energies.len(), 2);
    }

    #[test]
    fn water_has_a_dipole() {
        let output = RhfSolver.solve(&water(), &sto_3g(), None).unwrap();
        let [x, y, z] = output.dipole;
        let magnitude = (x * x + y * y + z * z).sqrt();
        assert!((1.2..2.2).contains(&magnitude), "{magnitude}");
        assert!(z > 0.0);
    }

    #[test]
    fn charge_spin_mismatch_is_a_build_failure() {
        let config = sto_3g().with_spin(1);
        let error = RhfSolver.solve(&water(), &config, None).unwrap_err();
        assert!(matches!(error, PipelineError::SolverBuildFailed { .. }), "{error}");
        assert!(error.to_string().contains("charge/spin mismatch"));
    }

    #[test]
    fn open_shell_is_rejected() {
        let config = sto_3g().with_spin(2);
        let error = RhfSolver.solve(&water(), &config, None).unwrap_err();
        assert!(matches!(error, PipelineError::SolverBuildFailed { .. }));
    }

    #[test]
    fn unknown_basis_is_a_build_failure() {
        let config = CalculationConfig::default().with_basis("no-such-basis");
        let error = RhfSolver.solve(&water(), &config, None).unwrap_err();
        assert!(matches!(error, PipelineError::SolverBuildFailed { .. }));
    }

    #[test]
    fn empty_geometry_is_a_build_failure() {
        let error = RhfSolver
            .solve(&Geometry::default(), &CalculationConfig::default(), None)
            .unwrap_err();
        assert!(matches!(error, PipelineError::SolverBuildFailed { .. }));
    }

    #[test]
    fn iteration_limit_is_a_convergence_failure() {
        let config = sto_3g().with_max_iterations(1);
        let error = RhfSolver.solve(&water(), &config, None).unwrap_err();
        assert!(matches!(
            error,
            PipelineError::SolverConvergenceFailed { iterations: 1, .. }
        ));
    }
}
