//! One-electron properties of a converged wave function.

use nalgebra::{DMatrix, Vector3};

use crate::{basis::BasisFunction, integrals::Integrator, molecule::Molecule};

/// e·a0 expressed in Debye
pub const AU_TO_DEBYE: f64 = 2.541_746_473;

/// Electric dipole moment of a molecule, stored in atomic units (e·a0).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DipoleMoment {
    vector: Vector3<f64>,
    origin: Vector3<f64>,
}

impl DipoleMoment {
    pub fn atomic_units(&self) -> Vector3<f64> {
        self.vector
    }

    pub fn debye(&self) -> Vector3<f64> {
        self.vector * AU_TO_DEBYE
    }

    /// The point the moment was evaluated about, in bohr
    pub fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    pub fn magnitude_debye(&self) -> f64 {
        self.debye().norm()
    }
}

/// mu = sum_A Z_A (R_A - O) - sum_ij P_ij <i| r - O |j>
///
/// The origin O is the center of nuclear charge. For neutral molecules the result
/// does not depend on it, for ions it fixes the otherwise arbitrary convention.
pub fn dipole_moment<I>(
    molecule: &Molecule,
    basis: &[BasisFunction],
    density: &DMatrix<f64>,
    integrator: &I,
) -> DipoleMoment
where
    I: Integrator<Function = BasisFunction>,
{
    let origin = molecule.center_of_charge();

    let nuclear = molecule
        .atoms()
        .iter()
        .map(|atom| atom.nuclear_charge() as f64 * (atom.position() - origin))
        .sum::<Vector3<f64>>();

    let mut electronic = Vector3::zeros();
    for i in 0..basis.len() {
        for j in i..basis.len() {
            let weight = if i == j { 1.0 } else { 2.0 };
            let integral = integrator.dipole((&basis[i], &basis[j]), &origin);
            electronic += weight * density[(i, j)] * integral;
        }
    }

    log::debug!("dipole: nuclear {nuclear:?}, electronic {electronic:?}");

    DipoleMoment {
        vector: nuclear - electronic,
        origin,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, Vector3};
    use smallvec::smallvec;

    use super::*;
    use crate::{
        atom::Atom,
        basis::{BasisFunction, ContractedGaussian, Gaussian},
        integrals::DefaultIntegrator,
        periodic_table::ElementType,
    };

    fn s_function(exponent: f64, position: Vector3<f64>) -> BasisFunction {
        BasisFunction {
            contracted_gaussian: ContractedGaussian(smallvec![Gaussian {
                exponent,
                coefficient: Gaussian::norm(exponent, (0, 0, 0)),
                angular: (0, 0, 0),
            }]),
            position,
        }
    }

    #[test]
    fn electrons_on_the_nuclei_cancel() {
        let a = Vector3::new(0.0, 0.0, -0.7);
        let b = Vector3::new(0.0, 0.0, 0.7);
        let molecule = Molecule::new(vec![
            Atom::new(ElementType::H, a),
            Atom::new(ElementType::H, b),
        ]);
        let basis = [s_function(1.0, a), s_function(1.0, b)];
        // one electron localised in each function
        let density = DMatrix::identity(2, 2);

        let dipole = dipole_moment(&molecule, &basis, &density, &DefaultIntegrator::default());
        assert_relative_eq!(dipole.atomic_units(), Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn displaced_charge_gives_point_dipole() {
        let molecule = Molecule::new(vec![Atom::new(ElementType::He, Vector3::zeros())]);
        // both electrons sit one bohr along x from the nucleus
        let basis = [s_function(1.0, Vector3::new(1.0, 0.0, 0.0))];
        let density = DMatrix::from_element(1, 1, 2.0);

        let dipole = dipole_moment(&molecule, &basis, &density, &DefaultIntegrator::default());
        assert_relative_eq!(
            dipole.atomic_units(),
            Vector3::new(-2.0, 0.0, 0.0),
            epsilon = 1e-10
        );
        assert_relative_eq!(dipole.magnitude_debye(), 2.0 * AU_TO_DEBYE, epsilon = 1e-9);
    }
}
