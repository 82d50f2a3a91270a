use std::time::Instant;

use itertools::Itertools;
use nalgebra::{DMatrix, DVector};

use crate::{
    atom::Atom,
    basis::BasisFunction,
    diis::Diis,
    integrals::{DefaultIntegrator, ElectronTensor, Integrator},
    molecule::Molecule,
};

use super::{
    properties::{self, DipoleMoment},
    utils, HartreeFockError, HartreeFockInput,
};

/// The output of a restricted hartree fock calculation
#[derive(Debug)]
#[non_exhaustive]
pub struct RestrictedHartreeFockOutput {
    /// the orbital energies that were found in this hartree fock calculation, sorted in
    /// ascending order
    pub orbital_energies: Vec<f64>,
    /// The electronic energy of the system
    pub electronic_energy: f64,
    /// The nuclear repulsion energy
    pub nuclear_repulsion: f64,
    /// After how many iterations did the system converge
    pub iterations: usize,
    /// the converged (total, alpha + beta) density matrix in the atomic orbital basis
    pub density: DMatrix<f64>,
    /// the basis the density is expressed in
    pub basis: Vec<BasisFunction>,
}

impl RestrictedHartreeFockOutput {
    pub fn total_energy(&self) -> f64 {
        self.electronic_energy + self.nuclear_repulsion
    }

    /// Dipole moment of the converged density about the center of nuclear charge
    pub fn dipole_moment(&self, molecule: &Molecule) -> DipoleMoment {
        properties::dipole_moment(
            molecule,
            &self.basis,
            &self.density,
            &DefaultIntegrator::default(),
        )
    }
}

pub fn restricted_hartree_fock(
    input: &HartreeFockInput,
) -> Result<RestrictedHartreeFockOutput, HartreeFockError> {
    let start = Instant::now();
    let integrator = DefaultIntegrator::default();

    // reject inconsistent input before touching any integrals
    let n_electrons = input.configuration.closed_shell_electrons(input.molecule)?;
    let basis = input.basis()?;
    let n_basis = basis.len();
    let n_occupied = n_electrons / 2;
    if n_occupied > n_basis {
        return Err(HartreeFockError::BasisTooSmall {
            electrons: n_electrons,
            n_basis,
        });
    }

    log::info!(
        "starting RHF: {} atoms, {n_electrons} electrons, {n_basis} basis functions ({})",
        input.molecule.atoms.len(),
        input.basis_set.name()
    );

    let nuclear_repulsion = nuclear_repulsion(&input.molecule.atoms);
    log::debug!("nuclear repulsion energy: {nuclear_repulsion}");

    let overlap = one_electron_matrix(&basis, "overlap", |a, b| integrator.overlap((a, b)));
    let kinetic = one_electron_matrix(&basis, "kinetic", |a, b| integrator.kinetic((a, b)));
    let nuclear = one_electron_matrix(&basis, "nuclear", |a, b| {
        integrator.nuclear((a, b), &input.molecule.atoms)
    });
    log::debug!("overlap matrix: {overlap:0.4}");
    input.check_deadline(start)?;

    let electron = ElectronTensor::from_basis(&basis, &integrator);
    let two_electron = TwoElectronOperator::new(&electron, n_basis);
    drop(electron);
    input.check_deadline(start)?;

    let core_hamiltonian = kinetic + nuclear;
    let orthogonalizer = lowdin_orthogonalizer(&overlap);
    let mut density = huckel_guess(&core_hamiltonian, &overlap, &orthogonalizer, n_occupied);

    let mut diis = Diis::new();
    let mut previous_energy = f64::INFINITY;
    let mut electronic_energy = 0.0;
    for iteration in 1..=input.max_iterations {
        input.check_deadline(start)?;

        let fock = &core_hamiltonian + two_electron.apply(&density);
        // energy of the density the fock matrix was built from
        electronic_energy = electronic_energy_of(&density, &core_hamiltonian, &fock);

        let commutator = &fock * &density * &overlap - &overlap * &density * &fock;
        let fock = match diis.fock(commutator, fock.clone()) {
            Some(extrapolated) => extrapolated,
            None => {
                log::debug!("DIIS extrapolation is singular, restarting the subspace");
                diis.reset();
                fock
            }
        };

        let (coefficients, orbital_energies) = solve_roothaan(&fock, &orthogonalizer);
        let next_density = closed_shell_density(&coefficients, n_occupied);

        let density_rms = (&next_density - &density).norm() / n_basis as f64;
        let energy_change = (electronic_energy - previous_energy).abs();
        density = next_density;
        previous_energy = electronic_energy;

        log::info!(
            "iteration {iteration:<4} - electronic energy {electronic_energy:1.8}. density rms {density_rms:1.4e}. energy change {energy_change:1.4e}",
        );

        if density_rms < input.epsilon && energy_change < input.energy_epsilon {
            let fock = &core_hamiltonian + two_electron.apply(&density);
            let electronic_energy = electronic_energy_of(&density, &core_hamiltonian, &fock);

            log::info!(
                "converged after {iteration} iterations in {:.2?}: total energy {:1.10}",
                start.elapsed(),
                electronic_energy + nuclear_repulsion
            );

            return Ok(RestrictedHartreeFockOutput {
                orbital_energies: orbital_energies.iter().copied().collect(),
                electronic_energy,
                nuclear_repulsion,
                iterations: iteration,
                density,
                basis,
            });
        }
    }

    Err(HartreeFockError::NotConverged {
        iterations: input.max_iterations,
        last_energy: electronic_energy + nuclear_repulsion,
    })
}

fn nuclear_repulsion(atoms: &[Atom]) -> f64 {
    atoms
        .iter()
        .tuple_combinations()
        .map(|(a, b)| {
            (a.nuclear_charge() * b.nuclear_charge()) as f64 / (b.position - a.position).norm()
        })
        .sum()
}

fn one_electron_matrix(
    basis: &[BasisFunction],
    label: &str,
    integral: impl Fn(&BasisFunction, &BasisFunction) -> f64,
) -> DMatrix<f64> {
    utils::symmetric_matrix(basis.len(), |i, j| {
        let value = integral(&basis[i], &basis[j]);
        log::trace!("{label} ({i}{j}) = {value}");
        value
    })
}

/// E = 1/2 tr(P (H + F))
fn electronic_energy_of(
    density: &DMatrix<f64>,
    hamiltonian: &DMatrix<f64>,
    fock: &DMatrix<f64>,
) -> f64 {
    0.5 * density.dot(&(hamiltonian + fock))
}

/// Coulomb minus half exchange, G(P)_ij = sum_kl P_kl [(ij|kl) - 1/2 (ik|jl)].
///
/// One n x n block per (ij) pair with i <= j, so every element of G is a
/// Frobenius product with the density.
struct TwoElectronOperator {
    blocks: Vec<DMatrix<f64>>,
    n_basis: usize,
}

impl TwoElectronOperator {
    fn new(electron: &ElectronTensor, n_basis: usize) -> Self {
        let blocks = (0..n_basis)
            .flat_map(|j| (0..=j).map(move |i| (i, j)))
            .map(|(i, j)| {
                DMatrix::from_fn(n_basis, n_basis, |k, l| {
                    electron[(i, j, k, l)] - 0.5 * electron[(i, k, j, l)]
                })
            })
            .collect();

        Self { blocks, n_basis }
    }

    /// Position of the (ij) block, i <= j
    fn block(&self, i: usize, j: usize) -> &DMatrix<f64> {
        &self.blocks[j * (j + 1) / 2 + i]
    }

    fn apply(&self, density: &DMatrix<f64>) -> DMatrix<f64> {
        utils::symmetric_matrix(self.n_basis, |i, j| self.block(i, j).dot(density))
    }
}

/// Löwdin's symmetric orthogonalization, X = S^-1/2
fn lowdin_orthogonalizer(overlap: &DMatrix<f64>) -> DMatrix<f64> {
    let (vectors, values) = utils::eigs(overlap.clone());
    let inverse_sqrt = DMatrix::from_diagonal(&values.map(|value| value.sqrt().recip()));
    &vectors * inverse_sqrt * vectors.transpose()
}

/// Solves FC = SCE in the orthogonal basis. Columns of C are ordered by orbital energy.
fn solve_roothaan(
    fock: &DMatrix<f64>,
    orthogonalizer: &DMatrix<f64>,
) -> (DMatrix<f64>, DVector<f64>) {
    let transformed = orthogonalizer.transpose() * fock * orthogonalizer;
    let (coefficients, energies) = utils::sorted_eigs(transformed);
    (orthogonalizer * coefficients, energies)
}

/// Initial density from a generalized Wolfsberg-Helmholz hamiltonian built on the
/// core hamiltonian
fn huckel_guess(
    hamiltonian: &DMatrix<f64>,
    overlap: &DMatrix<f64>,
    orthogonalizer: &DMatrix<f64>,
    n_occupied: usize,
) -> DMatrix<f64> {
    const WOLFSBERG_HELMHOLZ: f64 = 1.75;
    let guess = utils::symmetric_matrix(hamiltonian.nrows(), |i, j| {
        let (h_ii, h_jj) = (hamiltonian[(i, i)], hamiltonian[(j, j)]);
        if i == j {
            h_ii
        } else {
            0.5 * WOLFSBERG_HELMHOLZ * overlap[(i, j)] * (h_ii + h_jj)
        }
    });

    let (coefficients, _) = solve_roothaan(&guess, orthogonalizer);
    closed_shell_density(&coefficients, n_occupied)
}

/// P = 2 C_occ C_occ^T
fn closed_shell_density(coefficients: &DMatrix<f64>, n_occupied: usize) -> DMatrix<f64> {
    let occupied = coefficients.columns(0, n_occupied);
    2.0 * (&occupied * occupied.transpose())
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use approx::assert_relative_eq;

    use crate::{
        basis::BasisSet,
        config::ConfigBasisSet,
        hf::{
            restricted_hartree_fock, HartreeFockError, HartreeFockInput, MolecularElectronConfig,
            RestrictedHartreeFockOutput,
        },
        molecule::Molecule,
    };

    macro_rules! molecule {
        ($(
            $element:ident => ($x:expr, $y:expr, $z:expr)
        ),*) => {
            $crate::molecule::Molecule::new(vec![
                $($crate::atom::Atom::new(
                    $crate::periodic_table::ElementType::$element,
                    ::nalgebra::Vector3::new($x, $y, $z),
                )),*
            ])
        };
    }

    fn basis_set(json: &str) -> BasisSet {
        let basis_set: ConfigBasisSet = serde_json::from_str(json).unwrap();
        basis_set.into_basis_set("test".into()).unwrap()
    }

    fn input<'a>(molecule: &'a Molecule, basis_set: &'a BasisSet) -> HartreeFockInput<'a> {
        HartreeFockInput {
            molecule,
            configuration: MolecularElectronConfig::CLOSED_SHELL_NEUTRAL,
            basis_set,
            max_iterations: 100,
            epsilon: 1e-6,
            energy_epsilon: 1e-8,
            deadline: None,
        }
    }

    const B_6_31G: &str = r#"{"molssi_bse_schema":{"schema_type":"complete","schema_version":"0.1"},"revision_description":"DatafromGaussian09/GAMESS","revision_date":"2018-06-19","elements":{"1":{"electron_shells":[{"function_type":"gto","region":"valence","angular_momentum":[0],"exponents":["0.1873113696E+02","0.2825394365E+01","0.6401216923E+00"],"coefficients":[["0.3349460434E-01","0.2347269535E+00","0.8137573261E+00"]]},{"function_type":"gto","region":"valence","angular_momentum":[0],"exponents":["0.1612777588E+00"],"coefficients":[["1.0000000"]]}],"references":[{"reference_description":"31GSplit-valencebasissetforH,He","reference_keys":["ditchfield1971a"]}]},"8":{"electron_shells":[{"function_type":"gto","region":"valence","angular_momentum":[0],"exponents":["0.5484671660E+04","0.8252349460E+03","0.1880469580E+03","0.5296450000E+02","0.1689757040E+02","0.5799635340E+01"],"coefficients":[["0.1831074430E-02","0.1395017220E-01","0.6844507810E-01","0.2327143360E+00","0.4701928980E+00","0.3585208530E+00"]]},{"function_type":"gto","region":"valence","angular_momentum":[0,1],"exponents":["0.1553961625E+02","0.3599933586E+01","0.1013761750E+01"],"coefficients":[["-0.1107775495E+00","-0.1480262627E+00","0.1130767015E+01"],["0.7087426823E-01","0.3397528391E+00","0.7271585773E+00"]]},{"function_type":"gto","region":"valence","angular_momentum":[0,1],"exponents":["0.2700058226E+00"],"coefficients":[["0.1000000000E+01"],["0.1000000000E+01"]]}],"references":[{"reference_description":"6-31GSplit-valencebasisset","reference_keys":["hehre1972a"]}]}},"version":"1","function_types":["gto"],"names":["6-31G"],"tags":[],"family":"pople","description":"6-31Gvalencedouble-zeta","role":"orbital","auxiliaries":{},"name":"6-31G"}"#;

    #[test]
    fn hydrogen_6_31g() {
        let molecule = molecule! {
            H => (0.0, 0.0, 0.0),
            H => (0.0, 0.0, 1.4)
        };
        let basis_set = basis_set(B_6_31G);

        let RestrictedHartreeFockOutput {
            orbital_energies,
            electronic_energy,
            nuclear_repulsion,
            ..
        } = restricted_hartree_fock(&input(&molecule, &basis_set)).unwrap();

        assert_relative_eq!(electronic_energy, -1.8410539726907735, epsilon = 1e-3);
        assert_relative_eq!(nuclear_repulsion, 0.7142857142857142, epsilon = 1e-3);
        assert_relative_eq!(orbital_energies[0], -0.595564373728178, epsilon = 1e-3);
        assert_relative_eq!(orbital_energies[1], 0.2382503139896246, epsilon = 1e-3);
        assert_relative_eq!(orbital_energies[2], 0.7750727506800223, epsilon = 1e-3);
        assert_relative_eq!(orbital_energies[3], 1.40316490313582, epsilon = 1e-3);
    }

    #[test]
    fn water_6_31g() {
        let molecule = molecule! {
            O => (0.0, 0.0, 0.0),
            H => (0.0, 0.75, 0.585),
            H => (0.0, -0.75, 0.585)
        };
        let basis_set = basis_set(B_6_31G);

        let RestrictedHartreeFockOutput {
            orbital_energies,
            electronic_energy,
            nuclear_repulsion,
            ..
        } = restricted_hartree_fock(&input(&molecule, &basis_set)).unwrap();

        assert_relative_eq!(electronic_energy, -92.0230896544854, epsilon = 1e-3);
        assert_relative_eq!(nuclear_repulsion, 17.488049195046216, epsilon = 1e-3);

        assert_relative_eq!(orbital_energies[0], -20.523974864948215, epsilon = 1e-3);
        assert_relative_eq!(orbital_energies[1], -1.740756409886931, epsilon = 1e-3);
        assert_relative_eq!(orbital_energies[2], -1.0307147688870948, epsilon = 1e-3);
        assert_relative_eq!(orbital_energies[3], -0.6441844270629393, epsilon = 1e-3);
        assert_relative_eq!(orbital_energies[4], -0.6254760824539792, epsilon = 1e-3);
        assert_relative_eq!(orbital_energies[5], 0.26161301182427255, epsilon = 1e-3);
    }

    #[test]
    fn ethylene_sto_3g() {
        let molecule = molecule! {
            C => (0.0000, 0.0000, 0.0000),
            C => (1.3390, 0.0000, 0.0000),
            H => (0.0000, 0.9281, 0.5621),
            H => (0.0000, -0.9281, 0.5621),
            H => (1.3390, 0.9281, -0.5621),
            H => (1.3390, -0.9281, -0.5621)
        };
        let basis_set = BasisSet::builtin("sto-3g").unwrap();

        let output = restricted_hartree_fock(&input(&molecule, &basis_set)).unwrap();

        assert_relative_eq!(output.electronic_energy, -137.4520528397336, epsilon = 1e-2);
        assert_relative_eq!(output.nuclear_repulsion, 65.935968236742, epsilon = 1e-2);
        assert_relative_eq!(output.orbital_energies[0], -11.841655776436701, epsilon = 1e-2);
        assert_relative_eq!(output.orbital_energies[1], -11.652621382438332, epsilon = 1e-2);
        assert_eq!(output.orbital_energies.len(), 14);
    }

    #[test]
    fn water_sto_3g_dipole() {
        // experimental geometry, R(OH) = 1.809 bohr and 104.52 degrees
        let molecule = molecule! {
            O => (0.0, 0.0, 0.0),
            H => (0.0, 1.430429, 1.107157),
            H => (0.0, -1.430429, 1.107157)
        };
        let basis_set = BasisSet::builtin("sto-3g").unwrap();

        let output = restricted_hartree_fock(&input(&molecule, &basis_set)).unwrap();
        assert_relative_eq!(output.total_energy(), -74.963, epsilon = 1e-2);

        let dipole = output.dipole_moment(&molecule).debye();
        // the molecule lies in the yz plane with the hydrogens towards +z
        assert_relative_eq!(dipole.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(dipole.y, 0.0, epsilon = 1e-6);
        assert!(dipole.z > 0.0, "{dipole:?}");
        assert!((1.4..2.0).contains(&dipole.norm()), "{dipole:?}");
    }

    #[test]
    fn rejects_spin_mismatch_before_integrals() {
        let molecule = molecule! {
            H => (0.0, 0.0, 0.0),
            H => (0.0, 0.0, 1.4)
        };
        let basis_set = basis_set(B_6_31G);
        let mut input = input(&molecule, &basis_set);
        input.configuration = MolecularElectronConfig {
            molecular_charge: 0,
            spin: 1,
        };

        assert!(matches!(
            restricted_hartree_fock(&input),
            Err(HartreeFockError::ChargeSpinMismatch { electrons: 2, spin: 1 })
        ));
    }

    #[test]
    fn missing_element_basis() {
        let molecule = molecule! {
            H => (0.0, 0.0, 0.0),
            Cl => (0.0, 0.0, 2.4)
        };
        let basis_set = BasisSet::builtin("sto-3g").unwrap();

        assert!(matches!(
            restricted_hartree_fock(&input(&molecule, &basis_set)),
            Err(HartreeFockError::MissingBasis { .. })
        ));
    }

    #[test]
    fn expired_deadline_times_out() {
        let molecule = molecule! {
            H => (0.0, 0.0, 0.0),
            H => (0.0, 0.0, 1.4)
        };
        let basis_set = basis_set(B_6_31G);
        let mut input = input(&molecule, &basis_set);
        input.deadline = Some(Instant::now());

        assert!(matches!(
            restricted_hartree_fock(&input),
            Err(HartreeFockError::TimedOut { .. })
        ));
    }

    #[test]
    fn reports_last_energy_without_convergence() {
        let molecule = molecule! {
            H => (0.0, 0.0, 0.0),
            H => (0.0, 0.0, 1.4)
        };
        let basis_set = basis_set(B_6_31G);
        let mut input = input(&molecule, &basis_set);
        input.max_iterations = 1;

        match restricted_hartree_fock(&input) {
            Err(HartreeFockError::NotConverged {
                iterations,
                last_energy,
            }) => {
                assert_eq!(iterations, 1);
                assert!(last_energy < 0.0);
            }
            other => panic!("expected non-convergence, got {other:?}"),
        }
    }
}
