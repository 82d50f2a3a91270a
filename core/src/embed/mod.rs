//! Generation of 3D structures from SMILES.
//!
//! [`DistanceGeometry`] parses the SMILES string, makes every hydrogen explicit and
//! minimizes a restraint potential (bond lengths, ideal angles, planarity, soft
//! repulsion) from seeded random coordinates, first without the planarity terms
//! and then with all of them. A start that ends in a distorted local minimum is
//! retried with the next seed.

mod force_field;
mod minimize;
mod restraints;

use std::time::{Duration, Instant};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    error::PipelineError,
    geometry::{Geometry, GeometryAtom},
    smiles::{self, MolecularGraph},
};

use self::{
    minimize::{minimize_with_force_field, MinimizationConfig, MinimizationStatus},
    restraints::RestraintField,
};

/// Turns a SMILES string into Cartesian coordinates with explicit hydrogens.
pub trait GeometryGenerator {
    /// Fails with [`PipelineError::GeometryGenerationFailed`] for unreadable input or
    /// when no acceptable structure is found, and with
    /// [`PipelineError::CalculationTimedOut`] once `deadline` has passed.
    fn generate(&self, smiles: &str, deadline: Option<Instant>) -> Result<Geometry, PipelineError>;
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("molecule has no atoms")]
    NoAtoms,

    #[error(
        "no acceptable structure after {attempts} attempts \
         (bond deviation {bond_deviation:.3} Å, angle distance deviation {angle_deviation:.3} Å)"
    )]
    NotConverged {
        attempts: u32,
        bond_deviation: f64,
        angle_deviation: f64,
    },

    #[error("embedding exceeded the deadline after {elapsed:.2?}")]
    TimedOut { elapsed: Duration },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Seed of the random starting coordinates. The same seed always gives the same
    /// structure.
    pub seed: u64,
    /// Number of random starts before giving up
    pub attempts: u32,
    /// Conjugate gradient iterations per start
    pub max_iterations: usize,
    pub gradient_tolerance: f64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            attempts: 8,
            max_iterations: 2000,
            gradient_tolerance: 1e-6,
        }
    }
}

/// Embeds a molecular graph. Hydrogens counted on atoms become atoms of their own,
/// placed after the atoms of the graph. The structure is centered at the origin.
pub fn embed(
    graph: &MolecularGraph,
    config: &EmbeddingConfig,
    deadline: Option<Instant>,
) -> Result<Geometry, EmbeddingError> {
    let start = Instant::now();
    let graph = graph.with_explicit_hydrogens();
    if graph.atom_count() == 0 {
        return Err(EmbeddingError::NoAtoms);
    }

    let field = RestraintField::from_graph(&graph);
    let relaxed = field.without_planarity();
    let n_atoms = field.atom_count();
    let minimization = MinimizationConfig {
        max_iterations: config.max_iterations,
        gradient_tolerance: config.gradient_tolerance,
        deadline,
        ..Default::default()
    };

    let box_size = 1.2 * (n_atoms as f64).cbrt().max(1.0);
    let mut deviations = (f64::INFINITY, f64::INFINITY);

    for attempt in 0..config.attempts.max(1) {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(attempt as u64));
        let mut positions = (0..3 * n_atoms)
            .map(|_| rng.gen_range(-box_size..box_size))
            .collect::<Vec<_>>();

        let mut result = minimize_with_force_field(&relaxed, &mut positions, &minimization);
        if result.status != MinimizationStatus::DeadlineExceeded {
            result = minimize_with_force_field(&field, &mut positions, &minimization);
        }
        if result.status == MinimizationStatus::DeadlineExceeded {
            return Err(EmbeddingError::TimedOut {
                elapsed: start.elapsed(),
            });
        }

        if field.is_acceptable(&positions) {
            log::debug!(
                "embedded {} atoms in attempt {} ({} iterations, {:?}, residual {:.3e})",
                n_atoms,
                attempt + 1,
                result.iterations,
                result.status,
                result.energy
            );
            return Ok(to_geometry(&graph, &positions));
        }

        deviations = field.worst_deviations(&positions);
        log::debug!(
            "embedding attempt {} rejected: bond deviation {:.3}, angle deviation {:.3}",
            attempt + 1,
            deviations.0,
            deviations.1
        );
    }

    Err(EmbeddingError::NotConverged {
        attempts: config.attempts.max(1),
        bond_deviation: deviations.0,
        angle_deviation: deviations.1,
    })
}

fn to_geometry(graph: &MolecularGraph, positions: &[f64]) -> Geometry {
    let n_atoms = graph.atom_count();
    let mut centroid = [0.0; 3];
    for atom in positions.chunks_exact(3) {
        for k in 0..3 {
            centroid[k] += atom[k] / n_atoms as f64;
        }
    }

    let atoms = graph
        .atoms()
        .zip(positions.chunks_exact(3))
        .map(|(atom, position)| {
            GeometryAtom::new(
                atom.element,
                [
                    position[0] - centroid[0],
                    position[1] - centroid[1],
                    position[2] - centroid[2],
                ],
            )
        })
        .collect();

    Geometry::new(atoms, graph.formal_charge())
}

/// SMILES parsing followed by restraint based embedding
#[derive(Clone, Debug, Default)]
pub struct DistanceGeometry {
    config: EmbeddingConfig,
}

impl DistanceGeometry {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

impl GeometryGenerator for DistanceGeometry {
    fn generate(&self, smiles: &str, deadline: Option<Instant>) -> Result<Geometry, PipelineError> {
        let graph = smiles::parse(smiles).map_err(|error| PipelineError::from((error, smiles)))?;
        log::debug!("'{smiles}' parsed as {}", graph.formula());

        embed(&graph, &self.config, deadline).map_err(|error| PipelineError::from((error, smiles)))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    use super::*;
    use crate::periodic_table::ElementType;

    fn generate(smiles: &str) -> Geometry {
        DistanceGeometry::default().generate(smiles, None).unwrap()
    }

    fn angle(geometry: &Geometry, a: usize, center: usize, b: usize) -> f64 {
        let atoms = geometry.atoms();
        let u = atoms[a].position() - atoms[center].position();
        let v = atoms[b].position() - atoms[center].position();
        (u.dot(&v) / (u.norm() * v.norm())).acos().to_degrees()
    }

    #[test]
    fn water_geometry() {
        let water = generate("O");
        assert_eq!(water.len(), 3);
        assert_eq!(water.atoms()[0].element, ElementType::O);
        assert_relative_eq!(water.distance(0, 1), 0.97, epsilon = 0.02);
        assert_relative_eq!(water.distance(0, 2), 0.97, epsilon = 0.02);
        let hoh = angle(&water, 1, 0, 2);
        assert!((104.0..115.0).contains(&hoh), "H-O-H angle {hoh}");
    }

    #[test]
    fn methane_is_tetrahedral_and_centered() {
        let methane = generate("C");
        assert_eq!(methane.len(), 5);
        for h in 1..5 {
            assert_relative_eq!(methane.distance(0, h), 1.07, epsilon = 0.02);
        }
        for (a, b) in [(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)] {
            assert_relative_eq!(angle(&methane, a, 0, b), 109.47, epsilon = 2.0);
        }

        let centroid = methane
            .atoms()
            .iter()
            .map(GeometryAtom::position)
            .sum::<Vector3<f64>>();
        assert_relative_eq!(centroid, Vector3::zeros(), epsilon = 1e-9);
        // the carbon sits at the center of the hydrogens
        assert!(methane.atoms()[0].position().norm() < 0.02);
    }

    #[test]
    fn aromatic_ring_is_planar() {
        let benzene = generate("c1ccccc1");
        assert_eq!(benzene.len(), 12);

        let atoms = benzene.atoms();
        let origin = atoms[0].position();
        let normal = (atoms[2].position() - origin)
            .cross(&(atoms[4].position() - origin))
            .normalize();
        for atom in atoms {
            let height = (atom.position() - origin).dot(&normal);
            assert!(height.abs() < 0.05, "out of plane by {height}");
        }
        for i in 0..6 {
            assert_relative_eq!(benzene.distance(i, (i + 1) % 6), 1.44, epsilon = 0.05);
        }
    }

    /// Largest distance of any atom from the plane through atoms `a`, `b` and `c`
    fn out_of_plane(geometry: &Geometry, [a, b, c]: [usize; 3]) -> f64 {
        let atoms = geometry.atoms();
        let origin = atoms[a].position();
        let normal = (atoms[b].position() - origin)
            .cross(&(atoms[c].position() - origin))
            .normalize();
        atoms
            .iter()
            .map(|atom| (atom.position() - origin).dot(&normal).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn heteroaromatic_and_fused_rings_embed() {
        let pyridine = generate("c1ccncc1");
        assert_eq!(pyridine.len(), 11);
        assert!(out_of_plane(&pyridine, [0, 2, 4]) < 0.05);
        // ring hydrogens point away from the ring center
        for (carbon, hydrogen) in [(0, 6), (1, 7), (2, 8), (4, 9), (5, 10)] {
            assert!(pyridine.distance(carbon, hydrogen) < 1.15);
            assert!(pyridine.distance(3, hydrogen) > 2.0);
        }

        let naphthalene = generate("c1ccc2ccccc2c1");
        assert_eq!(naphthalene.len(), 18);
        assert!(out_of_plane(&naphthalene, [0, 3, 6]) < 0.05);
        // the peri carbons are both bonded to the fusion carbon 8
        assert_relative_eq!(naphthalene.distance(7, 9), 2.49, epsilon = 0.1);

        let indole = generate("c1ccc2[nH]ccc2c1");
        assert_eq!(indole.len(), 16);
        assert!(out_of_plane(&indole, [0, 3, 6]) < 0.1);
    }

    #[test]
    fn biphenyl_rings_are_each_planar() {
        let biphenyl = generate("c1ccccc1-c1ccccc1");
        assert_eq!(biphenyl.len(), 22);
        assert!(biphenyl.distance(5, 6) > 1.45);
        for ring in [[0, 2, 4], [6, 8, 10]] {
            let atoms = biphenyl.atoms();
            let origin = atoms[ring[0]].position();
            let normal = (atoms[ring[1]].position() - origin)
                .cross(&(atoms[ring[2]].position() - origin))
                .normalize();
            for atom in &atoms[ring[0]..ring[0] + 6] {
                assert!((atom.position() - origin).dot(&normal).abs() < 0.05);
            }
        }
    }

    #[test]
    fn formaldehyde_is_planar_with_short_double_bond() {
        let formaldehyde = generate("C=O");
        assert_eq!(formaldehyde.len(), 4);
        assert!(formaldehyde.distance(0, 1) < 1.35);

        let atoms = formaldehyde.atoms();
        let [c, o, h1, h2] = [0, 1, 2, 3].map(|i| atoms[i].position());
        let volume = (o - c).dot(&(h1 - c).cross(&(h2 - c)));
        assert!(volume.abs() < 1e-2, "signed volume {volume}");
    }

    #[test]
    fn same_seed_same_structure() {
        assert_eq!(generate("CCO"), generate("CCO"));

        let other = DistanceGeometry::new(EmbeddingConfig {
            seed: 7,
            ..Default::default()
        })
        .generate("CCO", None)
        .unwrap();
        assert_eq!(other.len(), 9);
    }

    #[test]
    fn fragments_are_kept_apart() {
        let salt = generate("[Na+].[Cl-]");
        assert_eq!(salt.len(), 2);
        assert_eq!(salt.formal_charge(), 0);
        assert!(salt.distance(0, 1) >= 2.9);
    }

    #[test]
    fn invalid_smiles_fails_geometry_generation() {
        for smiles in ["", "C1CC", "C(", "Xx", "[C"] {
            let error = DistanceGeometry::default().generate(smiles, None).unwrap_err();
            assert!(
                matches!(error, PipelineError::GeometryGenerationFailed { .. }),
                "{smiles}: {error}"
            );
        }
    }

    #[test]
    fn expired_deadline_times_out() {
        let error = DistanceGeometry::default()
            .generate("CCO", Some(Instant::now()))
            .unwrap_err();
        assert!(matches!(error, PipelineError::CalculationTimedOut { .. }));
    }
}
