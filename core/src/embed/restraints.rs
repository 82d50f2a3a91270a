//! Restraint potential used to embed a molecular graph in three dimensions.
//!
//! Every term is a penalty that vanishes for an ideal structure: harmonic bond
//! lengths, 1-3 distances derived from ideal bond angles, squared signed volumes
//! for planar centers and double bonds, and a flat-bottom repulsion between atoms
//! three or more bonds apart.

use nalgebra::Vector3;

use crate::{
    periodic_table::ElementType,
    smiles::{BondOrder, MolecularGraph},
};

use super::force_field::{accumulate, point, ForceField};

/// Bond order correction of the bond length, r_ij = (r_i + r_j)(1 - lambda ln n)
const BOND_ORDER_CORRECTION: f64 = 0.1332;

const BOND_WEIGHT: f64 = 100.0;
const ANGLE_WEIGHT: f64 = 50.0;
const PLANARITY_WEIGHT: f64 = 10.0;
const REPULSION_WEIGHT: f64 = 10.0;

/// Closest approach of atoms three or more bonds apart, in Ångström
const HYDROGEN_CONTACT: f64 = 2.0;
const HEAVY_CONTACT: f64 = 2.6;
/// Closest approach of atoms in different components
const FRAGMENT_CONTACT: f64 = 3.0;

/// Largest deviations from the targets an embedded structure may keep
const BOND_TOLERANCE: f64 = 0.1;
const ANGLE_TOLERANCE: f64 = 0.4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Hybridization {
    Sp,
    Sp2,
    Sp3,
    /// hypervalent centers, no angle restraints
    Other,
}

impl Hybridization {
    pub(crate) fn ideal_angle(self) -> Option<f64> {
        match self {
            Hybridization::Sp => Some(180f64.to_radians()),
            Hybridization::Sp2 => Some(120f64.to_radians()),
            Hybridization::Sp3 => Some((-1.0f64 / 3.0).acos()),
            Hybridization::Other => None,
        }
    }
}

/// Hybridization of every atom, derived from its degree and bond orders
pub(crate) fn hybridizations(graph: &MolecularGraph) -> Vec<Hybridization> {
    let adjacency = graph.adjacency();
    (0..graph.atom_count())
        .map(|atom| {
            let degree = adjacency[atom].len();
            let mut doubles = 0;
            let mut triple = false;
            let mut aromatic = false;
            for bond in graph.bonds_of(atom) {
                match bond.order {
                    BondOrder::Double => doubles += 1,
                    BondOrder::Triple | BondOrder::Quadruple => triple = true,
                    BondOrder::Aromatic => aromatic = true,
                    BondOrder::Single => {}
                }
            }

            if degree > 4 {
                Hybridization::Other
            } else if degree <= 2 && (triple || doubles >= 2) {
                Hybridization::Sp
            } else if degree <= 3 && (doubles >= 1 || aromatic) {
                Hybridization::Sp2
            } else {
                Hybridization::Sp3
            }
        })
        .collect()
}

/// Target length of a bond in Ångström
pub(crate) fn bond_length(a: ElementType, b: ElementType, order: BondOrder) -> f64 {
    let sum = a.covalent_radius() + b.covalent_radius();
    sum * (1.0 - BOND_ORDER_CORRECTION * order.value().ln())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DistanceKind {
    Bond,
    Angle,
}

#[derive(Clone, Debug, PartialEq)]
struct DistanceRestraint {
    i: usize,
    j: usize,
    target: f64,
    weight: f64,
    kind: DistanceKind,
}

#[derive(Clone, Debug, PartialEq)]
struct Repulsion {
    i: usize,
    j: usize,
    min_distance: f64,
}

/// The restraint potential of one molecular graph. Positions are in Ångström.
#[derive(Clone, Debug)]
pub(crate) struct RestraintField {
    n_atoms: usize,
    distances: Vec<DistanceRestraint>,
    /// quadruples whose signed volume should vanish
    planes: Vec<[usize; 4]>,
    repulsions: Vec<Repulsion>,
}

impl RestraintField {
    /// Builds the restraints of a graph whose hydrogens are explicit atoms.
    pub(crate) fn from_graph(graph: &MolecularGraph) -> Self {
        let n_atoms = graph.atom_count();
        let adjacency = graph.adjacency();
        let hybridizations = hybridizations(graph);

        let mut bond_lengths = vec![vec![None; n_atoms]; n_atoms];
        let mut distances = Vec::new();
        for bond in graph.bonds() {
            let target = bond_length(
                graph.atom(bond.i).element,
                graph.atom(bond.j).element,
                bond.order,
            );
            bond_lengths[bond.i][bond.j] = Some(target);
            bond_lengths[bond.j][bond.i] = Some(target);
            distances.push(DistanceRestraint {
                i: bond.i,
                j: bond.j,
                target,
                weight: BOND_WEIGHT,
                kind: DistanceKind::Bond,
            });
        }

        let mut planes = Vec::new();
        for (center, neighbors) in adjacency.iter().enumerate() {
            let Some(ideal) = hybridizations[center].ideal_angle() else {
                continue;
            };

            for (n, &a) in neighbors.iter().enumerate() {
                for &b in &neighbors[n + 1..] {
                    // three membered ring, the 1-3 pair is bonded
                    if bond_lengths[a][b].is_some() {
                        continue;
                    }
                    // four membered ring
                    let square = adjacency[a]
                        .iter()
                        .any(|&k| k != center && adjacency[b].contains(&k));
                    let angle = if square { 90f64.to_radians() } else { ideal };

                    let (Some(da), Some(db)) = (bond_lengths[center][a], bond_lengths[center][b])
                    else {
                        continue;
                    };
                    let target = (da * da + db * db - 2.0 * da * db * angle.cos()).sqrt();
                    distances.push(DistanceRestraint {
                        i: a,
                        j: b,
                        target,
                        weight: ANGLE_WEIGHT,
                        kind: DistanceKind::Angle,
                    });
                }
            }

            if hybridizations[center] == Hybridization::Sp2 && neighbors.len() == 3 {
                planes.push([center, neighbors[0], neighbors[1], neighbors[2]]);
            }
        }

        for bond in graph.bonds() {
            if !matches!(bond.order, BondOrder::Double | BondOrder::Aromatic)
                || hybridizations[bond.i] != Hybridization::Sp2
                || hybridizations[bond.j] != Hybridization::Sp2
            {
                continue;
            }
            for &a in adjacency[bond.i].iter().filter(|&&a| a != bond.j) {
                for &b in adjacency[bond.j].iter().filter(|&&b| b != bond.i && b != a) {
                    planes.push([a, bond.i, bond.j, b]);
                }
            }
        }

        let topological = graph.topological_distances();
        let mut repulsions = Vec::new();
        for i in 0..n_atoms {
            for j in i + 1..n_atoms {
                let min_distance = match topological[i][j] {
                    Some(d) if d < 3 => continue,
                    None => FRAGMENT_CONTACT,
                    Some(_)
                        if graph.atom(i).element == ElementType::H
                            || graph.atom(j).element == ElementType::H =>
                    {
                        HYDROGEN_CONTACT
                    }
                    Some(_) => HEAVY_CONTACT,
                };
                repulsions.push(Repulsion { i, j, min_distance });
            }
        }

        log::trace!(
            "restraints: {} distances, {} planes, {} repulsive pairs",
            distances.len(),
            planes.len(),
            repulsions.len()
        );

        Self {
            n_atoms,
            distances,
            planes,
            repulsions,
        }
    }

    pub(crate) fn atom_count(&self) -> usize {
        self.n_atoms
    }

    /// The same field without planarity terms. Squared signed volumes hold a
    /// hydrogen that starts inside a ring in the ring plane, minimizing this field
    /// first lets it leave through the third dimension.
    pub(crate) fn without_planarity(&self) -> Self {
        Self {
            planes: Vec::new(),
            ..self.clone()
        }
    }

    /// Largest deviation from a bond length and from a 1-3 distance target
    pub(crate) fn worst_deviations(&self, positions: &[f64]) -> (f64, f64) {
        let mut bond: f64 = 0.0;
        let mut angle: f64 = 0.0;
        for restraint in &self.distances {
            let deviation =
                ((point(positions, restraint.i) - point(positions, restraint.j)).norm()
                    - restraint.target)
                    .abs();
            match restraint.kind {
                DistanceKind::Bond => bond = bond.max(deviation),
                DistanceKind::Angle => angle = angle.max(deviation),
            }
        }
        (bond, angle)
    }

    /// Whether a minimized structure reproduces the bonded geometry
    pub(crate) fn is_acceptable(&self, positions: &[f64]) -> bool {
        let (bond, angle) = self.worst_deviations(positions);
        bond < BOND_TOLERANCE && angle < ANGLE_TOLERANCE
    }
}

impl ForceField for RestraintField {
    fn energy_and_gradients(&self, positions: &[f64], gradients: &mut [f64]) -> f64 {
        gradients.fill(0.0);
        let mut energy = 0.0;

        for restraint in &self.distances {
            let delta = point(positions, restraint.i) - point(positions, restraint.j);
            let r = delta.norm().max(1e-10);
            let stretch = r - restraint.target;
            energy += restraint.weight * stretch * stretch;

            let force = delta * (2.0 * restraint.weight * stretch / r);
            accumulate(gradients, restraint.i, force);
            accumulate(gradients, restraint.j, -force);
        }

        for &[p0, p1, p2, p3] in &self.planes {
            let origin = point(positions, p0);
            let u = point(positions, p1) - origin;
            let v = point(positions, p2) - origin;
            let w = point(positions, p3) - origin;
            let volume = u.dot(&v.cross(&w));
            energy += PLANARITY_WEIGHT * volume * volume;

            let scale = 2.0 * PLANARITY_WEIGHT * volume;
            let d1: Vector3<f64> = v.cross(&w) * scale;
            let d2: Vector3<f64> = w.cross(&u) * scale;
            let d3: Vector3<f64> = u.cross(&v) * scale;
            accumulate(gradients, p1, d1);
            accumulate(gradients, p2, d2);
            accumulate(gradients, p3, d3);
            accumulate(gradients, p0, -(d1 + d2 + d3));
        }

        for repulsion in &self.repulsions {
            let delta = point(positions, repulsion.i) - point(positions, repulsion.j);
            let r = delta.norm().max(1e-10);
            if r >= repulsion.min_distance {
                continue;
            }
            let overlap = repulsion.min_distance - r;
            energy += REPULSION_WEIGHT * overlap * overlap;

            let force = delta * (-2.0 * REPULSION_WEIGHT * overlap / r);
            accumulate(gradients, repulsion.i, force);
            accumulate(gradients, repulsion.j, -force);
        }

        energy
    }
}
