use std::fmt::Write;

use nalgebra::Vector3;
use serde::Serialize;

use crate::periodic_table::ElementType;

/// A single atom of an embedded structure. Positions are in Ångström.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct GeometryAtom {
    pub element: ElementType,
    pub position: [f64; 3],
}

impl GeometryAtom {
    pub fn new(element: ElementType, position: [f64; 3]) -> Self {
        Self { element, position }
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::from(self.position)
    }
}

/// Cartesian structure of a molecule, produced once by a geometry generator and
/// never modified afterwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Geometry {
    atoms: Vec<GeometryAtom>,
    /// Sum of the formal charges written in the source notation
    formal_charge: i32,
}

impl Geometry {
    pub fn new(atoms: Vec<GeometryAtom>, formal_charge: i32) -> Self {
        Self {
            atoms,
            formal_charge,
        }
    }

    pub fn atoms(&self) -> &[GeometryAtom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn formal_charge(&self) -> i32 {
        self.formal_charge
    }

    /// Number of electrons of the neutral system
    pub fn nuclear_charge(&self) -> u32 {
        self.atoms
            .iter()
            .map(|atom| atom.element.atomic_number())
            .sum()
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        (self.atoms[i].position() - self.atoms[j].position()).norm()
    }

    /// Renders the structure as an XYZ block
    pub fn to_xyz(&self, comment: &str) -> String {
        let mut output = format!("{}\n{}\n", self.atoms.len(), comment);
        for GeometryAtom {
            element,
            position: [x, y, z],
        } in &self.atoms
        {
            // writing into a String cannot fail
            let _ = writeln!(output, "{:<2} {x:>14.8} {y:>14.8} {z:>14.8}", element.symbol());
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn xyz_block_lists_every_atom() {
        let geometry = Geometry::new(
            vec![
                GeometryAtom::new(ElementType::O, [0.0, 0.0, 0.0]),
                GeometryAtom::new(ElementType::H, [0.0, 0.757, 0.587]),
                GeometryAtom::new(ElementType::H, [0.0, -0.757, 0.587]),
            ],
            0,
        );

        let xyz = geometry.to_xyz("water");
        let lines = xyz.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "3");
        assert_eq!(lines[1], "water");
        assert!(lines[2].starts_with("O "));
        assert_eq!(geometry.nuclear_charge(), 10);
        assert_relative_eq!(geometry.distance(1, 2), 1.514, epsilon = 1e-12);
    }
}
