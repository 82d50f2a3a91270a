use nalgebra::Vector3;

use crate::{atom::Atom, geometry::Geometry};

/// Bohr radius in Ångström (CODATA 2018)
pub const BOHR_TO_ANGSTROM: f64 = 0.529_177_210_903;

/// Represents a molecule as seen by the solver: nuclei in atomic units.
#[derive(Debug, Clone)]
pub struct Molecule {
    pub(crate) atoms: Vec<Atom>,
}

impl Molecule {
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Sum of all nuclear charges, i.e. the electron count of the neutral molecule
    pub fn nuclear_charge(&self) -> i32 {
        self.atoms.iter().map(Atom::nuclear_charge).sum()
    }

    /// Charge-weighted average of the nuclear positions
    pub fn center_of_charge(&self) -> Vector3<f64> {
        let total = self.nuclear_charge();
        if total == 0 {
            return Vector3::zeros();
        }

        self.atoms
            .iter()
            .map(|atom| atom.nuclear_charge() as f64 * atom.position)
            .sum::<Vector3<f64>>()
            / total as f64
    }
}

impl From<&Geometry> for Molecule {
    fn from(geometry: &Geometry) -> Self {
        let atoms = geometry
            .atoms()
            .iter()
            .map(|atom| Atom {
                position: atom.position() / BOHR_TO_ANGSTROM,
                element_type: atom.element,
            })
            .collect();

        Self { atoms }
    }
}
