use std::sync::Once;

use chemfiles::{Frame, MemoryTrajectoryReader};

use super::{graph::BondOrder, SmilesError};

/// Atoms and bonds of a SMILES string as chemfiles reads them
#[derive(Debug)]
pub(super) struct Topology {
    /// 0 where chemfiles does not know the element
    pub(super) atomic_numbers: Vec<u64>,
    /// bonded atoms and the order written in the string, `None` where the string
    /// leaves the order implicit
    pub(super) bonds: Vec<([usize; 2], Option<BondOrder>)>,
}

/// chemfiles reports recoverable problems through a global callback, which by
/// default prints to stderr
fn forward_warnings() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        chemfiles::set_warning_callback(|message: &str| log::debug!("chemfiles: {message}"));
    });
}

fn reader_error(error: chemfiles::Error) -> SmilesError {
    SmilesError::Reader {
        message: error.to_string(),
    }
}

/// Reads the first (and only) structure of `smiles` with the chemfiles SMI format.
pub(super) fn read_topology(smiles: &str) -> Result<Topology, SmilesError> {
    forward_warnings();

    let data = format!("{smiles}\n");
    let mut trajectory = MemoryTrajectoryReader::new(data.as_bytes(), "SMI").map_err(reader_error)?;
    let mut frame = Frame::new();
    trajectory.read(&mut frame).map_err(reader_error)?;

    let atomic_numbers = (0..frame.size() as usize)
        .map(|i| frame.atom(i).atomic_number())
        .collect();

    let topology = frame.topology();
    let bonds = topology
        .bonds()
        .into_iter()
        .zip(topology.bond_orders())
        .map(|(bond, order)| {
            let order = match order {
                chemfiles::BondOrder::Single => Some(BondOrder::Single),
                chemfiles::BondOrder::Double => Some(BondOrder::Double),
                chemfiles::BondOrder::Triple => Some(BondOrder::Triple),
                chemfiles::BondOrder::Quadruple => Some(BondOrder::Quadruple),
                chemfiles::BondOrder::Aromatic => Some(BondOrder::Aromatic),
                _ => None,
            };
            (bond, order)
        })
        .collect();

    Ok(Topology {
        atomic_numbers,
        bonds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_bonds_of_a_branched_molecule() {
        let topology = read_topology("CC(=O)O").unwrap();
        assert_eq!(topology.atomic_numbers, [6, 6, 8, 8]);

        let mut bonds = topology.bonds.iter().map(|(bond, _)| *bond).collect::<Vec<_>>();
        bonds.sort_unstable();
        assert_eq!(bonds, [[0, 1], [1, 2], [1, 3]]);

        let carbonyl = topology.bonds.iter().find(|(bond, _)| *bond == [1, 2]);
        assert_eq!(carbonyl.and_then(|(_, order)| *order), Some(BondOrder::Double));
    }

    #[test]
    fn ring_closures_become_bonds() {
        let topology = read_topology("C1CC1").unwrap();
        assert_eq!(topology.bonds.len(), 3);
        assert!(topology.bonds.iter().any(|(bond, _)| *bond == [0, 2]));
    }
}
