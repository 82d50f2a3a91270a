use crate::periodic_table::ElementType;

use super::{
    graph::{Bond, BondOrder, MolecularGraph},
    reader::{read_topology, Topology},
    scanner::Scanner,
    SmilesError,
};

/// Parses a SMILES string. Organic subset atoms receive their implicit hydrogens
/// from the default valences, bracket atoms carry exactly the hydrogens written.
pub fn parse(smiles: &str) -> Result<MolecularGraph, SmilesError> {
    if smiles.trim().is_empty() {
        return Err(SmilesError::Empty);
    }

    let scan = Scanner::new(smiles).run()?;
    let topology = read_topology(smiles)?;
    check_topology(&topology, scan.atoms.len(), scan.bonds.len())?;

    for (index, (atom, &number)) in scan.atoms.iter().zip(&topology.atomic_numbers).enumerate() {
        if number != 0 && number != u64::from(atom.element.atomic_number()) {
            return Err(SmilesError::Reader {
                message: format!(
                    "atom {index} was read with atomic number {number}, expected {}",
                    atom.element
                ),
            });
        }
    }

    let bonds = topology
        .bonds
        .iter()
        .map(|&([i, j], order)| Bond::new(i, j, order.unwrap_or(BondOrder::Single)))
        .collect::<Vec<_>>();
    let mut graph = MolecularGraph::new(scan.atoms, bonds);
    assign_aromatic_bonds(&mut graph);
    assign_implicit_hydrogens(&mut graph, &scan.organic)?;

    log::trace!(
        "parsed '{smiles}': {} atoms, {} bonds",
        graph.atom_count(),
        graph.bond_count()
    );
    Ok(graph)
}

fn check_topology(topology: &Topology, atoms: usize, bonds: usize) -> Result<(), SmilesError> {
    if topology.atomic_numbers.len() != atoms || topology.bonds.len() != bonds {
        return Err(SmilesError::Reader {
            message: format!(
                "read {} atoms and {} bonds, the string has {atoms} atoms and {bonds} bonds",
                topology.atomic_numbers.len(),
                topology.bonds.len()
            ),
        });
    }
    Ok(())
}

/// Bonds between two aromatic atoms are aromatic when they lie on a ring, unless
/// written as double or triple bonds. The remaining ones are single bonds, like the
/// bond joining the rings of biphenyl.
fn assign_aromatic_bonds(graph: &mut MolecularGraph) {
    let bonds = graph.bonds().collect::<Vec<_>>();
    for bond in bonds {
        if matches!(
            bond.order,
            BondOrder::Double | BondOrder::Triple | BondOrder::Quadruple
        ) {
            continue;
        }
        let aromatic = graph.atom(bond.i).aromatic
            && graph.atom(bond.j).aromatic
            && graph.is_ring_bond(bond.i, bond.j);
        let order = if aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        };
        if order != bond.order {
            graph.set_bond_order(bond.i, bond.j, order);
        }
    }
}

/// Fills in the hydrogens of organic subset atoms: the lowest default valence that
/// accommodates the explicit bonds is completed with hydrogens. Aromatic atoms
/// contribute one valence to the pi system, except for the pyrrole-like `o` and `s`
/// (and bracket `[nH]`, which is written explicitly).
fn assign_implicit_hydrogens(
    graph: &mut MolecularGraph,
    organic: &[bool],
) -> Result<(), SmilesError> {
    for index in 0..graph.atom_count() {
        if !organic[index] {
            continue;
        }

        let mut used = 0;
        let mut multiple_bond = false;
        for bond in graph.bonds_of(index) {
            used += bond.order.valence();
            multiple_bond |= matches!(
                bond.order,
                BondOrder::Double | BondOrder::Triple | BondOrder::Quadruple
            );
        }

        let atom = graph.atom(index);
        if atom.aromatic
            && !multiple_bond
            && !matches!(atom.element, ElementType::O | ElementType::S)
        {
            used += 1;
        }

        let valence = atom
            .element
            .default_valences()
            .iter()
            .copied()
            .find(|&valence| valence >= used)
            .ok_or_else(|| SmilesError::ValenceExceeded {
                symbol: atom.element.symbol().to_owned(),
                offset: atom.offset,
                bonds: used,
            })?;

        graph.atom_mut(index).hydrogens = valence - used;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hydrogens(smiles: &str) -> Vec<u32> {
        parse(smiles)
            .unwrap()
            .atoms()
            .map(|atom| atom.hydrogens)
            .collect()
    }

    #[test]
    fn implicit_hydrogens_of_simple_molecules() {
        assert_eq!(hydrogens("C"), [4]);
        assert_eq!(hydrogens("O"), [2]);
        assert_eq!(hydrogens("N"), [3]);
        assert_eq!(hydrogens("F"), [1]);
        assert_eq!(hydrogens("C=O"), [2, 0]);
        assert_eq!(hydrogens("CO"), [3, 1]);
        assert_eq!(hydrogens("C#N"), [1, 0]);
        assert_eq!(hydrogens("CC(=O)O"), [3, 0, 0, 1]);
        assert_eq!(hydrogens("CS(=O)(=O)C"), [3, 0, 0, 0, 3]);
        assert_eq!(hydrogens("ClCBr"), [0, 2, 0]);
    }

    #[test]
    fn aromatic_rings() {
        assert_eq!(hydrogens("c1ccccc1"), [1; 6]);
        assert_eq!(hydrogens("c1ccncc1"), [1, 1, 1, 0, 1, 1]);
        assert_eq!(hydrogens("c1ccoc1"), [1, 1, 1, 0, 1]);
        assert_eq!(hydrogens("c1cc[nH]c1"), [1, 1, 1, 1, 1]);
        // naphthalene: the fusion carbons have three ring bonds
        assert_eq!(hydrogens("c1ccc2ccccc2c1"), [1, 1, 1, 0, 1, 1, 1, 1, 0, 1]);

        let benzene = parse("c1ccccc1").unwrap();
        assert_eq!(benzene.bond_count(), 6);
        assert!(benzene.bonds().all(|bond| bond.order == BondOrder::Aromatic));
    }

    #[test]
    fn bracket_atoms() {
        let graph = parse("[13CH4]").unwrap();
        let atom = graph.atom(0);
        assert_eq!(atom.isotope, Some(13));
        assert_eq!(atom.hydrogens, 4);

        let graph = parse("[NH4+]").unwrap();
        assert_eq!(graph.formal_charge(), 1);
        assert_eq!(graph.atom(0).hydrogens, 4);

        let graph = parse("C[O-]").unwrap();
        assert_eq!(graph.formal_charge(), -1);
        assert_eq!(graph.atom(1).hydrogens, 0);

        assert_eq!(parse("[Fe++]").unwrap().formal_charge(), 2);
        assert_eq!(parse("[O-2]").unwrap().formal_charge(), -2);
        assert_eq!(parse("[CH3:7]C").unwrap().atom(0).hydrogens, 3);
        assert_eq!(parse("[Cl-]").unwrap().atom(0).element, ElementType::Cl);
        assert_eq!(parse("[se]1cccc1").unwrap().atom(0).element, ElementType::Se);
    }

    #[test]
    fn stereo_is_accepted_and_ignored() {
        let graph = parse("N[C@@H](C)C(=O)O").unwrap();
        assert_eq!(graph.atom(1).hydrogens, 1);
        assert_eq!(parse("F/C=C/F").unwrap().formula(), "C2H2F2");
        assert!(parse("F[C@TH1](Cl)(Br)I").is_ok());
    }

    #[test]
    fn branches_and_rings() {
        let graph = parse("CC(C)(C)C").unwrap();
        assert_eq!(graph.bond_count(), 4);
        assert_eq!(graph.adjacency()[1].len(), 4);

        let graph = parse("C1CC1").unwrap();
        assert_eq!(graph.bond_count(), 3);
        assert!(graph.bond_between(0, 2).is_some());

        let graph = parse("C%12CC%12").unwrap();
        assert_eq!(graph.bond_count(), 3);

        let graph = parse("C1CCCCC=1").unwrap();
        assert_eq!(graph.bond_between(0, 5).map(|b| b.order), Some(BondOrder::Double));
    }

    #[test]
    fn disconnected_components() {
        let graph = parse("[Na+].[Cl-]").unwrap();
        assert_eq!(graph.atom_count(), 2);
        assert_eq!(graph.bond_count(), 0);
        assert_eq!(graph.formal_charge(), 0);
        assert_eq!(parse("O.O").unwrap().hydrogen_count(), 4);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(parse(""), Err(SmilesError::Empty)));
        assert!(matches!(parse("  "), Err(SmilesError::Empty)));
        assert!(matches!(parse("C1CC"), Err(SmilesError::UnclosedRing { ring: 1, offset: 1 })));
        assert!(matches!(parse("C(C"), Err(SmilesError::UnbalancedBranch { offset: 1 })));
        assert!(matches!(parse("CC)"), Err(SmilesError::UnbalancedBranch { offset: 2 })));
        assert!(matches!(parse("C="), Err(SmilesError::DanglingBond { offset: 1 })));
        assert!(matches!(parse("[CH4"), Err(SmilesError::UnclosedBracket { offset: 0 })));
        assert!(matches!(parse("[Xx]"), Err(SmilesError::UnknownElement { .. })));
        assert!(matches!(
            parse("C&C"),
            Err(SmilesError::UnexpectedCharacter { character: '&', offset: 1 })
        ));
        assert!(matches!(parse("=C"), Err(SmilesError::UnexpectedCharacter { .. })));
        assert!(matches!(parse("C11"), Err(SmilesError::InvalidRingClosure { .. })));
        assert!(matches!(parse("C(=O)(=O)=O"), Err(SmilesError::ValenceExceeded { .. })));
        assert!(matches!(parse("FF(F)"), Err(SmilesError::ValenceExceeded { .. })));
    }

    #[test]
    fn aromatic_bonds_need_a_ring() {
        let biphenyl = parse("c1ccccc1-c1ccccc1").unwrap();
        assert_eq!(biphenyl.bond_between(5, 6).map(|bond| bond.order), Some(BondOrder::Single));
        assert_eq!(biphenyl.bond_between(6, 7).map(|bond| bond.order), Some(BondOrder::Aromatic));
        assert_eq!(biphenyl.hydrogen_count(), 10);

        // the bond joining the rings may also be left implicit
        let implicit = parse("c1ccccc1c1ccccc1").unwrap();
        assert_eq!(implicit.bond_between(5, 6).map(|bond| bond.order), Some(BondOrder::Single));

        let indole = parse("c1ccc2[nH]ccc2c1").unwrap();
        assert_eq!(indole.formula(), "C8H7N");
        assert!(indole.bonds().all(|bond| bond.order == BondOrder::Aromatic));
    }

    #[test]
    fn bracket_counts_are_bounded() {
        assert!(matches!(
            parse("[CH99999]"),
            Err(SmilesError::HydrogenCountOutOfRange { offset: 0 })
        ));
        assert!(matches!(
            parse("[CH99999999999]"),
            Err(SmilesError::HydrogenCountOutOfRange { .. })
        ));
        assert!(matches!(
            parse("C[C+99999999999]"),
            Err(SmilesError::ChargeOutOfRange { offset: 1 })
        ));
        assert_eq!(parse("[CH4]").unwrap().hydrogen_count(), 4);
    }
}
