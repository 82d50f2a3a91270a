use std::fmt;

use petgraph::{
    algo::{dijkstra, has_path_connecting},
    graph::{node_index, UnGraph},
    visit::EdgeRef,
};
use serde::Serialize;

use crate::periodic_table::ElementType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Bond order used for bond length estimates, 1.5 for aromatic bonds
    pub fn value(&self) -> f64 {
        match self {
            BondOrder::Single => 1.0,
            BondOrder::Double => 2.0,
            BondOrder::Triple => 3.0,
            BondOrder::Quadruple => 4.0,
            BondOrder::Aromatic => 1.5,
        }
    }

    /// Contribution to the valence of an atom. Aromatic bonds count as single bonds,
    /// the shared pi electron is accounted for on the atom.
    pub(crate) fn valence(&self) -> u32 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BondOrder::Single => "-",
            BondOrder::Double => "=",
            BondOrder::Triple => "#",
            BondOrder::Quadruple => "$",
            BondOrder::Aromatic => ":",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphAtom {
    pub element: ElementType,
    pub aromatic: bool,
    pub charge: i32,
    pub isotope: Option<u32>,
    /// Hydrogens attached without being atoms of the graph: the bracket count,
    /// or the count derived from the default valence for organic subset atoms
    pub hydrogens: u32,
    /// Byte offset of the atom in the source string
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Bond {
    pub i: usize,
    pub j: usize,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(idx1: usize, idx2: usize, order: BondOrder) -> Self {
        if idx1 <= idx2 {
            Self {
                i: idx1,
                j: idx2,
                order,
            }
        } else {
            Self {
                i: idx2,
                j: idx1,
                order,
            }
        }
    }

    /// The partner of `atom` in this bond
    pub fn other(&self, atom: usize) -> usize {
        if self.i == atom {
            self.j
        } else {
            self.i
        }
    }
}

/// Atoms and bonds read from a SMILES string, held in an undirected graph whose node
/// indices are the atom indices. Atom indices follow the order of appearance in the
/// string.
#[derive(Debug, Clone, Default)]
pub struct MolecularGraph {
    graph: UnGraph<GraphAtom, BondOrder>,
}

impl MolecularGraph {
    pub(crate) fn new(atoms: Vec<GraphAtom>, bonds: impl IntoIterator<Item = Bond>) -> Self {
        let mut graph = UnGraph::with_capacity(atoms.len(), atoms.len());
        for atom in atoms {
            graph.add_node(atom);
        }
        for bond in bonds {
            graph.add_edge(node_index(bond.i), node_index(bond.j), bond.order);
        }
        Self { graph }
    }

    pub fn atoms(&self) -> impl ExactSizeIterator<Item = &GraphAtom> + '_ {
        self.graph.raw_nodes().iter().map(|node| &node.weight)
    }

    #[inline]
    pub fn atom(&self, index: usize) -> &GraphAtom {
        &self.graph[node_index(index)]
    }

    pub(crate) fn atom_mut(&mut self, index: usize) -> &mut GraphAtom {
        &mut self.graph[node_index(index)]
    }

    pub fn bonds(&self) -> impl ExactSizeIterator<Item = Bond> + '_ {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| Bond::new(edge.source().index(), edge.target().index(), edge.weight))
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn formal_charge(&self) -> i32 {
        self.atoms().map(|atom| atom.charge).sum()
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<Bond> {
        self.graph
            .find_edge(node_index(a), node_index(b))
            .map(|edge| Bond::new(a, b, self.graph[edge]))
    }

    pub(crate) fn set_bond_order(&mut self, a: usize, b: usize, order: BondOrder) {
        if let Some(edge) = self.graph.find_edge(node_index(a), node_index(b)) {
            self.graph[edge] = order;
        }
    }

    /// Sorted neighbor lists indexed by atom
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        self.graph
            .node_indices()
            .map(|atom| {
                let mut neighbors = self
                    .graph
                    .neighbors(atom)
                    .map(|neighbor| neighbor.index())
                    .collect::<Vec<_>>();
                neighbors.sort_unstable();
                neighbors
            })
            .collect()
    }

    pub fn bonds_of(&self, atom: usize) -> impl Iterator<Item = Bond> + '_ {
        self.graph
            .edges(node_index(atom))
            .map(|edge| Bond::new(edge.source().index(), edge.target().index(), *edge.weight()))
    }

    /// Whether the bond between `a` and `b` lies on a ring, i.e. `a` and `b` stay
    /// connected once the bond is removed.
    pub fn is_ring_bond(&self, a: usize, b: usize) -> bool {
        let Some(edge) = self.graph.find_edge(node_index(a), node_index(b)) else {
            return false;
        };
        let mut without = self.graph.clone();
        without.remove_edge(edge);
        has_path_connecting(&without, node_index(a), node_index(b), None)
    }

    /// Number of bonds on the shortest path between every pair of atoms, `None` for
    /// atoms in different components
    pub fn topological_distances(&self) -> Vec<Vec<Option<usize>>> {
        let n = self.atom_count();
        self.graph
            .node_indices()
            .map(|start| {
                let mut row = vec![None; n];
                for (atom, distance) in dijkstra(&self.graph, start, None, |_| 1usize) {
                    row[atom.index()] = Some(distance);
                }
                row
            })
            .collect()
    }

    /// Total number of hydrogens, both graph atoms and attached counts
    pub fn hydrogen_count(&self) -> u32 {
        self.atoms()
            .map(|atom| atom.hydrogens + u32::from(atom.element == ElementType::H))
            .sum()
    }

    /// Molecular formula in Hill order
    pub fn formula(&self) -> String {
        let mut counts = std::collections::BTreeMap::new();
        for atom in self.atoms() {
            *counts.entry(atom.element.symbol()).or_insert(0u32) += 1;
        }
        let hydrogens = self.hydrogen_count();
        counts.remove("H");

        let mut formula = String::new();
        let mut push = |symbol: &str, count: u32| match count {
            0 => {}
            1 => formula.push_str(symbol),
            n => formula.push_str(&format!("{symbol}{n}")),
        };

        if let Some(carbons) = counts.remove("C") {
            push("C", carbons);
            push("H", hydrogens);
        } else if !counts.is_empty() {
            // without carbon hydrogen is sorted alphabetically like every other element
            counts.insert("H", hydrogens);
        } else {
            push("H", hydrogens);
        }
        for (symbol, count) in counts {
            push(symbol, count);
        }
        formula
    }

    /// Returns a graph where every attached hydrogen is an atom of its own. The new
    /// hydrogens follow the heavy atoms, in the order of the atoms they are bonded to.
    pub fn with_explicit_hydrogens(&self) -> Self {
        let mut graph = self.graph.clone();

        for atom in self.graph.node_indices() {
            let parent = &self.graph[atom];
            for _ in 0..parent.hydrogens {
                let hydrogen = graph.add_node(GraphAtom {
                    element: ElementType::H,
                    aromatic: false,
                    charge: 0,
                    isotope: None,
                    hydrogens: 0,
                    offset: parent.offset,
                });
                graph.add_edge(atom, hydrogen, BondOrder::Single);
            }
            graph[atom].hydrogens = 0;
        }

        Self { graph }
    }
}
