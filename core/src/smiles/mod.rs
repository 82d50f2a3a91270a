//! Reading of SMILES line notation into a molecular graph.
//!
//! The string is scanned once for its atom annotations and its syntax, chemfiles
//! reads the bonds and bond orders, and the hydrogens the string leaves implicit
//! are filled in from the default valences.
//!
//! Supported: the organic subset (`B C N O P S F Cl Br I`, aromatic `b c n o p s`),
//! bracket atoms with isotope, chirality, hydrogen count, charge and atom class,
//! the bond symbols `- = # $ : / \`, branches, ring closures (`1`..`9`, `%nn`) and
//! disconnected components separated by `.`. Stereo descriptors are accepted and
//! discarded.

mod graph;
mod parser;
mod reader;
mod scanner;

use thiserror::Error;

pub use graph::{Bond, BondOrder, GraphAtom, MolecularGraph};
pub use parser::parse;

/// Errors of the SMILES reader. Offsets are byte offsets into the input string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmilesError {
    #[error("empty SMILES string")]
    Empty,

    #[error("unexpected character '{character}' at offset {offset}")]
    UnexpectedCharacter { character: char, offset: usize },

    #[error("unknown element '{symbol}' at offset {offset}")]
    UnknownElement { symbol: String, offset: usize },

    #[error("bracket atom starting at offset {offset} is not closed")]
    UnclosedBracket { offset: usize },

    #[error("unbalanced parenthesis at offset {offset}")]
    UnbalancedBranch { offset: usize },

    #[error("ring bond {ring} opened at offset {offset} is never closed")]
    UnclosedRing { ring: u32, offset: usize },

    #[error("invalid ring closure {ring} at offset {offset}")]
    InvalidRingClosure { ring: u32, offset: usize },

    #[error("bond at offset {offset} is not followed by an atom")]
    DanglingBond { offset: usize },

    #[error("hydrogen count of the bracket atom at offset {offset} is larger than 9")]
    HydrogenCountOutOfRange { offset: usize },

    #[error("charge of the bracket atom at offset {offset} is outside of -15..=15")]
    ChargeOutOfRange { offset: usize },

    #[error("chemfiles could not read the SMILES string: {message}")]
    Reader { message: String },

    #[error("{symbol} at offset {offset} has {bonds} bonds, more than its allowed valence")]
    ValenceExceeded {
        symbol: String,
        offset: usize,
        bonds: u32,
    },
}
