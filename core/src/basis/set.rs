use std::{collections::HashMap, fs::File, io::BufReader, path::Path};

use thiserror::Error;

use crate::{atom::Atom, config::ConfigBasisSet, periodic_table::ElementType};

use super::{BasisFunction, ContractedGaussian};

const DEF2_SVP: &str = include_str!("../../data/basis/def2-svp.json");
const STO_3G: &str = include_str!("../../data/basis/sto-3g.json");

/// Basis sets shipped with the crate, as (canonical name, BSE JSON)
const BUILTIN: [(&str, &str); 2] = [("def2svp", DEF2_SVP), ("sto3g", STO_3G)];

#[derive(Debug, Error)]
pub enum BasisSetError {
    #[error("unknown basis set '{0}' (built-in: def2svp, sto-3g)")]
    Unknown(String),

    #[error("failed to read basis set file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed basis set JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid number '{value}' in basis set")]
    Number {
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("unsupported shell for {element}: {detail}")]
    UnsupportedShell { element: ElementType, detail: String },
}

#[derive(Debug)]
pub struct BasisSet {
    name: String,
    atomic_mapping: HashMap<ElementType, AtomicBasis>,
}

impl BasisSet {
    /// Returns the basis of a given atom, if it exists.
    pub fn for_atom(&self, atom: &Atom) -> Option<&AtomicBasis> {
        self.atomic_mapping.get(&atom.element_type)
    }

    pub fn supports(&self, element: ElementType) -> bool {
        self.atomic_mapping.contains_key(&element)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a new basis set given mappings from element type to the basis of that element
    pub(crate) fn new(name: String, atomic_mapping: HashMap<ElementType, AtomicBasis>) -> Self {
        Self {
            name,
            atomic_mapping,
        }
    }

    /// Looks up one of the built-in basis sets. Names are compared ignoring case and
    /// punctuation, so `def2-SVP`, `def2svp` and `DEF2_SVP` are the same set.
    pub fn builtin(name: &str) -> Result<Self, BasisSetError> {
        let key = canonical_name(name);
        let (_, json) = BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == key)
            .ok_or_else(|| BasisSetError::Unknown(name.to_owned()))?;

        let config: ConfigBasisSet = serde_json::from_str(json)?;
        config.into_basis_set(key)
    }

    /// Loads a basis set in Basis Set Exchange JSON format from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BasisSetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| BasisSetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: ConfigBasisSet = serde_json::from_reader(BufReader::new(file))?;
        let name = path
            .file_stem()
            .map(|stem| canonical_name(&stem.to_string_lossy()))
            .unwrap_or_default();
        config.into_basis_set(name)
    }

    /// Resolves a basis set identifier: a built-in name, or otherwise a path to a
    /// BSE JSON file.
    pub fn resolve(identifier: &str) -> Result<Self, BasisSetError> {
        match Self::builtin(identifier) {
            Err(BasisSetError::Unknown(_)) if Path::new(identifier).is_file() => {
                Self::load(identifier)
            }
            other => other,
        }
    }

    /// Places the atomic basis of every atom at its nucleus. Returns the first element
    /// without a basis on failure.
    pub fn basis_for(&self, atoms: &[Atom]) -> Result<Vec<BasisFunction>, ElementType> {
        let mut basis = Vec::new();
        for atom in atoms {
            let atomic_basis = self.for_atom(atom).ok_or(atom.element_type)?;
            basis.extend(
                atomic_basis
                    .basis_functions()
                    .map(|contracted_gaussian| BasisFunction {
                        contracted_gaussian: contracted_gaussian.clone(),
                        position: atom.position,
                    }),
            );
        }
        Ok(basis)
    }
}

pub(crate) fn canonical_name(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Represents the basis functions for a single atom.
#[derive(Debug)]
pub struct AtomicBasis {
    pub(crate) shells: Vec<ElectronShell>,
}

impl AtomicBasis {
    pub(crate) fn empty() -> Self {
        Self { shells: Vec::new() }
    }

    pub fn basis_functions(&self) -> impl Iterator<Item = &ContractedGaussian> {
        self.shells.iter().flat_map(|shell| &shell.basis_functions)
    }

    pub fn max_angular_momentum(&self) -> i32 {
        self.shells
            .iter()
            .map(|shell| shell.angular_magnitude)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ElectronShell {
    pub(crate) angular_magnitude: i32,
    pub(crate) basis_functions: Vec<ContractedGaussian>,
}

impl ElectronShell {
    pub(crate) fn new(angular_magnitude: i32) -> Self {
        Self {
            angular_magnitude,
            basis_functions: Vec::new(),
        }
    }
}
