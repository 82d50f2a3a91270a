use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named SMILES string
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoleculeDescriptor {
    pub name: String,
    pub smiles: String,
}

impl MoleculeDescriptor {
    pub fn new(name: impl Into<String>, smiles: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            smiles: smiles.into(),
        }
    }
}

/// Ordered collection of molecules. Insertion order is the order of the results;
/// duplicate names are kept as separate entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoleculeSet {
    molecules: Vec<MoleculeDescriptor>,
}

impl MoleculeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<N, S>(pairs: impl IntoIterator<Item = (N, S)>) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(name, smiles)| MoleculeDescriptor::new(name, smiles))
            .collect()
    }

    /// Small closed shell molecules made of H, C, N, O and F
    pub fn tutorial() -> Self {
        Self::from_pairs([
            ("Water", "O"),
            ("Methane", "C"),
            ("Ammonia", "N"),
            ("Hydrogen fluoride", "F"),
            ("Formaldehyde", "C=O"),
            ("Methanol", "CO"),
        ])
    }

    /// Reads a JSON array of `{"name": ..., "smiles": ...}` objects
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn push(&mut self, name: impl Into<String>, smiles: impl Into<String>) {
        self.molecules.push(MoleculeDescriptor::new(name, smiles));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MoleculeDescriptor> {
        self.molecules.iter()
    }

    pub fn as_slice(&self) -> &[MoleculeDescriptor] {
        &self.molecules
    }

    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }
}

impl FromIterator<MoleculeDescriptor> for MoleculeSet {
    fn from_iter<T: IntoIterator<Item = MoleculeDescriptor>>(iter: T) -> Self {
        Self {
            molecules: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MoleculeSet {
    type Item = &'a MoleculeDescriptor;
    type IntoIter = std::slice::Iter<'a, MoleculeDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.molecules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order_and_duplicates() {
        let set = MoleculeSet::from_pairs([("b", "C"), ("a", "O"), ("b", "N")]);
        let names = set.iter().map(|m| m.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["b", "a", "b"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn parses_json_list() {
        let set: MoleculeSet = serde_json::from_str(
            r#"[{"name": "Water", "smiles": "O"}, {"name": "Ethanol", "smiles": "CCO"}]"#,
        )
        .unwrap();
        assert_eq!(set.as_slice()[1], MoleculeDescriptor::new("Ethanol", "CCO"));

        let error = serde_json::from_str::<MoleculeSet>(r#"[{"name": "Water"}]"#);
        assert!(error.is_err());
    }

    #[test]
    fn tutorial_set() {
        let set = MoleculeSet::tutorial();
        assert_eq!(set.len(), 6);
        assert_eq!(set.as_slice()[0], MoleculeDescriptor::new("Water", "O"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            MoleculeSet::load("/nonexistent/molecules.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
