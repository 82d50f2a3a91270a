//! Terminal tables of batch results.

use std::fmt;

use tabled::{settings::Style, Table, Tabled};

use crate::pipeline::{MoleculeOutcome, ResultRecord};

#[derive(Debug, Clone, Tabled)]
struct ResultRow {
    #[tabled(rename = "Molecule")]
    molecule: String,
    #[tabled(rename = "HF Energy (Hartree)")]
    energy: String,
    #[tabled(rename = "Dipole Moment (D)")]
    dipole: String,
    #[tabled(rename = "Dipole |μ| (D)")]
    magnitude: String,
}

impl From<&ResultRecord> for ResultRow {
    fn from(record: &ResultRecord) -> Self {
        Self {
            molecule: record.name.clone(),
            energy: format!("{:.8}", record.energy),
            dipole: format_dipole(record.dipole),
            magnitude: format!("{:.3}", record.dipole_magnitude),
        }
    }
}

/// `(x, y, z)` with three decimals
pub fn format_dipole([x, y, z]: [f64; 3]) -> String {
    format!("({x:.3}, {y:.3}, {z:.3})")
}

/// One row per computed molecule, in input order
#[derive(Debug, Clone)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new<'a>(records: impl IntoIterator<Item = &'a ResultRecord>) -> Self {
        Self {
            rows: records.into_iter().map(ResultRow::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut table = Table::new(&self.rows);
        table.with(Style::rounded());
        write!(f, "{table}")
    }
}

#[derive(Debug, Clone, Tabled)]
struct FailureRow {
    #[tabled(rename = "Molecule")]
    molecule: String,
    #[tabled(rename = "SMILES")]
    smiles: String,
    #[tabled(rename = "Error")]
    error: String,
}

/// The molecules that failed, with their error
#[derive(Debug, Clone)]
pub struct FailureTable {
    rows: Vec<FailureRow>,
}

impl FailureTable {
    pub fn new<'a>(outcomes: impl IntoIterator<Item = &'a MoleculeOutcome>) -> Self {
        let rows = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                MoleculeOutcome::Failure {
                    name,
                    smiles,
                    error,
                } => Some(FailureRow {
                    molecule: name.clone(),
                    smiles: smiles.clone(),
                    error: error.to_string(),
                }),
                MoleculeOutcome::Success(_) => None,
            })
            .collect();
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for FailureTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut table = Table::new(&self.rows);
        table.with(Style::rounded());
        write!(f, "{table}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn record(name: &str, dipole: [f64; 3]) -> ResultRecord {
        let [x, y, z] = dipole;
        ResultRecord {
            name: name.to_owned(),
            smiles: "O".to_owned(),
            energy: -75.98534567891,
            dipole,
            dipole_magnitude: (x * x + y * y + z * z).sqrt(),
            iterations: 12,
        }
    }

    #[test]
    fn formats_values_with_fixed_precision() {
        let table = ResultTable::new(&[record("Water", [0.0, -0.0004, 2.04567])]);
        let text = table.to_string();

        assert!(text.contains("HF Energy (Hartree)"));
        assert!(text.contains("Dipole |μ| (D)"));
        assert!(text.contains("-75.98534568"));
        assert!(text.contains("(0.000, -0.000, 2.046)"));
        assert!(text.contains("2.046"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn rows_follow_record_order() {
        let records = [record("b", [1.0, 0.0, 0.0]), record("a", [0.0, 1.0, 0.0])];
        let text = ResultTable::new(&records).to_string();
        let b = text.find("│ b ").unwrap();
        let a = text.find("│ a ").unwrap();
        assert!(b < a);
    }

    #[test]
    fn rounded_components_reproduce_the_magnitude() {
        let dipole = [0.1234, -1.98765, 0.55555];
        let record = record("x", dipole);
        let formatted = format_dipole(dipole);
        let components = formatted
            .trim_matches(|c| c == '(' || c == ')')
            .split(", ")
            .map(|part| part.parse::<f64>().unwrap())
            .collect::<Vec<_>>();
        let norm = components.iter().map(|c| c * c).sum::<f64>().sqrt();
        // each component is off by at most 5e-4
        assert!((norm - record.dipole_magnitude).abs() <= 5e-4 * 3f64.sqrt());
    }

    #[test]
    fn failure_table_lists_errors() {
        let outcomes = [
            MoleculeOutcome::Success(record("ok", [0.0; 3])),
            MoleculeOutcome::Failure {
                name: "broken".into(),
                smiles: "C1CC".into(),
                error: PipelineError::geometry("C1CC", "ring bond 1 is never closed"),
            },
        ];
        let table = FailureTable::new(&outcomes);
        let text = table.to_string();
        assert!(!table.is_empty());
        assert!(text.contains("broken"));
        assert!(text.contains("C1CC"));
        assert!(!text.contains("│ ok "));
    }
}
