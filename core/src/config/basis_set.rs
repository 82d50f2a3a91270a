use std::collections::HashMap;

use serde::Deserialize;
use smallvec::SmallVec;

use crate::{
    basis::{AtomicBasis, BasisSet, BasisSetError, ContractedGaussian, ElectronShell, Gaussian},
    periodic_table::ElementType,
};

/// A basis set in the JSON format of the Basis Set Exchange
#[derive(Deserialize)]
pub(crate) struct ConfigBasisSet {
    elements: HashMap<ElementType, ConfigElectronicConfiguration>,
}

#[derive(Deserialize)]
struct ConfigElectronicConfiguration {
    #[serde(default)]
    electron_shells: Vec<ConfigElectronShell>,
}

#[derive(Deserialize)]
struct ConfigElectronShell {
    function_type: String,
    angular_momentum: Vec<i32>,
    exponents: Vec<String>,
    coefficients: Vec<Vec<String>>,
}

impl ConfigBasisSet {
    pub(crate) fn into_basis_set(self, name: String) -> Result<BasisSet, BasisSetError> {
        let mut atomic_mapping = HashMap::with_capacity(self.elements.len());

        for (element, configuration) in self.elements {
            let mut element_atomic_basis = AtomicBasis::empty();

            for electron_shell in &configuration.electron_shells {
                element_atomic_basis
                    .shells
                    .extend(electron_shell.to_shells(element)?);
            }

            atomic_mapping.insert(element, element_atomic_basis);
        }

        Ok(BasisSet::new(name, atomic_mapping))
    }
}

impl ConfigElectronShell {
    /// Expands one BSE shell into shells of a single angular momentum. Combined shells
    /// (`"angular_momentum": [0, 1]`) pair the n-th coefficient row with the n-th angular
    /// momentum; general contractions with a single angular momentum produce one
    /// contracted function per coefficient row.
    fn to_shells(&self, element: ElementType) -> Result<Vec<ElectronShell>, BasisSetError> {
        if !self.function_type.starts_with("gto") {
            return Err(BasisSetError::UnsupportedShell {
                element,
                detail: format!("function type '{}'", self.function_type),
            });
        }

        let exponents = self
            .exponents
            .iter()
            .map(|value| parse_number(value))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = match self.angular_momentum.as_slice() {
            [] => {
                return Err(BasisSetError::UnsupportedShell {
                    element,
                    detail: "shell without angular momentum".into(),
                })
            }
            &[angular_magnitude] => self
                .coefficients
                .iter()
                .map(|row| (angular_magnitude, row))
                .collect::<Vec<_>>(),
            combined => {
                if combined.len() != self.coefficients.len() {
                    return Err(BasisSetError::UnsupportedShell {
                        element,
                        detail: format!(
                            "{} angular momenta but {} coefficient rows",
                            combined.len(),
                            self.coefficients.len()
                        ),
                    });
                }
                combined.iter().copied().zip(&self.coefficients).collect()
            }
        };

        let mut shells = Vec::with_capacity(rows.len());
        for (angular_magnitude, row) in rows {
            if !(0..=2).contains(&angular_magnitude) {
                return Err(BasisSetError::UnsupportedShell {
                    element,
                    detail: format!("angular momentum {angular_magnitude} (only s, p and d are supported)"),
                });
            }
            if row.len() != exponents.len() {
                return Err(BasisSetError::UnsupportedShell {
                    element,
                    detail: format!(
                        "{} exponents but {} coefficients",
                        exponents.len(),
                        row.len()
                    ),
                });
            }

            let coefficients = row
                .iter()
                .map(|value| parse_number(value))
                .collect::<Result<Vec<_>, _>>()?;

            let mut shell = ElectronShell::new(angular_magnitude);
            for angular in generate_angular_vectors(angular_magnitude) {
                let mut primitives = SmallVec::with_capacity(exponents.len());

                for (&exponent, &coefficient) in exponents.iter().zip(&coefficients) {
                    if coefficient == 0.0 {
                        continue;
                    }
                    let norm = Gaussian::norm(exponent, angular);
                    primitives.push(Gaussian {
                        exponent,
                        coefficient: coefficient * norm,
                        angular,
                    });
                }

                shell
                    .basis_functions
                    .push(ContractedGaussian(primitives).normalized());
            }
            shells.push(shell);
        }

        Ok(shells)
    }
}

fn parse_number(value: &str) -> Result<f64, BasisSetError> {
    // some sources write fortran style exponents
    value
        .trim()
        .replace(['D', 'd'], "E")
        .parse::<f64>()
        .map_err(|source| BasisSetError::Number {
            value: value.to_owned(),
            source,
        })
}

// generate all (i, j, k) such that i + j + k = angular
fn generate_angular_vectors(angular_magnitude: i32) -> Vec<(i32, i32, i32)> {
    let mut angular_vectors = Vec::with_capacity(6);

    for (i, j, k) in itertools::iproduct!(
        (0..=angular_magnitude).rev(),
        (0..=angular_magnitude).rev(),
        (0..=angular_magnitude).rev()
    ) {
        if i + j + k == angular_magnitude {
            angular_vectors.push((i, j, k));
        }
    }

    angular_vectors
}
