pub(crate) use basis_set::ConfigBasisSet;
pub use calculation::{CalculationConfig, Method};

mod basis_set;
mod calculation;
