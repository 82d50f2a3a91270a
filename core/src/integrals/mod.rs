use nalgebra::Vector3;

use crate::atom::Atom;

mod electron_tensor;
mod hermite;
pub mod mmd;

pub use electron_tensor::ElectronTensor;

pub type DefaultIntegrator = mmd::McMurchieDavidson;

pub trait Integrator {
    type Function;
    /// Precomputed data for a product of two functions, reused across the
    /// two-electron integrals that contain it.
    type Pair: Send + Sync;

    /// Calculate the overlap integral between two basis functions.
    fn overlap(&self, functions: (&Self::Function, &Self::Function)) -> f64;

    /// Calculate the kinetic energy integral between two basis functions.
    fn kinetic(&self, functions: (&Self::Function, &Self::Function)) -> f64;

    /// Calculate the nuclear attraction integral between two basis functions and the nuclei of a quantum system.
    fn nuclear(&self, functions: (&Self::Function, &Self::Function), nuclei: &[Atom]) -> f64;

    /// Calculate <a| r - origin |b>, the position operator relative to `origin`.
    fn dipole(
        &self,
        functions: (&Self::Function, &Self::Function),
        origin: &Vector3<f64>,
    ) -> Vector3<f64>;

    fn pair(&self, functions: (&Self::Function, &Self::Function)) -> Self::Pair;

    /// Calculate the electron-electron repulsion integral (ab|cd) from the pairs (ab) and (cd).
    fn electron_repulsion(&self, pairs: (&Self::Pair, &Self::Pair)) -> f64;
}
