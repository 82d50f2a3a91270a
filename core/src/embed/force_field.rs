use nalgebra::Vector3;

/// A differentiable potential over a set of atomic positions.
pub(crate) trait ForceField {
    /// Compute the total energy and per-atom gradients for the given positions.
    ///
    /// * `positions` - Flat array of atomic coordinates [x0, y0, z0, x1, y1, z1, ...]
    /// * `gradients` - Output: gradient array (same layout as positions), dE/dx_i.
    ///   Overwritten, not accumulated into.
    ///
    /// Returns the total energy.
    fn energy_and_gradients(&self, positions: &[f64], gradients: &mut [f64]) -> f64;
}

#[inline(always)]
pub(crate) fn point(positions: &[f64], atom: usize) -> Vector3<f64> {
    Vector3::new(
        positions[3 * atom],
        positions[3 * atom + 1],
        positions[3 * atom + 2],
    )
}

#[inline(always)]
pub(crate) fn accumulate(gradients: &mut [f64], atom: usize, value: Vector3<f64>) {
    gradients[3 * atom] += value.x;
    gradients[3 * atom + 1] += value.y;
    gradients[3 * atom + 2] += value.z;
}
