use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;

struct Sample {
    error: DMatrix<f64>,
    fock: DMatrix<f64>,
}

/// Pulay's direct inversion in the iterative subspace: extrapolates the next fock
/// matrix from the previous ones by minimizing the norm of the combined error vector.
pub(crate) struct Diis {
    previous_samples: VecDeque<Sample>,
    capacity: usize,
    /// number of samples to collect before extrapolating
    warmup: usize,
}

impl Diis {
    pub fn new() -> Self {
        Self {
            previous_samples: VecDeque::new(),
            capacity: 8,
            warmup: 2,
        }
    }

    /// Records a sample and returns the extrapolated fock matrix. Returns `None` if the
    /// DIIS equations are singular, in which case the caller should use the plain fock
    /// matrix.
    pub fn fock(&mut self, error: DMatrix<f64>, fock: DMatrix<f64>) -> Option<DMatrix<f64>> {
        self.previous_samples.push_front(Sample { error, fock });
        self.previous_samples.truncate(self.capacity);

        let n = self.previous_samples.len();
        if n < self.warmup {
            return self
                .previous_samples
                .front()
                .map(|Sample { fock, .. }| fock.to_owned());
        }

        let matrix = DMatrix::from_fn(n + 1, n + 1, |i, j| match (i, j) {
            (i, j) if i == n && j == n => 0.0,
            (i, j) if i == n || j == n => 1.0,
            _ => self.previous_samples[j]
                .error
                .dot(&self.previous_samples[i].error),
        });

        let b = DVector::from_fn(n + 1, |i, _| if i == n { 1.0 } else { 0.0 });

        let solution = matrix.lu().solve(&b)?;
        if solution.iter().any(|x| !x.is_finite()) {
            return None;
        }

        Some(
            solution
                .iter()
                .enumerate()
                .take(n)
                .map(|(i, &x)| x * &self.previous_samples[i].fock)
                .sum(),
        )
    }

    /// Drops all samples, e.g. after the extrapolation became singular
    pub fn reset(&mut self) {
        self.previous_samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    use super::Diis;

    #[test]
    fn returns_latest_fock_during_warmup() {
        let mut diis = Diis::new();
        let fock = DMatrix::from_element(2, 2, 3.0);
        let out = diis.fock(DMatrix::identity(2, 2), fock.clone()).unwrap();
        assert_eq!(out, fock);
    }

    #[test]
    fn extrapolation_coefficients_sum_to_one() {
        let mut diis = Diis::new();
        // two samples with opposite errors: the optimal combination is the average
        diis.fock(DMatrix::from_element(2, 2, 1.0), DMatrix::from_element(2, 2, 2.0));
        let out = diis
            .fock(DMatrix::from_element(2, 2, -1.0), DMatrix::from_element(2, 2, 4.0))
            .unwrap();
        assert_relative_eq!(out, DMatrix::from_element(2, 2, 3.0), epsilon = 1e-12);
    }
}
