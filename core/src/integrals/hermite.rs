//! Hermite Gaussian machinery of the McMurchie-Davidson scheme.
//!
//! [1] Helgaker, Jørgensen, Olsen. Molecular Electronic-Structure Theory, ch. 9.
//! [2] Goings, J. Integrals. https://joshuagoings.com/2017/04/28/integrals/
use nalgebra::Vector3;
use smallvec::SmallVec;


/// Expansion coefficients E^{ij}_t, t = 0..=i+j, of the product of two 1D cartesian
/// gaussians with exponents `a` and `b` in Hermite gaussians centered on their
/// product center. `separation` is A_x - B_x.
pub(crate) fn hermite_expansion(i: i32, j: i32, separation: f64, a: f64, b: f64) -> SmallVec<[f64; 8]> {
    (0..=i + j)
        .map(|t| expansion_coefficient(i, j, t, separation, a, b))
        .collect()
}

/// A single coefficient E^{ij}_t. Zero outside 0 <= t <= i + j.
pub(crate) fn expansion_coefficient(i: i32, j: i32, t: i32, separation: f64, a: f64, b: f64) -> f64 {
    let p = a + b;
    let q = a * b / p;

    if t < 0 || t > i + j || i < 0 || j < 0 {
        0.0
    } else if i == 0 && j == 0 {
        // t must be zero here
        (-q * separation * separation).exp()
    } else if j == 0 {
        (2.0 * p).recip() * expansion_coefficient(i - 1, j, t - 1, separation, a, b)
            - (q * separation / a) * expansion_coefficient(i - 1, j, t, separation, a, b)
            + (t + 1) as f64 * expansion_coefficient(i - 1, j, t + 1, separation, a, b)
    } else {
        (2.0 * p).recip() * expansion_coefficient(i, j - 1, t - 1, separation, a, b)
            + (q * separation / b) * expansion_coefficient(i, j - 1, t, separation, a, b)
            + (t + 1) as f64 * expansion_coefficient(i, j - 1, t + 1, separation, a, b)
    }
}

/// F_n(x) = ∫_0^1 t^(2n) exp(-x t^2) dt. The closed form divides by x^(n + 1/2),
/// so vanishing arguments take the limit 1 / (2n + 1).
pub(crate) fn boys_function(n: usize, x: f64) -> f64 {
    if x < 1e-12 {
        1.0 / (2 * n + 1) as f64
    } else {
        boys::exact::boys(n as u64, x)
    }
}

/// Table of Hermite Coulomb integrals R^0_{tuv} for all t <= t_max, u <= u_max,
/// v <= v_max.
pub(crate) struct HermiteCoulomb {
    values: Vec<f64>,
    dims: (usize, usize, usize),
}

impl HermiteCoulomb {
    /// `exponent` is the (reduced) exponent of the Hermite gaussian, `separation` the
    /// vector from the second center to the first, e.g. P - C for nuclear attraction.
    pub(crate) fn new(max: (i32, i32, i32), exponent: f64, separation: Vector3<f64>) -> Self {
        let (t_max, u_max, v_max) = (max.0 as usize, max.1 as usize, max.2 as usize);
        let order = t_max + u_max + v_max;
        let dims = (t_max + 1, u_max + 1, v_max + 1);
        let block = dims.0 * dims.1 * dims.2;

        let index = |n: usize, t: usize, u: usize, v: usize| {
            n * block + (t * dims.1 + u) * dims.2 + v
        };

        let x = exponent * separation.norm_squared();
        let mut values = vec![0.0; (order + 1) * block];

        let mut scale = 1.0;
        for n in 0..=order {
            values[index(n, 0, 0, 0)] = scale * boys_function(n, x);
            scale *= -2.0 * exponent;
        }

        // R^n_{tuv} only needs R^{n+1} of lower total order, so sweep n downwards
        for n in (0..order).rev() {
            let remaining = order - n;
            for (t, u, v) in itertools::iproduct!(0..=t_max, 0..=u_max, 0..=v_max) {
                if t + u + v == 0 || t + u + v > remaining {
                    continue;
                }

                let value = if t > 0 {
                    let lower = if t > 1 {
                        (t - 1) as f64 * values[index(n + 1, t - 2, u, v)]
                    } else {
                        0.0
                    };
                    lower + separation.x * values[index(n + 1, t - 1, u, v)]
                } else if u > 0 {
                    let lower = if u > 1 {
                        (u - 1) as f64 * values[index(n + 1, 0, u - 2, v)]
                    } else {
                        0.0
                    };
                    lower + separation.y * values[index(n + 1, 0, u - 1, v)]
                } else {
                    let lower = if v > 1 {
                        (v - 1) as f64 * values[index(n + 1, 0, 0, v - 2)]
                    } else {
                        0.0
                    };
                    lower + separation.z * values[index(n + 1, 0, 0, v - 1)]
                };

                values[index(n, t, u, v)] = value;
            }
        }

        values.truncate(block);
        Self { values, dims }
    }

    #[inline(always)]
    pub(crate) fn get(&self, t: usize, u: usize, v: usize) -> f64 {
        self.values[(t * self.dims.1 + u) * self.dims.2 + v]
    }
}
