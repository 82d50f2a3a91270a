//! McMurchie Davidon integration scheme.
//! Reference:
//!
//! [1] Goings, J. Integrals. https://joshuagoings.com/2017/04/28/integrals/
use nalgebra::Vector3;
use smallvec::SmallVec;

use crate::{
    atom::Atom,
    basis::{BasisFunction, ContractedGaussian, Gaussian},
};

use super::{
    hermite::{hermite_expansion, HermiteCoulomb},
    Integrator,
};

#[derive(Default)]
pub struct McMurchieDavidson;

/// Product of two primitive gaussians, expanded in Hermite gaussians around their
/// product center.
#[derive(Clone, Debug)]
pub struct PrimitivePair {
    exponent: f64,
    center: Vector3<f64>,
    /// product of the two contraction coefficients (normalization included)
    coefficient: f64,
    e_x: SmallVec<[f64; 8]>,
    e_y: SmallVec<[f64; 8]>,
    e_z: SmallVec<[f64; 8]>,
}

/// All primitive products of two contracted basis functions
#[derive(Clone, Debug)]
pub struct BasisPair {
    primitives: Vec<PrimitivePair>,
    max_hermite: (i32, i32, i32),
}

impl Integrator for McMurchieDavidson {
    type Function = BasisFunction;
    type Pair = BasisPair;

    fn overlap(&self, functions: (&Self::Function, &Self::Function)) -> f64 {
        let (basis_a, basis_b) = functions;
        let separation = basis_a.position - basis_b.position;

        contract(basis_a, basis_b, |primitive_a, primitive_b| {
            primitive_overlap(primitive_a, primitive_b, separation)
        })
    }

    fn kinetic(&self, functions: (&Self::Function, &Self::Function)) -> f64 {
        let (basis_a, basis_b) = functions;
        let separation = basis_a.position - basis_b.position;

        contract(basis_a, basis_b, |primitive_a, primitive_b| {
            primitive_kinetic(primitive_a, primitive_b, separation)
        })
    }

    fn nuclear(&self, functions: (&Self::Function, &Self::Function), nuclei: &[Atom]) -> f64 {
        let (basis_a, basis_b) = functions;
        let separation = basis_a.position - basis_b.position;

        contract(basis_a, basis_b, |primitive_a, primitive_b| {
            let product_center = product_center(
                basis_a.position,
                primitive_a.exponent,
                basis_b.position,
                primitive_b.exponent,
            );

            nuclei
                .iter()
                .map(|nucleus| {
                    primitive_nuclear(primitive_a, primitive_b, separation, product_center, nucleus)
                })
                .sum()
        })
    }

    fn dipole(
        &self,
        functions: (&Self::Function, &Self::Function),
        origin: &Vector3<f64>,
    ) -> Vector3<f64> {
        let (basis_a, basis_b) = functions;
        let separation = basis_a.position - basis_b.position;

        let mut output = Vector3::zeros();
        for (primitive_a, primitive_b) in itertools::iproduct!(
            &basis_a.contracted_gaussian.0,
            &basis_b.contracted_gaussian.0
        ) {
            let product_center = product_center(
                basis_a.position,
                primitive_a.exponent,
                basis_b.position,
                primitive_b.exponent,
            );
            output += primitive_a.coefficient
                * primitive_b.coefficient
                * primitive_dipole(*primitive_a, *primitive_b, separation, product_center - origin);
        }
        output
    }

    fn pair(&self, functions: (&Self::Function, &Self::Function)) -> Self::Pair {
        let (basis_a, basis_b) = functions;
        let separation = basis_a.position - basis_b.position;

        let ContractedGaussian(data_a) = &basis_a.contracted_gaussian;
        let ContractedGaussian(data_b) = &basis_b.contracted_gaussian;

        let mut max_hermite = (0, 0, 0);
        let mut primitives = Vec::with_capacity(data_a.len() * data_b.len());
        for (primitive_a, primitive_b) in itertools::iproduct!(data_a, data_b) {
            let Gaussian {
                exponent: a,
                angular: (l1, m1, n1),
                ..
            } = *primitive_a;
            let Gaussian {
                exponent: b,
                angular: (l2, m2, n2),
                ..
            } = *primitive_b;

            max_hermite = (
                max_hermite.0.max(l1 + l2),
                max_hermite.1.max(m1 + m2),
                max_hermite.2.max(n1 + n2),
            );

            primitives.push(PrimitivePair {
                exponent: a + b,
                center: product_center(basis_a.position, a, basis_b.position, b),
                coefficient: primitive_a.coefficient * primitive_b.coefficient,
                e_x: hermite_expansion(l1, l2, separation.x, a, b),
                e_y: hermite_expansion(m1, m2, separation.y, a, b),
                e_z: hermite_expansion(n1, n2, separation.z, a, b),
            });
        }

        BasisPair {
            primitives,
            max_hermite,
        }
    }

    fn electron_repulsion(&self, pairs: (&Self::Pair, &Self::Pair)) -> f64 {
        let (pair_ab, pair_cd) = pairs;
        let max = (
            pair_ab.max_hermite.0 + pair_cd.max_hermite.0,
            pair_ab.max_hermite.1 + pair_cd.max_hermite.1,
            pair_ab.max_hermite.2 + pair_cd.max_hermite.2,
        );

        let mut output = 0.0;
        for primitive_ab in &pair_ab.primitives {
            for primitive_cd in &pair_cd.primitives {
                output += primitive_ab.coefficient
                    * primitive_cd.coefficient
                    * primitive_electron(primitive_ab, primitive_cd, max);
            }
        }
        output
    }
}

/// Sums a primitive integral over both contractions
#[inline(always)]
fn contract(
    basis_a: &BasisFunction,
    basis_b: &BasisFunction,
    mut primitive_integral: impl FnMut(Gaussian, Gaussian) -> f64,
) -> f64 {
    let ContractedGaussian(data_a) = &basis_a.contracted_gaussian;
    let ContractedGaussian(data_b) = &basis_b.contracted_gaussian;

    let mut output = 0.0;
    for (&primitive_a, &primitive_b) in itertools::iproduct!(data_a, data_b) {
        output += primitive_a.coefficient
            * primitive_b.coefficient
            * primitive_integral(primitive_a, primitive_b);
    }
    output
}

fn primitive_overlap(primitive_a: Gaussian, primitive_b: Gaussian, separation: Vector3<f64>) -> f64 {
    let Gaussian {
        exponent: exp_a,
        angular: (l1, m1, n1),
        ..
    } = primitive_a;

    let Gaussian {
        exponent: exp_b,
        angular: (l2, m2, n2),
        ..
    } = primitive_b;

    if l2 < 0 || m2 < 0 || n2 < 0 {
        return 0.0;
    }

    hermite_expansion(l1, l2, separation.x, exp_a, exp_b)[0]
        * hermite_expansion(m1, m2, separation.y, exp_a, exp_b)[0]
        * hermite_expansion(n1, n2, separation.z, exp_a, exp_b)[0]
        * (std::f64::consts::PI / (exp_a + exp_b)).powi(3).sqrt()
}

fn primitive_kinetic(primitive_a: Gaussian, primitive_b: Gaussian, separation: Vector3<f64>) -> f64 {
    let Gaussian {
        exponent: b_exp,
        angular: (l, m, n),
        ..
    } = primitive_b;

    let angular_step =
        |i, j, k| primitive_overlap(primitive_a, add_angular(primitive_b, [i, j, k]), separation);

    let term_0 = b_exp
        * (2 * (l + m + n) + 3) as f64
        * primitive_overlap(primitive_a, primitive_b, separation);
    let term_1 = -2.0
        * b_exp.powi(2)
        * (angular_step(2, 0, 0) + angular_step(0, 2, 0) + angular_step(0, 0, 2));
    let term_2 = -0.5
        * ((l * (l - 1)) as f64 * angular_step(-2, 0, 0)
            + (m * (m - 1)) as f64 * angular_step(0, -2, 0)
            + (n * (n - 1)) as f64 * angular_step(0, 0, -2));
    term_0 + term_1 + term_2
}

fn primitive_nuclear(
    primitive_a: Gaussian,
    primitive_b: Gaussian,
    // A - B
    separation: Vector3<f64>,
    product_center: Vector3<f64>,
    nucleus: &Atom,
) -> f64 {
    let Gaussian {
        exponent: a,
        angular: (l1, m1, n1),
        ..
    } = primitive_a;

    let Gaussian {
        exponent: b,
        angular: (l2, m2, n2),
        ..
    } = primitive_b;

    let p = a + b;
    let e_x = hermite_expansion(l1, l2, separation.x, a, b);
    let e_y = hermite_expansion(m1, m2, separation.y, a, b);
    let e_z = hermite_expansion(n1, n2, separation.z, a, b);
    let coulomb = HermiteCoulomb::new(
        (l1 + l2, m1 + m2, n1 + n2),
        p,
        product_center - nucleus.position,
    );

    let mut sum = 0.0;
    for (t, e1) in e_x.iter().enumerate() {
        for (u, e2) in e_y.iter().enumerate() {
            for (v, e3) in e_z.iter().enumerate() {
                sum += e1 * e2 * e3 * coulomb.get(t, u, v);
            }
        }
    }
    (-nucleus.nuclear_charge() as f64 * std::f64::consts::TAU / p) * sum
}

/// <a| r - C |b> for primitives; `center_offset` is P - C
fn primitive_dipole(
    primitive_a: Gaussian,
    primitive_b: Gaussian,
    separation: Vector3<f64>,
    center_offset: Vector3<f64>,
) -> Vector3<f64> {
    let Gaussian {
        exponent: a,
        angular: (l1, m1, n1),
        ..
    } = primitive_a;

    let Gaussian {
        exponent: b,
        angular: (l2, m2, n2),
        ..
    } = primitive_b;

    let e_x = hermite_expansion(l1, l2, separation.x, a, b);
    let e_y = hermite_expansion(m1, m2, separation.y, a, b);
    let e_z = hermite_expansion(n1, n2, separation.z, a, b);

    // ∫ x_C Λ_t dx is nonzero only for t = 0 (X_PC sqrt(pi/p)) and t = 1 (sqrt(pi/p))
    let first_moment = |e: &[f64], offset: f64| e.get(1).copied().unwrap_or(0.0) + offset * e[0];
    let norm = (std::f64::consts::PI / (a + b)).powi(3).sqrt();

    Vector3::new(
        first_moment(&e_x, center_offset.x) * e_y[0] * e_z[0],
        e_x[0] * first_moment(&e_y, center_offset.y) * e_z[0],
        e_x[0] * e_y[0] * first_moment(&e_z, center_offset.z),
    ) * norm
}

fn primitive_electron(
    primitive_ab: &PrimitivePair,
    primitive_cd: &PrimitivePair,
    max: (i32, i32, i32),
) -> f64 {
    let p = primitive_ab.exponent;
    let q = primitive_cd.exponent;
    let alpha = p * q / (p + q);

    let coulomb = HermiteCoulomb::new(max, alpha, primitive_ab.center - primitive_cd.center);

    let mut sum = 0.0;
    for (t1, e1) in primitive_ab.e_x.iter().enumerate() {
        for (u1, e2) in primitive_ab.e_y.iter().enumerate() {
            for (v1, e3) in primitive_ab.e_z.iter().enumerate() {
                let e_ab = e1 * e2 * e3;
                if e_ab == 0.0 {
                    continue;
                }

                let mut inner = 0.0;
                for (t2, e4) in primitive_cd.e_x.iter().enumerate() {
                    for (u2, e5) in primitive_cd.e_y.iter().enumerate() {
                        for (v2, e6) in primitive_cd.e_z.iter().enumerate() {
                            // (-1)^(t2 + u2 + v2)
                            let sign = if (t2 + u2 + v2) % 2 == 0 { 1.0 } else { -1.0 };
                            inner += sign * e4 * e5 * e6 * coulomb.get(t1 + t2, u1 + u2, v1 + v2);
                        }
                    }
                }
                sum += e_ab * inner;
            }
        }
    }

    2.0 * std::f64::consts::PI.powi(5).sqrt() * (p * q * (p + q).sqrt()).recip() * sum
}

#[inline(always)]
fn add_angular(gaussian: Gaussian, [i, j, k]: [i32; 3]) -> Gaussian {
    let Gaussian {
        angular: (l, m, n), ..
    } = gaussian;

    Gaussian {
        angular: (l + i, m + j, n + k),
        ..gaussian
    }
}

#[inline(always)]
fn product_center(
    a_pos: Vector3<f64>,
    a_exp: f64,
    b_pos: Vector3<f64>,
    b_exp: f64,
) -> Vector3<f64> {
    (a_exp * a_pos + b_exp * b_pos) / (a_exp + b_exp)
}
