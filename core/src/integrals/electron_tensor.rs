use std::ops::Index;

use crate::basis::BasisFunction;

use super::Integrator;

/// Integrals whose Cauchy-Schwarz bound falls below this are not computed
const SCREENING_THRESHOLD: f64 = 1e-12;

/// An integral index used in the two-electron integrals of a basis set.
///
/// The index represents the four indices (x, y, z, w) used to calculate a two-electron integral:
///   int_{x,y,z,w} = int_{xy|zw} = <x y | z w>
///
/// Two-electron integrals are invariant under x <-> y, z <-> w and (xy) <-> (zw), so
/// only one of the eight equivalent index tuples is stored.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct IntegralIndex(usize, usize, usize, usize);

impl IntegralIndex {
    /// Creates a new integral index with the given indices.
    pub(crate) const fn new(index: (usize, usize, usize, usize)) -> Self {
        let (i, j, k, l) = index;
        Self(i, j, k, l)
    }

    /// Position of this integral in the packed storage
    #[inline(always)]
    pub(crate) fn linear(&self) -> usize {
        let &Self(i, j, k, l) = self;
        let ij = pair_index(i, j);
        let kl = pair_index(k, l);
        pair_index(ij, kl)
    }
}

/// Compound index of an unordered pair
#[inline(always)]
const fn pair_index(i: usize, j: usize) -> usize {
    if i >= j {
        i * (i + 1) / 2 + j
    } else {
        j * (j + 1) / 2 + i
    }
}

impl std::fmt::Display for IntegralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let &Self(i, j, k, l) = self;
        write!(f, "({} {}|{} {})", i, j, k, l)
    }
}

/// An electron tensor representing electron-electron repulsion integrals between
/// four contracted Gaussian functions in a given basis set.
pub struct ElectronTensor {
    data: Vec<f64>,
    /// side length
    size: usize,
}

impl ElectronTensor {
    /// Computes every symmetry-unique electron repulsion integral of `basis`.
    ///
    /// Pair data is built once per (ij) and integrals with a negligible
    /// Cauchy-Schwarz bound sqrt((ij|ij)(kl|kl)) are skipped. With the `rayon`
    /// feature the work is spread over the global thread pool.
    pub fn from_basis<I>(basis: &[BasisFunction], integrator: &I) -> Self
    where
        I: Integrator<Function = BasisFunction> + Sync,
    {
        let n_basis = basis.len();
        let n_pairs = n_basis * (n_basis + 1) / 2;

        let mut pairs = Vec::with_capacity(n_pairs);
        let mut pair_indices = Vec::with_capacity(n_pairs);
        for i in 0..n_basis {
            for j in 0..=i {
                pairs.push(integrator.pair((&basis[i], &basis[j])));
                pair_indices.push((i, j));
            }
        }

        // compute diagonal first - we need these entries for screening
        let diagonal = pairs
            .iter()
            .map(|pair| integrator.electron_repulsion((pair, pair)).abs().sqrt())
            .collect::<Vec<_>>();

        let mut data = vec![0.0; n_pairs * (n_pairs + 1) / 2];

        let row = |ij: usize| {
            let mut output = Vec::with_capacity(ij + 1);
            for kl in 0..=ij {
                if diagonal[ij] * diagonal[kl] < SCREENING_THRESHOLD {
                    continue;
                }
                let integral = integrator.electron_repulsion((&pairs[ij], &pairs[kl]));
                log::trace!(
                    "ERI ({:?}|{:?}) = {integral:<1.8}",
                    pair_indices[ij],
                    pair_indices[kl]
                );
                output.push((pair_index(ij, kl), integral));
            }
            output
        };

        #[cfg(feature = "rayon")]
        {
            use rayon::iter::{IntoParallelIterator, ParallelIterator};

            (0..n_pairs)
                .into_par_iter()
                .map(row)
                .collect::<Vec<_>>() // iterators are lazy - we collect to evaluate all elements
                .into_iter()
                .flatten()
                .for_each(|(index, integral)| data[index] = integral);
        }

        #[cfg(not(feature = "rayon"))]
        (0..n_pairs)
            .flat_map(row)
            .for_each(|(index, integral)| data[index] = integral);

        log::debug!(
            "computed electron repulsion integrals for {n_basis} basis functions ({} unique)",
            data.len()
        );

        Self {
            data,
            size: n_basis,
        }
    }

    /// Number of basis functions
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Index<(usize, usize, usize, usize)> for ElectronTensor {
    type Output = f64;

    fn index(&self, index: (usize, usize, usize, usize)) -> &Self::Output {
        &self.data[IntegralIndex::new(index).linear()]
    }
}

impl Index<IntegralIndex> for ElectronTensor {
    type Output = f64;

    fn index(&self, index: IntegralIndex) -> &Self::Output {
        &self.data[index.linear()]
    }
}
