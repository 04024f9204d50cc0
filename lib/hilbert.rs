//! Definitions to describe the levels of an atom, and vectors and operators
//! built on them.

use std::{ hash::Hash, ops::Deref };
use indexmap::IndexMap;
use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };

/// Compute the outer product of two state vectors.
pub fn outer_prod(a: &nd::Array1<C64>, b: &nd::Array1<C64>)
    -> nd::Array2<C64>
{
    nd::Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j].conj())
}

// transition operator |i⟩⟨j| for an n-level system; indices must be < n
pub(crate) fn sigma(i: usize, j: usize, n: usize) -> nd::Array2<C64> {
    let mut s: nd::Array2<C64> = nd::Array2::zeros((n, n));
    s[[i, j]] = C64::one();
    s
}

/// A collection of unique levels with associated energies in units of angular
/// frequency.
///
/// Levels are ordered by insertion; the position of a level is its row/column
/// in every matrix built on the basis. Backed by an [`IndexMap`], which can be
/// accessed via [`Deref`].
#[derive(Clone, Debug, PartialEq)]
pub struct Basis<S>
where S: Clone + Eq + Hash
{
    energies: IndexMap<S, f64>,
}

impl<S> Deref for Basis<S>
where S: Clone + Eq + Hash
{
    type Target = IndexMap<S, f64>;

    fn deref(&self) -> &Self::Target { &self.energies }
}

impl<S> Default for Basis<S>
where S: Clone + Eq + Hash
{
    fn default() -> Self { Self { energies: IndexMap::default() } }
}

impl<S> FromIterator<(S, f64)> for Basis<S>
where S: Clone + Eq + Hash
{
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = (S, f64)>
    {
        Self { energies: iter.into_iter().collect() }
    }
}

impl<S> Basis<S>
where S: Clone + Eq + Hash
{
    /// Create a new, empty basis.
    pub fn new() -> Self { Self::default() }

    /// Return the number of levels.
    pub fn num_states(&self) -> usize { self.energies.len() }

    /// Get the energy of a particular level.
    pub fn get_energy(&self, state: &S) -> Option<f64> {
        self.energies.get(state).copied()
    }

    /// Get an array representation of a particular level by index.
    pub fn get_vector_index(&self, index: usize) -> Option<nd::Array1<C64>> {
        let n = self.energies.len();
        (index < n).then(|| {
            (0..n).map(|j| if j == index { C64::one() } else { C64::zero() })
                .collect()
        })
    }

    /// Get an array representation of a particular level.
    pub fn get_vector(&self, state: &S) -> Option<nd::Array1<C64>> {
        self.energies.get_index_of(state)
            .and_then(|k| self.get_vector_index(k))
    }

    /// Get the density matrix for a particular level by index.
    pub fn get_density_index(&self, index: usize) -> Option<nd::Array2<C64>> {
        self.get_vector_index(index)
            .map(|diag| nd::Array2::from_diag(&diag))
    }

    /// Build the diagonal matrix of level energies.
    pub fn energy_matrix(&self) -> nd::Array2<C64> {
        let diag: nd::Array1<C64>
            = self.energies.values().map(|e| C64::from(*e)).collect();
        nd::Array2::from_diag(&diag)
    }
}
