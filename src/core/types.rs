//! Feature storage types

use std::iter::{Enumerate, Zip};
use std::slice::Iter;

/// Sparse vector representation with sorted, zero-based indices
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        // Sort by indices
        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Number of stored elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// True when every index is larger than the one before it
    pub fn is_strictly_increasing(&self) -> bool {
        self.indices.windows(2).all(|pair| pair[0] < pair[1])
    }
}

/// One example's features, stored either densely or sparsely.
///
/// Every solver is written against this type, so the same implementation
/// serves both layouts.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureVector {
    Dense(Vec<f64>),
    Sparse(SparseVector),
}

impl FeatureVector {
    /// Dense vector from its coefficients
    pub fn dense(values: Vec<f64>) -> Self {
        FeatureVector::Dense(values)
    }

    /// Sparse vector from zero-based indices and values
    pub fn sparse(indices: Vec<usize>, values: Vec<f64>) -> Self {
        FeatureVector::Sparse(SparseVector::new(indices, values))
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, FeatureVector::Dense(_))
    }

    /// Number of stored entries (every coefficient for dense storage)
    pub fn nnz(&self) -> usize {
        match self {
            FeatureVector::Dense(values) => values.len(),
            FeatureVector::Sparse(sv) => sv.nnz(),
        }
    }

    /// Smallest dimensionality able to hold this vector
    pub fn min_dim(&self) -> usize {
        match self {
            FeatureVector::Dense(values) => values.len(),
            FeatureVector::Sparse(sv) => sv.indices.last().map_or(0, |&i| i + 1),
        }
    }

    /// Iterate over stored `(index, value)` pairs in increasing index order
    pub fn iter(&self) -> FeatureIter<'_> {
        match self {
            FeatureVector::Dense(values) => FeatureIter::Dense(values.iter().enumerate()),
            FeatureVector::Sparse(sv) => FeatureIter::Sparse(sv.indices.iter().zip(sv.values.iter())),
        }
    }

    /// Inner product with a dense weight vector
    ///
    /// All indices must be below `w.len()`.
    pub fn dot(&self, w: &[f64]) -> f64 {
        match self {
            FeatureVector::Dense(values) => values.iter().zip(w).map(|(&x, &wj)| x * wj).sum(),
            FeatureVector::Sparse(sv) => sv
                .indices
                .iter()
                .zip(&sv.values)
                .map(|(&j, &x)| w[j] * x)
                .sum(),
        }
    }

    /// `w += coef * self`
    pub fn add_scaled_to(&self, coef: f64, w: &mut [f64]) {
        match self {
            FeatureVector::Dense(values) => {
                for (wj, &x) in w.iter_mut().zip(values) {
                    *wj += coef * x;
                }
            }
            FeatureVector::Sparse(sv) => {
                for (&j, &x) in sv.indices.iter().zip(&sv.values) {
                    w[j] += coef * x;
                }
            }
        }
    }

    /// Squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        match self {
            FeatureVector::Dense(values) => values.iter().map(|&v| v * v).sum(),
            FeatureVector::Sparse(sv) => sv.values.iter().map(|&v| v * v).sum(),
        }
    }

    /// Multiply every stored value by `factor(index)`
    pub fn scale_entries<F: Fn(usize) -> f64>(&mut self, factor: F) {
        match self {
            FeatureVector::Dense(values) => {
                for (j, v) in values.iter_mut().enumerate() {
                    *v *= factor(j);
                }
            }
            FeatureVector::Sparse(sv) => {
                for (&j, v) in sv.indices.iter().zip(sv.values.iter_mut()) {
                    *v *= factor(j);
                }
            }
        }
    }

    /// Append a trailing feature at `index`.
    ///
    /// Dense vectors are zero-padded up to `index` first.
    pub fn push(&mut self, index: usize, value: f64) {
        match self {
            FeatureVector::Dense(values) => {
                if values.len() < index {
                    values.resize(index, 0.0);
                }
                values.push(value);
            }
            FeatureVector::Sparse(sv) => {
                sv.indices.push(index);
                sv.values.push(value);
            }
        }
    }

    /// Dense copy of this vector with dimensionality `n`
    pub fn to_dense(&self, n: usize) -> Vec<f64> {
        let mut out = vec![0.0; n];
        for (j, v) in self.iter() {
            if j < n {
                out[j] = v;
            }
        }
        out
    }
}

/// Iterator over the stored entries of a [`FeatureVector`]
pub enum FeatureIter<'a> {
    Dense(Enumerate<Iter<'a, f64>>),
    Sparse(Zip<Iter<'a, usize>, Iter<'a, f64>>),
}

impl Iterator for FeatureIter<'_> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FeatureIter::Dense(it) => it.next().map(|(j, &v)| (j, v)),
            FeatureIter::Sparse(it) => it.next().map(|(&j, &v)| (j, v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_vector_creation() {
        let indices = vec![2, 0, 4];
        let values = vec![2.0, 1.0, 3.0];
        let sv = SparseVector::new(indices, values);

        // Check that indices are sorted
        assert_eq!(sv.indices, vec![0, 2, 4]);
        assert_eq!(sv.values, vec![1.0, 2.0, 3.0]);
        assert!(sv.is_strictly_increasing());
    }

    #[test]
    fn test_duplicate_indices_are_not_strictly_increasing() {
        let sv = SparseVector::new(vec![1, 1], vec![1.0, 2.0]);
        assert!(!sv.is_strictly_increasing());
    }

    #[test]
    #[should_panic(expected = "Indices and values must have same length")]
    fn test_sparse_vector_length_mismatch() {
        SparseVector::new(vec![0, 1], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_dot_matches_between_layouts() {
        let w = vec![0.5, -1.0, 2.0, 0.0];
        let dense = FeatureVector::dense(vec![1.0, 0.0, 3.0, 4.0]);
        let sparse = FeatureVector::sparse(vec![0, 2, 3], vec![1.0, 3.0, 4.0]);

        assert_eq!(dense.dot(&w), 6.5);
        assert_eq!(sparse.dot(&w), 6.5);
        assert_eq!(dense.norm_squared(), sparse.norm_squared());
    }

    #[test]
    fn test_add_scaled_to() {
        let mut w = vec![1.0; 3];
        FeatureVector::sparse(vec![1], vec![2.0]).add_scaled_to(-0.5, &mut w);
        assert_eq!(w, vec![1.0, 0.0, 1.0]);

        FeatureVector::dense(vec![1.0, 1.0, 1.0]).add_scaled_to(2.0, &mut w);
        assert_eq!(w, vec![3.0, 2.0, 3.0]);
    }

    #[test]
    fn test_iter_and_min_dim() {
        let sparse = FeatureVector::sparse(vec![4, 1], vec![2.0, 1.0]);
        assert_eq!(sparse.iter().collect::<Vec<_>>(), vec![(1, 1.0), (4, 2.0)]);
        assert_eq!(sparse.min_dim(), 5);

        let dense = FeatureVector::dense(vec![0.0, 3.0]);
        assert_eq!(dense.iter().collect::<Vec<_>>(), vec![(0, 0.0), (1, 3.0)]);
        assert_eq!(dense.min_dim(), 2);
    }

    #[test]
    fn test_push_pads_dense_vectors() {
        let mut dense = FeatureVector::dense(vec![1.0]);
        dense.push(3, 1.0);
        assert_eq!(dense, FeatureVector::dense(vec![1.0, 0.0, 0.0, 1.0]));

        let mut sparse = FeatureVector::sparse(vec![0], vec![1.0]);
        sparse.push(3, 1.0);
        assert_eq!(sparse.to_dense(4), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_scale_entries() {
        let mut v = FeatureVector::sparse(vec![0, 2], vec![1.0, 3.0]);
        v.scale_entries(|j| if j == 2 { -1.0 } else { 1.0 });
        assert_eq!(v.to_dense(3), vec![1.0, 0.0, -3.0]);
    }
}
