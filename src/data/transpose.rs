//! Row-major to column-major conversion for the feature-wise solvers

use crate::core::{FeatureVector, SparseVector, SubProblem};

/// Column-major copy of a subproblem.
///
/// `columns[j]` holds feature `j` of every example, indexed by example.
/// Labels and instance weights stay in example order.
#[derive(Debug, Clone)]
pub struct ColumnProblem {
    /// Number of examples
    pub l: usize,
    /// Number of features
    pub n: usize,
    pub columns: Vec<FeatureVector>,
    pub y: Vec<f64>,
    pub instance_weights: Vec<f64>,
}

impl ColumnProblem {
    pub fn from_rows(prob: &SubProblem<'_>) -> Self {
        Self {
            l: prob.len(),
            n: prob.n,
            columns: transpose(&prob.x, prob.n),
            y: prob.y.clone(),
            instance_weights: prob.instance_weights.clone(),
        }
    }

    /// Per-example cost `W_i * (y_i > 0 ? cp : cn)`
    pub fn class_costs(&self, cp: f64, cn: f64) -> Vec<f64> {
        self.y
            .iter()
            .zip(&self.instance_weights)
            .map(|(&y, &w)| if y > 0.0 { w * cp } else { w * cn })
            .collect()
    }
}

/// Transpose `rows` into `n` columns.
///
/// The result is dense when every row is dense and sparse otherwise; sparse
/// columns are filled by a counting sort so their indices come out ordered.
pub fn transpose(rows: &[&FeatureVector], n: usize) -> Vec<FeatureVector> {
    let l = rows.len();

    if rows.iter().all(|r| r.is_dense()) {
        let mut columns = vec![vec![0.0; l]; n];
        for (i, row) in rows.iter().enumerate() {
            for (j, v) in row.iter() {
                if j < n {
                    columns[j][i] = v;
                }
            }
        }
        return columns.into_iter().map(FeatureVector::Dense).collect();
    }

    let mut col_nnz = vec![0usize; n];
    for row in rows {
        for (j, _) in row.iter() {
            if j < n {
                col_nnz[j] += 1;
            }
        }
    }

    let mut columns: Vec<SparseVector> = col_nnz
        .iter()
        .map(|&k| SparseVector {
            indices: Vec::with_capacity(k),
            values: Vec::with_capacity(k),
        })
        .collect();
    for (i, row) in rows.iter().enumerate() {
        for (j, v) in row.iter() {
            if j < n {
                columns[j].indices.push(i);
                columns[j].values.push(v);
            }
        }
    }
    columns.into_iter().map(FeatureVector::Sparse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Problem;

    #[test]
    fn test_sparse_transpose() {
        let rows = vec![
            FeatureVector::sparse(vec![0, 2], vec![1.0, 2.0]),
            FeatureVector::sparse(vec![2], vec![3.0]),
            FeatureVector::dense(vec![4.0, 0.0, 5.0]),
        ];
        let refs: Vec<&FeatureVector> = rows.iter().collect();
        let cols = transpose(&refs, 3);

        assert_eq!(cols[0], FeatureVector::sparse(vec![0, 2], vec![1.0, 4.0]));
        assert_eq!(cols[1], FeatureVector::sparse(vec![2], vec![0.0]));
        assert_eq!(
            cols[2],
            FeatureVector::sparse(vec![0, 1, 2], vec![2.0, 3.0, 5.0])
        );
    }

    #[test]
    fn test_dense_transpose() {
        let rows = vec![
            FeatureVector::dense(vec![1.0, 2.0]),
            FeatureVector::dense(vec![3.0, 4.0]),
            FeatureVector::dense(vec![5.0, 6.0]),
        ];
        let refs: Vec<&FeatureVector> = rows.iter().collect();
        let cols = transpose(&refs, 2);

        assert_eq!(cols[0], FeatureVector::dense(vec![1.0, 3.0, 5.0]));
        assert_eq!(cols[1], FeatureVector::dense(vec![2.0, 4.0, 6.0]));
    }

    #[test]
    fn test_round_trip_is_exact() {
        let rows = vec![
            FeatureVector::sparse(vec![1, 4], vec![0.1, -7.25]),
            FeatureVector::sparse(vec![], vec![]),
            FeatureVector::sparse(vec![0, 1, 3], vec![1e-300, 3.5, f64::MAX]),
        ];
        let refs: Vec<&FeatureVector> = rows.iter().collect();
        let cols = transpose(&refs, 5);
        let col_refs: Vec<&FeatureVector> = cols.iter().collect();
        let back = transpose(&col_refs, rows.len());
        assert_eq!(back, rows);

        let dense: Vec<FeatureVector> = rows
            .iter()
            .map(|r| FeatureVector::Dense(r.to_dense(5)))
            .collect();
        let refs: Vec<&FeatureVector> = dense.iter().collect();
        let cols = transpose(&refs, 5);
        let col_refs: Vec<&FeatureVector> = cols.iter().collect();
        assert_eq!(transpose(&col_refs, dense.len()), dense);
    }

    #[test]
    fn test_column_problem_keeps_example_order() {
        let prob = Problem::new(
            vec![
                FeatureVector::sparse(vec![0], vec![1.0]),
                FeatureVector::sparse(vec![1], vec![2.0]),
            ],
            vec![1.0, -1.0],
        )
        .unwrap()
        .with_instance_weights(vec![0.5, 2.0])
        .unwrap();
        let sub = SubProblem::identity(&prob);
        let cols = ColumnProblem::from_rows(&sub);

        assert_eq!(cols.l, 2);
        assert_eq!(cols.n, 2);
        assert_eq!(cols.columns[1], FeatureVector::sparse(vec![1], vec![2.0]));
        assert_eq!(cols.class_costs(4.0, 1.0), vec![2.0, 2.0]);
    }
}
