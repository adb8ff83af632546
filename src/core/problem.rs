//! Training problems
//!
//! [`Problem`] is the caller-facing example set. [`SubProblem`] is the
//! borrowed, possibly permuted view handed to a single solver call.

use crate::core::{FeatureVector, LinearError, Result};

/// Labeled examples plus per-example weights and warm-start state
#[derive(Debug, Clone)]
pub struct Problem {
    /// Feature dimensionality, including the bias column when present
    pub n: usize,
    pub x: Vec<FeatureVector>,
    /// Class label (classification) or target value (regression)
    pub y: Vec<f64>,
    /// Non-negative per-example multipliers of C
    pub instance_weights: Vec<f64>,
    /// Initial dual variables for the dual solvers
    pub alpha_init: Vec<f64>,
    /// Initial weights for the Newton-based solvers
    pub w_init: Vec<f64>,
    /// Value of the synthetic bias feature; negative means no bias
    pub bias: f64,
}

impl Problem {
    /// Build a problem, inferring the dimensionality from the examples
    pub fn new(x: Vec<FeatureVector>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(LinearError::DimensionMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        let l = x.len();
        let n = x.iter().map(FeatureVector::min_dim).max().unwrap_or(0);
        Ok(Self {
            n,
            x,
            y,
            instance_weights: vec![1.0; l],
            alpha_init: vec![0.0; l],
            w_init: vec![0.0; n],
            bias: -1.0,
        })
    }

    /// Widen the feature space to `n` dimensions
    pub fn with_dimension(mut self, n: usize) -> Result<Self> {
        let needed = self.x.iter().map(FeatureVector::min_dim).max().unwrap_or(0);
        if n < needed {
            return Err(LinearError::DimensionMismatch {
                expected: needed,
                actual: n,
            });
        }
        for xi in &mut self.x {
            if let FeatureVector::Dense(values) = xi {
                values.resize(n, 0.0);
            }
        }
        self.n = n;
        self.w_init.resize(n, 0.0);
        Ok(self)
    }

    /// Append a synthetic feature of value `bias` to every example.
    ///
    /// A negative `bias` disables the term. Calling this on a problem that
    /// already carries a bias column replaces that column's value.
    pub fn with_bias(mut self, bias: f64) -> Self {
        if self.bias >= 0.0 {
            let last = self.n - 1;
            for xi in &mut self.x {
                match xi {
                    FeatureVector::Dense(values) => values[last] = bias,
                    FeatureVector::Sparse(sv) => {
                        if let Some(v) = sv.values.last_mut() {
                            *v = bias;
                        }
                    }
                }
            }
            if bias < 0.0 {
                // drop the column again
                for xi in &mut self.x {
                    match xi {
                        FeatureVector::Dense(values) => {
                            values.pop();
                        }
                        FeatureVector::Sparse(sv) => {
                            sv.indices.pop();
                            sv.values.pop();
                        }
                    }
                }
                self.n -= 1;
                self.w_init.truncate(self.n);
            }
        } else if bias >= 0.0 {
            let index = self.n;
            for xi in &mut self.x {
                xi.push(index, bias);
            }
            self.n += 1;
            self.w_init.resize(self.n, 0.0);
        }
        self.bias = bias;
        self
    }

    /// Per-example multipliers of C; zero excludes an example
    pub fn with_instance_weights(mut self, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != self.len() {
            return Err(LinearError::DimensionMismatch {
                expected: self.len(),
                actual: weights.len(),
            });
        }
        self.instance_weights = weights;
        Ok(self)
    }

    /// Initial dual variables, one per example
    pub fn with_dual_warm_start(mut self, alpha: Vec<f64>) -> Result<Self> {
        if alpha.len() != self.len() {
            return Err(LinearError::DimensionMismatch {
                expected: self.len(),
                actual: alpha.len(),
            });
        }
        self.alpha_init = alpha;
        Ok(self)
    }

    /// Initial primal weights, one per feature (bias column included)
    pub fn with_primal_warm_start(mut self, w: Vec<f64>) -> Result<Self> {
        if w.len() != self.n {
            return Err(LinearError::DimensionMismatch {
                expected: self.n,
                actual: w.len(),
            });
        }
        self.w_init = w;
        Ok(self)
    }

    /// Copy of this problem with every example stored densely
    pub fn to_dense(&self) -> Problem {
        let mut dense = self.clone();
        dense.x = self
            .x
            .iter()
            .map(|xi| FeatureVector::Dense(xi.to_dense(self.n)))
            .collect();
        dense
    }

    /// Number of examples
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Dimensionality without the bias column
    pub fn nr_feature(&self) -> usize {
        if self.bias >= 0.0 {
            self.n - 1
        } else {
            self.n
        }
    }

    /// Check the structural invariants every solver relies on
    pub fn validate(&self) -> Result<()> {
        let l = self.len();
        if l == 0 {
            return Err(LinearError::EmptyDataset);
        }
        for len in [self.x.len(), self.instance_weights.len(), self.alpha_init.len()] {
            if len != l {
                return Err(LinearError::DimensionMismatch {
                    expected: l,
                    actual: len,
                });
            }
        }
        if self.w_init.len() != self.n {
            return Err(LinearError::DimensionMismatch {
                expected: self.n,
                actual: self.w_init.len(),
            });
        }
        for (i, xi) in self.x.iter().enumerate() {
            match xi {
                FeatureVector::Dense(values) if values.len() != self.n => {
                    return Err(LinearError::InvalidDataset(format!(
                        "example {i} has {} dense features, expected {}",
                        values.len(),
                        self.n
                    )));
                }
                FeatureVector::Sparse(sv) => {
                    if !sv.is_strictly_increasing() {
                        return Err(LinearError::InvalidDataset(format!(
                            "example {i} has repeated or unsorted feature indices"
                        )));
                    }
                    if xi.min_dim() > self.n {
                        return Err(LinearError::InvalidDataset(format!(
                            "example {i} has feature index {} beyond dimension {}",
                            xi.min_dim() - 1,
                            self.n
                        )));
                    }
                }
                _ => {}
            }
        }
        if let Some(w) = self
            .instance_weights
            .iter()
            .find(|w| !w.is_finite() || **w < 0.0)
        {
            return Err(LinearError::InvalidDataset(format!(
                "instance weights must be finite and non-negative, got {w}"
            )));
        }
        Ok(())
    }
}

/// Borrowed view of a problem handed to one solver call.
///
/// The orchestrator builds one per training call, in class-grouped order,
/// and rewrites only `y` between one-vs-rest subproblems.
#[derive(Debug, Clone)]
pub struct SubProblem<'a> {
    pub n: usize,
    pub x: Vec<&'a FeatureVector>,
    pub y: Vec<f64>,
    pub instance_weights: Vec<f64>,
    pub alpha_init: Vec<f64>,
    pub w_init: &'a [f64],
}

impl<'a> SubProblem<'a> {
    /// View over the whole problem in its original order
    pub fn identity(prob: &'a Problem) -> Self {
        Self {
            n: prob.n,
            x: prob.x.iter().collect(),
            y: prob.y.clone(),
            instance_weights: prob.instance_weights.clone(),
            alpha_init: prob.alpha_init.clone(),
            w_init: &prob.w_init,
        }
    }

    /// View whose k-th example is `prob`'s `perm[k]`-th example
    pub fn permuted(prob: &'a Problem, perm: &[usize]) -> Self {
        Self {
            n: prob.n,
            x: perm.iter().map(|&i| &prob.x[i]).collect(),
            y: perm.iter().map(|&i| prob.y[i]).collect(),
            instance_weights: perm.iter().map(|&i| prob.instance_weights[i]).collect(),
            alpha_init: perm.iter().map(|&i| prob.alpha_init[i]).collect(),
            w_init: &prob.w_init,
        }
    }

    /// Number of examples
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Number of examples labeled positive
    pub fn count_positive(&self) -> usize {
        self.y.iter().filter(|&&y| y > 0.0).count()
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
