//! Trained linear models and prediction

use crate::core::{FeatureVector, LinearError, Parameter, Result, SolverType};
use serde::{Deserialize, Serialize};

/// A trained linear model.
///
/// Weights are stored feature-major: the coefficient of feature `j` for
/// weight column `k` lives at `w[j * nr_w + k]`, with the bias coefficient
/// (when `bias >= 0`) in row `nr_feature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Training configuration this model was produced with
    pub param: Parameter,
    /// Number of classes; 2 for regression models
    pub nr_class: usize,
    /// Number of features, excluding the bias column
    pub nr_feature: usize,
    pub w: Vec<f64>,
    /// Class labels in first-appearance order; empty for regression
    pub label: Vec<i32>,
    pub bias: f64,
    /// Dual variables of each solved subproblem, in original example order
    pub alphas: Vec<Vec<f64>>,
    /// Number of training examples
    pub n_examples: usize,
}

impl Model {
    /// Number of weight columns
    pub fn nr_w(&self) -> usize {
        if self.nr_class == 2 && self.param.solver_type != SolverType::McsvmCs {
            1
        } else {
            self.nr_class
        }
    }

    /// Number of weight rows, including the bias row
    pub fn w_size(&self) -> usize {
        if self.bias >= 0.0 {
            self.nr_feature + 1
        } else {
            self.nr_feature
        }
    }

    pub fn solver_type(&self) -> SolverType {
        self.param.solver_type
    }

    pub fn is_regression(&self) -> bool {
        self.param.solver_type.is_regression()
    }

    /// Whether [`Model::predict_probability`] is available
    pub fn is_probability_model(&self) -> bool {
        self.param.solver_type.is_logistic()
    }

    /// Coefficient of `feature` in weight column `column`
    pub fn coefficient(&self, feature: usize, column: usize) -> f64 {
        self.w[feature * self.nr_w() + column]
    }

    /// Decision values of `x`, one per weight column.
    ///
    /// Features at or beyond `nr_feature` are ignored, so test data may
    /// have a higher dimension than the training data. The bias term is
    /// added here; `x` must not carry it.
    pub fn decision_values(&self, x: &FeatureVector) -> Vec<f64> {
        let nr_w = self.nr_w();
        let mut dec = vec![0.0; nr_w];
        for (j, v) in x.iter() {
            if j >= self.nr_feature {
                continue;
            }
            let row = &self.w[j * nr_w..(j + 1) * nr_w];
            for (d, &wj) in dec.iter_mut().zip(row) {
                *d += wj * v;
            }
        }
        if self.bias >= 0.0 {
            let row = &self.w[self.nr_feature * nr_w..(self.nr_feature + 1) * nr_w];
            for (d, &wj) in dec.iter_mut().zip(row) {
                *d += wj * self.bias;
            }
        }
        dec
    }

    /// Predicted label (or regression value) together with the decision values
    pub fn predict_values(&self, x: &FeatureVector) -> (f64, Vec<f64>) {
        let dec = self.decision_values(x);
        let label = if self.is_regression() {
            dec[0]
        } else if self.nr_class == 2 {
            if dec[0] > 0.0 {
                self.label[0] as f64
            } else {
                self.label[1] as f64
            }
        } else {
            let mut best = 0;
            for (k, &d) in dec.iter().enumerate().skip(1) {
                if d > dec[best] {
                    best = k;
                }
            }
            self.label[best] as f64
        };
        (label, dec)
    }

    pub fn predict(&self, x: &FeatureVector) -> f64 {
        self.predict_values(x).0
    }

    /// Predicted label and per-class probability estimates.
    ///
    /// Only logistic models carry probabilities. Binary models return
    /// `[p, 1 − p]`; multiclass estimates are normalized one-vs-rest
    /// sigmoids.
    pub fn predict_probability(&self, x: &FeatureVector) -> Result<(f64, Vec<f64>)> {
        if !self.is_probability_model() {
            return Err(LinearError::UnsupportedOperation(format!(
                "probability estimates need a logistic regression model, not {}",
                self.param.solver_type
            )));
        }

        let (label, dec) = self.predict_values(x);
        let mut prob: Vec<f64> = dec.iter().map(|&d| 1.0 / (1.0 + (-d).exp())).collect();
        if self.nr_class == 2 {
            prob.push(1.0 - prob[0]);
        } else {
            let sum: f64 = prob.iter().sum();
            for p in prob.iter_mut() {
                *p /= sum;
            }
        }
        Ok((label, prob))
    }

    /// Release the model. Dropping it has the same effect.
    pub fn destroy(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn binary_model(solver: SolverType) -> Model {
        Model {
            param: Parameter::new(solver),
            nr_class: 2,
            nr_feature: 2,
            w: vec![1.0, -1.0, 0.5],
            label: vec![7, 3],
            bias: 1.0,
            alphas: Vec::new(),
            n_examples: 0,
        }
    }

    #[test]
    fn test_binary_prediction() {
        let model = binary_model(SolverType::L2rL2LossSvcDual);
        assert_eq!(model.nr_w(), 1);
        assert_eq!(model.w_size(), 3);

        // 2 - 1 + 0.5 > 0 -> first label
        let (label, dec) = model.predict_values(&FeatureVector::dense(vec![2.0, 1.0]));
        assert_eq!(label, 7.0);
        assert_relative_eq!(dec[0], 1.5);

        assert_eq!(model.predict(&FeatureVector::sparse(vec![1], vec![3.0])), 3.0);
    }

    #[test]
    fn test_extra_features_are_ignored() {
        let model = binary_model(SolverType::L2rL2LossSvcDual);
        let short = FeatureVector::sparse(vec![0], vec![1.0]);
        let long = FeatureVector::sparse(vec![0, 2, 9], vec![1.0, 100.0, -50.0]);
        assert_eq!(model.decision_values(&short), model.decision_values(&long));
    }

    #[test]
    fn test_multiclass_argmax() {
        let model = Model {
            param: Parameter::new(SolverType::L2rL1LossSvcDual),
            nr_class: 3,
            nr_feature: 2,
            // feature-major, three columns
            w: vec![1.0, 0.0, -1.0, 0.0, 1.0, -1.0],
            label: vec![10, 20, 30],
            bias: -1.0,
            alphas: Vec::new(),
            n_examples: 0,
        };
        assert_eq!(model.nr_w(), 3);
        assert_eq!(model.coefficient(1, 2), -1.0);
        assert_eq!(model.predict(&FeatureVector::dense(vec![2.0, 0.0])), 10.0);
        assert_eq!(model.predict(&FeatureVector::dense(vec![0.0, 2.0])), 20.0);
        assert_eq!(model.predict(&FeatureVector::dense(vec![-1.0, -1.0])), 30.0);
    }

    #[test]
    fn test_regression_returns_decision_value() {
        let model = Model {
            param: Parameter::new(SolverType::L2rL2LossSvr),
            nr_class: 2,
            nr_feature: 1,
            w: vec![2.0, 0.5],
            label: Vec::new(),
            bias: 1.0,
            alphas: Vec::new(),
            n_examples: 0,
        };
        assert_relative_eq!(model.predict(&FeatureVector::dense(vec![3.0])), 6.5);
    }

    #[test]
    fn test_binary_probability() {
        let model = binary_model(SolverType::L2rLr);
        let (label, prob) = model
            .predict_probability(&FeatureVector::dense(vec![0.0, 0.5]))
            .unwrap();
        // decision value is exactly zero
        assert_eq!(label, 3.0);
        assert_relative_eq!(prob[0], 0.5);
        assert_relative_eq!(prob[1], 0.5);
    }

    #[test]
    fn test_multiclass_probability_is_normalized() {
        let model = Model {
            param: Parameter::new(SolverType::L1rLr),
            nr_class: 3,
            nr_feature: 1,
            w: vec![1.0, -2.0, 0.3],
            label: vec![1, 2, 3],
            bias: -1.0,
            alphas: Vec::new(),
            n_examples: 0,
        };
        let (_, prob) = model
            .predict_probability(&FeatureVector::dense(vec![1.5]))
            .unwrap();
        assert_eq!(prob.len(), 3);
        assert_relative_eq!(prob.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_probability_needs_logistic_model() {
        let model = binary_model(SolverType::L2rL2LossSvc);
        let result = model.predict_probability(&FeatureVector::dense(vec![1.0, 1.0]));
        assert!(matches!(result, Err(LinearError::UnsupportedOperation(_))));
    }
}
