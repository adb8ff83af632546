//! High-level API for training and evaluating linear models
//!
//! This module wraps the training entry points in a builder and adds
//! evaluation helpers for classification and regression.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rlinear::api::Trainer;
//! use rlinear::SolverType;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = Trainer::new(SolverType::L2rLr)
//!     .with_c(4.0)
//!     .with_bias(1.0)
//!     .train_from_file("data.libsvm")?;
//!
//! let metrics = rlinear::api::evaluate_file(&model, "test.libsvm")?;
//! println!("Accuracy: {:.2}%", metrics.accuracy * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{ClassWeight, FeatureVector, Parameter, Problem, Result, SolverType};
use crate::data::load_problem;
use crate::model::Model;
use crate::train::{cross_validation, train};
use std::path::Path;

/// Training configuration with builder pattern
#[derive(Debug, Clone)]
pub struct Trainer {
    param: Parameter,
    bias: f64,
}

impl Trainer {
    /// Default configuration for `solver_type`, without a bias term
    pub fn new(solver_type: SolverType) -> Self {
        Self {
            param: Parameter::new(solver_type),
            bias: -1.0,
        }
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.param.c = c;
        self
    }

    /// Set stopping tolerance
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.param.eps = eps;
        self
    }

    /// Set the SVR insensitive band half-width
    pub fn with_p(mut self, p: f64) -> Self {
        self.param.p = p;
        self
    }

    /// Append a bias feature of this value; negative disables it
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    /// Multiply C by `weight` for examples labeled `label`
    pub fn with_class_weight(mut self, label: i32, weight: f64) -> Self {
        self.param.class_weights.push(ClassWeight { label, weight });
        self
    }

    pub fn with_shrinking(mut self, shrinking: bool) -> Self {
        self.param.shrinking = shrinking;
        self
    }

    /// Fix the coordinate-shuffling seed for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.param.seed = Some(seed);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.param.max_iterations = max_iterations;
        self
    }

    pub fn parameter(&self) -> &Parameter {
        &self.param
    }

    /// Train on a problem, adding the configured bias column
    pub fn train(&self, prob: &Problem) -> Result<Model> {
        train(&self.prepare(prob), &self.param)
    }

    /// Train from a LibSVM format file
    pub fn train_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Model> {
        let prob = load_problem(path)?;
        train(&prob.with_bias(self.bias), &self.param)
    }

    /// Cross-validated predictions for every example of `prob`
    pub fn cross_validate(&self, prob: &Problem, nr_fold: usize) -> Result<Vec<f64>> {
        cross_validation(&self.prepare(prob), &self.param, nr_fold)
    }

    fn prepare(&self, prob: &Problem) -> Problem {
        if prob.bias == self.bias {
            prob.clone()
        } else {
            prob.clone().with_bias(self.bias)
        }
    }
}

/// Agreement between predictions and targets
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationMetrics {
    /// Fraction of exactly matching predictions
    pub accuracy: f64,
    pub mean_squared_error: f64,
    /// Squared Pearson correlation between predictions and targets
    pub squared_correlation: f64,
    pub total: usize,
}

impl EvaluationMetrics {
    /// Compare `predictions` against `targets` pairwise
    pub fn compute(targets: &[f64], predictions: &[f64]) -> Self {
        let total = targets.len().min(predictions.len());
        if total == 0 {
            return Self {
                accuracy: 0.0,
                mean_squared_error: 0.0,
                squared_correlation: 0.0,
                total,
            };
        }

        let mut correct = 0;
        let (mut error, mut sum_p, mut sum_t, mut sum_pp, mut sum_tt, mut sum_pt) =
            (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        for (&t, &p) in targets.iter().zip(predictions) {
            if p == t {
                correct += 1;
            }
            error += (p - t) * (p - t);
            sum_p += p;
            sum_t += t;
            sum_pp += p * p;
            sum_tt += t * t;
            sum_pt += p * t;
        }

        let n = total as f64;
        let numerator = n * sum_pt - sum_p * sum_t;
        let denominator = (n * sum_pp - sum_p * sum_p) * (n * sum_tt - sum_t * sum_t);
        let squared_correlation = if denominator > 0.0 {
            numerator * numerator / denominator
        } else {
            0.0
        };

        Self {
            accuracy: correct as f64 / n,
            mean_squared_error: error / n,
            squared_correlation,
            total,
        }
    }
}

/// Evaluate `model` on labeled examples
pub fn evaluate(model: &Model, x: &[FeatureVector], y: &[f64]) -> EvaluationMetrics {
    let predictions: Vec<f64> = x.iter().map(|xi| model.predict(xi)).collect();
    EvaluationMetrics::compute(y, &predictions)
}

/// Evaluate `model` on a LibSVM format file
pub fn evaluate_file<P: AsRef<Path>>(model: &Model, path: P) -> Result<EvaluationMetrics> {
    let prob = load_problem(path)?;
    Ok(evaluate(model, &prob.x, &prob.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toy_problem() -> Problem {
        Problem::new(
            vec![
                FeatureVector::sparse(vec![0], vec![2.0]),
                FeatureVector::sparse(vec![0], vec![-2.0]),
                FeatureVector::sparse(vec![0], vec![1.5]),
                FeatureVector::sparse(vec![0], vec![-1.5]),
            ],
            vec![1.0, -1.0, 1.0, -1.0],
        )
        .unwrap()
    }

    #[test]
    fn test_builder_pattern() {
        let trainer = Trainer::new(SolverType::L2rL2LossSvr)
            .with_c(2.0)
            .with_eps(0.01)
            .with_p(0.5)
            .with_class_weight(3, 0.5)
            .with_shrinking(false)
            .with_seed(9)
            .with_max_iterations(5000);

        let param = trainer.parameter();
        assert_eq!(param.c, 2.0);
        assert_eq!(param.eps, 0.01);
        assert_eq!(param.p, 0.5);
        assert_eq!(param.class_weight(3), Some(0.5));
        assert!(!param.shrinking);
        assert_eq!(param.seed, Some(9));
        assert_eq!(param.max_iterations, 5000);
    }

    #[test]
    fn test_bias_is_applied_once() {
        let trainer = Trainer::new(SolverType::L2rL2LossSvcDual)
            .with_bias(1.0)
            .with_seed(1);
        let model = trainer.train(&toy_problem()).unwrap();
        assert_eq!(model.nr_feature, 1);
        assert_eq!(model.w.len(), 2);

        let with_bias = toy_problem().with_bias(1.0);
        let again = trainer.train(&with_bias).unwrap();
        assert_eq!(again.w.len(), 2);
        assert_eq!(model.w, again.w);
    }

    #[test]
    fn test_train_and_evaluate_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "+1 1:2.0").unwrap();
        writeln!(file, "-1 1:-2.0").unwrap();
        writeln!(file, "+1 1:1.5").unwrap();
        writeln!(file, "-1 1:-1.5").unwrap();
        file.flush().unwrap();

        let model = Trainer::new(SolverType::L2rLr)
            .with_seed(1)
            .train_from_file(file.path())
            .unwrap();
        let metrics = evaluate_file(&model, file.path()).unwrap();
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.accuracy, 1.0);
    }

    #[test]
    fn test_cross_validate() {
        let target = Trainer::new(SolverType::L2rL1LossSvcDual)
            .with_seed(5)
            .cross_validate(&toy_problem(), 4)
            .unwrap();
        assert_eq!(target, toy_problem().y);
    }

    #[test]
    fn test_evaluation_metrics() {
        let metrics = EvaluationMetrics::compute(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 5.0]);
        assert_eq!(metrics.accuracy, 0.75);
        assert_relative_eq!(metrics.mean_squared_error, 0.25);
        assert!(metrics.squared_correlation > 0.9 && metrics.squared_correlation < 1.0);

        let exact = EvaluationMetrics::compute(&[0.5, -1.0], &[1.0, -2.0]);
        // a linear rescaling keeps perfect correlation
        assert_relative_eq!(exact.squared_correlation, 1.0, epsilon = 1e-12);

        let empty = EvaluationMetrics::compute(&[], &[]);
        assert_eq!(empty.total, 0);
    }
}
