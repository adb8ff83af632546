//! Training configuration

use crate::core::{LinearError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of training formulations
///
/// The discriminants follow the numbering used on the command line and in
/// model files written by other LIBLINEAR-compatible tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverType {
    /// L2-regularized logistic regression (primal)
    L2rLr = 0,
    /// L2-regularized L2-loss support vector classification (dual)
    L2rL2LossSvcDual = 1,
    /// L2-regularized L2-loss support vector classification (primal)
    L2rL2LossSvc = 2,
    /// L2-regularized L1-loss support vector classification (dual)
    L2rL1LossSvcDual = 3,
    /// Crammer and Singer multiclass SVM; not trainable
    McsvmCs = 4,
    /// L1-regularized L2-loss support vector classification
    L1rL2LossSvc = 5,
    /// L1-regularized logistic regression
    L1rLr = 6,
    /// L2-regularized logistic regression (dual); not trainable
    L2rLrDual = 7,
    /// L2-regularized L2-loss support vector regression (primal)
    L2rL2LossSvr = 11,
    /// L2-regularized L2-loss support vector regression (dual)
    L2rL2LossSvrDual = 12,
    /// L2-regularized L1-loss support vector regression (dual)
    L2rL1LossSvrDual = 13,
}

impl SolverType {
    pub const ALL: [SolverType; 11] = [
        SolverType::L2rLr,
        SolverType::L2rL2LossSvcDual,
        SolverType::L2rL2LossSvc,
        SolverType::L2rL1LossSvcDual,
        SolverType::McsvmCs,
        SolverType::L1rL2LossSvc,
        SolverType::L1rLr,
        SolverType::L2rLrDual,
        SolverType::L2rL2LossSvr,
        SolverType::L2rL2LossSvrDual,
        SolverType::L2rL1LossSvrDual,
    ];

    /// Name used in the text model format
    pub fn name(self) -> &'static str {
        match self {
            SolverType::L2rLr => "L2R_LR",
            SolverType::L2rL2LossSvcDual => "L2R_L2LOSS_SVC_DUAL",
            SolverType::L2rL2LossSvc => "L2R_L2LOSS_SVC",
            SolverType::L2rL1LossSvcDual => "L2R_L1LOSS_SVC_DUAL",
            SolverType::McsvmCs => "MCSVM_CS",
            SolverType::L1rL2LossSvc => "L1R_L2LOSS_SVC",
            SolverType::L1rLr => "L1R_LR",
            SolverType::L2rLrDual => "L2R_LR_DUAL",
            SolverType::L2rL2LossSvr => "L2R_L2LOSS_SVR",
            SolverType::L2rL2LossSvrDual => "L2R_L2LOSS_SVR_DUAL",
            SolverType::L2rL1LossSvrDual => "L2R_L1LOSS_SVR_DUAL",
        }
    }

    /// Look up a solver by its numeric code
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| *s as u32 == code)
    }

    /// Regression solvers skip class grouping
    pub fn is_regression(self) -> bool {
        matches!(
            self,
            SolverType::L2rL2LossSvr | SolverType::L2rL2LossSvrDual | SolverType::L2rL1LossSvrDual
        )
    }

    /// Solvers whose decision values map to probabilities
    pub fn is_logistic(self) -> bool {
        matches!(self, SolverType::L2rLr | SolverType::L1rLr)
    }

    /// Whether `train` can handle this formulation
    pub fn is_trainable(self) -> bool {
        !matches!(self, SolverType::McsvmCs | SolverType::L2rLrDual)
    }

    /// Stopping tolerance used when none is configured
    pub fn default_eps(self) -> f64 {
        match self {
            SolverType::L2rLr | SolverType::L2rL2LossSvc => 0.01,
            SolverType::L1rL2LossSvc | SolverType::L1rLr => 0.01,
            SolverType::L2rL2LossSvr => 0.001,
            _ => 0.1,
        }
    }
}

impl fmt::Display for SolverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverType {
    type Err = LinearError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|solver| solver.name() == s)
            .ok_or_else(|| LinearError::ParseError(format!("unknown solver type: {s}")))
    }
}

/// Multiplier applied to C for every example of one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassWeight {
    pub label: i32,
    pub weight: f64,
}

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub solver_type: SolverType,
    /// Regularization strength
    pub c: f64,
    /// Stopping tolerance
    pub eps: f64,
    /// Half-width of the insensitive band (SVR only)
    pub p: f64,
    pub class_weights: Vec<ClassWeight>,
    /// Outer-iteration cap for the coordinate-descent solvers
    pub max_iterations: usize,
    /// Enable the active-set shrinking heuristic
    pub shrinking: bool,
    /// Seed for coordinate shuffling; `None` draws one from the OS
    pub seed: Option<u64>,
}

impl Parameter {
    /// Configuration with the default tolerance of `solver_type`
    pub fn new(solver_type: SolverType) -> Self {
        Self {
            solver_type,
            c: 1.0,
            eps: solver_type.default_eps(),
            p: 0.1,
            class_weights: Vec::new(),
            max_iterations: 1000,
            shrinking: true,
            seed: None,
        }
    }

    /// Weight multiplier configured for `label`, if any.
    /// Repeated entries for the same label multiply.
    pub fn class_weight(&self, label: i32) -> Option<f64> {
        let mut weights = self
            .class_weights
            .iter()
            .filter(|cw| cw.label == label)
            .map(|cw| cw.weight)
            .peekable();
        weights.peek()?;
        Some(weights.product())
    }
}

impl Default for Parameter {
    fn default() -> Self {
        Self::new(SolverType::L2rL2LossSvcDual)
    }
}
