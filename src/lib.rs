//! Large-scale linear classification and regression
//!
//! L2- and L1-regularized logistic regression, L2-regularized support vector
//! classification and regression, trained with trust-region Newton and
//! coordinate-descent methods. Models read and write the LIBLINEAR text
//! format.

pub mod api;
pub mod core;
pub mod data;
pub mod model;
pub mod objective;
pub mod optimizer;
pub mod persistence;
pub mod solver;
pub mod train;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, Trainer};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{ClassWeight, LinearError, Parameter, Problem, Result, SolverType};
pub use crate::data::load_problem;
pub use crate::model::Model;
pub use crate::optimizer::{NewtonOptimizer, TrustRegionNewton};
pub use crate::persistence::{load_model, save_model};
pub use crate::train::{check_parameter, cross_validation, train, train_with};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
