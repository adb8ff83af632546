//! Coordinate-descent solvers
//!
//! [`dual_cd`] optimizes the Lagrange multipliers of the L2-regularized SVC
//! and SVR problems, [`l1r_cd`] optimizes L1-regularized primal weights one
//! feature at a time. Both share the [`ActiveSet`] shrinking bookkeeping.

pub mod dual_cd;
pub mod l1r_cd;
pub mod shrinking;

pub use self::dual_cd::*;
pub use self::l1r_cd::*;
pub use self::shrinking::*;

use crate::core::ProgressSink;
use rand::rngs::StdRng;

/// Which loss a dual solver optimizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualLoss {
    /// Hinge (or epsilon-insensitive) loss, box-constrained multipliers
    L1,
    /// Squared loss, multipliers bounded below only
    L2,
}

/// Per-call state shared by every coordinate-descent solver
pub struct SolveContext<'a> {
    pub rng: &'a mut StdRng,
    pub sink: &'a dyn ProgressSink,
    /// Soft cap on outer passes
    pub max_iterations: usize,
    /// Skip variables that look settled at a bound
    pub shrinking: bool,
}

/// Outcome of one solver call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    /// Outer passes performed
    pub iterations: usize,
    pub objective_value: f64,
    /// Nonzero dual variables (dual solvers) or weights (L1 solvers)
    pub nonzero: usize,
    pub hit_iteration_cap: bool,
}
