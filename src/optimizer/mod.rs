//! Newton-type minimization of smooth primal objectives
//!
//! The primal solvers only depend on the [`NewtonOptimizer`] capability, so
//! any implementation can be injected through [`crate::train::train_with`].
//! [`TrustRegionNewton`] is the one used by default.

pub mod tron;

pub use self::tron::TrustRegionNewton;

use crate::core::ProgressSink;
use crate::objective::ObjectiveFunction;

/// Summary of one call to [`NewtonOptimizer::minimize`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonReport {
    /// Accepted steps
    pub iterations: usize,
    pub objective_value: f64,
    /// Gradient norm at the returned weights
    pub gradient_norm: f64,
    pub hit_iteration_cap: bool,
}

/// Minimizes an [`ObjectiveFunction`] in place
pub trait NewtonOptimizer {
    /// Minimize starting from the contents of `w`, leaving the result there.
    ///
    /// Stops once the gradient norm falls to `eps` times its initial value.
    fn minimize(
        &self,
        objective: &mut dyn ObjectiveFunction,
        w: &mut [f64],
        eps: f64,
        sink: &dyn ProgressSink,
    ) -> NewtonReport;
}
