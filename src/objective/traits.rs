//! Objective function trait definition

/// Twice-differentiable objective minimized by a Newton-type optimizer.
///
/// Implementations cache intermediate products between calls. The required
/// call order within one Newton step is `value(w)`, then `gradient(w)` at the
/// same `w`, then any number of `hessian_vector_product` calls, which use the
/// curvature captured by the most recent `gradient`.
pub trait ObjectiveFunction {
    /// Objective value at `w`
    fn value(&mut self, w: &[f64]) -> f64;

    /// Gradient at `w`, written into `g`
    fn gradient(&mut self, w: &[f64], g: &mut [f64]);

    /// Product of the (generalized) Hessian with `s`, written into `hs`
    fn hessian_vector_product(&mut self, s: &[f64], hs: &mut [f64]);

    /// Number of variables
    fn dimension(&self) -> usize;
}
