//! L2-regularized L2-loss (squared hinge) SVC objective

use crate::core::{FeatureVector, SubProblem};
use crate::objective::matvec::{sub_xtv, sub_xv, xv};
use crate::objective::ObjectiveFunction;

/// f(w) = ½‖w‖² + Σ C_i max(0, 1 − y_i wᵀx_i)²
pub struct L2SvcObjective<'p> {
    prob: &'p SubProblem<'p>,
    c: Vec<f64>,
    /// y_i · wᵀx_i from the last `value` call
    yz: Vec<f64>,
    /// Margin violators found by the last `gradient` call
    active: Vec<usize>,
    scratch: Vec<f64>,
}

impl<'p> L2SvcObjective<'p> {
    /// `c` holds one cost per example
    pub fn new(prob: &'p SubProblem<'p>, c: Vec<f64>) -> Self {
        let l = prob.len();
        Self {
            prob,
            c,
            yz: vec![0.0; l],
            active: Vec::with_capacity(l),
            scratch: vec![0.0; l],
        }
    }

    /// Rows currently in the active set
    pub fn active_rows(&self) -> &[usize] {
        &self.active
    }
}

impl ObjectiveFunction for L2SvcObjective<'_> {
    fn value(&mut self, w: &[f64]) -> f64 {
        xv(&self.prob.x, w, &mut self.yz);

        let mut f = w.iter().map(|&v| v * v).sum::<f64>() / 2.0;
        for ((yz, &y), &c) in self.yz.iter_mut().zip(&self.prob.y).zip(&self.c) {
            *yz *= y;
            let d = 1.0 - *yz;
            if d > 0.0 {
                f += c * d * d;
            }
        }
        f
    }

    fn gradient(&mut self, w: &[f64], g: &mut [f64]) {
        self.active.clear();
        for (i, &yz) in self.yz.iter().enumerate() {
            if yz < 1.0 {
                let k = self.active.len();
                self.scratch[k] = self.c[i] * self.prob.y[i] * (yz - 1.0);
                self.active.push(i);
            }
        }
        let k = self.active.len();
        sub_xtv(&self.prob.x, &self.active, &self.scratch[..k], g);

        for (gj, &wj) in g.iter_mut().zip(w) {
            *gj = wj + 2.0 * *gj;
        }
    }

    fn hessian_vector_product(&mut self, s: &[f64], hs: &mut [f64]) {
        restricted_hessian_product(
            &self.prob.x,
            &self.c,
            &self.active,
            &mut self.scratch,
            s,
            hs,
        );
    }

    fn dimension(&self) -> usize {
        self.prob.n
    }
}

/// `hs = s + 2 · X_Iᵀ diag(C_I) X_I s` over the active rows `I`.
///
/// Shared by the squared-hinge and squared-epsilon-insensitive losses,
/// whose generalized Hessians differ only in how `I` is chosen.
pub(crate) fn restricted_hessian_product(
    x: &[&FeatureVector],
    c: &[f64],
    active: &[usize],
    scratch: &mut [f64],
    s: &[f64],
    hs: &mut [f64],
) {
    let k = active.len();
    let wa = &mut scratch[..k];
    sub_xv(x, active, s, wa);
    for (v, &i) in wa.iter_mut().zip(active) {
        *v *= c[i];
    }
    sub_xtv(x, active, wa, hs);

    for (h, &sj) in hs.iter_mut().zip(s) {
        *h = sj + 2.0 * *h;
    }
}
