//! L2-regularized L2-loss support vector regression objective

use crate::core::SubProblem;
use crate::objective::l2_svc::restricted_hessian_product;
use crate::objective::matvec::{sub_xtv, xv};
use crate::objective::ObjectiveFunction;

/// f(w) = ½‖w‖² + Σ C_i max(0, |wᵀx_i − y_i| − p)²
pub struct L2SvrObjective<'p> {
    prob: &'p SubProblem<'p>,
    c: Vec<f64>,
    p: f64,
    /// wᵀx_i from the last `value` call
    z: Vec<f64>,
    /// Examples outside the insensitive band, from the last `gradient` call
    active: Vec<usize>,
    scratch: Vec<f64>,
}

impl<'p> L2SvrObjective<'p> {
    /// `c` holds one cost per example, `p` is the band half-width
    pub fn new(prob: &'p SubProblem<'p>, c: Vec<f64>, p: f64) -> Self {
        let l = prob.len();
        Self {
            prob,
            c,
            p,
            z: vec![0.0; l],
            active: Vec::with_capacity(l),
            scratch: vec![0.0; l],
        }
    }
}

impl ObjectiveFunction for L2SvrObjective<'_> {
    fn value(&mut self, w: &[f64]) -> f64 {
        xv(&self.prob.x, w, &mut self.z);

        let mut f = w.iter().map(|&v| v * v).sum::<f64>() / 2.0;
        for ((&z, &y), &c) in self.z.iter().zip(&self.prob.y).zip(&self.c) {
            let d = z - y;
            if d < -self.p {
                f += c * (d + self.p) * (d + self.p);
            } else if d > self.p {
                f += c * (d - self.p) * (d - self.p);
            }
        }
        f
    }

    fn gradient(&mut self, w: &[f64], g: &mut [f64]) {
        self.active.clear();
        for (i, &z) in self.z.iter().enumerate() {
            let d = z - self.prob.y[i];
            let coef = if d < -self.p {
                self.c[i] * (d + self.p)
            } else if d > self.p {
                self.c[i] * (d - self.p)
            } else {
                continue;
            };
            self.scratch[self.active.len()] = coef;
            self.active.push(i);
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
