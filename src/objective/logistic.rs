//! L2-regularized logistic regression objective

use crate::core::SubProblem;
use crate::objective::matvec::{xtv, xv};
use crate::objective::ObjectiveFunction;

/// f(w) = ½‖w‖² + Σ C_i log(1 + exp(−y_i wᵀx_i))
pub struct LogisticObjective<'p> {
    prob: &'p SubProblem<'p>,
    c: Vec<f64>,
    /// Xw from the last `value` call
    z: Vec<f64>,
    /// σ(yz)(1 − σ(yz)) from the last `gradient` call
    d: Vec<f64>,
    scratch: Vec<f64>,
}

impl<'p> LogisticObjective<'p> {
    /// `c` holds one cost per example
    pub fn new(prob: &'p SubProblem<'p>, c: Vec<f64>) -> Self {
        let l = prob.len();
        Self {
            prob,
            c,
            z: vec![0.0; l],
            d: vec![0.0; l],
            scratch: vec![0.0; l],
        }
    }
}

impl ObjectiveFunction for LogisticObjective<'_> {
    fn value(&mut self, w: &[f64]) -> f64 {
        xv(&self.prob.x, w, &mut self.z);

        let mut f = w.iter().map(|&v| v * v).sum::<f64>() / 2.0;
        for ((&y, &z), &c) in self.prob.y.iter().zip(&self.z).zip(&self.c) {
            let yz = y * z;
            // log(1 + e^{-yz}) without overflow for large |yz|
            if yz >= 0.0 {
                f += c * (-yz).exp().ln_1p();
            } else {
                f += c * (-yz + yz.exp().ln_1p());
            }
        }
        f
    }

    fn gradient(&mut self, w: &[f64], g: &mut [f64]) {
        for i in 0..self.prob.len() {
            let y = self.prob.y[i];
            let sigma = 1.0 / (1.0 + (-y * self.z[i]).exp());
            self.d[i] = sigma * (1.0 - sigma);
            self.scratch[i] = self.c[i] * (sigma - 1.0) * y;
        }
        xtv(&self.prob.x, &self.scratch, g);

        for (gj, &wj) in g.iter_mut().zip(w) {
            *gj += wj;
        }
    }

    fn hessian_vector_product(&mut self, s: &[f64], hs: &mut [f64]) {
        xv(&self.prob.x, s, &mut self.scratch);
        for ((wa, &c), &d) in self.scratch.iter_mut().zip(&self.c).zip(&self.d) {
            *wa *= c * d;
        }
        xtv(&self.prob.x, &self.scratch, hs);

        for (h, &sj) in hs.iter_mut().zip(s) {
            *h += sj;
        }
    }

    fn dimension(&self) -> usize {
        self.prob.n
    }
}
