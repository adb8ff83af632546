//! Trust-region Newton method with a truncated conjugate-gradient inner solver

use crate::core::ProgressSink;
use crate::objective::ObjectiveFunction;
use crate::optimizer::{NewtonOptimizer, NewtonReport};
use log::Level;

// Step acceptance thresholds on actual/predicted reduction
const ETA0: f64 = 1e-4;
const ETA1: f64 = 0.25;
const ETA2: f64 = 0.75;

// Trust-region radius update factors
const SIGMA1: f64 = 0.25;
const SIGMA2: f64 = 0.5;
const SIGMA3: f64 = 4.0;

/// Trust-region Newton optimizer.
///
/// Each outer iteration approximately solves the quadratic model inside the
/// current radius with conjugate gradients, then accepts or rejects the step
/// by comparing the actual reduction against the predicted one.
#[derive(Debug, Clone, Copy)]
pub struct TrustRegionNewton {
    /// Cap on accepted Newton steps
    pub max_iterations: usize,
}

impl TrustRegionNewton {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    /// Truncated CG on `H s = -g` restricted to `‖s‖ ≤ delta`.
    ///
    /// Writes the step into `s` and the final residual `-g - H s` into `r`,
    /// returning the number of CG iterations.
    fn trcg(
        objective: &mut dyn ObjectiveFunction,
        delta: f64,
        g: &[f64],
        s: &mut [f64],
        r: &mut [f64],
        sink: &dyn ProgressSink,
    ) -> usize {
        let n = g.len();
        let mut d = vec![0.0; n];
        let mut hd = vec![0.0; n];

        for j in 0..n {
            s[j] = 0.0;
            r[j] = -g[j];
            d[j] = r[j];
        }
        let cgtol = 0.1 * norm(g);

        let mut cg_iter = 0;
        let mut rtr = dot(r, r);
        loop {
            if rtr.sqrt() <= cgtol {
                break;
            }
            cg_iter += 1;
            objective.hessian_vector_product(&d, &mut hd);

            let mut alpha = rtr / dot(&d, &hd);
            axpy(alpha, &d, s);
            if norm(s) > delta {
                sink.emit(Level::Debug, "cg reaches trust region boundary");
                axpy(-alpha, &d, s);

                let std = dot(s, &d);
                let sts = dot(s, s);
                let dtd = dot(&d, &d);
                let dsq = delta * delta;
                let rad = (std * std + dtd * (dsq - sts)).sqrt();
                alpha = if std >= 0.0 {
                    (dsq - sts) / (std + rad)
                } else {
                    (rad - std) / dtd
                };
                axpy(alpha, &d, s);
                axpy(-alpha, &hd, r);
                break;
            }
            axpy(-alpha, &hd, r);

            let rnew_trnew = dot(r, r);
            let beta = rnew_trnew / rtr;
            for (dj, &rj) in d.iter_mut().zip(r.iter()) {
                *dj = beta * *dj + rj;
            }
            rtr = rnew_trnew;
        }
        cg_iter
    }
}

impl Default for TrustRegionNewton {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl NewtonOptimizer for TrustRegionNewton {
    fn minimize(
        &self,
        objective: &mut dyn ObjectiveFunction,
        w: &mut [f64],
        eps: f64,
        sink: &dyn ProgressSink,
    ) -> NewtonReport {
        let n = objective.dimension();
        let mut g = vec![0.0; n];
        let mut s = vec![0.0; n];
        let mut r = vec![0.0; n];
        let mut w_new = vec![0.0; n];

        let mut f = objective.value(w);
        objective.gradient(w, &mut g);
        let mut delta = norm(&g);
        let gnorm0 = delta;
        let mut gnorm = gnorm0;

        let mut iter = 1;
        let mut converged = gnorm <= eps * gnorm0;

        while iter <= self.max_iterations && !converged {
            let cg_iter = Self::trcg(objective, delta, &g, &mut s, &mut r, sink);

            for ((wn, &wj), &sj) in w_new.iter_mut().zip(w.iter()).zip(&s) {
                *wn = wj + sj;
            }

            let gs = dot(&g, &s);
            let prered = -0.5 * (gs - dot(&s, &r));
            let fnew = objective.value(&w_new);

            // Compare actual reduction with the model's prediction
            let actred = f - fnew;

            let snorm = norm(&s);
            if iter == 1 {
                delta = delta.min(snorm);
            }

            let alpha = if fnew - f - gs <= 0.0 {
                SIGMA3
            } else {
                SIGMA1.max(-0.5 * (gs / (fnew - f - gs)))
            };

            if actred < ETA0 * prered {
                delta = (alpha.max(SIGMA1) * snorm).min(SIGMA2 * delta);
            } else if actred < ETA1 * prered {
                delta = (SIGMA1 * delta).max((alpha * snorm).min(SIGMA2 * delta));
            } else if actred < ETA2 * prered {
                delta = (SIGMA1 * delta).max((alpha * snorm).min(SIGMA3 * delta));
            } else {
                delta = delta.max((alpha * snorm).min(SIGMA3 * delta));
            }

            sink.emit(
                Level::Debug,
                &format!(
                    "iter {iter:2} act {actred:5.3e} pre {prered:5.3e} delta {delta:5.3e} \
                     f {f:5.3e} |g| {gnorm:5.3e} CG {cg_iter:3}"
                ),
            );

            if actred > ETA0 * prered {
                iter += 1;
                w.copy_from_slice(&w_new);
                f = fnew;
                objective.gradient(w, &mut g);

                gnorm = norm(&g);
                if gnorm <= eps * gnorm0 {
                    converged = true;
                    break;
                }
            }
            if f < -1.0e32 {
                sink.emit(Level::Warn, "f < -1.0e+32");
                break;
            }
            if actred.abs() <= 0.0 && prered <= 0.0 {
                sink.emit(Level::Warn, "actred and prered <= 0");
                break;
            }
            if actred.abs() <= 1.0e-12 * f.abs() && prered.abs() <= 1.0e-12 * f.abs() {
                sink.emit(Level::Warn, "actred and prered too small");
                break;
            }
        }

        let hit_iteration_cap = !converged && iter > self.max_iterations;
        if hit_iteration_cap {
            sink.emit(
                Level::Warn,
                &format!("reaching max number of Newton iterations ({})", self.max_iterations),
            );
        }

        NewtonReport {
            iterations: iter - 1,
            objective_value: f,
            gradient_norm: gnorm,
            hit_iteration_cap,
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// `y += a * x`
fn axpy(a: f64, x: &[f64], y: &mut [f64]) {
    for (yj, &xj) in y.iter_mut().zip(x) {
        *yj += a * xj;
    }
}
