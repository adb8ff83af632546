//! Coordinate descent for L1-regularized primal problems
//!
//! Both solvers walk the features of a [`ColumnProblem`] one at a time,
//! take a one-dimensional generalized Newton step on `|w_j|` plus the loss,
//! and backtrack until a sufficient-decrease condition holds. A cheap upper
//! bound on the loss change is tried before the exact one.

use crate::core::FeatureVector;
use crate::data::ColumnProblem;
use crate::solver::{ActiveSet, SolveContext, SolveReport};
use log::Level;
use std::ops::Deref;

const INF: f64 = f64::INFINITY;
const SIGMA: f64 = 0.01;
const MAX_LINE_SEARCH: usize = 20;

/// Multiplies every column entry by its example's label while alive and
/// undoes the scaling on drop, whichever way the solver exits.
struct LabelScaledColumns<'a> {
    columns: &'a mut [FeatureVector],
    y: &'a [f64],
}

impl<'a> LabelScaledColumns<'a> {
    fn new(columns: &'a mut [FeatureVector], y: &'a [f64]) -> Self {
        for col in columns.iter_mut() {
            col.scale_entries(|i| y[i]);
        }
        Self { columns, y }
    }
}

impl Deref for LabelScaledColumns<'_> {
    type Target = [FeatureVector];

    fn deref(&self) -> &Self::Target {
        self.columns
    }
}

impl Drop for LabelScaledColumns<'_> {
    fn drop(&mut self) {
        // labels are ±1, so scaling again restores the values exactly
        let y = self.y;
        for col in self.columns.iter_mut() {
            col.scale_entries(|i| y[i]);
        }
    }
}

/// Generalized Newton direction for `|w_j|` plus a quadratic model with
/// slope `g` and curvature `h`
fn newton_direction(g: f64, h: f64, wj: f64) -> f64 {
    let gp = g + 1.0;
    let gn = g - 1.0;
    if gp <= h * wj {
        -gp / h
    } else if gn >= h * wj {
        -gn / h
    } else {
        -wj
    }
}

/// Optimality violation of coordinate `j`, or `None` when it is settled at
/// zero firmly enough to be shrunk
fn violation(g: f64, wj: f64, shrink_bound: Option<f64>) -> Option<f64> {
    let gp = g + 1.0;
    let gn = g - 1.0;
    if wj == 0.0 {
        if gp < 0.0 {
            Some(-gp)
        } else if gn > 0.0 {
            Some(gn)
        } else if shrink_bound.is_some_and(|m| gp > m && gn < -m) {
            None
        } else {
            Some(0.0)
        }
    } else if wj > 0.0 {
        Some(gp.abs())
    } else {
        Some(gn.abs())
    }
}

/// Solve
///
/// ```text
/// min_w  ‖w‖₁ + Σ C_i max(0, 1 − y_i wᵀx_i)²
/// ```
///
/// over column-major data, writing the result into `w`. `prob` is borrowed
/// mutably because its columns are label-scaled for the duration of the
/// call; they are restored before returning.
pub fn solve_l1r_l2_svc(
    prob: &mut ColumnProblem,
    w: &mut [f64],
    eps: f64,
    cp: f64,
    cn: f64,
    ctx: &mut SolveContext<'_>,
) -> SolveReport {
    let l = prob.l;
    let w_size = prob.n;
    let c = prob.class_costs(cp, cn);

    // b_i = 1 − y_i wᵀx_i
    let mut b = vec![1.0; l];
    w.fill(0.0);

    let columns = LabelScaledColumns::new(&mut prob.columns, &prob.y);

    let xj_sq: Vec<f64> = columns
        .iter()
        .map(|col| col.iter().map(|(i, v)| c[i] * v * v).sum())
        .collect();

    let mut active = ActiveSet::new((0..w_size).collect());
    let mut gmax_old = INF;
    let mut gmax_init = 0.0;
    let mut iter = 0;
    let mut converged = false;

    while iter < ctx.max_iterations {
        let mut gmax_new: f64 = 0.0;

        active.shuffle(ctx.rng);

        let shrink_bound = ctx.shrinking.then_some(gmax_old / l as f64);
        let mut s = 0;
        while s < active.len() {
            let j = active.get(s);
            let col = &columns[j];

            let mut g_loss = 0.0;
            let mut h = 0.0;
            for (i, val) in col.iter() {
                if b[i] > 0.0 {
                    let tmp = c[i] * val;
                    g_loss -= tmp * b[i];
                    h += tmp * val;
                }
            }
            g_loss *= 2.0;
            let g = g_loss;
            let h = (2.0 * h).max(1.0e-12);

            let Some(v) = violation(g, w[j], shrink_bound) else {
                active.shrink(s);
                continue;
            };
            s += 1;
            gmax_new = gmax_new.max(v);

            let mut d = newton_direction(g, h, w[j]);
            if d.abs() < 1.0e-12 {
                continue;
            }

            let mut delta = (w[j] + d).abs() - w[j].abs() + g * d;
            let mut d_old = 0.0;
            let mut loss_old = 0.0;
            let mut num_linesearch = 0;
            while num_linesearch < MAX_LINE_SEARCH {
                let d_diff = d_old - d;
                let mut cond = (w[j] + d).abs() - w[j].abs() - SIGMA * delta;

                let appxcond = xj_sq[j] * d * d + g_loss * d + cond;
                if appxcond <= 0.0 {
                    for (i, val) in col.iter() {
                        b[i] += d_diff * val;
                    }
                    break;
                }

                let mut loss_new = 0.0;
                if num_linesearch == 0 {
                    for (i, val) in col.iter() {
                        if b[i] > 0.0 {
                            loss_old += c[i] * b[i] * b[i];
                        }
                        let b_new = b[i] + d_diff * val;
                        b[i] = b_new;
                        if b_new > 0.0 {
                            loss_new += c[i] * b_new * b_new;
                        }
                    }
                } else {
                    for (i, val) in col.iter() {
                        let b_new = b[i] + d_diff * val;
                        b[i] = b_new;
                        if b_new > 0.0 {
                            loss_new += c[i] * b_new * b_new;
                        }
                    }
                }

                cond += loss_new - loss_old;
                if cond <= 0.0 {
                    break;
                }
                d_old = d;
                d *= 0.5;
                delta *= 0.5;
                num_linesearch += 1;
            }

            w[j] += d;

            // b drifted from w after a failed search
            if num_linesearch >= MAX_LINE_SEARCH {
                ctx.sink.emit(Level::Debug, "line search exhausted, recomputing residuals");
                b.fill(1.0);
                for (k, col) in columns.iter().enumerate() {
                    if w[k] != 0.0 {
                        for (i, val) in col.iter() {
                            b[i] -= w[k] * val;
                        }
                    }
                }
            }
        }

        if iter == 0 {
            gmax_init = gmax_new;
        }
        iter += 1;

        if gmax_new <= eps * gmax_init {
            if active.is_full() {
                converged = true;
                break;
            }
            ctx.sink.emit(Level::Debug, "reactivating all variables");
            active.reactivate();
            gmax_old = INF;
            continue;
        }
        gmax_old = gmax_new;
    }
    drop(columns);

    let hit_iteration_cap = finish(ctx, iter, converged);

    let mut v = 0.0;
    let mut nnz = 0;
    for &wj in w.iter() {
        if wj != 0.0 {
            v += wj.abs();
            nnz += 1;
        }
    }
    for (&bi, &ci) in b.iter().zip(&c) {
        if bi > 0.0 {
            v += ci * bi * bi;
        }
    }
    report(ctx, iter, v, nnz, w_size, hit_iteration_cap)
}

/// Solve
///
/// ```text
/// min_w  ‖w‖₁ + Σ C_i log(1 + exp(−y_i wᵀx_i))
/// ```
///
/// over column-major data, writing the result into `w`. Newton steps are
/// clipped to `[−10, 10]` before the line search.
pub fn solve_l1r_lr(
    prob: &ColumnProblem,
    w: &mut [f64],
    eps: f64,
    cp: f64,
    cn: f64,
    ctx: &mut SolveContext<'_>,
) -> SolveReport {
    let l = prob.l;
    let w_size = prob.n;
    let c = prob.class_costs(cp, cn);
    let positive: Vec<bool> = prob.y.iter().map(|&y| y > 0.0).collect();

    let mut exp_wtx = vec![1.0; l];
    let mut exp_wtx_new = vec![0.0; l];
    w.fill(0.0);

    let mut x_min: f64 = 0.0;
    let mut xj_max = vec![0.0; w_size];
    let mut c_sum = vec![0.0; w_size];
    let mut xjneg_sum = vec![0.0; w_size];
    let mut xjpos_sum = vec![0.0; w_size];
    for (j, col) in prob.columns.iter().enumerate() {
        for (i, val) in col.iter() {
            x_min = x_min.min(val);
            xj_max[j] = f64::max(xj_max[j], val);
            c_sum[j] += c[i];
            if positive[i] {
                xjpos_sum[j] += c[i] * val;
            } else {
                xjneg_sum[j] += c[i] * val;
            }
        }
    }

    let mut active = ActiveSet::new((0..w_size).collect());
    let mut gmax_old = INF;
    let mut gmax_init = 0.0;
    let mut iter = 0;
    let mut converged = false;

    while iter < ctx.max_iterations {
        let mut gmax_new: f64 = 0.0;

        active.shuffle(ctx.rng);

        let shrink_bound = ctx.shrinking.then_some(gmax_old / l as f64);
        let mut s = 0;
        while s < active.len() {
            let j = active.get(s);
            let col = &prob.columns[j];

            let mut sum1 = 0.0;
            let mut sum2 = 0.0;
            let mut h = 0.0;
            for (i, val) in col.iter() {
                let e = exp_wtx[i];
                let tmp1 = val / (1.0 + e);
                let tmp2 = c[i] * tmp1;
                let tmp3 = tmp2 * e;
                sum2 += tmp2;
                sum1 += tmp3;
                h += tmp1 * tmp3;
            }
            let h = f64::max(h, 1.0e-12);
            let g = -sum2 + xjneg_sum[j];

            let Some(v) = violation(g, w[j], shrink_bound) else {
                active.shrink(s);
                continue;
            };
            s += 1;
            gmax_new = gmax_new.max(v);

            let d = newton_direction(g, h, w[j]);
            if d.abs() < 1.0e-12 {
                continue;
            }
            let mut d = d.clamp(-10.0, 10.0);

            let mut delta = (w[j] + d).abs() - w[j].abs() + g * d;
            let mut num_linesearch = 0;
            while num_linesearch < MAX_LINE_SEARCH {
                let mut cond = (w[j] + d).abs() - w[j].abs() - SIGMA * delta;

                // Upper bounds on the loss change, valid for non-negative data
                if x_min >= 0.0 && xj_max[j] > 0.0 && c_sum[j] > 0.0 {
                    let tmp = (d * xj_max[j]).exp();
                    let appxcond1 = (sum1 * (tmp - 1.0) / xj_max[j] / c_sum[j]).ln_1p() * c_sum[j]
                        + cond
                        - d * xjpos_sum[j];
                    let appxcond2 = (sum2 * (1.0 / tmp - 1.0) / xj_max[j] / c_sum[j]).ln_1p()
                        * c_sum[j]
                        + cond
                        + d * xjneg_sum[j];
                    if appxcond1.min(appxcond2) <= 0.0 {
                        for (i, val) in col.iter() {
                            exp_wtx[i] *= (d * val).exp();
                        }
                        break;
                    }
                }

                cond += d * xjneg_sum[j];
                for (k, (i, val)) in col.iter().enumerate() {
                    let exp_dx = (d * val).exp();
                    exp_wtx_new[k] = exp_wtx[i] * exp_dx;
                    cond += c[i] * ((1.0 + exp_wtx_new[k]) / (exp_dx + exp_wtx_new[k])).ln();
                }

                if cond <= 0.0 {
                    for (k, (i, _)) in col.iter().enumerate() {
                        exp_wtx[i] = exp_wtx_new[k];
                    }
                    break;
                }
                d *= 0.5;
                delta *= 0.5;
                num_linesearch += 1;
            }

            w[j] += d;

            if num_linesearch >= MAX_LINE_SEARCH {
                ctx.sink.emit(Level::Debug, "line search exhausted, recomputing exp(wTx)");
                exp_wtx.fill(0.0);
                for (k, col) in prob.columns.iter().enumerate() {
                    if w[k] != 0.0 {
                        for (i, val) in col.iter() {
                            exp_wtx[i] += w[k] * val;
                        }
                    }
                }
                for e in exp_wtx.iter_mut() {
                    *e = e.exp();
                }
            }
        }

        if iter == 0 {
            gmax_init = gmax_new;
        }
        iter += 1;

        if gmax_new <= eps * gmax_init {
            if active.is_full() {
                converged = true;
                break;
            }
            ctx.sink.emit(Level::Debug, "reactivating all variables");
            active.reactivate();
            gmax_old = INF;
            continue;
        }
        gmax_old = gmax_new;
    }

    let hit_iteration_cap = finish(ctx, iter, converged);

    let mut v = 0.0;
    let mut nnz = 0;
    for &wj in w.iter() {
        if wj != 0.0 {
            v += wj.abs();
            nnz += 1;
        }
    }
    for i in 0..l {
        v += if positive[i] {
            c[i] * (1.0 / exp_wtx[i]).ln_1p()
        } else {
            c[i] * exp_wtx[i].ln_1p()
        };
    }
    report(ctx, iter, v, nnz, w_size, hit_iteration_cap)
}

fn finish(ctx: &SolveContext<'_>, iter: usize, converged: bool) -> bool {
    ctx.sink.emit(
        Level::Info,
        &format!("optimization finished, #iter = {iter}"),
    );
    let hit_iteration_cap = !converged && iter >= ctx.max_iterations;
    if hit_iteration_cap {
        ctx.sink.emit(Level::Warn, "reaching max number of iterations");
    }
    hit_iteration_cap
}

fn report(
    ctx: &SolveContext<'_>,
    iter: usize,
    objective_value: f64,
    nnz: usize,
    w_size: usize,
    hit_iteration_cap: bool,
) -> SolveReport {
    ctx.sink.emit(
        Level::Info,
        &format!("Objective value = {objective_value}, #nonzeros/#features = {nnz}/{w_size}"),
    );
    SolveReport {
        iterations: iter,
        objective_value,
        nonzero: nnz,
        hit_iteration_cap,
    }
}
