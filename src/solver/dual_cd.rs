//! Dual coordinate descent for L2-regularized SVC and SVR
//!
//! Both solvers keep `w = Σ coef_i x_i` in sync with the dual variables so
//! that each coordinate's gradient costs one sparse dot product.

use crate::core::SubProblem;
use crate::solver::{ActiveSet, DualLoss, SolveContext, SolveReport};
use log::Level;

const INF: f64 = f64::INFINITY;

/// Solve the SVC dual
///
/// ```text
/// min_α  ½ αᵀ(Q + D)α − eᵀα   s.t.  0 ≤ α_i ≤ U_i
/// ```
///
/// with `Q_ij = y_i y_j x_iᵀx_j`. For the L1 loss `D = 0` and `U_i = C_i`;
/// for the L2 loss `D_ii = 1/(2 C_i)` and `U_i = ∞`. `C_i` is the example's
/// instance weight times `cp` or `cn` depending on its label.
///
/// `w` receives the primal weights and `alphas_out` the final multipliers in
/// the order of `prob`. Examples with `C_i = 0` are left out and report 0.
#[allow(clippy::too_many_arguments)]
pub fn solve_l2r_l1l2_svc(
    prob: &SubProblem<'_>,
    w: &mut [f64],
    alphas_out: &mut [f64],
    eps: f64,
    cp: f64,
    cn: f64,
    loss: DualLoss,
    ctx: &mut SolveContext<'_>,
) -> SolveReport {
    let l = prob.len();
    let costs = prob.class_costs(cp, cn);
    let (diag, upper_bound) = loss_terms(&costs, loss);
    let y: Vec<f64> = prob
        .y
        .iter()
        .map(|&v| if v > 0.0 { 1.0 } else { -1.0 })
        .collect();

    let mut alpha = vec![0.0; l];
    let mut qd = vec![0.0; l];
    let mut members = Vec::with_capacity(l);

    // Warm start: rebuild w from the initial multipliers
    w.fill(0.0);
    for i in 0..l {
        if costs[i] == 0.0 {
            continue;
        }
        alpha[i] = prob.alpha_init[i].clamp(0.0, upper_bound[i]);
        prob.x[i].add_scaled_to(y[i] * alpha[i], w);
        qd[i] = prob.x[i].norm_squared() + diag[i];
        members.push(i);
    }
    let mut active = ActiveSet::new(members);

    let mut pg_max_old = INF;
    let mut pg_min_old = -INF;
    let mut iter = 0;
    let mut converged = false;

    while iter < ctx.max_iterations {
        let mut pg_max_new = -INF;
        let mut pg_min_new = INF;

        active.shuffle(ctx.rng);

        let mut s = 0;
        while s < active.len() {
            let i = active.get(s);
            let xi = prob.x[i];
            let g = y[i] * xi.dot(w) - 1.0 + alpha[i] * diag[i];
            let u = upper_bound[i];

            let mut pg = 0.0;
            if alpha[i] == 0.0 {
                if ctx.shrinking && g > pg_max_old {
                    active.shrink(s);
                    continue;
                } else if g < 0.0 {
                    pg = g;
                }
            } else if alpha[i] == u {
                if ctx.shrinking && g < pg_min_old {
                    active.shrink(s);
                    continue;
                } else if g > 0.0 {
                    pg = g;
                }
            } else {
                pg = g;
            }
            s += 1;

            pg_max_new = pg_max_new.max(pg);
            pg_min_new = pg_min_new.min(pg);

            if pg.abs() > 1.0e-12 {
                let alpha_old = alpha[i];
                alpha[i] = (alpha[i] - g / qd[i]).max(0.0).min(u);
                let d = (alpha[i] - alpha_old) * y[i];
                xi.add_scaled_to(d, w);
            }
        }

        iter += 1;

        if pg_max_new - pg_min_new <= eps {
            if active.is_full() {
                converged = true;
                break;
            }
            ctx.sink.emit(Level::Debug, "reactivating all variables");
            active.reactivate();
            pg_max_old = INF;
            pg_min_old = -INF;
            continue;
        }
        pg_max_old = if pg_max_new <= 0.0 { INF } else { pg_max_new };
        pg_min_old = if pg_min_new >= 0.0 { -INF } else { pg_min_new };
    }

    ctx.sink.emit(
        Level::Info,
        &format!("optimization finished, #iter = {iter}"),
    );
    let hit_iteration_cap = !converged && iter >= ctx.max_iterations;
    if hit_iteration_cap {
        ctx.sink.emit(
            Level::Warn,
            "reaching max number of iterations; using -s 2 may be faster",
        );
    }

    let mut v: f64 = w.iter().map(|&wj| wj * wj).sum();
    let mut nr_sv = 0;
    for i in 0..l {
        if costs[i] > 0.0 {
            v += alpha[i] * (alpha[i] * diag[i] - 2.0);
            if alpha[i] > 0.0 {
                nr_sv += 1;
            }
            alphas_out[i] = alpha[i];
        } else {
            alphas_out[i] = 0.0;
        }
    }
    let objective_value = v / 2.0;
    ctx.sink.emit(
        Level::Info,
        &format!("Objective value = {objective_value}, nSV = {nr_sv}"),
    );

    SolveReport {
        iterations: iter,
        objective_value,
        nonzero: nr_sv,
        hit_iteration_cap,
    }
}

/// Solve the SVR dual
///
/// ```text
/// min_β  ½ βᵀ(Q + D)β − yᵀβ + p‖β‖₁   s.t.  −U_i ≤ β_i ≤ U_i
/// ```
///
/// with `Q_ij = x_iᵀx_j` and `C_i = W_i · c`. For the L1 loss `D = 0` and
/// `U_i = C_i`; for the L2 loss `D_ii = 1/(2 C_i)` and `U_i = ∞`.
///
/// The outer loop stops once the summed violation drops below `eps` times
/// the violation of the all-zero solution.
#[allow(clippy::too_many_arguments)]
pub fn solve_l2r_l1l2_svr(
    prob: &SubProblem<'_>,
    w: &mut [f64],
    alphas_out: &mut [f64],
    c: f64,
    p: f64,
    eps: f64,
    loss: DualLoss,
    ctx: &mut SolveContext<'_>,
) -> SolveReport {
    let l = prob.len();
    let y = &prob.y;
    let costs: Vec<f64> = prob.instance_weights.iter().map(|&wi| wi * c).collect();
    let (lambda, upper_bound) = loss_terms(&costs, loss);

    let mut beta = vec![0.0; l];
    let mut qd = vec![0.0; l];
    let mut members = Vec::with_capacity(l);
    let mut gnorm1_init = 0.0;

    w.fill(0.0);
    for i in 0..l {
        if costs[i] == 0.0 {
            continue;
        }
        beta[i] = prob.alpha_init[i].clamp(-upper_bound[i], upper_bound[i]);
        prob.x[i].add_scaled_to(beta[i], w);
        qd[i] = prob.x[i].norm_squared();

        // violation of the all-zero solution
        let gp = -y[i] + p;
        let gn = -y[i] - p;
        if gp < 0.0 {
            gnorm1_init += -gp;
        } else if gn > 0.0 {
            gnorm1_init += gn;
        }
        members.push(i);
    }
    let mut active = ActiveSet::new(members);

    let mut gmax_old = INF;
    let mut iter = 0;
    let mut converged = false;

    while iter < ctx.max_iterations {
        let mut gmax_new: f64 = 0.0;
        let mut gnorm1_new = 0.0;

        active.shuffle(ctx.rng);

        let mut s = 0;
        while s < active.len() {
            let i = active.get(s);
            let xi = prob.x[i];
            let u = upper_bound[i];
            let g = -y[i] + lambda[i] * beta[i] + xi.dot(w);
            let h = qd[i] + lambda[i];

            let gp = g + p;
            let gn = g - p;
            let mut violation = 0.0;
            if beta[i] == 0.0 {
                if gp < 0.0 {
                    violation = -gp;
                } else if gn > 0.0 {
                    violation = gn;
                } else if ctx.shrinking && gp > gmax_old && gn < -gmax_old {
                    active.shrink(s);
                    continue;
                }
            } else if beta[i] >= u {
                if gp > 0.0 {
                    violation = gp;
                } else if ctx.shrinking && gp < -gmax_old {
                    active.shrink(s);
                    continue;
                }
            } else if beta[i] <= -u {
                if gn < 0.0 {
                    violation = -gn;
                } else if ctx.shrinking && gn > gmax_old {
                    active.shrink(s);
                    continue;
                }
            } else if beta[i] > 0.0 {
                violation = gp.abs();
            } else {
                violation = gn.abs();
            }
            s += 1;

            gmax_new = gmax_new.max(violation);
            gnorm1_new += violation;

            // Newton direction on the piecewise quadratic
            let d = if gp < h * beta[i] {
                -gp / h
            } else if gn > h * beta[i] {
                -gn / h
            } else {
                -beta[i]
            };
            if d.abs() < 1.0e-12 {
                continue;
            }

            let beta_old = beta[i];
            beta[i] = (beta[i] + d).max(-u).min(u);
            let d = beta[i] - beta_old;
            if d != 0.0 {
                xi.add_scaled_to(d, w);
            }
        }

        iter += 1;

        if gnorm1_new <= eps * gnorm1_init {
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

    ctx.sink.emit(
        Level::Info,
        &format!("optimization finished, #iter = {iter}"),
    );
    let hit_iteration_cap = !converged && iter >= ctx.max_iterations;
    if hit_iteration_cap {
        ctx.sink.emit(
            Level::Warn,
            "reaching max number of iterations; using -s 11 may be faster",
        );
    }

    let mut v = 0.5 * w.iter().map(|&wj| wj * wj).sum::<f64>();
    let mut nr_sv = 0;
    for i in 0..l {
        if costs[i] > 0.0 {
            v += p * beta[i].abs() - y[i] * beta[i] + 0.5 * lambda[i] * beta[i] * beta[i];
            if beta[i] != 0.0 {
                nr_sv += 1;
            }
            alphas_out[i] = beta[i];
        } else {
            alphas_out[i] = 0.0;
        }
    }
    ctx.sink.emit(
        Level::Info,
        &format!("Objective value = {v}, nSV = {nr_sv}"),
    );

    SolveReport {
        iterations: iter,
        objective_value: v,
        nonzero: nr_sv,
        hit_iteration_cap,
    }
}

/// Diagonal term and upper bound of each multiplier
fn loss_terms(costs: &[f64], loss: DualLoss) -> (Vec<f64>, Vec<f64>) {
    costs
        .iter()
        .map(|&ci| match loss {
            DualLoss::L1 => (0.0, ci),
            DualLoss::L2 if ci > 0.0 => (0.5 / ci, INF),
            DualLoss::L2 => (0.0, INF),
        })
        .unzip()
}
