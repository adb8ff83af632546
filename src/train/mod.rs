//! Training orchestration
//!
//! Classification problems are grouped by label and solved either as one
//! binary problem or as one-vs-rest subproblems; regression problems go to
//! the solver in a single call.

pub mod cross_validation;

pub use self::cross_validation::cross_validation;

use crate::core::{
    LinearError, LogSink, Parameter, Problem, ProgressSink, Result, SolverType, SubProblem,
};
use crate::data::ColumnProblem;
use crate::model::Model;
use crate::objective::{L2SvcObjective, L2SvrObjective, LogisticObjective};
use crate::optimizer::{NewtonOptimizer, NewtonReport, TrustRegionNewton};
use crate::solver::{
    solve_l1r_l2_svc, solve_l1r_lr, solve_l2r_l1l2_svc, solve_l2r_l1l2_svr, DualLoss,
    SolveContext, SolveReport,
};
use log::Level;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Examples grouped by class label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassGroups {
    /// Distinct labels in order of first appearance
    pub label: Vec<i32>,
    /// Offset of each class within `perm`
    pub start: Vec<usize>,
    /// Number of examples of each class
    pub count: Vec<usize>,
    /// `perm[k]` is the original index of the k-th grouped example
    pub perm: Vec<usize>,
}

impl ClassGroups {
    pub fn nr_class(&self) -> usize {
        self.label.len()
    }
}

/// Group examples by their (integral) label.
///
/// The grouping is stable: within a class, examples keep their original
/// relative order.
pub fn group_classes(y: &[f64]) -> ClassGroups {
    let mut label: Vec<i32> = Vec::new();
    let mut count: Vec<usize> = Vec::new();
    let mut data_label = Vec::with_capacity(y.len());

    for &yi in y {
        let this_label = yi as i32;
        let k = match label.iter().position(|&lab| lab == this_label) {
            Some(k) => {
                count[k] += 1;
                k
            }
            None => {
                label.push(this_label);
                count.push(1);
                label.len() - 1
            }
        };
        data_label.push(k);
    }

    let mut start = vec![0; label.len()];
    for k in 1..label.len() {
        start[k] = start[k - 1] + count[k - 1];
    }

    let mut next = start.clone();
    let mut perm = vec![0; y.len()];
    for (i, &k) in data_label.iter().enumerate() {
        perm[next[k]] = i;
        next[k] += 1;
    }

    ClassGroups {
        label,
        start,
        count,
        perm,
    }
}

/// Reject configurations no solver can run
pub fn check_parameter(prob: &Problem, param: &Parameter) -> Result<()> {
    if !(param.eps > 0.0) {
        return Err(LinearError::InvalidParameter("eps <= 0".to_string()));
    }
    if !(param.c > 0.0) {
        return Err(LinearError::InvalidParameter("C <= 0".to_string()));
    }
    if !(param.p >= 0.0) {
        return Err(LinearError::InvalidParameter("p < 0".to_string()));
    }
    if param.max_iterations == 0 {
        return Err(LinearError::InvalidParameter(
            "max_iterations must be positive".to_string(),
        ));
    }
    if let Some(cw) = param
        .class_weights
        .iter()
        .find(|cw| !cw.weight.is_finite() || cw.weight < 0.0)
    {
        return Err(LinearError::InvalidParameter(format!(
            "weight of class {} must be finite and non-negative, got {}",
            cw.label, cw.weight
        )));
    }
    if !param.solver_type.is_trainable() {
        return Err(LinearError::UnsupportedSolver(format!(
            "{} cannot be trained",
            param.solver_type
        )));
    }
    prob.validate()
}

/// Train a model with the default optimizer, logging through `log`
pub fn train(prob: &Problem, param: &Parameter) -> Result<Model> {
    train_with(prob, param, &TrustRegionNewton::default(), &LogSink)
}

/// Train a model with an injected Newton optimizer and progress sink
pub fn train_with(
    prob: &Problem,
    param: &Parameter,
    optimizer: &dyn NewtonOptimizer,
    sink: &dyn ProgressSink,
) -> Result<Model> {
    check_parameter(prob, param)?;

    let mut rng = match param.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut ctx = SolveContext {
        rng: &mut rng,
        sink,
        max_iterations: param.max_iterations,
        shrinking: param.shrinking,
    };

    let l = prob.len();
    let n = prob.n;
    let mut model = Model {
        param: param.clone(),
        nr_class: 2,
        nr_feature: prob.nr_feature(),
        w: Vec::new(),
        label: Vec::new(),
        bias: prob.bias,
        alphas: Vec::new(),
        n_examples: l,
    };

    if param.solver_type.is_regression() {
        let sub = SubProblem::identity(prob);
        let mut w = vec![0.0; n];
        let mut alphas = vec![0.0; l];
        train_one(&sub, param, &mut w, &mut alphas, param.c, param.c, optimizer, &mut ctx)?;
        model.w = w;
        model.alphas.push(alphas);
        return Ok(model);
    }

    let groups = group_classes(&prob.y);
    let nr_class = groups.nr_class();
    model.nr_class = nr_class;
    model.label = groups.label.clone();

    for cw in &param.class_weights {
        if !groups.label.contains(&cw.label) {
            sink.emit(
                Level::Warn,
                &format!(
                    "class label {} specified in weight is not found",
                    cw.label
                ),
            );
        }
    }
    let weighted_c: Vec<f64> = groups
        .label
        .iter()
        .map(|&lab| param.class_weight(lab).map_or(param.c, |weight| param.c * weight))
        .collect();

    let mut sub = SubProblem::permuted(prob, &groups.perm);
    let mut alphas = vec![0.0; l];

    if nr_class <= 2 {
        let e0 = groups.count[0];
        for (k, yk) in sub.y.iter_mut().enumerate() {
            *yk = if k < e0 { 1.0 } else { -1.0 };
        }

        let mut w = vec![0.0; n];
        let cn = weighted_c.get(1).copied().unwrap_or(param.c);
        train_one(&sub, param, &mut w, &mut alphas, weighted_c[0], cn, optimizer, &mut ctx)?;

        model.w = w;
        model.alphas.push(unpermute(&alphas, &groups.perm));
    } else {
        model.w = vec![0.0; n * nr_class];
        let mut w = vec![0.0; n];
        for k in 0..nr_class {
            let si = groups.start[k];
            let ei = si + groups.count[k];
            for (i, yi) in sub.y.iter_mut().enumerate() {
                *yi = if (si..ei).contains(&i) { 1.0 } else { -1.0 };
            }

            sink.emit(
                Level::Debug,
                &format!("training class {} against the rest", groups.label[k]),
            );
            train_one(&sub, param, &mut w, &mut alphas, weighted_c[k], param.c, optimizer, &mut ctx)?;

            for (j, &wj) in w.iter().enumerate() {
                model.w[j * nr_class + k] = wj;
            }
            model.alphas.push(unpermute(&alphas, &groups.perm));
        }
    }

    Ok(model)
}

/// Scatter values from grouped order back to original example order
fn unpermute(values: &[f64], perm: &[usize]) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    for (&v, &i) in values.iter().zip(perm) {
        out[i] = v;
    }
    out
}

/// Solve one binary (or regression) subproblem with the configured solver
#[allow(clippy::too_many_arguments)]
pub(crate) fn train_one(
    sub: &SubProblem<'_>,
    param: &Parameter,
    w: &mut [f64],
    alphas_out: &mut [f64],
    cp: f64,
    cn: f64,
    optimizer: &dyn NewtonOptimizer,
    ctx: &mut SolveContext<'_>,
) -> Result<SolveReport> {
    let l = sub.len();
    let pos = sub.count_positive();
    let neg = l - pos;
    // Primal tolerance scaled by the minority class share
    let primal_eps = param.eps * pos.min(neg).max(1) as f64 / l as f64;

    let report = match param.solver_type {
        SolverType::L2rLr => {
            let mut objective = LogisticObjective::new(sub, sub.class_costs(cp, cn));
            w.copy_from_slice(sub.w_init);
            alphas_out.fill(0.0);
            let r = optimizer.minimize(&mut objective, w, primal_eps, ctx.sink);
            newton_report(r, w)
        }
        SolverType::L2rL2LossSvc => {
            let mut objective = L2SvcObjective::new(sub, sub.class_costs(cp, cn));
            w.copy_from_slice(sub.w_init);
            alphas_out.fill(0.0);
            let r = optimizer.minimize(&mut objective, w, primal_eps, ctx.sink);
            newton_report(r, w)
        }
        SolverType::L2rL2LossSvr => {
            let costs = sub.instance_weights.iter().map(|&wi| wi * param.c).collect();
            let mut objective = L2SvrObjective::new(sub, costs, param.p);
            w.copy_from_slice(sub.w_init);
            alphas_out.fill(0.0);
            let r = optimizer.minimize(&mut objective, w, param.eps, ctx.sink);
            newton_report(r, w)
        }
        SolverType::L2rL2LossSvcDual => {
            solve_l2r_l1l2_svc(sub, w, alphas_out, param.eps, cp, cn, DualLoss::L2, ctx)
        }
        SolverType::L2rL1LossSvcDual => {
            solve_l2r_l1l2_svc(sub, w, alphas_out, param.eps, cp, cn, DualLoss::L1, ctx)
        }
        SolverType::L2rL2LossSvrDual => solve_l2r_l1l2_svr(
            sub,
            w,
            alphas_out,
            param.c,
            param.p,
            param.eps,
            DualLoss::L2,
            ctx,
        ),
        SolverType::L2rL1LossSvrDual => solve_l2r_l1l2_svr(
            sub,
            w,
            alphas_out,
            param.c,
            param.p,
            param.eps,
            DualLoss::L1,
            ctx,
        ),
        SolverType::L1rL2LossSvc => {
            let mut columns = ColumnProblem::from_rows(sub);
            alphas_out.fill(0.0);
            solve_l1r_l2_svc(&mut columns, w, primal_eps, cp, cn, ctx)
        }
        SolverType::L1rLr => {
            let columns = ColumnProblem::from_rows(sub);
            alphas_out.fill(0.0);
            solve_l1r_lr(&columns, w, primal_eps, cp, cn, ctx)
        }
        SolverType::McsvmCs | SolverType::L2rLrDual => {
            return Err(LinearError::UnsupportedSolver(format!(
                "{} cannot be trained",
                param.solver_type
            )));
        }
    };
    Ok(report)
}

fn newton_report(r: NewtonReport, w: &[f64]) -> SolveReport {
    SolveReport {
        iterations: r.iterations,
        objective_value: r.objective_value,
        nonzero: w.iter().filter(|&&v| v != 0.0).count(),
        hit_iteration_cap: r.hit_iteration_cap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::testing::RecordingSink;
    use crate::core::{ClassWeight, FeatureVector, SilentSink};

    fn three_class_problem() -> Problem {
        let centers = [(3.0, 0.0), (-3.0, 3.0), (-3.0, -3.0)];
        let labels = [5.0, 1.0, 9.0];
        let offsets = [(0.3, 0.2), (-0.2, 0.4), (0.1, -0.3), (-0.4, -0.1)];
        let mut x = Vec::new();
        let mut y = Vec::new();
        // classes interleaved so grouping has work to do
        for off in &offsets {
            for (c, center) in centers.iter().enumerate() {
                x.push(FeatureVector::dense(vec![center.0 + off.0, center.1 + off.1]));
                y.push(labels[c]);
            }
        }
        Problem::new(x, y).unwrap().with_bias(1.0)
    }

    fn seeded(solver: SolverType) -> Parameter {
        let mut param = Parameter::new(solver);
        param.seed = Some(17);
        param
    }

    #[test]
    fn test_group_classes() {
        let groups = group_classes(&[2.0, -1.0, 2.0, 7.0, -1.0]);
        assert_eq!(groups.label, vec![2, -1, 7]);
        assert_eq!(groups.count, vec![2, 2, 1]);
        assert_eq!(groups.start, vec![0, 2, 4]);
        assert_eq!(groups.perm, vec![0, 2, 1, 4, 3]);
    }

    #[test]
    fn test_check_parameter() {
        let prob = three_class_problem();
        let mut param = Parameter::default();
        assert!(check_parameter(&prob, &param).is_ok());

        param.eps = 0.0;
        assert!(matches!(
            check_parameter(&prob, &param),
            Err(LinearError::InvalidParameter(_))
        ));

        let mut param = Parameter::default();
        param.c = -1.0;
        assert!(check_parameter(&prob, &param).is_err());

        let mut param = Parameter::default();
        param.p = -0.1;
        assert!(check_parameter(&prob, &param).is_err());

        for solver in [SolverType::McsvmCs, SolverType::L2rLrDual] {
            assert!(matches!(
                check_parameter(&prob, &Parameter::new(solver)),
                Err(LinearError::UnsupportedSolver(_))
            ));
        }
    }

    #[test]
    fn test_unsupported_solver_does_no_work() {
        let prob = three_class_problem();
        let sink = RecordingSink::default();
        let result = train_with(
            &prob,
            &Parameter::new(SolverType::McsvmCs),
            &TrustRegionNewton::default(),
            &sink,
        );
        assert!(matches!(result, Err(LinearError::UnsupportedSolver(_))));
        assert!(sink.messages.borrow().is_empty());
    }

    #[test]
    fn test_one_vs_rest_reconstructs_labels() {
        let prob = three_class_problem();
        for solver in [
            SolverType::L2rLr,
            SolverType::L2rL2LossSvcDual,
            SolverType::L2rL2LossSvc,
            SolverType::L2rL1LossSvcDual,
            SolverType::L1rL2LossSvc,
            SolverType::L1rLr,
        ] {
            let model = train(&prob, &seeded(solver)).unwrap();
            assert_eq!(model.nr_class, 3);
            assert_eq!(model.label, vec![5, 1, 9]);
            assert_eq!(model.w.len(), 3 * 3);
            assert_eq!(model.alphas.len(), 3);
            for (xi, &yi) in prob.x.iter().zip(&prob.y) {
                // the bias column is added by the model itself
                let raw = FeatureVector::dense(xi.to_dense(2));
                assert_eq!(model.predict(&raw), yi, "solver {solver}");
            }
        }
    }

    #[test]
    fn test_binary_duals_follow_original_order() {
        let prob = Problem::new(
            vec![
                FeatureVector::dense(vec![-1.0]),
                FeatureVector::dense(vec![2.0]),
                FeatureVector::dense(vec![-2.0]),
                FeatureVector::dense(vec![1.0]),
            ],
            vec![-1.0, 1.0, -1.0, 1.0],
        )
        .unwrap();
        let model = train(&prob, &seeded(SolverType::L2rL1LossSvcDual)).unwrap();
        assert_eq!(model.label, vec![-1, 1]);
        assert_eq!(model.alphas.len(), 1);

        // w = Σ y_i α_i x_i in original order
        let alphas = &model.alphas[0];
        let w: f64 = (0..4)
            .map(|i| prob.y[i] * alphas[i] * prob.x[i].dot(&[1.0]))
            .sum();
        // label[0] = -1 is the positive side of the subproblem
        assert!((model.w[0] + w).abs() < 1e-9);
    }

    #[test]
    fn test_class_weight_for_missing_label_warns() {
        let prob = three_class_problem();
        let mut param = seeded(SolverType::L2rL2LossSvcDual);
        param.class_weights.push(ClassWeight {
            label: 42,
            weight: 3.0,
        });
        let sink = RecordingSink::default();
        let model = train_with(&prob, &param, &TrustRegionNewton::default(), &sink).unwrap();
        assert_eq!(model.nr_class, 3);
        assert!(sink
            .messages
            .borrow()
            .iter()
            .any(|(level, msg)| *level == Level::Warn && msg.contains("42")));
    }

    #[test]
    fn test_single_class_problem() {
        let prob = Problem::new(
            vec![FeatureVector::dense(vec![1.0]), FeatureVector::dense(vec![2.0])],
            vec![4.0, 4.0],
        )
        .unwrap();
        let model = train(&prob, &seeded(SolverType::L2rL2LossSvcDual)).unwrap();
        assert_eq!(model.nr_class, 1);
        assert_eq!(model.nr_w(), 1);
        assert_eq!(model.predict(&FeatureVector::dense(vec![-3.0])), 4.0);
    }

    #[test]
    fn test_regression_skips_grouping() {
        let x: Vec<FeatureVector> = (0..10)
            .map(|k| FeatureVector::dense(vec![k as f64 / 5.0]))
            .collect();
        let y: Vec<f64> = (0..10).map(|k| 3.0 * k as f64 / 5.0 + 0.5).collect();
        let prob = Problem::new(x, y).unwrap().with_bias(1.0);

        for solver in [
            SolverType::L2rL2LossSvr,
            SolverType::L2rL2LossSvrDual,
            SolverType::L2rL1LossSvrDual,
        ] {
            let mut param = seeded(solver);
            param.c = 100.0;
            param.p = 0.01;
            param.eps = 1e-4;
            let model = train_with(&prob, &param, &TrustRegionNewton::default(), &SilentSink)
                .unwrap();
            assert_eq!(model.nr_class, 2);
            assert!(model.label.is_empty());
            let pred = model.predict(&FeatureVector::dense(vec![1.0]));
            assert!((pred - 3.5).abs() < 0.1, "solver {solver}: {pred}");
        }
    }

    #[test]
    fn test_primal_warm_start_is_used() {
        let prob = three_class_problem();
        let binary = Problem::new(
            prob.x[..6].to_vec(),
            prob.y[..6]
                .iter()
                .map(|&y| if y == 5.0 { 1.0 } else { -1.0 })
                .collect(),
        )
        .unwrap();
        let param = seeded(SolverType::L2rL2LossSvc);
        let cold = train(&binary, &param).unwrap();

        let warm_prob = binary.clone().with_primal_warm_start(cold.w.clone()).unwrap();
        let warm = train_with(&warm_prob, &param, &TrustRegionNewton::default(), &SilentSink)
            .unwrap();
        for (a, b) in cold.w.iter().zip(&warm.w) {
            assert!((a - b).abs() < 1e-3);
        }
    }
}
