//! k-fold cross-validation

use crate::core::{LinearError, LogSink, Parameter, Problem, ProgressSink, Result};
use crate::optimizer::TrustRegionNewton;
use crate::train::{check_parameter, train_with};
use log::Level;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Predict every example with a model trained on the other folds.
///
/// Examples are shuffled once and split into `nr_fold` contiguous folds;
/// fold `i` covers positions `i*l/nr_fold .. (i+1)*l/nr_fold`. The returned
/// vector holds one prediction per example in original order.
pub fn cross_validation(prob: &Problem, param: &Parameter, nr_fold: usize) -> Result<Vec<f64>> {
    cross_validation_with(prob, param, nr_fold, &LogSink)
}

pub fn cross_validation_with(
    prob: &Problem,
    param: &Parameter,
    nr_fold: usize,
    sink: &dyn ProgressSink,
) -> Result<Vec<f64>> {
    if nr_fold < 2 {
        return Err(LinearError::InvalidParameter(format!(
            "cross-validation needs at least 2 folds, got {nr_fold}"
        )));
    }
    check_parameter(prob, param)?;

    let l = prob.len();
    let nr_fold = if nr_fold > l {
        sink.emit(
            Level::Warn,
            &format!("# folds ({nr_fold}) > # data ({l}); using {l} folds (leave-one-out)"),
        );
        l
    } else {
        nr_fold
    };

    let mut rng = match param.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut perm: Vec<usize> = (0..l).collect();
    for i in 0..l {
        let j = rng.gen_range(i..l);
        perm.swap(i, j);
    }
    let fold_start: Vec<usize> = (0..=nr_fold).map(|i| i * l / nr_fold).collect();

    let optimizer = TrustRegionNewton::default();
    let mut target = vec![0.0; l];
    for i in 0..nr_fold {
        let (begin, end) = (fold_start[i], fold_start[i + 1]);
        let train_idx: Vec<usize> = perm[..begin]
            .iter()
            .chain(&perm[end..])
            .copied()
            .collect();

        let fold = subset(prob, &train_idx);
        sink.emit(
            Level::Debug,
            &format!("fold {}: training on {} examples", i + 1, fold.len()),
        );
        let model = train_with(&fold, param, &optimizer, sink)?;
        for &k in &perm[begin..end] {
            target[k] = model.predict(&prob.x[k]);
        }
    }
    Ok(target)
}

/// Copy of `prob` restricted to the examples in `idx`
fn subset(prob: &Problem, idx: &[usize]) -> Problem {
    Problem {
        n: prob.n,
        x: idx.iter().map(|&i| prob.x[i].clone()).collect(),
        y: idx.iter().map(|&i| prob.y[i]).collect(),
        instance_weights: idx.iter().map(|&i| prob.instance_weights[i]).collect(),
        alpha_init: idx.iter().map(|&i| prob.alpha_init[i]).collect(),
        w_init: prob.w_init.clone(),
        bias: prob.bias,
    }
}
