//! Integration tests for the rlinear library
//!
//! These tests run the full pipeline: load data, train, save, reload and
//! predict, across every trainable solver.

use rlinear::api::{evaluate, evaluate_file, Trainer};
use rlinear::persistence::{load_json, save_json};
use rlinear::{
    load_model, load_problem, save_model, train, FeatureVector, LinearError, Parameter, Problem,
    SolverType,
};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const CLASSIFIERS: [SolverType; 6] = [
    SolverType::L2rLr,
    SolverType::L2rL2LossSvcDual,
    SolverType::L2rL2LossSvc,
    SolverType::L2rL1LossSvcDual,
    SolverType::L1rL2LossSvc,
    SolverType::L1rLr,
];

const REGRESSORS: [SolverType; 3] = [
    SolverType::L2rL2LossSvr,
    SolverType::L2rL2LossSvrDual,
    SolverType::L2rL1LossSvrDual,
];

fn write_libsvm(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    for line in lines {
        writeln!(file, "{line}").expect("Failed to write");
    }
    file.flush().expect("Failed to flush");
    file
}

fn separable_file() -> NamedTempFile {
    write_libsvm(&[
        "+1 1:2.0 2:1.0",
        "+1 1:1.8 2:1.1",
        "+1 1:2.2 2:0.9",
        "-1 1:-2.0 2:-1.0",
        "-1 1:-1.8 2:-1.1",
        "-1 1:-2.2 2:-0.9",
    ])
}

/// Three well separated classes with labels that are not 0..k
fn three_class_problem() -> Problem {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for k in 0..6 {
        let t = k as f64 * 0.1;
        x.push(FeatureVector::sparse(vec![0, 1], vec![4.0 + t, 0.0 - t]));
        y.push(10.0);
        x.push(FeatureVector::sparse(vec![0, 2], vec![-4.0 - t, 4.0 + t]));
        y.push(-3.0);
        x.push(FeatureVector::sparse(vec![1, 2], vec![4.0 + t, -4.0 + t]));
        y.push(7.0);
    }
    Problem::new(x, y).unwrap()
}

#[test]
fn test_complete_workflow_libsvm() {
    let file = separable_file();
    let temp_dir = TempDir::new().unwrap();

    for solver in CLASSIFIERS {
        let model = Trainer::new(solver)
            .with_bias(1.0)
            .with_seed(11)
            .train_from_file(file.path())
            .unwrap_or_else(|e| panic!("{solver} failed to train: {e}"));

        let metrics = evaluate_file(&model, file.path()).unwrap();
        assert_eq!(metrics.accuracy, 1.0, "{solver} misclassified training data");

        let model_path = temp_dir.path().join(format!("{solver}.model"));
        save_model(&model, &model_path).unwrap();
        let loaded = load_model(&model_path).unwrap();

        assert_eq!(loaded.label, model.label);
        assert_eq!(loaded.w, model.w);
        let prob = load_problem(file.path()).unwrap();
        for xi in &prob.x {
            assert_eq!(loaded.predict(xi), model.predict(xi));
        }
    }
}

#[test]
fn test_multiclass_one_vs_rest() {
    let prob = three_class_problem();
    for solver in CLASSIFIERS {
        let model = Trainer::new(solver)
            .with_bias(1.0)
            .with_seed(5)
            .train(&prob)
            .unwrap();

        assert_eq!(model.nr_class, 3, "{solver}");
        assert_eq!(model.label, vec![10, -3, 7], "{solver}");
        assert_eq!(model.nr_w(), 3);
        assert_eq!(model.w.len(), (3 + 1) * 3);

        let metrics = evaluate(&model, &prob.x, &prob.y);
        assert_eq!(metrics.accuracy, 1.0, "{solver}");
    }
}

#[test]
fn test_regression_workflow() {
    // y = 2*x1 - x2 + 1
    let mut lines = Vec::new();
    for i in 0..20 {
        let x1 = (i % 5) as f64 * 0.5;
        let x2 = (i / 5) as f64 * 0.25;
        lines.push(format!("{} 1:{x1} 2:{x2}", 2.0 * x1 - x2 + 1.0));
    }
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let file = write_libsvm(&refs);

    for solver in REGRESSORS {
        let model = Trainer::new(solver)
            .with_c(100.0)
            .with_p(0.0)
            .with_eps(1e-5)
            .with_bias(1.0)
            .with_seed(2)
            .train_from_file(file.path())
            .unwrap();

        assert!(model.is_regression());
        assert!(model.label.is_empty());
        let metrics = evaluate_file(&model, file.path()).unwrap();
        assert!(
            metrics.mean_squared_error < 1e-2,
            "{solver}: mse {}",
            metrics.mean_squared_error
        );
        assert!(metrics.squared_correlation > 0.99, "{solver}");
    }
}

#[test]
fn test_probability_estimates() {
    let prob = three_class_problem();
    let model = Trainer::new(SolverType::L2rLr)
        .with_bias(1.0)
        .with_seed(1)
        .train(&prob)
        .unwrap();

    for (xi, &yi) in prob.x.iter().zip(&prob.y) {
        let (label, estimates) = model.predict_probability(xi).unwrap();
        assert_eq!(label, yi);
        assert!((estimates.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        let best = model.label.iter().position(|&l| l as f64 == label).unwrap();
        assert!(estimates.iter().all(|&p| p <= estimates[best]));
    }

    let svm = Trainer::new(SolverType::L2rL2LossSvcDual)
        .with_seed(1)
        .train(&prob)
        .unwrap();
    assert!(matches!(
        svm.predict_probability(&prob.x[0]),
        Err(LinearError::UnsupportedOperation(_))
    ));
}

#[test]
fn test_json_persistence_keeps_training_state() {
    let prob = three_class_problem();
    let model = Trainer::new(SolverType::L2rL1LossSvcDual)
        .with_c(0.5)
        .with_seed(3)
        .train(&prob)
        .unwrap();
    assert_eq!(model.alphas.len(), 3);
    assert!(model.alphas.iter().all(|a| a.len() == prob.len()));

    let file = NamedTempFile::new().unwrap();
    save_json(&model, file.path()).unwrap();
    let envelope = load_json(file.path()).unwrap();
    assert_eq!(envelope.model.param, model.param);
    assert_eq!(envelope.model.n_examples, prob.len());
    for xi in &prob.x {
        assert_eq!(envelope.model.predict(xi), model.predict(xi));
    }
}

#[test]
fn test_test_data_may_have_more_features() {
    let file = separable_file();
    let model = Trainer::new(SolverType::L2rL2LossSvcDual)
        .with_bias(1.0)
        .with_seed(1)
        .train_from_file(file.path())
        .unwrap();
    assert_eq!(model.nr_feature, 2);

    let wide = write_libsvm(&["+1 1:2.0 2:1.0 9:-100", "-1 1:-2.0 2:-1.0 5:100"]);
    let metrics = evaluate_file(&model, wide.path()).unwrap();
    assert_eq!(metrics.accuracy, 1.0);
}

#[test]
fn test_invalid_configurations_are_rejected() {
    let prob = load_problem(separable_file().path()).unwrap();

    let mut param = Parameter::new(SolverType::L2rLr);
    param.c = 0.0;
    assert!(matches!(
        train(&prob, &param),
        Err(LinearError::InvalidParameter(_))
    ));

    assert!(matches!(
        train(&prob, &Parameter::new(SolverType::McsvmCs)),
        Err(LinearError::UnsupportedSolver(_))
    ));
    assert!(matches!(
        train(&prob, &Parameter::new(SolverType::L2rLrDual)),
        Err(LinearError::UnsupportedSolver(_))
    ));
}

#[test]
fn test_malformed_data_file() {
    let file = write_libsvm(&["+1 1:2.0", "-1 3:1.0 2:4.0"]);
    assert!(matches!(
        load_problem(file.path()),
        Err(LinearError::ParseError(_))
    ));

    let empty = write_libsvm(&[]);
    assert!(matches!(
        load_problem(empty.path()),
        Err(LinearError::EmptyDataset)
    ));
}
