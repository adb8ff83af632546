//! rlinear Command Line Interface
//!
//! Train linear classifiers and regressors on LibSVM format data, predict
//! with saved models and inspect model files.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use rlinear::api::{EvaluationMetrics, Trainer};
use rlinear::core::{ClassWeight, LinearError, Problem, Result, SolverType};
use rlinear::data::load_problem;
use rlinear::persistence::{load_json, load_model, save_json, save_model};
use rlinear::Model;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "rlinear")]
#[command(about = "Large-scale linear classification and regression")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model, or cross-validate with -v
    Train(TrainArgs),
    /// Predict with a trained model
    Predict(PredictArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM format)
    data: PathBuf,

    /// Output model file; defaults to <data>.model
    model: Option<PathBuf>,

    /// Solver, by number or name (e.g. 0 or L2R_LR)
    #[arg(short = 's', long, default_value = "1", value_parser = parse_solver)]
    solver: SolverType,

    /// Cost parameter C
    #[arg(short = 'c', long, default_value = "1.0")]
    cost: f64,

    /// Stopping tolerance; defaults per solver
    #[arg(short = 'e', long)]
    eps: Option<f64>,

    /// Epsilon-insensitive band of the SVR loss
    #[arg(short = 'p', long, default_value = "0.1")]
    p: f64,

    /// Bias feature value; negative disables the bias term
    #[arg(short = 'B', long, default_value = "-1", allow_negative_numbers = true)]
    bias: f64,

    /// Class weight as LABEL:WEIGHT, may be repeated
    #[arg(
        short = 'w',
        long = "weight",
        value_parser = parse_class_weight,
        allow_hyphen_values = true
    )]
    weights: Vec<ClassWeight>,

    /// Run n-fold cross-validation instead of saving a model
    #[arg(short = 'v', long = "folds")]
    folds: Option<usize>,

    /// Iteration cap for the coordinate-descent solvers
    #[arg(long, default_value = "1000")]
    max_iterations: usize,

    /// Disable the shrinking heuristic
    #[arg(long)]
    no_shrinking: bool,

    /// Seed for reproducible coordinate order
    #[arg(long)]
    seed: Option<u64>,

    /// Store examples densely
    #[arg(long)]
    dense: bool,

    /// Save the model as JSON with metadata instead of the text format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PredictArgs {
    /// Test data file (LibSVM format)
    data: PathBuf,

    /// Trained model file (text format, or JSON when ending in .json)
    model: PathBuf,

    /// Output predictions file (prints to stdout if not specified)
    output: Option<PathBuf>,

    /// Output probability estimates (logistic regression models only)
    #[arg(short = 'b', long)]
    probability: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn parse_solver(s: &str) -> std::result::Result<SolverType, String> {
    match s.parse::<u32>() {
        Ok(code) => {
            SolverType::from_code(code).ok_or_else(|| format!("unknown solver number: {code}"))
        }
        Err(_) => s.parse::<SolverType>().map_err(|e| e.to_string()),
    }
}

fn parse_class_weight(s: &str) -> std::result::Result<ClassWeight, String> {
    let (label, weight) = s
        .split_once(':')
        .ok_or_else(|| format!("expected LABEL:WEIGHT, got '{s}'"))?;
    let label = label
        .parse::<i32>()
        .map_err(|_| format!("bad class label '{label}'"))?;
    let weight = weight
        .parse::<f64>()
        .map_err(|_| format!("bad class weight '{weight}'"))?;
    Ok(ClassWeight { label, weight })
}

fn trainer_from_args(args: &TrainArgs) -> Trainer {
    let mut trainer = Trainer::new(args.solver)
        .with_c(args.cost)
        .with_p(args.p)
        .with_bias(args.bias)
        .with_shrinking(!args.no_shrinking)
        .with_max_iterations(args.max_iterations);
    if let Some(eps) = args.eps {
        trainer = trainer.with_eps(eps);
    }
    if let Some(seed) = args.seed {
        trainer = trainer.with_seed(seed);
    }
    for cw in &args.weights {
        trainer = trainer.with_class_weight(cw.label, cw.weight);
    }
    trainer
}

fn load_data(path: &Path, dense: bool) -> Result<Problem> {
    info!("Loading data from: {path:?}");
    let prob = load_problem(path)?;
    info!("Loaded {} examples with {} features", prob.len(), prob.n);
    Ok(if dense { prob.to_dense() } else { prob })
}

fn train_command(args: TrainArgs) -> Result<()> {
    let trainer = trainer_from_args(&args);
    let param = trainer.parameter();
    info!(
        "Parameters: solver={}, C={}, eps={}, p={}, bias={}",
        param.solver_type, param.c, param.eps, param.p, args.bias
    );

    let prob = load_data(&args.data, args.dense)?;

    if let Some(folds) = args.folds {
        let target = trainer.cross_validate(&prob, folds)?;
        let metrics = EvaluationMetrics::compute(&prob.y, &target);
        if param.solver_type.is_regression() {
            println!(
                "Cross Validation Mean squared error = {}",
                metrics.mean_squared_error
            );
            println!(
                "Cross Validation Squared correlation coefficient = {}",
                metrics.squared_correlation
            );
        } else {
            println!(
                "Cross Validation Accuracy = {}%",
                100.0 * metrics.accuracy
            );
        }
        return Ok(());
    }

    let model = trainer.train(&prob)?;
    info!(
        "Training completed: {} classes, {} features",
        model.nr_class, model.nr_feature
    );

    let output = args
        .model
        .clone()
        .unwrap_or_else(|| default_model_path(&args.data));
    if args.json {
        save_json(&model, &output)?;
    } else {
        save_model(&model, &output)?;
    }
    info!("Model saved to: {output:?}");

    Ok(())
}

fn default_model_path(data: &Path) -> PathBuf {
    let mut name = data
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".model");
    PathBuf::from(name)
}

fn read_any_model(path: &Path) -> Result<Model> {
    info!("Loading model from: {path:?}");
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        Ok(load_json(path)?.model)
    } else {
        load_model(path)
    }
}

fn predict_command(args: PredictArgs) -> Result<()> {
    let model = read_any_model(&args.model)?;
    if args.probability && !model.is_probability_model() {
        return Err(LinearError::UnsupportedOperation(
            "probability output is only supported for logistic regression".to_string(),
        ));
    }

    let prob = load_data(&args.data, false)?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    if args.probability {
        let labels: Vec<String> = model.label.iter().map(i32::to_string).collect();
        writeln!(writer, "labels {}", labels.join(" "))?;
    }

    let mut predictions = Vec::with_capacity(prob.len());
    for xi in &prob.x {
        if args.probability {
            let (label, estimates) = model.predict_probability(xi)?;
            let estimates: Vec<String> = estimates.iter().map(|p| format!("{p}")).collect();
            writeln!(writer, "{label} {}", estimates.join(" "))?;
            predictions.push(label);
        } else {
            let label = model.predict(xi);
            writeln!(writer, "{label}")?;
            predictions.push(label);
        }
    }
    writer.flush()?;

    let metrics = EvaluationMetrics::compute(&prob.y, &predictions);
    if model.is_regression() {
        info!(
            "Mean squared error = {} (regression)",
            metrics.mean_squared_error
        );
        info!(
            "Squared correlation coefficient = {} (regression)",
            metrics.squared_correlation
        );
    } else {
        let correct = (metrics.accuracy * metrics.total as f64).round() as usize;
        info!(
            "Accuracy = {}% ({correct}/{})",
            100.0 * metrics.accuracy,
            metrics.total
        );
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    let model = read_any_model(&args.model)?;

    println!("=== Linear Model Summary ===");
    println!("Solver: {}", model.solver_type());
    println!("Classes: {}", model.nr_class);
    if !model.is_regression() {
        let labels: Vec<String> = model.label.iter().map(i32::to_string).collect();
        println!("Labels: {}", labels.join(" "));
    }
    println!("Features: {}", model.nr_feature);
    println!("Bias: {}", model.bias);
    println!("Weight columns: {}", model.nr_w());

    let nonzero = model.w.iter().filter(|&&v| v != 0.0).count();
    println!("Non-zero weights: {nonzero}/{}", model.w.len());

    Ok(())
}
