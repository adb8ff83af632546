//! Model serialization and persistence
//!
//! Models are stored in the LIBLINEAR text format, readable by other
//! LIBLINEAR-compatible tools, or as JSON with a metadata envelope.

use crate::core::{LinearError, Parameter, Result, SolverType};
use crate::model::Model;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Write `model` in the text format.
///
/// Weights are printed with the shortest representation that reads back to
/// the same `f64`, so a save/load cycle is lossless.
pub fn write_model<W: Write>(model: &Model, mut writer: W) -> Result<()> {
    let nr_w = model.nr_w();

    writeln!(writer, "solver_type {}", model.solver_type())?;
    writeln!(writer, "nr_class {}", model.nr_class)?;
    if !model.is_regression() {
        let labels: Vec<String> = model.label.iter().map(i32::to_string).collect();
        writeln!(writer, "label {}", labels.join(" "))?;
    }
    writeln!(writer, "nr_feature {}", model.nr_feature)?;
    writeln!(writer, "bias {}", model.bias)?;
    writeln!(writer, "w")?;
    for row in model.w.chunks(nr_w).take(model.w_size()) {
        let values: Vec<String> = row.iter().map(f64::to_string).collect();
        writeln!(writer, "{}", values.join(" "))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a model in the text format
pub fn read_model<R: BufRead>(reader: R) -> Result<Model> {
    let mut solver_type = None;
    let mut nr_class = None;
    let mut nr_feature = None;
    let mut bias = None;
    let mut label = Vec::new();

    let mut lines = reader.lines().enumerate();
    let mut saw_w = false;
    for (line_no, line) in lines.by_ref() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else {
            continue;
        };
        let line_no = line_no + 1;
        match key {
            "solver_type" => {
                let name = next_token(&mut tokens, key, line_no)?;
                solver_type = Some(name.parse::<SolverType>()?);
            }
            "nr_class" => nr_class = Some(parse_value::<usize>(&mut tokens, key, line_no)?),
            "nr_feature" => nr_feature = Some(parse_value::<usize>(&mut tokens, key, line_no)?),
            "bias" => bias = Some(parse_value::<f64>(&mut tokens, key, line_no)?),
            "label" => {
                label = tokens
                    .map(|t| {
                        t.parse::<i32>().map_err(|_| {
                            LinearError::ParseError(format!("line {line_no}: bad label '{t}'"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
            }
            "w" => {
                saw_w = true;
                break;
            }
            other => {
                return Err(LinearError::ParseError(format!(
                    "line {line_no}: unknown text in model file: '{other}'"
                )));
            }
        }
    }

    let missing = |what: &str| LinearError::ParseError(format!("model file has no {what}"));
    if !saw_w {
        return Err(missing("weight section"));
    }
    let solver_type = solver_type.ok_or_else(|| missing("solver_type"))?;
    let nr_class = nr_class.ok_or_else(|| missing("nr_class"))?;
    let nr_feature = nr_feature.ok_or_else(|| missing("nr_feature"))?;
    let bias = bias.ok_or_else(|| missing("bias"))?;

    if !solver_type.is_regression() && label.len() != nr_class {
        return Err(LinearError::ParseError(format!(
            "expected {nr_class} labels, found {}",
            label.len()
        )));
    }

    let mut model = Model {
        param: Parameter::new(solver_type),
        nr_class,
        nr_feature,
        w: Vec::new(),
        label,
        bias,
        alphas: Vec::new(),
        n_examples: 0,
    };

    let expected = expected_weights(&model)?;
    let mut w = Vec::new();
    for (line_no, line) in lines {
        let line = line?;
        for token in line.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| {
                LinearError::ParseError(format!("line {}: bad weight '{token}'", line_no + 1))
            })?;
            w.push(value);
            if w.len() > expected {
                return Err(LinearError::ParseError(format!(
                    "line {}: more than {expected} weights",
                    line_no + 1
                )));
            }
        }
    }
    if w.len() != expected {
        return Err(LinearError::ParseError(format!(
            "expected {expected} weights, found {}",
            w.len()
        )));
    }
    model.w = w;
    Ok(model)
}

/// Number of weights a model with this header must carry.
///
/// Classification models need at least one class and regression models
/// always have two; the bias must be a finite number.
fn expected_weights(model: &Model) -> Result<usize> {
    let solver_type = model.solver_type();
    if solver_type.is_regression() {
        if model.nr_class != 2 {
            return Err(LinearError::ParseError(format!(
                "regression model must have nr_class 2, found {}",
                model.nr_class
            )));
        }
    } else if model.nr_class == 0 {
        return Err(LinearError::ParseError(
            "classification model has no classes".to_string(),
        ));
    }
    if !model.bias.is_finite() {
        return Err(LinearError::ParseError(format!(
            "bias must be finite, found {}",
            model.bias
        )));
    }

    let rows = if model.bias >= 0.0 {
        model.nr_feature.checked_add(1)
    } else {
        Some(model.nr_feature)
    };
    rows.and_then(|rows| rows.checked_mul(model.nr_w()))
        .ok_or_else(|| {
            LinearError::ParseError(format!("nr_feature {} is too large", model.nr_feature))
        })
}

fn next_token<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    key: &str,
    line_no: usize,
) -> Result<&'a str> {
    tokens
        .next()
        .ok_or_else(|| LinearError::ParseError(format!("line {line_no}: {key} has no value")))
}

fn parse_value<'a, T: std::str::FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    key: &str,
    line_no: usize,
) -> Result<T> {
    let token = next_token(tokens, key, line_no)?;
    token
        .parse()
        .map_err(|_| LinearError::ParseError(format!("line {line_no}: bad {key} '{token}'")))
}

/// Save a model to `path` in the text format
pub fn save_model<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let file = File::create(path)?;
    write_model(model, BufWriter::new(file))
}

/// Load a model from a text-format file
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    let file = File::open(path)?;
    read_model(BufReader::new(file))
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// JSON file layout: metadata plus the full model, training parameters and
/// dual variables included
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEnvelope {
    pub metadata: ModelMetadata,
    pub model: Model,
}

impl ModelEnvelope {
    pub fn new(model: Model) -> Self {
        Self {
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            model,
        }
    }
}

/// Save a model to `path` as JSON
pub fn save_json<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &ModelEnvelope::new(model.clone()))
        .map_err(|e| LinearError::SerializationError(e.to_string()))?;
    Ok(())
}

/// Load a JSON model, returning it with its metadata
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<ModelEnvelope> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let envelope: ModelEnvelope = serde_json::from_reader(reader)
        .map_err(|e| LinearError::SerializationError(e.to_string()))?;
    let expected = expected_weights(&envelope.model)?;
    if envelope.model.w.len() != expected {
        return Err(LinearError::ParseError(format!(
            "expected {expected} weights, found {}",
            envelope.model.w.len()
        )));
    }
    if !envelope.model.is_regression() && envelope.model.label.len() != envelope.model.nr_class {
        return Err(LinearError::ParseError(format!(
            "expected {} labels, found {}",
            envelope.model.nr_class,
            envelope.model.label.len()
        )));
    }
    Ok(envelope)
}
