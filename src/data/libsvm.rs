//! LibSVM format reader
//!
//! Each line holds a label followed by `index:value` pairs with one-based,
//! increasing indices:
//!
//! ```text
//! +1 1:0.5 3:1.2 7:0.8
//! 3 2:0.3 5:2.1
//! ```
//!
//! Labels are kept as written, so the same reader serves classification
//! and regression data.

use crate::core::{FeatureVector, LinearError, Problem, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Load a sparse problem from a LibSVM format file
pub fn load_problem<P: AsRef<Path>>(path: P) -> Result<Problem> {
    let file = File::open(path)?;
    read_problem(BufReader::new(file))
}

/// Read a sparse problem from any buffered reader
pub fn read_problem<R: BufRead>(reader: R) -> Result<Problem> {
    let mut x = Vec::new();
    let mut y = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (label, features) = parse_line(line).map_err(|e| {
            LinearError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
        })?;
        y.push(label);
        x.push(features);
    }

    if y.is_empty() {
        return Err(LinearError::EmptyDataset);
    }

    Problem::new(x, y)
}

/// Parse a single line into its label and zero-based sparse features
pub fn parse_line(line: &str) -> Result<(f64, FeatureVector)> {
    let mut parts = line.split_whitespace();

    let label_str = parts
        .next()
        .ok_or_else(|| LinearError::ParseError("Empty line".to_string()))?;
    let label = label_str
        .parse::<f64>()
        .map_err(|_| LinearError::ParseError(format!("Invalid label: {}", label_str)))?;

    let mut indices = Vec::new();
    let mut values = Vec::new();

    for feature_str in parts {
        let (index_str, value_str) = feature_str.split_once(':').ok_or_else(|| {
            LinearError::ParseError(format!("Invalid feature format: {}", feature_str))
        })?;

        let index = index_str.parse::<usize>().map_err(|_| {
            LinearError::ParseError(format!("Invalid feature index: {}", index_str))
        })?;
        let value = value_str.parse::<f64>().map_err(|_| {
            LinearError::ParseError(format!("Invalid feature value: {}", value_str))
        })?;

        if index == 0 {
            return Err(LinearError::ParseError(format!(
                "Feature index must be positive: {}",
                index
            )));
        }
        let zero_based = index - 1;
        if indices.last().is_some_and(|&prev| zero_based <= prev) {
            return Err(LinearError::ParseError(format!(
                "Feature indices must be increasing: {}",
                index
            )));
        }

        indices.push(zero_based);
        values.push(value);
    }

    Ok((label, FeatureVector::sparse(indices, values)))
}
