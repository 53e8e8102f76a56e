//! Fitted preprocessing pipeline.
//!
//! The pipeline is a list of column transformers. Each one selects its
//! columns from the input frame, imputes nulls with the fitted fill values and
//! encodes or scales the result. Output columns are the transformers' outputs
//! concatenated in declaration order; columns no transformer selects (`id`
//! among them) are dropped.

use std::fs;
use std::path::Path;

use polars::frame::DataFrame;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{Result, ServiceError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnTransformer {
    OneHot {
        columns: Vec<String>,
        categories: Vec<Vec<String>>,
        fill_values: Vec<String>,
        #[serde(default)]
        drop_first: bool,
    },
    Ordinal {
        columns: Vec<String>,
        categories: Vec<Vec<f64>>,
        fill_values: Vec<f64>,
        unknown_value: f64,
    },
    Numeric {
        columns: Vec<String>,
        fill_values: Vec<f64>,
        scaler: Scaler,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub transformers: Vec<ColumnTransformer>,
}

fn check_len(what: &str, columns: &[String], len: usize) -> Result<()> {
    if columns.len() != len {
        return Err(ServiceError::InvalidArtifact(format!(
            "{} has {} entries for {} columns",
            what,
            len,
            columns.len()
        )));
    }
    Ok(())
}

fn numeric_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

impl ColumnTransformer {
    pub fn columns(&self) -> &[String] {
        match self {
            ColumnTransformer::OneHot { columns, .. }
            | ColumnTransformer::Ordinal { columns, .. }
            | ColumnTransformer::Numeric { columns, .. } => columns,
        }
    }

    /// Number of matrix columns this transformer emits.
    pub fn output_width(&self) -> usize {
        match self {
            ColumnTransformer::OneHot { categories, drop_first, .. } => categories
                .iter()
                .map(|c| if *drop_first { c.len().saturating_sub(1) } else { c.len() })
                .sum(),
            ColumnTransformer::Ordinal { columns, .. } => columns.len(),
            ColumnTransformer::Numeric { columns, .. } => columns.len(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            ColumnTransformer::OneHot { columns, categories, fill_values, .. } => {
                check_len("one_hot categories", columns, categories.len())?;
                check_len("one_hot fill_values", columns, fill_values.len())
            }
            ColumnTransformer::Ordinal { columns, categories, fill_values, .. } => {
                check_len("ordinal categories", columns, categories.len())?;
                check_len("ordinal fill_values", columns, fill_values.len())
            }
            ColumnTransformer::Numeric { columns, fill_values, scaler } => {
                check_len("numeric fill_values", columns, fill_values.len())?;
                match scaler {
                    Scaler::Standard { mean, scale } => {
                        check_len("standard mean", columns, mean.len())?;
                        check_len("standard scale", columns, scale.len())?;
                        if scale.iter().any(|s| *s == 0.0) {
                            return Err(ServiceError::InvalidArtifact(
                                "standard scaler has a zero scale".to_string(),
                            ));
                        }
                        Ok(())
                    }
                    Scaler::MinMax { min, scale } => {
                        check_len("min_max min", columns, min.len())?;
                        check_len("min_max scale", columns, scale.len())
                    }
                    Scaler::None => Ok(()),
                }
            }
        }
    }

    /// Appends the encoded output columns to `out`, one `Vec` per column.
    fn transform_into(&self, df: &DataFrame, out: &mut Vec<Vec<f64>>) -> PolarsResult<()> {
        match self {
            ColumnTransformer::OneHot { columns, categories, fill_values, drop_first } => {
                for ((name, cats), fill) in columns.iter().zip(categories).zip(fill_values) {
                    let series = df.column(name)?.cast(&DataType::Utf8)?;
                    let values: Vec<&str> = series
                        .utf8()?
                        .into_iter()
                        .map(|v| v.unwrap_or(fill.as_str()))
                        .collect();

                    let skip = usize::from(*drop_first && !cats.is_empty());
                    for category in cats.iter().skip(skip) {
                        out.push(
                            values
                                .iter()
                                .map(|v| if *v == category.as_str() { 1.0 } else { 0.0 })
                                .collect(),
                        );
                    }
                }
            }
            ColumnTransformer::Ordinal { columns, categories, fill_values, unknown_value } => {
                for ((name, cats), fill) in columns.iter().zip(categories).zip(fill_values) {
                    let encoded = numeric_column(df, name)?
                        .into_iter()
                        .map(|v| {
                            let v = v.unwrap_or(*fill);
                            cats.iter()
                                .position(|c| *c == v)
                                .map(|idx| idx as f64)
                                .unwrap_or(*unknown_value)
                        })
                        .collect();
                    out.push(encoded);
                }
            }
            ColumnTransformer::Numeric { columns, fill_values, scaler } => {
                for (idx, (name, fill)) in columns.iter().zip(fill_values).enumerate() {
                    let scaled = numeric_column(df, name)?
                        .into_iter()
                        .map(|v| {
                            let v = v.unwrap_or(*fill);
                            match scaler {
                                Scaler::Standard { mean, scale } => (v - mean[idx]) / scale[idx],
                                Scaler::MinMax { min, scale } => v * scale[idx] + min[idx],
                                Scaler::None => v,
                            }
                        })
                        .collect();
                    out.push(scaled);
                }
            }
        }
        Ok(())
    }
}

impl Preprocessor {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ServiceError::ArtifactIo {
            path: path.to_path_buf(),
            source,
        })?;
        let preprocessor: Preprocessor =
            serde_json::from_str(&raw).map_err(|source| ServiceError::ArtifactDecode {
                path: path.to_path_buf(),
                source,
            })?;
        preprocessor.validate()?;
        Ok(preprocessor)
    }

    pub fn validate(&self) -> Result<()> {
        if self.transformers.is_empty() {
            return Err(ServiceError::InvalidArtifact(
                "pipeline has no transformers".to_string(),
            ));
        }
        self.transformers.iter().try_for_each(ColumnTransformer::validate)
    }

    pub fn output_width(&self) -> usize {
        self.transformers.iter().map(ColumnTransformer::output_width).sum()
    }

    /// Transforms `df` into a row-per-subject feature matrix. Row order is
    /// the frame's row order.
    pub fn transform(&self, df: &DataFrame) -> Result<DenseMatrix<f64>> {
        let nrows = df.height();
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(self.output_width());
        for transformer in &self.transformers {
            transformer.transform_into(df, &mut columns)?;
        }

        let ncols = columns.len();
        let values: Vec<f64> = columns.into_iter().flatten().collect();
        Ok(DenseMatrix::new(nrows, ncols, values, true))
    }
}
