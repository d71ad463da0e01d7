// src/query.rs

use anyhow::{bail, Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::compute::cast;
use arrow::compute::kernels::cmp::eq;
use arrow::datatypes::DataType;
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use serde::Deserialize;
use std::{
    fmt,
    fs::File,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Right-hand side of a `column = value` filter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl FilterValue {
    /// Finite numbers where the input parses as one, text otherwise.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => FilterValue::Number(n),
            _ => FilterValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// `SELECT COUNT(1) FROM <pattern> WHERE <column> = <equals>`
#[derive(Debug, Clone)]
pub struct CountQuery {
    pub pattern: String,
    pub column: String,
    pub equals: FilterValue,
}

impl CountQuery {
    /// Query every `*.parquet` directly under `data_dir`.
    pub fn for_dir(data_dir: &Path, column: impl Into<String>, equals: FilterValue) -> Self {
        Self {
            pattern: data_dir.join("*.parquet").to_string_lossy().into_owned(),
            column: column.into(),
            equals,
        }
    }

    #[instrument(level = "info", skip(self), fields(pattern = %self.pattern, filter = %self))]
    pub fn run(&self) -> Result<u64> {
        let mut files: Vec<PathBuf> = glob(&self.pattern)
            .with_context(|| format!("bad glob pattern {}", self.pattern))?
            .filter_map(Result::ok)
            .collect();
        files.sort();
        if files.is_empty() {
            bail!("no files match {}", self.pattern);
        }

        let mut total = 0u64;
        for path in &files {
            let n = self
                .count_file(path)
                .with_context(|| format!("querying {}", path.display()))?;
            debug!(file = %path.display(), matches = n, "scanned");
            total += n;
        }
        info!(files = files.len(), count = total, "query finished");
        Ok(total)
    }

    fn count_file(&self, path: &Path) -> Result<u64> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let idx = builder
            .schema()
            .index_of(&self.column)
            .with_context(|| format!("no column {:?}", self.column))?;
        let mask = ProjectionMask::roots(builder.parquet_schema(), [idx]);
        let reader = builder.with_projection(mask).build()?;

        let mut count = 0u64;
        for batch in reader {
            let batch = batch?;
            let column = batch.column(0);
            let matched = match &self.equals {
                FilterValue::Number(v) => {
                    let values = cast(column, &DataType::Float64)?;
                    eq(&values, &Float64Array::new_scalar(*v))?
                }
                FilterValue::Text(v) => {
                    let values = cast(column, &DataType::Utf8)?;
                    eq(&values, &StringArray::new_scalar(v.as_str()))?
                }
            };
            // nulls compare as null, never as true
            count += matched.true_count() as u64;
        }
        Ok(count)
    }
}

impl fmt::Display for CountQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.equals)
    }
}
