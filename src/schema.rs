//! Column selection and output schema.
//!
//! Resolves a caller's column request against the headers of the files
//! about to be loaded, once per call, and maps the merged table onto a
//! polars `DataFrame`.

use crate::error::{ReaderError, Result};
use crate::models::{ColumnDef, ColumnKind, TimeSeriesTable, Value};
use polars::prelude::*;
use regex::Regex;
use tracing::{debug, warn};

/// Which columns a load should return
#[derive(Debug, Clone, Default)]
pub enum ColumnSpec {
    /// Every column of every selected file
    #[default]
    All,
    /// Exactly these columns, in this order
    ByName(Vec<String>),
    /// Every column whose name matches
    ByPattern(Regex),
}

impl ColumnSpec {
    pub fn by_name<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnSpec::ByName(names.into_iter().map(Into::into).collect())
    }

    pub fn by_pattern(pattern: &str) -> Result<Self> {
        Ok(ColumnSpec::ByPattern(Regex::new(pattern)?))
    }

    /// Parse a command-line column request.
    ///
    /// `""` and `"*"` select everything, `/re/` selects by pattern and
    /// anything else is a comma separated list of names.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() || spec == "*" {
            return Ok(ColumnSpec::All);
        }
        if let Some(pattern) = spec.strip_prefix('/').and_then(|s| s.strip_suffix('/')) {
            return Self::by_pattern(pattern);
        }
        let names: Vec<String> = spec
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            return Err(ReaderError::configuration(format!(
                "no column names in '{}'",
                spec
            )));
        }
        Ok(ColumnSpec::ByName(names))
    }
}

/// Common kind for a column that appears with different kinds in different files
fn widen(a: ColumnKind, b: ColumnKind) -> ColumnKind {
    use ColumnKind::*;
    match (a, b) {
        (a, b) if a == b => a,
        (Integer, Float) | (Float, Integer) => Float,
        _ => Text,
    }
}

/// Union of the given headers' columns, first seen order
pub fn union_columns<'a, I>(headers: I) -> Vec<ColumnDef>
where
    I: IntoIterator<Item = &'a [ColumnDef]>,
{
    let mut union: Vec<ColumnDef> = Vec::new();
    for columns in headers {
        for col in columns {
            match union.iter_mut().find(|c| c.name == col.name) {
                Some(existing) => existing.kind = widen(existing.kind, col.kind),
                None => union.push(col.clone()),
            }
        }
    }
    union
}

/// Resolve a column request against the available columns.
///
/// Requested names that no file carries are dropped with a warning, as is a
/// column named like the output time column. A name requested twice is
/// returned once.
pub fn resolve_columns(available: &[ColumnDef], spec: &ColumnSpec, time_column: &str) -> Vec<ColumnDef> {
    let candidates: Vec<ColumnDef> = match spec {
        ColumnSpec::All => available.to_vec(),
        ColumnSpec::ByPattern(re) => available
            .iter()
            .filter(|c| re.is_match(&c.name))
            .cloned()
            .collect(),
        ColumnSpec::ByName(names) => names
            .iter()
            .filter_map(|name| {
                let found = available.iter().find(|c| &c.name == name).cloned();
                if found.is_none() {
                    warn!("Requested column '{}' not found in any selected file", name);
                }
                found
            })
            .collect(),
    };

    let mut resolved: Vec<ColumnDef> = Vec::with_capacity(candidates.len());
    for col in candidates {
        if col.name == time_column {
            warn!(
                "Column '{}' has the same name as the time column and is left out",
                col.name
            );
        } else if !resolved.iter().any(|c| c.name == col.name) {
            resolved.push(col);
        }
    }

    debug!(
        "Resolved {} of {} available columns",
        resolved.len(),
        available.len()
    );
    resolved
}

/// polars type used for a column kind
pub fn polars_dtype(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Timestamp => DataType::Datetime(TimeUnit::Milliseconds, None),
        ColumnKind::Integer => DataType::Int64,
        ColumnKind::Float => DataType::Float64,
        ColumnKind::Text => DataType::String,
    }
}

fn datetime_column(name: &str, values: Vec<Option<chrono::NaiveDateTime>>) -> Column {
    DatetimeChunked::from_naive_datetime_options(name.into(), values, TimeUnit::Milliseconds)
        .into_series()
        .into()
}

/// Build a `DataFrame` holding the time column followed by every table column
pub fn build_dataframe(table: &TimeSeriesTable) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(table.columns.len() + 1);
    columns.push(datetime_column(
        &table.time_column,
        table.timestamps.iter().copied().map(Some).collect(),
    ));

    for (idx, def) in table.columns.iter().enumerate() {
        let cells = table.rows.iter().map(|row| &row[idx]);
        let name: PlSmallStr = def.name.as_str().into();
        let column = match def.kind {
            ColumnKind::Float => {
                let values: Vec<Option<f64>> = cells.map(Value::as_f64).collect();
                Column::new(name, values)
            }
            ColumnKind::Integer => {
                let values: Vec<Option<i64>> = cells
                    .map(|v| match v {
                        Value::Int(i) => Some(*i),
                        _ => None,
                    })
                    .collect();
                Column::new(name, values)
            }
            ColumnKind::Text => {
                let values: Vec<Option<String>> = cells
                    .map(|v| match v {
                        Value::Text(s) => Some(s.clone()),
                        Value::Null => None,
                        Value::Int(i) => Some(i.to_string()),
                        Value::Float(f) => Some(f.to_string()),
                        Value::Time(t) => Some(t.to_string()),
                    })
                    .collect();
                Column::new(name, values)
            }
            ColumnKind::Timestamp => {
                let values = cells
                    .map(|v| match v {
                        Value::Time(t) => Some(*t),
                        _ => None,
                    })
                    .collect();
                datetime_column(&def.name, values)
            }
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}
