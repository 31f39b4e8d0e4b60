//! Core data structures shared by discovery, parsing and loading.
//!
//! Defines the supported file kinds, column definitions, per-file time
//! coverage, parsed values and the merged time series table.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Instrument file kinds supported by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    /// Aerodyne TDLWintel stream file, named by its start instant
    Str,
    /// Campbell Scientific TOA5 datalogger table
    Toa5,
}

impl FileKind {
    /// Detect file kind from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "str" => Some(FileKind::Str),
            "dat" => Some(FileKind::Toa5),
            _ => None,
        }
    }

    /// Parse a user supplied kind name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "str" | "tdl" | "tdlwintel" => Some(FileKind::Str),
            "toa5" | "dat" | "campbell" => Some(FileKind::Toa5),
            _ => None,
        }
    }
}

/// Value type of a parsed column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Timestamp,
    Integer,
    Float,
    Text,
}

/// A named, typed column discovered in a file header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    pub units: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            units: None,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        let units = units.into();
        self.units = if units.is_empty() { None } else { Some(units) };
        self
    }
}

/// Time span of the records a file contributes.
///
/// Point-in-time files (STR) have `min_time == max_time`. TOA5 files whose
/// last record could not be read carry `max_time: None` until it is inferred
/// from the next file in time order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCoverage {
    pub min_time: NaiveDateTime,
    pub max_time: Option<NaiveDateTime>,
}

impl TimeCoverage {
    pub fn point(instant: NaiveDateTime) -> Self {
        Self {
            min_time: instant,
            max_time: Some(instant),
        }
    }

    pub fn span(min_time: NaiveDateTime, max_time: Option<NaiveDateTime>) -> Self {
        Self { min_time, max_time }
    }

    /// Upper end of the span, falling back to the start when unknown
    pub fn end(&self) -> NaiveDateTime {
        self.max_time.unwrap_or(self.min_time)
    }
}

/// A candidate file paired with its coverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    pub path: PathBuf,
    pub coverage: TimeCoverage,
}

/// Result of reading a file header
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub columns: Vec<ColumnDef>,
    /// `None` when the file holds a header but no records
    pub coverage: Option<TimeCoverage>,
}

/// A single parsed cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Time(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

pub type Row = Vec<Value>;

/// Rows read from one file, in resolved column order
#[derive(Debug, Clone, Default)]
pub struct FileBody {
    pub timestamps: Vec<NaiveDateTime>,
    pub rows: Vec<Row>,
}

impl FileBody {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// A directory that could not be listed during traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDiagnostic {
    pub path: PathBuf,
    pub message: String,
}

/// Merged, time ordered result of a load.
///
/// Every row has exactly `columns.len()` values and there is one timestamp
/// per row.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    pub time_column: String,
    pub columns: Vec<ColumnDef>,
    pub timestamps: Vec<NaiveDateTime>,
    pub rows: Vec<Row>,
}

impl TimeSeriesTable {
    pub fn empty(time_column: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            time_column: time_column.into(),
            columns,
            timestamps: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// All values of one column, top to bottom
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// First and last timestamp, if any rows are present
    pub fn coverage(&self) -> Option<TimeCoverage> {
        let first = *self.timestamps.first()?;
        let last = self.timestamps.last().copied();
        Some(TimeCoverage::span(first, last))
    }

    /// Convert to a polars frame with the time column first
    pub fn to_dataframe(&self) -> crate::error::Result<polars::prelude::DataFrame> {
        crate::schema::build_dataframe(self)
    }
}
