//! Instrument Reader Library
//!
//! Locates Campbell Scientific TOA5 datalogger tables and Aerodyne TDLWintel
//! STR stream files and loads the records inside a time window into one
//! time-ordered table.
//!
//! This library provides tools for:
//! - Walking directory trees level by level to a bounded depth
//! - Reading per-file time coverage from headers and file names
//! - Selecting only the files whose coverage meets a time window
//! - Merging file bodies into a single table trimmed to the window
//! - Converting tables to polars DataFrames and writing Parquet or CSV

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod formats;
pub mod loader;
pub mod models;
pub mod output;
pub mod schema;

// Re-export commonly used types
pub use config::LoaderConfig;
pub use error::{ReaderError, Result};
pub use formats::FileFormat;
pub use loader::discovery::{DirectoryWalker, WalkResult};
pub use loader::{LoadOutcome, Source, TimeRangeLoader, load_range};
pub use models::{
    ColumnDef, ColumnKind, FileCoverage, FileKind, ListDiagnostic, TimeCoverage, TimeSeriesTable,
    Value,
};
pub use output::{CompressionAlgorithm, write_csv, write_parquet, write_table};
pub use schema::ColumnSpec;
