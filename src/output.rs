//! Writing loaded tables to disk.
//!
//! Converts a `TimeSeriesTable` to a polars frame and writes it as Parquet
//! or CSV, chosen by the output file extension.

use crate::error::{ReaderError, Result};
use crate::models::TimeSeriesTable;
use polars::prelude::{CsvWriter, ParquetCompression, ParquetWriter, SerWriter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    #[default]
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Parse a user supplied algorithm name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "snappy" => Some(Self::Snappy),
            "zstd" => Some(Self::Zstd),
            "lz4" => Some(Self::Lz4),
            "none" | "uncompressed" => Some(Self::Uncompressed),
            _ => None,
        }
    }

    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(self) -> ParquetCompression {
        match self {
            Self::Snappy => ParquetCompression::Snappy,
            Self::Zstd => ParquetCompression::Zstd(None),
            Self::Lz4 => ParquetCompression::Lz4Raw,
            Self::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// Output encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "parquet" | "pq" => Some(Self::Parquet),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Write a table as a Parquet file.
///
/// Returns the number of rows written.
pub fn write_parquet(
    table: &TimeSeriesTable,
    path: &Path,
    compression: CompressionAlgorithm,
) -> Result<usize> {
    let mut df = table.to_dataframe()?;
    let file = File::create(path)?;

    ParquetWriter::new(file)
        .with_compression(compression.to_polars_compression())
        .finish(&mut df)?;

    debug!(
        "Wrote {} rows to {} ({:?})",
        df.height(),
        path.display(),
        compression
    );
    Ok(df.height())
}

/// Write a table as CSV with a header row
pub fn write_csv(table: &TimeSeriesTable, path: &Path) -> Result<usize> {
    let mut df = table.to_dataframe()?;
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(df.height())
}

/// Write a table, picking the encoding from the file extension.
pub fn write_table(
    table: &TimeSeriesTable,
    path: &Path,
    compression: CompressionAlgorithm,
) -> Result<usize> {
    match OutputFormat::from_path(path) {
        Some(OutputFormat::Parquet) => write_parquet(table, path, compression),
        Some(OutputFormat::Csv) => write_csv(table, path),
        None => Err(ReaderError::configuration(format!(
            "unsupported output extension for {} (use .parquet or .csv)",
            path.display()
        ))),
    }
}
