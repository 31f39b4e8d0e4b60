//! Aerodyne TDLWintel STR stream file parsing.
//!
//! STR files are named after the instant recording started, e.g.
//! `A_140113_100000.str`, and that instant is the file's coverage. The first
//! line lists the species, the rest are whitespace separated records whose
//! first token counts seconds since 1904-01-01.

use super::{FileFormat, column_mapping, dedup_column_names, lossy_lines, parse_value};
use crate::constants::STR_NAME_FILTER;
use crate::constants::str_file::{
    EPOCH_YEAR, FILENAME_STAMP_FORMAT, FILENAME_STAMP_PATTERN, SPECIES_MARKER,
};
use crate::error::{ReaderError, Result};
use crate::models::{ColumnDef, ColumnKind, FileBody, FileHeader, FileKind, TimeCoverage, Value};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// STR parser
#[derive(Debug, Clone, Copy, Default)]
pub struct StrFormat;

fn stamp_regex() -> &'static Regex {
    static STAMP: OnceLock<Regex> = OnceLock::new();
    STAMP.get_or_init(|| Regex::new(FILENAME_STAMP_PATTERN).expect("valid stamp pattern"))
}

/// Start instant encoded in an STR file name
pub fn filename_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let stem = path.file_stem()?.to_string_lossy();
    stamp_regex()
        .captures_iter(&stem)
        .filter_map(|caps| {
            NaiveDateTime::parse_from_str(&caps[1], FILENAME_STAMP_FORMAT).ok()
        })
        .last()
}

/// Convert a TDLWintel time value to a timestamp, to the millisecond
pub fn tdl_seconds_to_datetime(seconds: f64) -> Option<NaiveDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(EPOCH_YEAR, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let millis = (seconds * 1000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

fn read_species(path: &Path) -> Result<Vec<ColumnDef>> {
    let reader = BufReader::new(File::open(path)?);
    let first = lossy_lines(reader).next().transpose()?.unwrap_or_default();

    let species = first
        .trim()
        .strip_prefix(SPECIES_MARKER)
        .ok_or_else(|| ReaderError::header(path, format!("missing '{}' line", SPECIES_MARKER)))?;

    let names: Vec<String> = species
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return Err(ReaderError::header(path, "no species listed"));
    }

    Ok(dedup_column_names(&names)
        .into_iter()
        .map(|name| ColumnDef::new(name, ColumnKind::Float))
        .collect())
}

impl FileFormat for StrFormat {
    fn kind(&self) -> FileKind {
        FileKind::Str
    }

    fn default_name_filter(&self) -> &'static str {
        STR_NAME_FILTER
    }

    fn parse_header(&self, path: &Path) -> Result<FileHeader> {
        let start = filename_timestamp(path).ok_or_else(|| {
            ReaderError::header(path, "file name carries no YYMMDD_HHMMSS timestamp")
        })?;
        let columns = read_species(path)?;

        Ok(FileHeader {
            columns,
            coverage: Some(TimeCoverage::point(start)),
        })
    }

    /// Coverage comes from the file name alone; the content is not opened
    fn parse_coverage(&self, path: &Path) -> Result<Option<TimeCoverage>> {
        filename_timestamp(path)
            .map(|start| Some(TimeCoverage::point(start)))
            .ok_or_else(|| ReaderError::header(path, "file name carries no YYMMDD_HHMMSS timestamp"))
    }

    fn parse_body(&self, path: &Path, columns: &[ColumnDef]) -> Result<FileBody> {
        let species = read_species(path)?;
        let mapping = column_mapping(&species, columns);

        let reader = BufReader::new(File::open(path)?);
        let mut body = FileBody::default();

        for (idx, line) in lossy_lines(reader).enumerate().skip(1) {
            let line_no = idx + 1;
            let line = line?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() < species.len() + 1 {
                return Err(ReaderError::body(
                    path,
                    line_no,
                    format!(
                        "expected {} values, found {}",
                        species.len() + 1,
                        tokens.len()
                    ),
                ));
            }

            let timestamp = tokens[0]
                .parse::<f64>()
                .ok()
                .and_then(tdl_seconds_to_datetime)
                .ok_or_else(|| {
                    ReaderError::body(path, line_no, format!("invalid time '{}'", tokens[0]))
                })?;

            let row = columns
                .iter()
                .zip(&mapping)
                .map(|(col, idx)| match idx {
                    Some(i) => parse_value(tokens[i + 1], col.kind).map_err(|reason| {
                        ReaderError::body(path, line_no, format!("{}: {}", col.name, reason))
                    }),
                    None => Ok(Value::Null),
                })
                .collect::<Result<Vec<Value>>>()?;

            body.timestamps.push(timestamp);
            body.rows.push(row);
        }

        debug!("Read {} records from {}", body.len(), path.display());
        Ok(body)
    }
}
