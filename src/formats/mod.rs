//! Instrument file formats
//!
//! Each format knows how to read a file header (columns and time coverage)
//! and a file body (timestamps and rows for a resolved column set). The
//! loader only talks to formats through the `FileFormat` trait.

pub mod str_file;
pub mod toa5;

pub use str_file::StrFormat;
pub use toa5::Toa5Format;

use crate::constants::toa5::{NAN_TOKENS, TIMESTAMP_FORMATS};
use crate::error::Result;
use crate::models::{ColumnDef, ColumnKind, FileBody, FileHeader, FileKind, TimeCoverage, Value};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt::Debug;
use std::io::BufRead;
use std::path::Path;

/// Header and body parsing for one file kind
pub trait FileFormat: Debug + Send + Sync {
    fn kind(&self) -> FileKind;

    /// Full-path pattern selecting this format's files during discovery
    fn default_name_filter(&self) -> &'static str;

    /// Read column definitions and time coverage without loading the body
    fn parse_header(&self, path: &Path) -> Result<FileHeader>;

    /// Time coverage alone; `None` for a file without records
    fn parse_coverage(&self, path: &Path) -> Result<Option<TimeCoverage>> {
        Ok(self.parse_header(path)?.coverage)
    }

    /// Read every record, producing one value per entry of `columns`.
    ///
    /// Columns this file does not carry come back as `Value::Null`.
    fn parse_body(&self, path: &Path, columns: &[ColumnDef]) -> Result<FileBody>;
}

/// Parser for a file kind
pub fn for_kind(kind: FileKind) -> Box<dyn FileFormat> {
    match kind {
        FileKind::Str => Box::new(StrFormat),
        FileKind::Toa5 => Box::new(Toa5Format),
    }
}

/// Rename repeated names so every column is addressable.
///
/// The second `X` becomes `X_2`, the third `X_3`, skipping any suffix that
/// is already taken by another column.
pub fn dedup_column_names(names: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = names.iter().cloned().collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        if seen.insert(name.as_str()) {
            out.push(name.clone());
            continue;
        }
        let mut n = 2;
        let renamed = loop {
            let candidate = format!("{}_{}", name, n);
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        taken.insert(renamed.clone());
        out.push(renamed);
    }

    out
}

/// For each resolved column, its position among a file's own columns
pub fn column_mapping(file_columns: &[ColumnDef], resolved: &[ColumnDef]) -> Vec<Option<usize>> {
    resolved
        .iter()
        .map(|col| file_columns.iter().position(|c| c.name == col.name))
        .collect()
}

/// Convert one raw token to a value of the requested kind.
///
/// Missing-value tokens become `Value::Null` for every kind but text.
pub fn parse_value(raw: &str, kind: ColumnKind) -> std::result::Result<Value, String> {
    let token = raw.trim();
    if kind != ColumnKind::Text && NAN_TOKENS.contains(&token) {
        return Ok(Value::Null);
    }

    match kind {
        ColumnKind::Text => Ok(Value::Text(token.to_string())),
        ColumnKind::Float => match token.to_ascii_uppercase().as_str() {
            "INF" | "+INF" => Ok(Value::Float(f64::INFINITY)),
            "-INF" => Ok(Value::Float(f64::NEG_INFINITY)),
            _ => token
                .parse::<f64>()
                .map(|v| if v.is_nan() { Value::Null } else { Value::Float(v) })
                .map_err(|_| format!("'{}' is not a number", token)),
        },
        ColumnKind::Integer => token
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("'{}' is not an integer", token)),
        ColumnKind::Timestamp => parse_timestamp(token)
            .map(Value::Time)
            .ok_or_else(|| format!("'{}' is not a timestamp", token)),
    }
}

/// Lines of a reader with line endings removed.
///
/// Bytes that are not UTF-8 (Latin-1 unit strings from older loggers, for
/// instance) are replaced rather than failing the read.
pub fn lossy_lines<R: BufRead>(reader: R) -> impl Iterator<Item = std::io::Result<String>> {
    reader.split(b'\n').map(|line| {
        line.map(|bytes| {
            String::from_utf8_lossy(&bytes)
                .trim_end_matches('\r')
                .to_string()
        })
    })
}

/// Parse a logger timestamp such as `2014-01-13 10:00:00` or `2014-01-13 10:00:00.5`
pub fn parse_timestamp(token: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(token.trim(), fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedup_column_names() {
        let renamed = dedup_column_names(&strings(&["T", "RH", "T", "T"]));
        assert_eq!(renamed, strings(&["T", "RH", "T_2", "T_3"]));
    }

    #[test]
    fn test_dedup_skips_existing_suffix() {
        let renamed = dedup_column_names(&strings(&["T", "T_2", "T"]));
        assert_eq!(renamed, strings(&["T", "T_2", "T_3"]));
    }

    #[test]
    fn test_column_mapping() {
        let file = vec![
            ColumnDef::new("a", ColumnKind::Float),
            ColumnDef::new("b", ColumnKind::Float),
        ];
        let resolved = vec![
            ColumnDef::new("b", ColumnKind::Float),
            ColumnDef::new("c", ColumnKind::Float),
        ];
        assert_eq!(column_mapping(&file, &resolved), vec![Some(1), None]);
    }

    #[test]
    fn test_parse_value_by_kind() {
        assert_eq!(parse_value("1.5", ColumnKind::Float), Ok(Value::Float(1.5)));
        assert_eq!(parse_value("NAN", ColumnKind::Float), Ok(Value::Null));
        assert_eq!(parse_value("", ColumnKind::Integer), Ok(Value::Null));
        assert_eq!(
            parse_value("-INF", ColumnKind::Float),
            Ok(Value::Float(f64::NEG_INFINITY))
        );
        assert_eq!(parse_value("42", ColumnKind::Integer), Ok(Value::Int(42)));
        assert_eq!(
            parse_value("NAN", ColumnKind::Text),
            Ok(Value::Text("NAN".to_string()))
        );
        assert!(parse_value("abc", ColumnKind::Float).is_err());
        assert!(parse_value("4.2", ColumnKind::Integer).is_err());
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2014, 1, 13)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2014-01-13 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2014-01-13 10:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2014-01-13 10:00:00.5"),
            Some(expected + chrono::Duration::milliseconds(500))
        );
        assert_eq!(parse_timestamp("13/01/2014"), None);
    }

    #[test]
    fn test_for_kind() {
        assert_eq!(for_kind(FileKind::Str).kind(), FileKind::Str);
        assert_eq!(for_kind(FileKind::Toa5).kind(), FileKind::Toa5);
    }

    #[test]
    fn test_lossy_lines() {
        let raw: &[u8] = b"SPEC: CH4\r\n\"\xB0C\",1\nlast";
        let lines: Vec<String> = lossy_lines(raw).map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["SPEC: CH4", "\"\u{FFFD}C\",1", "last"]);
    }
}
