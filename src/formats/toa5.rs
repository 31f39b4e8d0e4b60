//! Campbell Scientific TOA5 table parsing.
//!
//! A TOA5 file opens with four quoted CSV header lines:
//!
//! ```text
//! "TOA5","Station","CR1000","1234","CR1000.Std.22","CPU:met.CR1","4242","Met"
//! "TIMESTAMP","RECORD","AirT_Avg","RH"
//! "TS","RN","Deg C","%"
//! "","","Avg","Smp"
//! "2014-01-13 10:00:00",0,1.23,45.6
//! ```
//!
//! The first `TS` column becomes the row timestamp; the remaining fields are
//! exposed as columns. Coverage comes from the first and last records.

use super::{FileFormat, column_mapping, dedup_column_names, parse_timestamp, parse_value};
use crate::constants::toa5::{FORMAT_MARKER, HEADER_LINES, NAN_TOKENS, RECORD_UNITS, TIMESTAMP_UNITS};
use crate::constants::TOA5_NAME_FILTER;
use crate::error::{ReaderError, Result};
use crate::models::{ColumnDef, ColumnKind, FileBody, FileHeader, FileKind, TimeCoverage, Value};
use chrono::NaiveDateTime;
use csv::ByteRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Bytes read from the end of a file when looking for the last record
const TAIL_BYTES: u64 = 8192;

/// TOA5 parser
#[derive(Debug, Clone, Copy, Default)]
pub struct Toa5Format;

/// Logger identification from the environment line
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Toa5Environment {
    pub station_name: String,
    pub logger_model: String,
    pub serial_number: String,
    pub os_version: String,
    pub program_name: String,
    pub program_signature: String,
    pub table_name: String,
}

/// One record with its 1-based line number
struct Record {
    line: usize,
    fields: Vec<String>,
}

/// Record-level reader over a TOA5 file
struct Toa5Reader<R: Read> {
    csv: csv::Reader<R>,
    buf: ByteRecord,
}

impl<R: Read> Toa5Reader<R> {
    fn new(source: R) -> Self {
        let csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(source);
        Self {
            csv,
            buf: ByteRecord::new(),
        }
    }

    /// Next non-empty record, with bytes that are not UTF-8 replaced
    fn next_record(&mut self, path: &Path) -> Result<Option<Record>> {
        loop {
            let more = self
                .csv
                .read_byte_record(&mut self.buf)
                .map_err(|e| csv_failure(path, e))?;
            if !more {
                return Ok(None);
            }
            let blank = self.buf.len() == 1 && self.buf[0].iter().all(u8::is_ascii_whitespace);
            if !blank {
                break;
            }
        }
        Ok(Some(Record {
            line: self.buf.position().map(|p| p.line() as usize).unwrap_or(0),
            fields: self
                .buf
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        }))
    }
}

fn csv_failure(path: &Path, error: csv::Error) -> ReaderError {
    let line = error.position().map(|p| p.line() as usize).unwrap_or(0);
    let reason = error.to_string();
    match error.into_kind() {
        csv::ErrorKind::Io(source) => ReaderError::Read {
            path: path.to_path_buf(),
            source,
        },
        _ => ReaderError::body(path, line, reason),
    }
}

/// Column layout of one file, as read from its header lines
#[derive(Debug, Clone)]
struct Layout {
    environment: Toa5Environment,
    /// Position of the row timestamp among the raw fields
    time_index: usize,
    /// Exposed columns with the raw field index each one reads
    columns: Vec<(usize, ColumnDef)>,
}

impl Layout {
    fn column_defs(&self) -> Vec<ColumnDef> {
        self.columns.iter().map(|(_, c)| c.clone()).collect()
    }

    fn field_count(&self) -> usize {
        self.columns.len() + 1
    }
}

fn read_header_records<R: Read>(path: &Path, reader: &mut Toa5Reader<R>) -> Result<Vec<Vec<String>>> {
    let mut header = Vec::with_capacity(HEADER_LINES);
    while header.len() < HEADER_LINES {
        match reader.next_record(path)? {
            Some(record) => header.push(record.fields),
            None => {
                return Err(ReaderError::header(
                    path,
                    format!("expected {} header lines, file ended after {}", HEADER_LINES, header.len()),
                ));
            }
        }
    }
    Ok(header)
}

fn parse_environment(path: &Path, fields: &[String]) -> Result<Toa5Environment> {
    let marker = fields.first().map(|f| f.trim()).unwrap_or_default();
    if marker != FORMAT_MARKER {
        return Err(ReaderError::header(
            path,
            format!("not a TOA5 file (first field is '{}')", marker),
        ));
    }

    let get = |i: usize| fields.get(i).cloned().unwrap_or_default();
    Ok(Toa5Environment {
        station_name: get(1),
        logger_model: get(2),
        serial_number: get(3),
        os_version: get(4),
        program_name: get(5),
        program_signature: get(6),
        table_name: get(7),
    })
}

/// Build the layout from the header records and, when present, the first data record
fn build_layout(path: &Path, header: &[Vec<String>], first_record: Option<&[String]>) -> Result<Layout> {
    let environment = parse_environment(path, &header[0])?;
    let raw_names: Vec<String> = header[1].iter().map(|f| f.trim().to_string()).collect();
    let names = dedup_column_names(&raw_names);
    let units: Vec<&str> = header[2].iter().map(|f| f.trim()).collect();

    let time_index = units
        .iter()
        .position(|u| *u == TIMESTAMP_UNITS)
        .or_else(|| names.iter().position(|n| n == "TIMESTAMP"))
        .ok_or_else(|| ReaderError::header(path, "no TIMESTAMP column"))?;

    let columns = names
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != time_index)
        .map(|(i, name)| {
            let unit = units.get(i).copied().unwrap_or_default();
            let kind = match unit {
                TIMESTAMP_UNITS => ColumnKind::Timestamp,
                RECORD_UNITS => ColumnKind::Integer,
                _ if first_record.and_then(|r| r.get(i)).is_some_and(|v| is_text_value(v)) => {
                    ColumnKind::Text
                }
                _ => ColumnKind::Float,
            };
            (i, ColumnDef::new(name.clone(), kind).with_units(unit))
        })
        .collect();

    Ok(Layout {
        environment,
        time_index,
        columns,
    })
}

/// A value that is neither numeric nor a missing-value token
fn is_text_value(value: &str) -> bool {
    let text = value.trim();
    !NAN_TOKENS.contains(&text)
        && !matches!(text.to_ascii_uppercase().as_str(), "INF" | "+INF" | "-INF")
        && text.parse::<f64>().is_err()
}

fn record_timestamp(fields: &[String], time_index: usize) -> Option<NaiveDateTime> {
    fields.get(time_index).and_then(|f| parse_timestamp(f))
}

/// Last non-empty record of a file, read from its tail
fn read_last_record(path: &Path) -> Result<Option<Vec<String>>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    file.seek(SeekFrom::Start(len.saturating_sub(TAIL_BYTES)))?;

    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;

    let Some(last) = tail
        .split(|b| *b == b'\n')
        .rev()
        .find(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
    else {
        return Ok(None);
    };

    // A truncated line may not even be valid CSV
    Ok(Toa5Reader::new(last)
        .next_record(path)
        .ok()
        .flatten()
        .map(|record| record.fields))
}

impl Toa5Format {
    /// Logger identification for a file
    pub fn read_environment(&self, path: &Path) -> Result<Toa5Environment> {
        let (layout, _, _) = self.open(path)?;
        Ok(layout.environment)
    }

    /// Read the header and first data record, leaving the reader after that record
    fn open(&self, path: &Path) -> Result<(Layout, Option<Record>, Toa5Reader<BufReader<File>>)> {
        let mut reader = Toa5Reader::new(BufReader::new(File::open(path)?));
        let header = read_header_records(path, &mut reader)?;
        let first = reader.next_record(path)?;
        let layout = build_layout(path, &header, first.as_ref().map(|r| r.fields.as_slice()))?;
        Ok((layout, first, reader))
    }
}

impl FileFormat for Toa5Format {
    fn kind(&self) -> FileKind {
        FileKind::Toa5
    }

    fn default_name_filter(&self) -> &'static str {
        TOA5_NAME_FILTER
    }

    fn parse_header(&self, path: &Path) -> Result<FileHeader> {
        let (layout, first, _) = self.open(path)?;

        let Some(first) = first else {
            debug!("TOA5 file has no records: {}", path.display());
            return Ok(FileHeader {
                columns: layout.column_defs(),
                coverage: None,
            });
        };

        let min_time = record_timestamp(&first.fields, layout.time_index).ok_or_else(|| {
            ReaderError::header(path, "first record has no valid timestamp")
        })?;

        let max_time = read_last_record(path)?
            .and_then(|fields| record_timestamp(&fields, layout.time_index))
            .filter(|t| *t >= min_time);

        if max_time.is_none() {
            debug!(
                "Last record of {} is unreadable; end time will be inferred",
                path.display()
            );
        }

        Ok(FileHeader {
            columns: layout.column_defs(),
            coverage: Some(TimeCoverage::span(min_time, max_time)),
        })
    }

    fn parse_body(&self, path: &Path, columns: &[ColumnDef]) -> Result<FileBody> {
        let (layout, first, mut reader) = self.open(path)?;
        let file_columns = layout.column_defs();
        let mapping: Vec<Option<usize>> = column_mapping(&file_columns, columns)
            .into_iter()
            .map(|idx| idx.map(|i| layout.columns[i].0))
            .collect();

        let mut body = FileBody::default();
        let mut next = first;

        while let Some(Record { line, fields }) = next {
            if fields.len() < layout.field_count() {
                return Err(ReaderError::body(
                    path,
                    line,
                    format!(
                        "expected {} fields, found {}",
                        layout.field_count(),
                        fields.len()
                    ),
                ));
            }

            let timestamp = record_timestamp(&fields, layout.time_index)
                .ok_or_else(|| ReaderError::body(path, line, "invalid record timestamp"))?;

            let row = columns
                .iter()
                .zip(&mapping)
                .map(|(col, field_idx)| match field_idx {
                    Some(i) => parse_value(&fields[*i], col.kind)
                        .map_err(|reason| ReaderError::body(path, line, format!("{}: {}", col.name, reason))),
                    None => Ok(Value::Null),
                })
                .collect::<Result<Vec<Value>>>()?;

            body.timestamps.push(timestamp);
            body.rows.push(row);
            next = reader.next_record(path)?;
        }

        debug!("Read {} records from {}", body.len(), path.display());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = r#""TOA5","Tower","CR1000","1234","CR1000.Std.22","CPU:met.CR1","4242","Met"
"TIMESTAMP","RECORD","AirT_Avg","RH","Flag","AirT_Avg"
"TS","RN","Deg C","%","",""
"","","Avg","Smp","Smp","Avg"
"#;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2014, 1, 13)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn write_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}{}", HEADER, body).unwrap();
        file
    }

    #[test]
    fn test_quoted_commas_stay_in_one_field() {
        let mut reader = Toa5Reader::new(&br#""2014-01-13 10:00:00",7,"NAN","a,b",1.5"#[..]);
        let record = reader.next_record(Path::new("t.dat")).unwrap().unwrap();
        assert_eq!(record.line, 1);
        assert_eq!(
            record.fields,
            vec!["2014-01-13 10:00:00", "7", "NAN", "a,b", "1.5"]
        );
        assert!(reader.next_record(Path::new("t.dat")).unwrap().is_none());
    }

    #[test]
    fn test_text_detection() {
        assert!(is_text_value("ok"));
        assert!(!is_text_value("1.5"));
        assert!(!is_text_value("NAN"));
        assert!(!is_text_value("-INF"));
        assert!(!is_text_value(""));
    }

    #[test]
    fn test_header_columns_and_coverage() {
        let file = write_file(
            "\"2014-01-13 10:00:00\",0,1.5,40,\"ok\",2.5\n\
             \"2014-01-13 10:30:00\",1,1.6,41,\"ok\",2.6\n",
        );

        let header = Toa5Format.parse_header(file.path()).unwrap();

        let names: Vec<&str> = header.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["RECORD", "AirT_Avg", "RH", "Flag", "AirT_Avg_2"]);
        assert_eq!(header.columns[0].kind, ColumnKind::Integer);
        assert_eq!(header.columns[1].kind, ColumnKind::Float);
        assert_eq!(header.columns[1].units.as_deref(), Some("Deg C"));
        assert_eq!(header.columns[3].kind, ColumnKind::Text);

        let coverage = header.coverage.unwrap();
        assert_eq!(coverage.min_time, at(10, 0));
        assert_eq!(coverage.max_time, Some(at(10, 30)));
    }

    #[test]
    fn test_truncated_last_record_leaves_end_open() {
        let file = write_file(
            "\"2014-01-13 10:00:00\",0,1.5,40,\"ok\",2.5\n\
             \"2014-01-13 1",
        );

        let header = Toa5Format.parse_header(file.path()).unwrap();
        let coverage = header.coverage.unwrap();
        assert_eq!(coverage.min_time, at(10, 0));
        assert_eq!(coverage.max_time, None);
    }

    #[test]
    fn test_header_without_records() {
        let file = write_file("");
        let header = Toa5Format.parse_header(file.path()).unwrap();
        assert!(header.coverage.is_none());
        assert_eq!(header.columns.len(), 5);
    }

    #[test]
    fn test_not_toa5() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\"TOACI1\",\"Tower\"").unwrap();
        writeln!(file, "a").unwrap();
        writeln!(file, "b").unwrap();
        writeln!(file, "c").unwrap();

        let result = Toa5Format.parse_header(file.path());
        assert!(matches!(result, Err(ReaderError::HeaderParse { .. })));
    }

    #[test]
    fn test_short_header() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\"TOA5\",\"Tower\"").unwrap();

        let result = Toa5Format.parse_header(file.path());
        assert!(matches!(result, Err(ReaderError::HeaderParse { .. })));
    }

    #[test]
    fn test_body_with_column_subset() {
        let file = write_file(
            "\"2014-01-13 10:00:00\",0,1.5,\"NAN\",\"ok\",2.5\n\
             \n\
             \"2014-01-13 10:30:00\",1,1.6,41,\"bad\",2.6\n",
        );
        let columns = vec![
            ColumnDef::new("RH", ColumnKind::Float),
            ColumnDef::new("Flag", ColumnKind::Text),
            ColumnDef::new("WS", ColumnKind::Float),
        ];

        let body = Toa5Format.parse_body(file.path(), &columns).unwrap();

        assert_eq!(body.timestamps, vec![at(10, 0), at(10, 30)]);
        assert_eq!(
            body.rows[0],
            vec![Value::Null, Value::Text("ok".to_string()), Value::Null]
        );
        assert_eq!(
            body.rows[1],
            vec![Value::Float(41.0), Value::Text("bad".to_string()), Value::Null]
        );
    }

    #[test]
    fn test_body_rejects_short_record() {
        let file = write_file(
            "\"2014-01-13 10:00:00\",0,1.5,40,\"ok\",2.5\n\
             \"2014-01-13 10:30:00\",1\n",
        );
        let columns = vec![ColumnDef::new("RH", ColumnKind::Float)];

        match Toa5Format.parse_body(file.path(), &columns) {
            Err(ReaderError::BodyParse { line, .. }) => assert_eq!(line, 6),
            other => panic!("Expected BodyParse error, got {:?}", other),
        }
    }

    #[test]
    fn test_environment() {
        let file = write_file("");
        let env = Toa5Format.read_environment(file.path()).unwrap();
        assert_eq!(env.station_name, "Tower");
        assert_eq!(env.logger_model, "CR1000");
        assert_eq!(env.table_name, "Met");
    }

    #[test]
    fn test_latin1_units_are_read() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            b"\"TOA5\",\"Tower\",\"CR1000\",\"1234\",\"OS\",\"CPU:met.CR1\",\"4242\",\"Met\"\n\
              \"TIMESTAMP\",\"RECORD\",\"AirT\"\n\
              \"TS\",\"RN\",\"\xB0C\"\n\
              \"\",\"\",\"Avg\"\n\
              \"2014-01-13 10:00:00\",0,1.5\n\
              \"2014-01-13 10:30:00\",1,1.6\n",
        )
        .unwrap();

        let header = Toa5Format.parse_header(file.path()).unwrap();
        assert_eq!(header.columns[1].units.as_deref(), Some("\u{FFFD}C"));
        assert_eq!(header.coverage.unwrap().max_time, Some(at(10, 30)));

        let body = Toa5Format.parse_body(file.path(), &header.columns).unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(body.rows[1], vec![Value::Int(1), Value::Float(1.6)]);
    }
}
