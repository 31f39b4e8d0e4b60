//! Integration tests for the loader module
//!
//! Exercises the complete load pipeline against STR and TOA5 files written
//! into temporary directory trees.


use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

/// 2014-01-13 at the given time
pub fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2014, 1, 13)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn tdl_seconds(t: NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1904, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (t - epoch).num_milliseconds() as f64 / 1000.0
}

/// Test STR file: one CH4/N2O record every `step_min` minutes for `count` records
#[derive(Debug, Clone)]
pub struct TestStrFile {
    pub start: NaiveDateTime,
    pub step_min: i64,
    pub count: usize,
}

impl TestStrFile {
    pub fn new(start: NaiveDateTime, step_min: i64, count: usize) -> Self {
        Self {
            start,
            step_min,
            count,
        }
    }

    pub fn file_name(&self) -> String {
        format!("A_{}.str", self.start.format("%y%m%d_%H%M%S"))
    }

    pub fn content(&self) -> String {
        let mut content = String::from("SPEC: CH4,N2O\n");
        for i in 0..self.count {
            let t = self.start + chrono::Duration::minutes(self.step_min * i as i64);
            content.push_str(&format!("{} {}.{} 0.32\n", tdl_seconds(t), 1, i));
        }
        content
    }

    pub fn write(&self, dir: &Path) -> PathBuf {
        let path = dir.join(self.file_name());
        fs::write(&path, self.content()).unwrap();
        path
    }
}

pub const TOA5_HEADER: &str = r#""TOA5","Tower","CR1000","1234","CR1000.Std.22","CPU:met.CR1","4242","Met"
"TIMESTAMP","RECORD","AirT","RH"
"TS","RN","Deg C","%"
"","","Avg","Smp"
"#;

/// Test TOA5 table with the given record times; AirT counts up from `first_value`
#[derive(Debug, Clone)]
pub struct TestToa5File {
    pub name: String,
    pub header: String,
    pub times: Vec<NaiveDateTime>,
    pub first_value: f64,
}

impl TestToa5File {
    pub fn new(name: &str, times: Vec<NaiveDateTime>, first_value: f64) -> Self {
        Self {
            name: name.to_string(),
            header: TOA5_HEADER.to_string(),
            times,
            first_value,
        }
    }

    pub fn with_header(mut self, header: &str) -> Self {
        self.header = header.to_string();
        self
    }

    pub fn content(&self) -> String {
        let fields = self.header.lines().nth(1).unwrap_or_default().split(',').count();
        let mut content = self.header.clone();
        for (i, t) in self.times.iter().enumerate() {
            let mut record = format!(
                "\"{}\",{},{}",
                t.format("%Y-%m-%d %H:%M:%S"),
                i,
                self.first_value + i as f64
            );
            for _ in 3..fields {
                record.push_str(",50");
            }
            content.push_str(&record);
            content.push('\n');
        }
        content
    }

    pub fn write(&self, dir: &Path) -> PathBuf {
        let path = dir.join(&self.name);
        fs::write(&path, self.content()).unwrap();
        path
    }
}

/// Times from `start` every `step_min` minutes
pub fn every(start: NaiveDateTime, step_min: i64, count: usize) -> Vec<NaiveDateTime> {
    (0..count)
        .map(|i| start + chrono::Duration::minutes(step_min * i as i64))
        .collect()
}
