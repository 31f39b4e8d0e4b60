//! Time-range loading across many instrument files.
//!
//! Orchestrates the load workflow: candidate discovery, per-file coverage,
//! time ordering, file-level selection, column resolution, body parsing and
//! the row-level merge into one table.

pub mod discovery;
pub mod merge;
pub mod selection;

#[cfg(test)]
pub mod tests;

use self::discovery::DirectoryWalker;
use self::merge::{concat_bodies, into_table, trim_to_window};
use self::selection::{infer_end_times, select_covering, sort_by_start};

use crate::config::LoaderConfig;
use crate::error::{ReaderError, Result};
use crate::formats::{FileFormat, for_kind};
use crate::models::{
    ColumnDef, FileBody, FileCoverage, FileKind, ListDiagnostic, TimeSeriesTable,
};
use crate::schema::{ColumnSpec, resolve_columns, union_columns};

use chrono::NaiveDateTime;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a load takes its files from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Walk this directory for files of the loader's format
    Directory(PathBuf),
    /// Use exactly these files
    Files(Vec<PathBuf>),
}

impl Source {
    /// A single directory becomes `Directory`, anything else a file list
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        match paths {
            [single] if single.is_dir() => Source::Directory(single.clone()),
            _ => Source::Files(paths.to_vec()),
        }
    }

    /// Fail before any work when the source does not exist
    fn check(&self) -> Result<()> {
        match self {
            Source::Directory(dir) => {
                if !dir.is_dir() {
                    return Err(ReaderError::invalid_input(dir, "directory does not exist"));
                }
            }
            Source::Files(files) => {
                for file in files {
                    if !file.is_file() {
                        return Err(ReaderError::invalid_input(file, "not a readable file"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Everything a load produced
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub table: TimeSeriesTable,
    /// Files whose bodies were read, in time order
    pub files_loaded: Vec<FileCoverage>,
    /// Directories that could not be listed
    pub diagnostics: Vec<ListDiagnostic>,
}

/// Loads records in a time window from a set of files of one format
#[derive(Debug)]
pub struct TimeRangeLoader {
    format: Box<dyn FileFormat>,
    config: LoaderConfig,
}

impl TimeRangeLoader {
    /// Create a loader for a file kind with default configuration
    pub fn new(kind: FileKind) -> Self {
        Self::with_format(for_kind(kind))
    }

    /// Create a loader around any format implementation
    pub fn with_format(format: Box<dyn FileFormat>) -> Self {
        Self {
            format,
            config: LoaderConfig::default(),
        }
    }

    /// Configure the loader
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn kind(&self) -> FileKind {
        self.format.kind()
    }

    /// Load every row in `[mindate, maxdate]` from `source`
    pub fn load(
        &self,
        source: &Source,
        mindate: NaiveDateTime,
        maxdate: NaiveDateTime,
        columns: &ColumnSpec,
    ) -> Result<LoadOutcome> {
        self.config.validate()?;
        if mindate > maxdate {
            return Err(ReaderError::configuration(format!(
                "window start {} is after window end {}",
                mindate, maxdate
            )));
        }
        source.check()?;

        // Step 1: Resolve candidate files
        let (candidates, diagnostics) = self.candidates(source)?;
        debug!("{} candidate {:?} files", candidates.len(), self.kind());

        // Steps 2-3: Coverage per candidate, in time order
        let coverages = self.scan_coverage(&candidates)?;

        // Step 4: Coarse file-level selection on [mindate, maxdate)
        let selected = select_covering(&coverages, mindate, maxdate);

        // Column schema is fixed before any body is read
        let resolved = self.resolve_schema(selected, columns)?;

        // Step 5: Parse each selected file
        let bodies = selected
            .iter()
            .map(|file| self.read_body(&file.path, &resolved))
            .collect::<Result<Vec<FileBody>>>()?;

        // Steps 6-7: Concatenate in file order, then exact row trim on [mindate, maxdate]
        let merged = trim_to_window(concat_bodies(bodies), mindate, maxdate);
        let table = into_table(&self.config.time_column, resolved, merged);

        debug!(
            "Loaded {} rows from {} files",
            table.len(),
            selected.len()
        );

        Ok(LoadOutcome {
            table,
            files_loaded: selected.to_vec(),
            diagnostics,
        })
    }

    /// Load every row of every candidate file
    pub fn load_all(&self, source: &Source, columns: &ColumnSpec) -> Result<LoadOutcome> {
        self.load(source, NaiveDateTime::MIN, NaiveDateTime::MAX, columns)
    }

    /// Read one whole file
    pub fn read_file(&self, path: &Path, columns: &ColumnSpec) -> Result<TimeSeriesTable> {
        Source::Files(vec![path.to_path_buf()]).check()?;

        let header = self.read_header(path)?;
        let resolved = resolve_columns(&header, columns, &self.config.time_column);
        let body = self.read_body(path, &resolved)?;
        Ok(into_table(&self.config.time_column, resolved, body))
    }

    /// Candidate files of a source, after name and root filtering
    pub fn candidates(&self, source: &Source) -> Result<(Vec<PathBuf>, Vec<ListDiagnostic>)> {
        let root_filter = self.config.compiled_root_filter()?;

        let (files, diagnostics) = match source {
            Source::Directory(dir) => {
                let name_filter = match self.config.compiled_name_filter()? {
                    Some(filter) => filter,
                    None => Regex::new(self.format.default_name_filter())?,
                };
                let walk = DirectoryWalker::new(self.config.max_depth)
                    .with_name_filter(Some(name_filter))
                    .walk_one(dir);
                (walk.files, walk.diagnostics)
            }
            Source::Files(files) => (files.clone(), Vec::new()),
        };

        let files = match root_filter {
            Some(root) => files
                .into_iter()
                .filter(|path| matches_root(path, &root))
                .collect(),
            None => files,
        };

        Ok((files, diagnostics))
    }

    /// Coverage of each file, sorted by start with unknown ends inferred.
    ///
    /// Files holding no records are left out.
    pub fn scan_coverage(&self, files: &[PathBuf]) -> Result<Vec<FileCoverage>> {
        let mut coverages = Vec::with_capacity(files.len());
        for path in files {
            match self.format.parse_coverage(path).map_err(|e| attribute(path, e))? {
                Some(coverage) => coverages.push(FileCoverage {
                    path: path.clone(),
                    coverage,
                }),
                None => debug!("Skipping file without records: {}", path.display()),
            }
        }

        let mut sorted = sort_by_start(coverages);
        infer_end_times(&mut sorted);
        Ok(sorted)
    }

    fn resolve_schema(&self, selected: &[FileCoverage], columns: &ColumnSpec) -> Result<Vec<ColumnDef>> {
        let headers = selected
            .iter()
            .map(|file| self.read_header(&file.path))
            .collect::<Result<Vec<_>>>()?;
        let available = union_columns(headers.iter().map(Vec::as_slice));
        Ok(resolve_columns(&available, columns, &self.config.time_column))
    }

    fn read_header(&self, path: &Path) -> Result<Vec<ColumnDef>> {
        self.format
            .parse_header(path)
            .map(|header| header.columns)
            .map_err(|e| attribute(path, e))
    }

    fn read_body(&self, path: &Path, columns: &[ColumnDef]) -> Result<FileBody> {
        self.format
            .parse_body(path, columns)
            .map_err(|e| attribute(path, e))
    }
}

/// Base-name match for root filtering
fn matches_root(path: &Path, root: &Regex) -> bool {
    path.file_name()
        .map(|name| root.is_match(&name.to_string_lossy()))
        .unwrap_or(false)
}

/// Make sure a failure while reading a file names that file
fn attribute(path: &Path, error: ReaderError) -> ReaderError {
    match error {
        ReaderError::Io(source) => ReaderError::Read {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    }
}

/// Load `[mindate, maxdate]` from `source` with default configuration
pub fn load_range(
    kind: FileKind,
    source: &Source,
    mindate: NaiveDateTime,
    maxdate: NaiveDateTime,
    columns: &ColumnSpec,
) -> Result<TimeSeriesTable> {
    TimeRangeLoader::new(kind)
        .load(source, mindate, maxdate, columns)
        .map(|outcome| outcome.table)
}
