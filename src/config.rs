//! Configuration for discovery and loading.
//!
//! Provides the loader settings that are not part of a single query:
//! traversal depth, file name filters and the output time column name.

use crate::constants::{DEFAULT_MAX_DEPTH, DEFAULT_TIME_COLUMN};
use crate::error::{ReaderError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings shared by every load performed with a `TimeRangeLoader`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Traversal depth when the source is a directory (1 = the directory itself only)
    pub max_depth: usize,

    /// Base-name pattern restricting which files of a directory belong to one logger table
    pub root_filter: Option<String>,

    /// Full-path pattern overriding the format's default extension filter
    pub name_filter: Option<String>,

    /// Name given to the timestamp column of the merged table
    pub time_column: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            root_filter: None,
            name_filter: None,
            time_column: DEFAULT_TIME_COLUMN.to_string(),
        }
    }
}

impl LoaderConfig {
    /// Set traversal depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Restrict candidates to files whose base name matches `pattern`
    pub fn with_root_filter(mut self, pattern: impl Into<String>) -> Self {
        self.root_filter = Some(pattern.into());
        self
    }

    /// Replace the format's extension filter
    pub fn with_name_filter(mut self, pattern: impl Into<String>) -> Self {
        self.name_filter = Some(pattern.into());
        self
    }

    /// Rename the output time column
    pub fn with_time_column(mut self, name: impl Into<String>) -> Self {
        self.time_column = name.into();
        self
    }

    /// Check the settings before any filesystem work starts
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(ReaderError::configuration(
                "max_depth must be at least 1 (1 = roots only)",
            ));
        }
        if self.time_column.trim().is_empty() {
            return Err(ReaderError::configuration("time_column must not be empty"));
        }
        self.compiled_root_filter()?;
        self.compiled_name_filter()?;
        debug!("Loader configuration validated: {:?}", self);
        Ok(())
    }

    pub fn compiled_root_filter(&self) -> Result<Option<Regex>> {
        compile_optional(self.root_filter.as_deref())
    }

    pub fn compiled_name_filter(&self) -> Result<Option<Regex>> {
        compile_optional(self.name_filter.as_deref())
    }
}

/// Compile a pattern, treating an absent or empty one as "match everything"
fn compile_optional(pattern: Option<&str>) -> Result<Option<Regex>> {
    match pattern {
        Some(p) if !p.is_empty() => Ok(Some(Regex::new(p)?)),
        _ => Ok(None),
    }
}
