//! Bounded-depth directory traversal
//!
//! Lists files and subdirectories under one or more roots, one level at a
//! time. Directories that cannot be listed are reported as diagnostics and
//! contribute no children; traversal carries on with the rest of the frontier.

use crate::error::ReaderError;
use crate::models::ListDiagnostic;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What a filesystem lookup says a path is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    File,
    Directory,
    Other,
}

/// Classify a path, following symlinks. Broken links and unreadable
/// entries come back as `Other`.
pub fn probe_path_type(path: &Path) -> PathType {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => PathType::File,
        Ok(meta) if meta.is_dir() => PathType::Directory,
        _ => PathType::Other,
    }
}

/// Immediate child names of a directory, sorted
pub fn list_immediate_children(dir: &Path) -> Result<Vec<String>, ReaderError> {
    let entries = fs::read_dir(dir).map_err(|source| ReaderError::List {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

/// Everything discovered while expanding one frontier
#[derive(Debug, Default, Clone)]
pub struct LevelListing {
    pub files: Vec<PathBuf>,
    pub dirs: Vec<PathBuf>,
    pub diagnostics: Vec<ListDiagnostic>,
}

/// Expand every directory of `frontier` by one level.
///
/// The returned `dirs` are exactly the next frontier.
pub fn expand_level(frontier: &[PathBuf]) -> LevelListing {
    let mut level = LevelListing::default();

    for dir in frontier {
        let children = match list_immediate_children(dir) {
            Ok(children) => children,
            Err(e) => {
                warn!("Skipping directory {}: {:#}", dir.display(), e);
                level.diagnostics.push(ListDiagnostic {
                    path: dir.clone(),
                    message: list_error_message(&e),
                });
                continue;
            }
        };

        for name in children {
            let path = dir.join(name);
            match probe_path_type(&path) {
                PathType::File => level.files.push(path),
                PathType::Directory => level.dirs.push(path),
                PathType::Other => debug!("Ignoring unreadable entry: {}", path.display()),
            }
        }
    }

    level
}

fn list_error_message(error: &ReaderError) -> String {
    match error {
        ReaderError::List { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}

/// Files and directories found by a walk, in discovery order
#[derive(Debug, Default, Clone)]
pub struct WalkResult {
    pub files: Vec<PathBuf>,
    pub dirs: Vec<PathBuf>,
    pub diagnostics: Vec<ListDiagnostic>,
}

/// Leveled directory walker.
///
/// Depth counts the roots as level 1, so `max_depth = 1` lists only the
/// direct children of the roots. Multiple roots share one frontier and one
/// depth budget. Overlapping roots are not deduplicated: when one root is
/// an ancestor of another, files under the overlap are listed twice, and
/// callers that care must pass disjoint roots.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    max_depth: usize,
    name_filter: Option<Regex>,
}

impl DirectoryWalker {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            name_filter: None,
        }
    }

    /// Keep only files whose full path matches `filter`; directories are never filtered
    pub fn with_name_filter(mut self, filter: Option<Regex>) -> Self {
        self.name_filter = filter;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Walk one or more roots
    pub fn walk<P: AsRef<Path>>(&self, roots: &[P]) -> WalkResult {
        let mut result = WalkResult::default();
        let mut frontier: Vec<PathBuf> = roots.iter().map(|r| r.as_ref().to_path_buf()).collect();

        for depth in 1..=self.max_depth {
            if frontier.is_empty() {
                break;
            }
            debug!("Expanding level {} ({} directories)", depth, frontier.len());

            let level = expand_level(&frontier);
            result.files.extend(level.files);
            result.dirs.extend(level.dirs.iter().cloned());
            result.diagnostics.extend(level.diagnostics);
            frontier = level.dirs;
        }

        if let Some(filter) = &self.name_filter {
            result
                .files
                .retain(|path| filter.is_match(&path.to_string_lossy()));
        }

        debug!(
            "Walk found {} files and {} directories ({} unreadable)",
            result.files.len(),
            result.dirs.len(),
            result.diagnostics.len()
        );
        result
    }

    /// Walk a single root
    pub fn walk_one(&self, root: impl AsRef<Path>) -> WalkResult {
        self.walk(&[root.as_ref()])
    }
}
