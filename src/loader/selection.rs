//! File-level time selection
//!
//! Orders candidate files by the start of their coverage and picks the
//! smallest run of files that can hold records inside a requested window.

use crate::models::FileCoverage;
use chrono::NaiveDateTime;
use tracing::debug;

/// Stable sort by coverage start; files starting together keep discovery order
pub fn sort_by_start(mut files: Vec<FileCoverage>) -> Vec<FileCoverage> {
    files.sort_by_key(|f| f.coverage.min_time);
    files
}

/// Fill in unknown end times from the start of the following file.
///
/// The last file, having no successor, ends where it starts. `files` must
/// already be sorted by start.
pub fn infer_end_times(files: &mut [FileCoverage]) {
    for i in 0..files.len() {
        if files[i].coverage.max_time.is_some() {
            continue;
        }
        let start = files[i].coverage.min_time;
        let inferred = files
            .get(i + 1)
            .map(|next| next.coverage.min_time)
            .filter(|t| *t >= start)
            .unwrap_or(start);
        debug!(
            "Inferred end {} for {}",
            inferred,
            files[i].path.display()
        );
        files[i].coverage.max_time = Some(inferred);
    }
}

/// Index range of the files to load for `[mindate, maxdate)`.
///
/// Starts at the last file beginning at or before `mindate` (or the first
/// file when none does) and runs through the last file beginning before
/// `maxdate`. A file that starts before the window is kept because its
/// records may run into it. `files` must be sorted by start.
///
/// Selection looks at start times only. When several files start at or
/// before `mindate`, only the last of them is loaded, even if an earlier one
/// is longer and its `max_time` reaches into the window.
pub fn covering_range(
    files: &[FileCoverage],
    mindate: NaiveDateTime,
    maxdate: NaiveDateTime,
) -> std::ops::Range<usize> {
    let starts_at_or_before = files.partition_point(|f| f.coverage.min_time <= mindate);
    let starts_before_end = files.partition_point(|f| f.coverage.min_time < maxdate);

    match starts_at_or_before.checked_sub(1) {
        // The file already running at `mindate` is always loaded
        Some(first) => first..starts_before_end.max(first + 1),
        None => 0..starts_before_end,
    }
}

/// The files to load for `[mindate, maxdate)`, in time order
pub fn select_covering(
    files: &[FileCoverage],
    mindate: NaiveDateTime,
    maxdate: NaiveDateTime,
) -> &[FileCoverage] {
    let range = covering_range(files, mindate, maxdate);
    debug!(
        "Selected files {}..{} of {} for window {} .. {}",
        range.start,
        range.end,
        files.len(),
        mindate,
        maxdate
    );
    &files[range]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeCoverage;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2014, 1, 13)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn point(name: &str, t: NaiveDateTime) -> FileCoverage {
        FileCoverage {
            path: PathBuf::from(name),
            coverage: TimeCoverage::point(t),
        }
    }

    fn open(name: &str, t: NaiveDateTime) -> FileCoverage {
        FileCoverage {
            path: PathBuf::from(name),
            coverage: TimeCoverage::span(t, None),
        }
    }

    fn names(files: &[FileCoverage]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.to_string_lossy().to_string())
            .collect()
    }

    fn hourly() -> Vec<FileCoverage> {
        sort_by_start(vec![
            point("A_140113_100000.str", at(10, 0)),
            point("A_140113_090000.str", at(9, 0)),
            point("A_140113_110000.str", at(11, 0)),
        ])
    }

    #[test]
    fn test_sort_is_stable() {
        let sorted = sort_by_start(vec![
            point("late", at(11, 0)),
            point("first-tie", at(9, 0)),
            point("second-tie", at(9, 0)),
        ]);
        assert_eq!(names(&sorted), vec!["first-tie", "second-tie", "late"]);
    }

    #[test]
    fn test_window_inside_files() {
        let files = hourly();
        let selected = select_covering(&files, at(9, 30), at(10, 30));
        assert_eq!(
            names(selected),
            vec!["A_140113_090000.str", "A_140113_100000.str"]
        );
    }

    #[test]
    fn test_file_starting_at_maxdate_excluded() {
        let files = hourly();
        let selected = select_covering(&files, at(9, 30), at(11, 0));
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_file_starting_at_mindate_is_first() {
        let files = hourly();
        let selected = select_covering(&files, at(10, 0), at(12, 0));
        assert_eq!(
            names(selected),
            vec!["A_140113_100000.str", "A_140113_110000.str"]
        );
    }

    #[test]
    fn test_window_before_all_files() {
        let files = hourly();
        assert!(select_covering(&files, at(7, 0), at(8, 0)).is_empty());
        assert_eq!(select_covering(&files, at(7, 0), at(9, 1)).len(), 1);
    }

    #[test]
    fn test_window_after_all_files_keeps_last() {
        let files = hourly();
        let selected = select_covering(&files, at(13, 0), at(14, 0));
        assert_eq!(names(selected), vec!["A_140113_110000.str"]);
    }

    #[test]
    fn test_zero_width_window_keeps_running_file() {
        let files = hourly();
        let selected = select_covering(&files, at(10, 0), at(10, 0));
        assert_eq!(names(selected), vec!["A_140113_100000.str"]);
    }

    #[test]
    fn test_only_latest_start_before_window_is_loaded() {
        let files = sort_by_start(vec![
            FileCoverage {
                path: PathBuf::from("long"),
                coverage: TimeCoverage::span(at(8, 0), Some(at(12, 0))),
            },
            FileCoverage {
                path: PathBuf::from("short"),
                coverage: TimeCoverage::span(at(9, 0), Some(at(9, 10))),
            },
            point("later", at(11, 0)),
        ]);

        let selected = select_covering(&files, at(10, 0), at(10, 30));
        assert_eq!(names(selected), vec!["short"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(select_covering(&[], at(9, 0), at(10, 0)).is_empty());
    }

    #[test]
    fn test_infer_end_times() {
        let mut files = sort_by_start(vec![
            open("b", at(10, 0)),
            open("a", at(9, 0)),
            FileCoverage {
                path: PathBuf::from("c"),
                coverage: TimeCoverage::span(at(11, 0), Some(at(11, 45))),
            },
            open("d", at(12, 0)),
        ]);

        infer_end_times(&mut files);

        let ends: Vec<_> = files.iter().map(|f| f.coverage.max_time).collect();
        assert_eq!(
            ends,
            vec![Some(at(10, 0)), Some(at(11, 0)), Some(at(11, 45)), Some(at(12, 0))]
        );
    }
}
