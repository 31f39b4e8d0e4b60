//! Row-level merge of per-file results
//!
//! Concatenates file bodies in file order, trims rows to the closed window
//! `[mindate, maxdate]` and stable-sorts the result by timestamp.

use crate::models::{ColumnDef, FileBody, TimeSeriesTable};
use chrono::NaiveDateTime;
use tracing::debug;

/// Concatenate bodies in the order given
pub fn concat_bodies(bodies: Vec<FileBody>) -> FileBody {
    let total: usize = bodies.iter().map(FileBody::len).sum();
    let mut merged = FileBody {
        timestamps: Vec::with_capacity(total),
        rows: Vec::with_capacity(total),
    };
    for body in bodies {
        merged.timestamps.extend(body.timestamps);
        merged.rows.extend(body.rows);
    }
    merged
}

/// Drop rows outside `[mindate, maxdate]`; both ends are inclusive
pub fn trim_to_window(body: FileBody, mindate: NaiveDateTime, maxdate: NaiveDateTime) -> FileBody {
    let before = body.len();
    let (timestamps, rows): (Vec<_>, Vec<_>) = body
        .timestamps
        .into_iter()
        .zip(body.rows)
        .filter(|(t, _)| *t >= mindate && *t <= maxdate)
        .unzip();

    debug!("Trimmed {} of {} rows outside the window", before - timestamps.len(), before);
    FileBody { timestamps, rows }
}

/// Build the final table, ordering rows by timestamp.
///
/// The sort is stable, so rows sharing a timestamp keep file order.
pub fn into_table(time_column: &str, columns: Vec<ColumnDef>, body: FileBody) -> TimeSeriesTable {
    let mut paired: Vec<_> = body.timestamps.into_iter().zip(body.rows).collect();
    if !paired.windows(2).all(|w| w[0].0 <= w[1].0) {
        debug!("Overlapping files produced out-of-order rows; sorting");
        paired.sort_by_key(|(t, _)| *t);
    }
    let (timestamps, rows): (Vec<_>, Vec<_>) = paired.into_iter().unzip();

    TimeSeriesTable {
        time_column: time_column.to_string(),
        columns,
        timestamps,
        rows,
    }
}
