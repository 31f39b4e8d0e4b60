//! Constants for instrument file discovery and parsing
//!
//! Default values, file name patterns and format markers used throughout
//! the crate.

// =============================================================================
// Discovery Defaults
// =============================================================================

/// Default traversal depth when loading from a directory
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Default name of the merged timestamp column
pub const DEFAULT_TIME_COLUMN: &str = "TIMESTAMP";

/// Extension filter for Campbell Scientific TOA5 tables
pub const TOA5_NAME_FILTER: &str = r"(?i)\.dat$";

/// Extension filter for TDLWintel STR files
pub const STR_NAME_FILTER: &str = r"(?i)\.str$";

// =============================================================================
// TOA5 Format
// =============================================================================

pub mod toa5 {
    /// First field of the environment line
    pub const FORMAT_MARKER: &str = "TOA5";

    /// Environment, field names, units and processing lines
    pub const HEADER_LINES: usize = 4;

    /// Units marking the record timestamp column
    pub const TIMESTAMP_UNITS: &str = "TS";

    /// Units marking the record number column
    pub const RECORD_UNITS: &str = "RN";

    /// Timestamp layouts written by the logger, with and without fractional seconds
    pub const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

    /// Tokens the logger writes for missing or overflowed values
    pub const NAN_TOKENS: &[&str] = &["NAN", "NaN", "nan", ""];
}

// =============================================================================
// STR Format
// =============================================================================

pub mod str_file {
    /// Prefix of the species line that opens every STR file
    pub const SPECIES_MARKER: &str = "SPEC:";

    /// Filename stamp `YYMMDD_HHMMSS`
    pub const FILENAME_STAMP_PATTERN: &str = r"(\d{6}_\d{6})";

    /// chrono layout of the filename stamp
    pub const FILENAME_STAMP_FORMAT: &str = "%y%m%d_%H%M%S";

    /// TDLWintel time column counts seconds from 1904-01-01 00:00:00
    pub const EPOCH_YEAR: i32 = 1904;
}
