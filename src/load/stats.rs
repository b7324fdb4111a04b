//! Run summary for a single pipeline invocation.

use std::fmt;
use std::time::Duration;

/// Final tally for one extract-transform-load run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Number of data rows a decode was attempted for
    pub attempted: u64,
    /// Number of rows skipped because decoding or address normalization failed
    pub decode_errors: u64,
    /// Number of records written across the three destination tables
    pub loaded: u64,
    /// Wall-clock duration of the whole extract-transform-load phase
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} errors, duration: {:?}",
            self.attempted, self.decode_errors, self.elapsed
        )
    }
}
