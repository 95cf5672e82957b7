//! Metrics tables sinks API

use crate::{BatchTable, Result, TrackTable};

/// Persistence of the metrics tables
pub trait TableSink {
    fn write_track(&mut self, table: &TrackTable) -> Result<()>;

    /// Same columns as a track, plus the source of every row
    fn write_batch(&mut self, batch: &BatchTable) -> Result<()>;
}

#[cfg(feature = "csv")]
mod csv_file;

#[cfg(feature = "csv")]
pub use csv_file::{CsvSink, COLUMNS};
