//! CSV file sink integration

use std::io::Write;

use csv::Writer;
use time::format_description::well_known;

use super::TableSink;
use crate::{BatchTable, MetricsError, Result, TrackRow, TrackTable};

/// Columns of a track table, a batch adds `source_file`
pub const COLUMNS: [&str; 12] = [
    "time",
    "latitude",
    "longitude",
    "altitude",
    "time_delta_seconds",
    "altitude_delta_meters",
    "distance_delta_great-circle_meters",
    "distance_delta_geodesic_meters",
    "distance_total_geodesic_meters",
    "distance_total_geodesic_kilometers",
    "speed_meters_per_second",
    "speed_kilometers_per_hour",
];

const SOURCE_COLUMN: &str = "source_file";

/// CSV writer of metrics tables, absent values are empty cells
pub struct CsvSink<W>
where
    W: Write,
{
    wtr: Writer<W>,
}

impl<W> CsvSink<W>
where
    W: Write,
{
    pub fn new(wtr: Writer<W>) -> Self {
        Self { wtr }
    }

    pub fn into_inner(self) -> Result<W> {
        self.wtr.into_inner().map_err(|e| e.into_error().into())
    }
}

impl<W> TableSink for CsvSink<W>
where
    W: Write,
{
    fn write_track(&mut self, table: &TrackTable) -> Result<()> {
        self.wtr.write_record(COLUMNS)?;

        for row in table.rows() {
            self.wtr.write_record(record(row)?)?;
        }

        self.wtr.flush()?;

        Ok(())
    }

    fn write_batch(&mut self, batch: &BatchTable) -> Result<()> {
        self.wtr
            .write_record(COLUMNS.iter().chain(std::iter::once(&SOURCE_COLUMN)))?;

        for brow in batch.rows() {
            let mut rec = record(&brow.row)?;
            rec.push(brow.source_identity.clone());
            self.wtr.write_record(rec)?;
        }

        self.wtr.flush()?;

        Ok(())
    }
}

fn record(row: &TrackRow) -> Result<Vec<String>> {
    let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();

    let time = match row.point.time {
        Some(t) => t
            .format(&well_known::Rfc3339)
            .map_err(|e| MetricsError::InvalidInput(format!("Failed on format the time: {}", e)))?,
        None => String::new(),
    };

    let seg = &row.segment;

    Ok(vec![
        time,
        row.point.latitude().to_string(),
        row.point.longitude().to_string(),
        optional(row.point.altitude),
        seg.time_delta_seconds.to_string(),
        optional(seg.altitude_delta_meters),
        seg.distance_delta_great_circle_meters.to_string(),
        seg.distance_delta_geodesic_meters.to_string(),
        row.distance_total_geodesic_meters.to_string(),
        row.distance_total_geodesic_kilometers.to_string(),
        seg.speed_meters_per_second.to_string(),
        seg.speed_kilometers_per_hour.to_string(),
    ])
}
