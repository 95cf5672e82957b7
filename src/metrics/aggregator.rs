//! Per track metrics table and summary

use std::fmt;

use log::debug;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use super::position::TrackPoint;
use super::segment::{compute_segment, round, SegmentRecord};
use crate::{MetricsError, Result};

/// One point of a track joined with the segment that reached it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRow {
    pub point: TrackPoint,
    /// Zeroed on the first row
    pub segment: SegmentRecord,
    pub distance_total_geodesic_meters: f64,
    pub distance_total_geodesic_kilometers: f64,
}

/// Metrics of a whole track, one row per recorded point
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTable {
    rows: Vec<TrackRow>,
}

impl TrackTable {
    /// Fold the points pairwise in recording order
    pub fn from_points(points: &[TrackPoint]) -> Result<Self> {
        if points.is_empty() {
            return Err(MetricsError::InsufficientData { point_count: 0 });
        }

        let mut rows = Vec::with_capacity(points.len());
        let mut total = 0.0;
        let mut prev: Option<&TrackPoint> = None;

        for point in points {
            let segment = match prev {
                Some(prev) => compute_segment(prev, point),
                None => SegmentRecord::start(point),
            };

            total += segment.distance_delta_geodesic_meters;

            rows.push(TrackRow {
                point: *point,
                segment,
                distance_total_geodesic_meters: total,
                distance_total_geodesic_kilometers: round(total / 1000.0),
            });

            prev = Some(point);
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[TrackRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false, a table holds at least the first point
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<TrackRow> {
        self.rows
    }

    /// Whole track statistics, sentinel row included
    pub fn summary(&self) -> TrackSummary {
        let segments = || self.rows.iter().map(|r| &r.segment);

        let distance_total = segments().fold(0.0, |acc, s| acc + s.distance_delta_geodesic_meters);

        let mut ascent = 0.0;
        let mut descent = 0.0;
        for delta in segments().filter_map(|s| s.altitude_delta_meters) {
            if delta > 0.0 {
                ascent += delta;
            } else if delta < 0.0 {
                descent += delta;
            }
        }

        let times: Vec<OffsetDateTime> = self.rows.iter().filter_map(|r| r.point.time).collect();
        let duration = match (times.iter().min(), times.iter().max()) {
            (Some(min), Some(max)) => *max - *min,
            _ => Duration::ZERO,
        };

        TrackSummary {
            points: self.rows.len(),
            session_start: self.rows.first().and_then(|r| r.point.time),
            session_stop: self.rows.last().and_then(|r| r.point.time),
            duration,
            distance_total_meters: distance_total,
            distance_total_kilometers: round(distance_total / 1000.0),
            ascent_meters: round(ascent),
            descent_meters: round(descent),
            speed_meters_per_second: Stats::of(segments().map(|s| s.speed_meters_per_second)),
            speed_kilometers_per_hour: Stats::of(segments().map(|s| s.speed_kilometers_per_hour)),
            time_delta_seconds: Stats::of(segments().map(|s| s.time_delta_seconds)),
            geodesic_fallbacks: segments().filter(|s| s.geodesic_fallback).count(),
        }
    }
}

/// Build the metrics table of a track and its summary
pub fn aggregate(points: &[TrackPoint]) -> Result<(TrackTable, TrackSummary)> {
    let table = TrackTable::from_points(points)?;
    let summary = table.summary();

    debug!(
        "Aggregated {} points: {:.3} m, {} geodesic fallbacks",
        summary.points, summary.distance_total_meters, summary.geodesic_fallbacks
    );

    Ok((table, summary))
}

/// Min, max and rounded mean of a column
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Stats {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            min,
            max,
            mean: round(sum / count as f64),
        }
    }
}

/// Aggregates over a [`TrackTable`]
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub points: usize,
    /// Time of the first row
    pub session_start: Option<OffsetDateTime>,
    /// Time of the last row
    pub session_stop: Option<OffsetDateTime>,
    /// Latest minus earliest timestamp, not stop minus start
    pub duration: Duration,
    pub distance_total_meters: f64,
    pub distance_total_kilometers: f64,
    pub ascent_meters: f64,
    /// Sum of the negative altitude deltas, zero or negative
    pub descent_meters: f64,
    pub speed_meters_per_second: Stats,
    pub speed_kilometers_per_hour: Stats,
    pub time_delta_seconds: Stats,
    pub geodesic_fallbacks: usize,
}

impl fmt::Display for TrackSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = |t: Option<OffsetDateTime>| match t {
            Some(t) => t.format(&Rfc3339).map_err(|_| fmt::Error),
            None => Ok("-".to_string()),
        };
        let secs = self.duration.whole_seconds();
        let sign = if secs < 0 { "-" } else { "" };
        let secs = secs.abs();

        writeln!(f, "SessionStart: {}", time(self.session_start)?)?;
        writeln!(f, "SessionStop: {}", time(self.session_stop)?)?;
        writeln!(
            f,
            "SessionDuration (hh:mm:ss): {}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            secs % 3600 / 60,
            secs % 60
        )?;
        writeln!(f, "SessionDistanceTotal: {} km", self.distance_total_kilometers)?;
        writeln!(f, "SessionWayUp: {} m", self.ascent_meters)?;
        writeln!(f, "SessionWayDown: {} m", self.descent_meters)?;
        writeln!(f, "---")?;
        writeln!(f, "MaxSpeed: {} km/h", self.speed_kilometers_per_hour.max)?;
        writeln!(f, "MinSpeed: {} km/h", self.speed_kilometers_per_hour.min)?;
        writeln!(f, "RoundedAvgSpeed: {} km/h", self.speed_kilometers_per_hour.mean)?;
        writeln!(f, "---")?;
        writeln!(f, "TimeDeltaMax: {}", self.time_delta_seconds.max)?;
        writeln!(f, "TimeDeltaMin: {}", self.time_delta_seconds.min)?;
        write!(f, "TimeDeltaMean: {}", self.time_delta_seconds.mean)?;

        if self.geodesic_fallbacks > 0 {
            write!(f, "\nGeodesicFallbacks: {}", self.geodesic_fallbacks)?;
        }

        Ok(())
    }
}
