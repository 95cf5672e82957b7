//! Metrics of one consecutive point pair

use super::geodesy::{geodesic, great_circle_distance};
use super::position::TrackPoint;

/// Decimal places kept on every derived value
pub const PRECISION: i32 = 3;

/// m/s to km/h
const KMH_PER_MPS: f64 = 3.6;

/// Derived metrics between a point and the one recorded before it
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SegmentRecord {
    /// Signed, negative when timestamps go backwards
    pub time_delta_seconds: f64,
    /// Absent when either point lacks altitude
    pub altitude_delta_meters: Option<f64>,
    pub distance_delta_great_circle_meters: f64,
    pub distance_delta_geodesic_meters: f64,
    pub speed_meters_per_second: f64,
    pub speed_kilometers_per_hour: f64,
    /// The geodesic delta is the spherical fallback estimate
    pub geodesic_fallback: bool,
}

impl SegmentRecord {
    /// Record of the first point of a track, nothing precedes it
    pub fn start(point: &TrackPoint) -> Self {
        Self {
            altitude_delta_meters: point.altitude.map(|_| 0.0),
            ..Default::default()
        }
    }
}

/// Compute the segment from `prev` to `curr`
///
/// A missing timestamp on either side gives a zero time delta. Speed is taken
/// from the stored, already rounded, distance and time delta. A time delta
/// that rounds to 0 gives speed 0, so duplicated fixes never produce infinite
/// speeds. Everything is rounded to [`PRECISION`] decimals.
pub fn compute_segment(prev: &TrackPoint, curr: &TrackPoint) -> SegmentRecord {
    let time_delta = match (prev.time, curr.time) {
        (Some(start), Some(stop)) => round((stop - start).as_seconds_f64()),
        _ => 0.0,
    };

    let altitude_delta = match (prev.altitude, curr.altitude) {
        (Some(start), Some(stop)) => Some(round(stop - start)),
        _ => None,
    };

    let geodesic = geodesic(prev.coordinates, curr.coordinates);
    let distance = round(geodesic.meters);

    let speed = if time_delta == 0.0 {
        0.0
    } else {
        round(distance / time_delta)
    };

    SegmentRecord {
        time_delta_seconds: time_delta,
        altitude_delta_meters: altitude_delta,
        distance_delta_great_circle_meters: round(great_circle_distance(
            prev.coordinates,
            curr.coordinates,
        )),
        distance_delta_geodesic_meters: distance,
        speed_meters_per_second: speed,
        speed_kilometers_per_hour: round(speed * KMH_PER_MPS),
        geodesic_fallback: geodesic.fallback,
    }
}

/// Round half away from zero to [`PRECISION`] decimals
pub fn round(value: f64) -> f64 {
    let factor = 10f64.powi(PRECISION);

    (value * factor).round() / factor
}
