//! Track point definition

use geo::geometry::Point;
use gpx::Waypoint;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::{MetricsError, Result};

/// One recorded fix of a track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    /// x = longitude, y = latitude, degrees WGS84
    pub coordinates: Point,
    pub time: Option<OffsetDateTime>,
    /// Meters
    pub altitude: Option<f64>,
}

impl TrackPoint {
    pub fn basic(coordinates: Point, time: OffsetDateTime) -> Self {
        Self {
            coordinates,
            time: Some(time),
            altitude: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);

        self
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates.y()
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates.x()
    }
}

impl TryFrom<&Waypoint> for TrackPoint {
    type Error = MetricsError;

    fn try_from(wp: &Waypoint) -> Result<Self> {
        // gpx only exposes its time as RFC 3339 text
        let time = match wp.time {
            Some(t) => {
                let text = t
                    .format()
                    .map_err(|e| MetricsError::GpxParse(e.to_string()))?;
                let parsed = OffsetDateTime::parse(&text, &Rfc3339)
                    .map_err(|e| MetricsError::GpxParse(format!("Failed on parse the time: {}", e)))?;
                Some(parsed)
            }
            None => None,
        };

        Ok(Self {
            coordinates: wp.point(),
            time,
            altitude: wp.elevation,
        })
    }
}
