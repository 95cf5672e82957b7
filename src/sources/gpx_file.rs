//! GPX file source integration

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::debug;

use super::PointsSource;
use crate::{MetricsError, Result, TrackPoint};

/// GPX document source, every track and segment flattened in document order
pub struct GpxSource<T>
where
    T: Read,
{
    rdr: T,
}

impl<T> GpxSource<T>
where
    T: Read,
{
    pub fn new(rdr: T) -> Self {
        Self { rdr }
    }
}

impl GpxSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;

        Ok(Self::new(BufReader::new(file)))
    }
}

impl<T> PointsSource for GpxSource<T>
where
    T: Read,
{
    fn fetch(&mut self) -> Result<Vec<TrackPoint>> {
        let doc = gpx::read(&mut self.rdr).map_err(|e| MetricsError::GpxParse(e.to_string()))?;

        let points: Vec<TrackPoint> = doc
            .tracks
            .iter()
            .flat_map(|trk| trk.segments.iter())
            .flat_map(|seg| seg.points.iter())
            .map(TrackPoint::try_from)
            .collect::<Result<_>>()?;

        debug!(
            "Read {} points from {} tracks",
            points.len(),
            doc.tracks.len()
        );

        Ok(points)
    }
}
