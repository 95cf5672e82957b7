//! Track points sources API

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Result, TrackPoint};

/// Track reader
pub trait PointsSource {
    /// Fetch the points of one track, in recording order
    fn fetch(&mut self) -> Result<Vec<TrackPoint>>;
}

/// Column names of a points table
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldsBuilder {
    pub latitude: String,
    pub longitude: String,
    pub time: String,
    pub altitude: String,
}

impl Default for FieldsBuilder {
    fn default() -> Self {
        Self {
            latitude: "latitude".to_string(),
            longitude: "longitude".to_string(),
            time: "time".to_string(),
            altitude: "altitude".to_string(),
        }
    }
}

impl FieldsBuilder {
    pub fn latitude(&mut self, name: &str) -> &mut Self {
        self.latitude = name.to_lowercase();

        self
    }

    pub fn longitude(&mut self, name: &str) -> &mut Self {
        self.longitude = name.to_lowercase();

        self
    }

    pub fn time(&mut self, name: &str) -> &mut Self {
        self.time = name.to_lowercase();

        self
    }

    pub fn altitude(&mut self, name: &str) -> &mut Self {
        self.altitude = name.to_lowercase();

        self
    }

    pub fn done(&self) -> Self {
        self.clone()
    }
}

/// GPX files of a folder, sorted by file name
pub fn gpx_files_in(folder: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = vec![];

    for entry in fs::read_dir(folder)? {
        let path = entry?.path();

        let is_gpx = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gpx"))
            .unwrap_or(false);
        if !is_gpx || !path.is_file() {
            continue;
        }

        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push((name.to_string(), path.clone()));
        }
    }

    files.sort();

    Ok(files)
}

mod gpx_file;

pub use gpx_file::GpxSource;

#[cfg(feature = "csv")]
mod csv_file;

#[cfg(feature = "csv")]
pub use csv_file::CsvSource;
