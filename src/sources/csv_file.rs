//! CSV file source integration

use std::io::Read;

use csv::{Reader, StringRecord};
use geo::geometry::Point;
use log::warn;
use time::format_description::well_known;
use time::OffsetDateTime;

use super::{FieldsBuilder, PointsSource};
use crate::{MetricsError, Result, TrackPoint};

/// CSV points source, one point per row
pub struct CsvSource<T>
where
    T: Read,
{
    rdr: Reader<T>,
    fields: FieldsBuilder,
}

impl<T> CsvSource<T>
where
    T: Read,
{
    pub fn new(rdr: Reader<T>, fields: Option<FieldsBuilder>) -> Self {
        Self {
            rdr,
            fields: fields.unwrap_or_default(),
        }
    }
}

impl<T> PointsSource for CsvSource<T>
where
    T: Read,
{
    fn fetch(&mut self) -> Result<Vec<TrackPoint>> {
        let mut points = vec![];

        let mut header = self.rdr.headers()?.clone();
        let header_idx = parse_header(&self.fields, &mut header)?;

        for (line, row) in self.rdr.records().enumerate() {
            let mut rec = row?;

            match parse_row(&header_idx, &mut rec) {
                Ok(Some(point)) => points.push(point),
                Ok(None) => warn!("Skipping row {} without coordinates", line + 1),
                Err(e) => {
                    return Err(MetricsError::InvalidInput(format!(
                        "row {} {:?}: {}",
                        line + 1,
                        rec,
                        e
                    )))
                }
            }
        }

        Ok(points)
    }
}

/// Field to index map
#[derive(Debug)]
struct FieldsIndex {
    latitude: usize,
    longitude: usize,
    time: Option<usize>,
    altitude: Option<usize>,
}

fn parse_header(fields: &FieldsBuilder, header: &mut StringRecord) -> Result<FieldsIndex> {
    header.trim();

    let find = |name: &str| {
        let name = name.to_lowercase();
        header.iter().position(|h| h.to_lowercase() == name)
    };

    let latitude = find(&fields.latitude)
        .ok_or_else(|| MetricsError::InvalidInput("Latitude header not found".to_string()))?;
    let longitude = find(&fields.longitude)
        .ok_or_else(|| MetricsError::InvalidInput("Longitude header not found".to_string()))?;

    Ok(FieldsIndex {
        latitude,
        longitude,
        time: find(&fields.time),
        altitude: find(&fields.altitude),
    })
}

fn parse_row(
    header: &FieldsIndex,
    row: &mut StringRecord,
) -> std::result::Result<Option<TrackPoint>, String> {
    row.trim();
    let row: &StringRecord = row;

    let field = |idx: Option<usize>| {
        idx.and_then(|i| row.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let (lat, lng) = match (field(Some(header.latitude)), field(Some(header.longitude))) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => return Ok(None),
    };

    let lat = lat
        .parse::<f64>()
        .map_err(|e| format!("Invalid latitude format: {}", e))?;
    let lng = lng
        .parse::<f64>()
        .map_err(|e| format!("Invalid longitude format: {}", e))?;

    let time = match field(header.time) {
        Some(d) => Some(
            OffsetDateTime::parse(d, &well_known::Rfc3339)
                .map_err(|e| format!("Failed on parse the time: {}", e))?,
        ),
        None => None,
    };

    let altitude = match field(header.altitude) {
        Some(d) => Some(
            d.parse::<f64>()
                .map_err(|e| format!("Invalid altitude format: {}", e))?,
        ),
        None => None,
    };

    Ok(Some(TrackPoint {
        coordinates: Point::new(lng, lat),
        time,
        altitude,
    }))
}

#[cfg(test)]
pub mod tests {
    use csv::ReaderBuilder;
    use geo::geometry::Point;
    use time::macros::datetime;

    use super::CsvSource;
    use crate::{FieldsBuilder, MetricsError, PointsSource, Result};

    #[test]
    fn track() -> Result<()> {
        let data = "\n
            latitude,longitude,time,altitude\n
            -26.31832,-48.8702222,\"2019-10-01T00:01:00.000+00:00\",200\n
            -26.31832,-48.8802222,\"2019-10-01T00:02:00.000+00:00\",198.5\n
            -26.31832,-48.8902222,\"2019-10-01T00:03:00.000+00:00\",\n
        ";
        let rdr = ReaderBuilder::new()
            .flexible(true)
            .from_reader(data.as_bytes());

        let mut source = CsvSource::new(rdr, None);
        let points = source.fetch()?;
        assert_eq!(3, points.len());

        assert_eq!(Point::new(-48.8702222, -26.31832), points[0].coordinates);
        assert_eq!(Some(datetime!(2019-10-01 0:01 UTC)), points[0].time);
        assert_eq!(Some(200.0), points[0].altitude);
        assert_eq!(Some(198.5), points[1].altitude);
        assert_eq!(None, points[2].altitude);

        Ok(())
    }

    #[test]
    fn skip_rows_without_coordinates() -> Result<()> {
        let data = "\n
            latitude,longitude,time\n
            -26.31832,-48.8702222,\"2019-10-01T00:01:00.000+00:00\"\n
            ,,\"2019-10-02T00:02:00.000+00:00\"\n
            -26.31832, ,\"2019-10-03T00:03:00.000+00:00\"\n
        ";
        let rdr = ReaderBuilder::new()
            .flexible(true)
            .from_reader(data.as_bytes());

        let mut source = CsvSource::new(rdr, None);
        let points = source.fetch()?;
        assert_eq!(1, points.len());

        Ok(())
    }

    #[test]
    fn custom_fields() -> Result<()> {
        let data = "\n
            Lat,Lon,Recorded,Ele\n
            -26.31832,-48.8702222,\"2019-10-01T00:01:00.000+00:00\",12\n
        ";
        let rdr = ReaderBuilder::new()
            .flexible(true)
            .from_reader(data.as_bytes());

        let fields = FieldsBuilder::default()
            .latitude("Lat")
            .longitude("lon")
            .time("recorded")
            .altitude("ele")
            .done();
        let mut source = CsvSource::new(rdr, Some(fields));
        let points = source.fetch()?;
        assert_eq!(1, points.len());
        assert_eq!(Some(12.0), points[0].altitude);
        assert!(points[0].time.is_some());

        Ok(())
    }

    #[test]
    fn invalid_values() {
        let data = "latitude,longitude\nnorth,-48.87\n";
        let rdr = ReaderBuilder::new().from_reader(data.as_bytes());

        let mut source = CsvSource::new(rdr, None);
        assert!(matches!(source.fetch(), Err(MetricsError::InvalidInput(_))));
    }

    #[test]
    fn missing_header() {
        let data = "lat,longitude\n-26.3,-48.87\n";
        let rdr = ReaderBuilder::new().from_reader(data.as_bytes());

        let mut source = CsvSource::new(rdr, None);
        assert!(matches!(source.fetch(), Err(MetricsError::InvalidInput(_))));
    }
}
