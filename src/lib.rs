//! gpx2metrics - motion metrics from recorded GPS tracks

mod error;
mod metrics;
pub mod sources;
pub mod sinks;

pub use error::{MetricsError, Result};
pub use metrics::aggregator::{aggregate, Stats, TrackRow, TrackSummary, TrackTable};
pub use metrics::batch::{
    combine, BatchCombiner, BatchOptions, BatchOutcome, BatchRow, BatchTable, ErrorPolicy,
};
pub use metrics::geodesy::{geodesic, geodesic_distance, great_circle_distance, Geodesic};
pub use metrics::position::TrackPoint;
pub use metrics::segment::{compute_segment, SegmentRecord, PRECISION};
pub use sources::{FieldsBuilder, PointsSource};
