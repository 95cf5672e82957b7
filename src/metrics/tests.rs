use std::sync::atomic::{AtomicUsize, Ordering};

use geo::Point;
use time::macros::datetime;

use super::aggregator::{aggregate, TrackTable};
use super::batch::{combine, BatchCombiner, ErrorPolicy};
use super::position::TrackPoint;
use super::segment::compute_segment;
use crate::{MetricsError, Result};

fn joinville() -> Vec<TrackPoint> {
    vec![
        TrackPoint::basic(Point::new(-48.8702222, -26.31832), datetime!(2021-05-24 0:00 UTC))
            .with_altitude(10.0),
        TrackPoint::basic(Point::new(-48.8619776, -26.3185919), datetime!(2021-05-24 0:05 UTC))
            .with_altitude(25.5),
        TrackPoint::basic(Point::new(-48.8619871, -26.3185861), datetime!(2021-05-24 0:10 UTC))
            .with_altitude(20.0),
    ]
}

#[test]
fn equator_degree() -> Result<()> {
    let p1 = TrackPoint::basic(Point::new(0.0, 0.0), datetime!(2021-05-24 0:00 UTC))
        .with_altitude(0.0);
    let p2 = TrackPoint::basic(Point::new(1.0, 0.0), datetime!(2021-05-24 1:00 UTC))
        .with_altitude(100.0);

    let (table, summary) = aggregate(&[p1, p2])?;
    assert_eq!(2, table.len());

    let segment = &table.rows()[1].segment;
    assert!((segment.distance_delta_geodesic_meters - 111_319.5).abs() < 1.0);
    assert_eq!(Some(100.0), segment.altitude_delta_meters);
    assert_eq!(3600.0, segment.time_delta_seconds);
    assert_eq!(30.922, segment.speed_meters_per_second);
    assert!((segment.speed_kilometers_per_hour - 111.32).abs() < 0.01);

    assert_eq!(100.0, summary.ascent_meters);
    assert_eq!(0.0, summary.descent_meters);
    assert_eq!(3600, summary.duration.whole_seconds());
    assert_eq!(111.319, summary.distance_total_kilometers);

    Ok(())
}

#[test]
fn single_point_track() -> Result<()> {
    let points = &joinville()[..1];

    let (table, summary) = aggregate(points)?;
    assert_eq!(1, table.len());

    let row = &table.rows()[0];
    assert_eq!(points[0], row.point);
    assert_eq!(0.0, row.segment.time_delta_seconds);
    assert_eq!(Some(0.0), row.segment.altitude_delta_meters);
    assert_eq!(0.0, row.segment.distance_delta_great_circle_meters);
    assert_eq!(0.0, row.segment.distance_delta_geodesic_meters);
    assert_eq!(0.0, row.segment.speed_meters_per_second);
    assert_eq!(0.0, row.segment.speed_kilometers_per_hour);
    assert_eq!(0.0, row.distance_total_geodesic_meters);

    assert_eq!(0.0, summary.distance_total_meters);
    assert_eq!(0, summary.duration.whole_seconds());
    assert_eq!(summary.session_start, summary.session_stop);

    Ok(())
}

#[test]
fn empty_track() {
    let result = aggregate(&[]);
    assert!(matches!(
        result,
        Err(MetricsError::InsufficientData { point_count: 0 })
    ));
}

#[test]
fn duplicated_timestamp_has_no_speed() {
    let p1 = TrackPoint::basic(Point::new(-48.87, -26.31), datetime!(2021-05-24 0:00 UTC));
    let p2 = TrackPoint::basic(Point::new(-48.86, -26.32), datetime!(2021-05-24 0:00 UTC));

    let segment = compute_segment(&p1, &p2);
    assert_eq!(0.0, segment.time_delta_seconds);
    assert!(segment.distance_delta_geodesic_meters > 1000.0);
    assert_eq!(0.0, segment.speed_meters_per_second);
    assert_eq!(0.0, segment.speed_kilometers_per_hour);
}

#[test]
fn sub_millisecond_delta_has_no_speed() {
    let p1 = TrackPoint::basic(Point::new(0.0, 0.0), datetime!(2021-05-24 0:00:00 UTC));
    let p2 = TrackPoint::basic(
        Point::new(0.0001, 0.0),
        datetime!(2021-05-24 0:00:00.0004 UTC),
    );

    let segment = compute_segment(&p1, &p2);
    assert_eq!(0.0, segment.time_delta_seconds);
    assert_eq!(11.132, segment.distance_delta_geodesic_meters);
    assert_eq!(0.0, segment.speed_meters_per_second);
    assert_eq!(0.0, segment.speed_kilometers_per_hour);
}

#[test]
fn speed_from_stored_values() {
    let p1 = TrackPoint::basic(Point::new(0.0, 0.0), datetime!(2021-05-24 0:00:00 UTC));
    let p2 = TrackPoint::basic(
        Point::new(0.0001, 0.0),
        datetime!(2021-05-24 0:00:00.0016 UTC),
    );

    let segment = compute_segment(&p1, &p2);
    assert_eq!(0.002, segment.time_delta_seconds);
    assert_eq!(
        (segment.distance_delta_geodesic_meters / segment.time_delta_seconds * 1000.0).round()
            / 1000.0,
        segment.speed_meters_per_second
    );
}

#[test]
fn backwards_timestamp_is_kept() {
    let p1 = TrackPoint::basic(Point::new(0.0, 0.0), datetime!(2021-05-24 0:10 UTC));
    let p2 = TrackPoint::basic(Point::new(0.001, 0.0), datetime!(2021-05-24 0:00 UTC));

    let segment = compute_segment(&p1, &p2);
    assert_eq!(-600.0, segment.time_delta_seconds);
    assert!(segment.speed_meters_per_second < 0.0);
}

#[test]
fn missing_altitude_is_skipped() -> Result<()> {
    let mut points = joinville();
    points[1].altitude = None;

    let (table, summary) = aggregate(&points)?;
    assert_eq!(None, table.rows()[1].segment.altitude_delta_meters);
    assert_eq!(None, table.rows()[2].segment.altitude_delta_meters);
    assert_eq!(0.0, summary.ascent_meters);
    assert_eq!(0.0, summary.descent_meters);

    Ok(())
}

#[test]
fn missing_time_has_zero_delta() {
    let p1 = TrackPoint {
        coordinates: Point::new(0.0, 0.0),
        time: None,
        altitude: None,
    };
    let p2 = TrackPoint::basic(Point::new(0.001, 0.0), datetime!(2021-05-24 0:00 UTC));

    let segment = compute_segment(&p1, &p2);
    assert_eq!(0.0, segment.time_delta_seconds);
    assert_eq!(0.0, segment.speed_meters_per_second);
}

#[test]
fn rounded_to_three_decimals() {
    let points = joinville();
    let segment = compute_segment(&points[0], &points[1]);

    for v in [
        segment.time_delta_seconds,
        segment.distance_delta_great_circle_meters,
        segment.distance_delta_geodesic_meters,
        segment.speed_meters_per_second,
        segment.speed_kilometers_per_hour,
    ] {
        assert_eq!(v, (v * 1000.0).round() / 1000.0);
    }
}

#[test]
fn cumulative_distance() -> Result<()> {
    let (table, summary) = aggregate(&joinville())?;

    let mut last = 0.0;
    let mut sum = 0.0;
    for row in table.rows() {
        sum += row.segment.distance_delta_geodesic_meters;
        assert!(row.distance_total_geodesic_meters >= last);
        last = row.distance_total_geodesic_meters;
    }
    assert_eq!(sum, last);
    assert_eq!(summary.distance_total_meters, last);

    Ok(())
}

#[test]
fn summary_includes_first_row() -> Result<()> {
    let (_, summary) = aggregate(&joinville())?;

    assert_eq!(0.0, summary.speed_meters_per_second.min);
    assert_eq!(0.0, summary.time_delta_seconds.min);
    assert_eq!(300.0, summary.time_delta_seconds.max);
    assert_eq!(200.0, summary.time_delta_seconds.mean);
    assert_eq!(15.5, summary.ascent_meters);
    assert_eq!(-5.5, summary.descent_meters);
    assert_eq!(600, summary.duration.whole_seconds());
    assert_eq!(Some(datetime!(2021-05-24 0:00 UTC)), summary.session_start);
    assert_eq!(Some(datetime!(2021-05-24 0:10 UTC)), summary.session_stop);

    Ok(())
}

#[test]
fn summary_report() -> Result<()> {
    let (_, summary) = aggregate(&joinville())?;
    let report = summary.to_string();

    assert!(report.starts_with("SessionStart: 2021-05-24T00:00:00Z\n"));
    assert!(report.contains("SessionDuration (hh:mm:ss): 00:10:00\n"));
    assert!(report.contains("SessionWayUp: 15.5 m\n"));
    assert!(report.contains("TimeDeltaMean: 200"));
    assert!(!report.contains("GeodesicFallbacks"));

    Ok(())
}

#[test]
fn combine_in_order() -> Result<()> {
    let points = joinville();
    let a = TrackTable::from_points(&points)?;
    let b = TrackTable::from_points(&points[1..])?;

    let batch = combine(vec![("a.gpx", a.clone()), ("b.gpx", b.clone())])?;
    assert_eq!(5, batch.len());
    assert_eq!(vec!["a.gpx", "b.gpx"], batch.sources());

    for (i, row) in batch.rows()[..3].iter().enumerate() {
        assert_eq!("a.gpx", row.source_identity);
        assert_eq!(a.rows()[i], row.row);
    }
    for (i, row) in batch.rows()[3..].iter().enumerate() {
        assert_eq!("b.gpx", row.source_identity);
        assert_eq!(b.rows()[i], row.row);
    }
    assert_eq!(2, batch.rows_of("b.gpx").count());

    Ok(())
}

#[test]
fn combine_nothing() {
    let result = combine(Vec::<(String, TrackTable)>::new());
    assert!(matches!(result, Err(MetricsError::EmptyBatch)));
}

#[test]
fn batch_abort_names_failed_source() {
    let tracks = vec![
        ("a.gpx".to_string(), joinville()),
        ("empty.gpx".to_string(), vec![]),
        ("c.gpx".to_string(), joinville()),
    ];

    let result = BatchCombiner::new().run(tracks);
    match result {
        Err(e) => {
            assert_eq!(Some("empty.gpx"), e.identity());
            assert!(e.to_string().contains("empty.gpx"));
        }
        Ok(_) => panic!("batch with an empty track must fail"),
    }
}

#[test]
fn batch_collect_reports_failures() -> Result<()> {
    let tracks = vec![
        ("a.gpx".to_string(), joinville()),
        ("empty.gpx".to_string(), vec![]),
        ("c.gpx".to_string(), joinville()[..2].to_vec()),
    ];

    let outcome = BatchCombiner::new()
        .on_error(ErrorPolicy::Collect)
        .run(tracks)?;
    assert_eq!(5, outcome.table.len());
    assert_eq!(vec!["a.gpx", "c.gpx"], outcome.table.sources());
    assert_eq!(2, outcome.summaries.len());
    assert_eq!(1, outcome.failures.len());
    assert_eq!(Some("empty.gpx"), outcome.failures[0].identity());

    Ok(())
}

#[test]
fn batch_collect_all_failed() {
    let tracks = vec![("empty.gpx".to_string(), vec![])];

    let result = BatchCombiner::new()
        .on_error(ErrorPolicy::Collect)
        .run(tracks);
    assert!(matches!(result, Err(MetricsError::Track { .. })));
}

#[test]
fn batch_parallel_keeps_order() -> Result<()> {
    let tracks: Vec<(String, Vec<TrackPoint>)> = (0..16)
        .map(|i| (format!("{:02}.gpx", i), joinville()[..1 + i % 3].to_vec()))
        .collect();

    let sequential = BatchCombiner::new().run(tracks.clone())?;
    let parallel = BatchCombiner::new().parallel(true).run(tracks)?;

    assert_eq!(sequential.table, parallel.table);
    let expected: Vec<String> = (0..16).map(|i| format!("{:02}.gpx", i)).collect();
    assert_eq!(expected, parallel.table.sources());

    Ok(())
}

#[test]
fn batch_without_tracks() {
    let result = BatchCombiner::new().run(vec![]);
    assert!(matches!(result, Err(MetricsError::EmptyBatch)));
}

#[test]
fn batch_abort_stops_at_first_failure() {
    let calls = AtomicUsize::new(0);
    let tracks = vec![
        ("a.gpx".to_string(), Ok(joinville())),
        ("empty.gpx".to_string(), Ok(vec![])),
        ("c.gpx".to_string(), Ok(joinville())),
        ("d.gpx".to_string(), Ok(joinville())),
    ];

    let result = BatchCombiner::new().run_with(tracks, |points| {
        calls.fetch_add(1, Ordering::SeqCst);
        aggregate(points)
    });
    assert!(matches!(&result, Err(e) if e.identity() == Some("empty.gpx")));
    assert_eq!(2, calls.load(Ordering::SeqCst));
}

#[test]
fn batch_collect_aggregates_everything() -> Result<()> {
    let calls = AtomicUsize::new(0);
    let tracks = vec![
        ("a.gpx".to_string(), Ok(joinville())),
        ("empty.gpx".to_string(), Ok(vec![])),
        ("c.gpx".to_string(), Ok(joinville())),
    ];

    let outcome = BatchCombiner::new()
        .on_error(ErrorPolicy::Collect)
        .run_with(tracks, |points| {
            calls.fetch_add(1, Ordering::SeqCst);
            aggregate(points)
        })?;
    assert_eq!(3, calls.load(Ordering::SeqCst));
    assert_eq!(1, outcome.failures.len());

    Ok(())
}

#[test]
fn batch_unreadable_sources_are_reported() {
    let tracks = vec![
        (
            "broken.gpx".to_string(),
            Err(MetricsError::GpxParse("no root element".to_string())),
        ),
        (
            "missing.gpx".to_string(),
            Err(MetricsError::GpxParse("unexpected end".to_string())),
        ),
    ];

    let result = BatchCombiner::new()
        .on_error(ErrorPolicy::Collect)
        .run_fetched(tracks);
    match result {
        Err(e) => {
            assert_eq!(Some("broken.gpx"), e.identity());
            assert!(e.to_string().contains("failed to parse GPX: no root element"));
        }
        Ok(_) => panic!("batch without a readable track must fail"),
    }
}

#[test]
fn batch_unreadable_source_is_collected() -> Result<()> {
    let tracks = vec![
        (
            "broken.gpx".to_string(),
            Err(MetricsError::GpxParse("no root element".to_string())),
        ),
        ("b.gpx".to_string(), Ok(joinville())),
    ];

    let outcome = BatchCombiner::new()
        .on_error(ErrorPolicy::Collect)
        .run_fetched(tracks)?;
    assert_eq!(vec!["b.gpx"], outcome.table.sources());
    assert_eq!(1, outcome.failures.len());
    assert_eq!(Some("broken.gpx"), outcome.failures[0].identity());

    Ok(())
}
