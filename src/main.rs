//! gpx2metrics cli - Motion metrics from recorded GPX tracks

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use argopt::{cmd_group, subcmd};
use csv::{ReaderBuilder, WriterBuilder};
use log::{info, warn};
use serde::Deserialize;

use gpx2metrics::sinks::{CsvSink, TableSink};
use gpx2metrics::sources::{gpx_files_in, CsvSource, GpxSource};
use gpx2metrics::{
    aggregate, BatchCombiner, BatchOptions, ErrorPolicy, FieldsBuilder, PointsSource, TrackTable,
};

/// CLI of gpx2metrics - Derive distance, speed and altitude metrics from your GPS tracks
#[cmd_group(commands = [folder, file, points])]
fn main() -> Result<(), String> {}

/// Process every GPX file of a folder into one CSV table
#[subcmd]
fn folder(
    /// Folder with the GPX files
    folder_path: String,
    /// CSV path file destination
    destination: String,
    /// Batch and fields configuration. Default: .gpx2metrics.yaml, ~/.gpx2metrics.yaml
    #[opt(long)]
    config: Option<String>,
    /// Aggregate the tracks concurrently
    #[opt(long)]
    parallel: bool,
    /// Keep processing when a track fails and report it at the end
    #[opt(long)]
    keep_going: bool,
) -> Result<(), String> {
    init_logging();

    let conf = load_configs(config);
    let mut combiner = BatchCombiner::with_options(conf.batch);
    if parallel {
        combiner.parallel(true);
    }
    if keep_going {
        combiner.on_error(ErrorPolicy::Collect);
    }

    let files = gpx_files_in(Path::new(&folder_path))
        .map_err(|e| format!("Failed on list the folder: {}", e))?;
    info!("Found {} GPX files in {}", files.len(), folder_path);

    // read failures go through the batch policy, so they are reported even
    // when no file was readable at all
    let mut tracks = vec![];
    for (name, path) in files {
        let fetched = GpxSource::open(&path).and_then(|mut src| src.fetch());
        let stop = fetched.is_err() && combiner.options.on_error == ErrorPolicy::Abort;
        tracks.push((name, fetched));
        if stop {
            break;
        }
    }

    let outcome = combiner.run_fetched(tracks).map_err(|e| e.to_string())?;

    let destination_file = File::create(&destination)
        .map_err(|e| format!("Failed on create the destination file: {}", e))?;
    let mut sink = CsvSink::new(WriterBuilder::new().from_writer(BufWriter::new(destination_file)));
    sink.write_batch(&outcome.table).map_err(|e| e.to_string())?;

    if !outcome.failures.is_empty() {
        warn!(
            "{} tracks were left out of {}",
            outcome.failures.len(),
            destination
        );
    }

    println!("Results saved to {}", destination);

    Ok(())
}

/// Print the summary of a GPX file, optionally saving its metrics table
#[subcmd]
fn file(
    /// GPX file source
    gpx_path: String,
    /// CSV path file destination
    #[opt(long)]
    destination: Option<String>,
) -> Result<(), String> {
    init_logging();

    let points = GpxSource::open(Path::new(&gpx_path))
        .and_then(|mut src| src.fetch())
        .map_err(|e| format!("Failed on read {}: {}", gpx_path, e))?;

    let (table, summary) = aggregate(&points).map_err(|e| e.to_string())?;
    println!("{}", summary);

    if let Some(destination) = destination {
        save_track(&table, &destination)?;
    }

    Ok(())
}

/// Derive the metrics of a track stored as CSV points
#[subcmd]
fn points(
    /// CSV file source
    csv_path: String,
    /// CSV path file destination
    destination: String,
    /// Batch and fields configuration. Default: .gpx2metrics.yaml, ~/.gpx2metrics.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    init_logging();

    let csv = File::open(&csv_path)
        .map_err(|e| format!("Failed on open the CSV file: {}", e))?;
    let rcsv = ReaderBuilder::new().flexible(true).from_reader(csv);

    let conf = load_configs(config);

    let mut source = CsvSource::new(rcsv, Some(conf.fields));
    let points = source.fetch().map_err(|e| e.to_string())?;

    let (table, summary) = aggregate(&points).map_err(|e| e.to_string())?;
    println!("{}", summary);

    save_track(&table, &destination)
}

fn save_track(table: &TrackTable, destination: &str) -> Result<(), String> {
    let destination_file = File::create(destination)
        .map_err(|e| format!("Failed on create the destination file: {}", e))?;

    let mut sink = CsvSink::new(WriterBuilder::new().from_writer(BufWriter::new(destination_file)));
    sink.write_track(table).map_err(|e| e.to_string())?;

    println!("Results saved to {}", destination);

    Ok(())
}

/// Log to stderr, `RUST_LOG` overrides the default `info` level
fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");

    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Load the current config
fn load_configs(provided: Option<String>) -> Configs {
    let mut options = vec![];

    if let Some(sprovided) = provided {
        options.push(sprovided);
    }

    options.push(".gpx2metrics.yaml".to_string());

    if let Some(home) = dirs::home_dir() {
        if let Some(shome) = home.to_str() {
            options.push(format!("{}/.gpx2metrics.yaml", shome));
        }
    }

    for fi in options {
        let Ok(s) = fs::read_to_string(&fi) else {
            continue;
        };

        match serde_yaml::from_str::<Configs>(&s) {
            Ok(conf) => {
                info!("Using configuration {}", fi);
                return conf;
            }
            Err(e) => warn!("Ignoring configuration {}: {}", fi, e),
        }
    }

    Configs::default()
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct Configs {
    pub fields: FieldsBuilder,
    pub batch: BatchOptions,
}

#[test]
fn parse_configs() -> Result<(), String> {
    let yaml = "\nfields: {}\nbatch: {}";

    let conf: Configs = serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;

    assert_eq!(Configs::default(), conf);

    let yaml = "\nfields:\n  altitude: ele\nbatch:\n  parallel: true\n  on_error: collect";

    let conf: Configs = serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;

    assert_eq!(
        Configs {
            fields: FieldsBuilder {
                latitude: "latitude".to_string(),
                longitude: "longitude".to_string(),
                time: "time".to_string(),
                altitude: "ele".to_string(),
            },
            batch: BatchOptions {
                parallel: true,
                on_error: ErrorPolicy::Collect,
            }
        },
        conf
    );

    let yaml = "\nbatch:\n  on_error: retry";

    assert!(serde_yaml::from_str::<Configs>(&yaml).is_err());

    Ok(())
}
