//! Batch of tracks combined into one table

use log::{info, warn};
use serde::Deserialize;

use super::aggregator::{aggregate, TrackRow, TrackSummary, TrackTable};
use super::position::TrackPoint;
use crate::{MetricsError, Result};

/// Track row tagged with the source it came from
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    pub source_identity: String,
    pub row: TrackRow,
}

/// Rows of many tracks, grouped by source in input order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTable {
    rows: Vec<BatchRow>,
}

impl BatchTable {
    pub fn rows(&self) -> &[BatchRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Source identities in block order
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = vec![];
        for row in &self.rows {
            if sources.last() != Some(&row.source_identity.as_str()) {
                sources.push(&row.source_identity);
            }
        }

        sources
    }

    /// Rows of one source, in their original order
    pub fn rows_of<'a>(&'a self, identity: &'a str) -> impl Iterator<Item = &'a TrackRow> + 'a {
        self.rows
            .iter()
            .filter(move |r| r.source_identity == identity)
            .map(|r| &r.row)
    }
}

/// Concatenate the tables in input order, tagging each row with its source
pub fn combine<I, S>(tracks: I) -> Result<BatchTable>
where
    I: IntoIterator<Item = (S, TrackTable)>,
    S: Into<String>,
{
    let mut rows = vec![];
    let mut count = 0;

    for (identity, table) in tracks {
        let identity: String = identity.into();
        count += 1;
        rows.extend(table.into_rows().into_iter().map(|row| BatchRow {
            source_identity: identity.clone(),
            row,
        }));
    }

    if count == 0 {
        return Err(MetricsError::EmptyBatch);
    }

    Ok(BatchTable { rows })
}

/// What to do with the rest of the batch when a track fails
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop at the first failing track, in input order
    #[default]
    Abort,
    /// Keep the tracks that succeed and report the failed ones
    Collect,
}

#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Aggregate the tracks concurrently, needs the `parallel` feature
    pub parallel: bool,
    pub on_error: ErrorPolicy,
}

/// Result of a batch run
#[derive(Debug)]
pub struct BatchOutcome {
    pub table: BatchTable,
    pub summaries: Vec<(String, TrackSummary)>,
    /// Failures tagged with their source, only filled with [`ErrorPolicy::Collect`]
    pub failures: Vec<MetricsError>,
}

/// Aggregates a set of tracks and combines them
pub struct BatchCombiner {
    pub options: BatchOptions,
}

impl BatchCombiner {
    pub fn new() -> Self {
        Self::with_options(BatchOptions::default())
    }

    pub fn with_options(options: BatchOptions) -> Self {
        Self { options }
    }

    pub fn parallel(&mut self, parallel: bool) -> &mut Self {
        self.options.parallel = parallel;

        self
    }

    pub fn on_error(&mut self, policy: ErrorPolicy) -> &mut Self {
        self.options.on_error = policy;

        self
    }

    /// Aggregate every track and combine the tables
    ///
    /// With [`ErrorPolicy::Collect`] the batch still fails when no track at
    /// all succeeds, with the first failure.
    pub fn run(&self, tracks: Vec<(String, Vec<TrackPoint>)>) -> Result<BatchOutcome> {
        let fetched = tracks
            .into_iter()
            .map(|(identity, points)| (identity, Ok(points)))
            .collect();

        self.run_fetched(fetched)
    }

    /// Like [`BatchCombiner::run`], for tracks whose reading may have failed
    ///
    /// A read failure counts as a failure of its track and follows the same
    /// [`ErrorPolicy`].
    pub fn run_fetched(
        &self,
        tracks: Vec<(String, Result<Vec<TrackPoint>>)>,
    ) -> Result<BatchOutcome> {
        self.run_with(tracks, aggregate)
    }

    pub(crate) fn run_with<F>(
        &self,
        tracks: Vec<(String, Result<Vec<TrackPoint>>)>,
        aggregate: F,
    ) -> Result<BatchOutcome>
    where
        F: Fn(&[TrackPoint]) -> Result<(TrackTable, TrackSummary)> + Sync,
    {
        if tracks.is_empty() {
            return Err(MetricsError::EmptyBatch);
        }

        let total = tracks.len();
        let mut tables = vec![];
        let mut summaries = vec![];
        let mut failures = vec![];

        for (identity, result) in self.aggregate_all(tracks, &aggregate) {
            match result {
                Ok((table, summary)) => {
                    summaries.push((identity.clone(), summary));
                    tables.push((identity, table));
                }
                Err(e) => {
                    let e = e.for_source(identity);
                    match self.options.on_error {
                        ErrorPolicy::Abort => return Err(e),
                        ErrorPolicy::Collect => {
                            warn!("Skipping {}", e);
                            failures.push(e);
                        }
                    }
                }
            }
        }

        if tables.is_empty() {
            return match failures.into_iter().next() {
                Some(e) => Err(e),
                None => Err(MetricsError::EmptyBatch),
            };
        }

        let table = combine(tables)?;

        info!(
            "Combined {} of {} tracks into {} rows",
            summaries.len(),
            total,
            table.len()
        );

        Ok(BatchOutcome {
            table,
            summaries,
            failures,
        })
    }

    /// Results in input order. The sequential iterator is lazy, so an
    /// aborting run never aggregates past the first failure.
    fn aggregate_all<'a, F>(
        &self,
        tracks: Vec<(String, Result<Vec<TrackPoint>>)>,
        aggregate: &'a F,
    ) -> Box<dyn Iterator<Item = Aggregated> + 'a>
    where
        F: Fn(&[TrackPoint]) -> Result<(TrackTable, TrackSummary)> + Sync,
    {
        let one = move |(identity, fetched): (String, Result<Vec<TrackPoint>>)| {
            let result = fetched.and_then(|points| aggregate(&points[..]));
            (identity, result)
        };

        #[cfg(feature = "parallel")]
        if self.options.parallel {
            use rayon::prelude::*;

            // collect keeps the input order
            let results: Vec<Aggregated> = tracks.into_par_iter().map(one).collect();
            return Box::new(results.into_iter());
        }

        #[cfg(not(feature = "parallel"))]
        if self.options.parallel {
            warn!("Built without the `parallel` feature, aggregating sequentially");
        }

        Box::new(tracks.into_iter().map(one))
    }
}

impl Default for BatchCombiner {
    fn default() -> Self {
        Self::new()
    }
}

type Aggregated = (String, Result<(TrackTable, TrackSummary)>);
