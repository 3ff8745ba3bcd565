use super::QueryError;
use crate::datamodel::{Labels, METRIC_NAME_LABEL};
use crate::storage::influxdb::{ResultSet, RowGroup};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSample {
    pub timestamp_ms: i64,
    pub value: f64,
}

/// A reassembled Prometheus series, samples ascending and unique by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub labels: Labels,
    pub samples: Vec<SeriesSample>,
}

/// Coalesces InfluxDB row groups into Prometheus series.
///
/// Row groups are keyed by the labels they produce: their non-empty tags and
/// their measurement as `__name__`. Groups sharing a key, whether from the
/// same result set or another sub-query, end up in one series.
#[derive(Debug, Default)]
pub struct ResultMerger {
    series: BTreeMap<Labels, Vec<SeriesSample>>,
}

impl ResultMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges every result set at once.
    pub fn merge(result_sets: &[ResultSet]) -> Result<Vec<TimeSeries>, QueryError> {
        let mut merger = Self::new();
        for result_set in result_sets {
            merger.add_result_set(result_set)?;
        }
        Ok(merger.finish())
    }

    pub fn add_result_set(&mut self, result_set: &ResultSet) -> Result<(), QueryError> {
        for row_group in &result_set.series {
            self.add_row_group(row_group)?;
        }
        Ok(())
    }

    pub fn add_row_group(&mut self, row_group: &RowGroup) -> Result<(), QueryError> {
        let samples = rows_to_samples(&row_group.values)?;

        match self.series.entry(series_labels(row_group)) {
            Entry::Occupied(mut entry) => {
                let existing = std::mem::take(entry.get_mut());
                *entry.get_mut() = merge_samples(existing, samples);
            }
            Entry::Vacant(entry) => {
                entry.insert(samples);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// The merged series, sorted by label set.
    pub fn finish(self) -> Vec<TimeSeries> {
        self.series
            .into_iter()
            .map(|(labels, samples)| TimeSeries { labels, samples })
            .collect()
    }
}

/// InfluxDB reports every tag key of the queried measurements on every group,
/// with empty values where the tag is absent. Prometheus treats an empty
/// label as a missing one, so they are skipped.
fn series_labels(row_group: &RowGroup) -> Labels {
    let mut labels: Labels = row_group
        .tags
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    labels.insert(METRIC_NAME_LABEL.to_string(), row_group.name.clone());
    labels
}

fn rows_to_samples(rows: &[Vec<Value>]) -> Result<Vec<SeriesSample>, QueryError> {
    rows.iter()
        .map(|row| match row.as_slice() {
            [timestamp, value] => {
                let timestamp_ms = timestamp.as_i64().ok_or_else(|| {
                    QueryError::MalformedRow(format!("bad timestamp: {}", timestamp))
                })?;
                let value = value.as_f64().ok_or_else(|| {
                    QueryError::MalformedRow(format!("bad sample value: {}", value))
                })?;
                Ok(SeriesSample {
                    timestamp_ms,
                    value,
                })
            }
            _ => Err(QueryError::MalformedRow(format!(
                "expected [<timestamp>, <value>], got {:?}",
                row
            ))),
        })
        .collect()
}

/// Merges two timestamp-sorted sample lists. On equal timestamps the sample
/// from `existing` is kept.
fn merge_samples(existing: Vec<SeriesSample>, new: Vec<SeriesSample>) -> Vec<SeriesSample> {
    if existing.is_empty() {
        return new;
    }
    let mut merged = Vec::with_capacity(existing.len() + new.len());
    let mut existing = existing.into_iter().peekable();
    let mut new = new.into_iter().peekable();

    while let (Some(a), Some(b)) = (existing.peek().copied(), new.peek().copied()) {
        if a.timestamp_ms < b.timestamp_ms {
            merged.extend(existing.next());
        } else if a.timestamp_ms > b.timestamp_ms {
            merged.extend(new.next());
        } else {
            merged.extend(existing.next());
            new.next();
        }
    }
    merged.extend(existing);
    merged.extend(new);
    merged
}
