//! Data Processor Module
//! Stateless filter and aggregate queries over a loaded dataset.
//!
//! Every query only reads the dataset and is total: an empty match is an
//! empty result, never an error.

use crate::data::record::{CollisionRecord, Dataset, InjuryType};
use chrono::Timelike;

/// Number of minute buckets in an hour histogram.
pub const MINUTES_PER_HOUR: usize = 60;

/// Default length of the dangerous-streets ranking.
pub const DEFAULT_TOP_STREETS: usize = 5;

/// Latitude / longitude pair.
pub type Point = (f64, f64);

/// Handles filtering and aggregation of collision records.
pub struct DataProcessor;

impl DataProcessor {
    /// Every crash position in dataset order.
    pub fn points(dataset: &Dataset) -> Vec<Point> {
        dataset.iter().map(CollisionRecord::position).collect()
    }

    /// Positions of crashes with at least `threshold` injured persons.
    ///
    /// Records with no injured-persons value never match.
    pub fn filter_by_min_injured(dataset: &Dataset, threshold: u32) -> Vec<Point> {
        dataset
            .iter()
            .filter(|r| r.injured_persons.is_some_and(|n| n >= threshold))
            .map(CollisionRecord::position)
            .collect()
    }

    /// Positions of crashes that happened during `hour` (0-23).
    pub fn filter_by_hour(dataset: &Dataset, hour: u32) -> Vec<Point> {
        Self::in_hour(dataset, hour)
            .map(CollisionRecord::position)
            .collect()
    }

    /// Crash counts per minute of `hour`, bucket `m` holding minute `m`.
    pub fn minute_histogram(dataset: &Dataset, hour: u32) -> [u32; MINUTES_PER_HOUR] {
        let mut buckets = [0u32; MINUTES_PER_HOUR];
        for ts in Self::in_hour(dataset, hour).filter_map(|r| r.timestamp) {
            buckets[ts.minute() as usize] += 1;
        }
        buckets
    }

    /// Streets ranked by the injured count of one category.
    ///
    /// Only records with a street name and a count of at least one take part.
    /// The sort is stable, so equal counts keep dataset order.
    pub fn top_streets_by_injury_type(
        dataset: &Dataset,
        injury_type: InjuryType,
        limit: usize,
    ) -> Vec<(String, u32)> {
        let mut ranked: Vec<(&str, u32)> = dataset
            .iter()
            .filter_map(|r| {
                let count = r.injured(injury_type).filter(|&n| n >= 1)?;
                let street = r.on_street_name.as_deref()?;
                Some((street, count))
            })
            .collect();

        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(limit)
            .map(|(street, count)| (street.to_string(), count))
            .collect()
    }

    /// Number of records with a timestamp in `hour`.
    pub fn count_in_hour(dataset: &Dataset, hour: u32) -> usize {
        Self::in_hour(dataset, hour).count()
    }

    fn in_hour(dataset: &Dataset, hour: u32) -> impl Iterator<Item = &CollisionRecord> {
        dataset
            .iter()
            .filter(move |r| r.timestamp.is_some_and(|ts| ts.hour() == hour))
    }
}
