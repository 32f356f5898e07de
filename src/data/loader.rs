//! Collision Data Loader Module
//! Parses the collision CSV with Polars into a typed, immutable dataset and
//! memoizes loads per row limit.

use crate::data::record::{CollisionRecord, Dataset};
use crate::data::source::Fetch;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),
}

impl From<PolarsError> for LoaderError {
    fn from(e: PolarsError) -> Self {
        LoaderError::DataUnavailable(format!("failed to parse CSV: {}", e))
    }
}

impl From<reqwest::Error> for LoaderError {
    fn from(e: reqwest::Error) -> Self {
        LoaderError::DataUnavailable(format!("failed to download dataset: {}", e))
    }
}

// Accepted (lowercased) header spellings per field
const CRASH_DATE: &[&str] = &["crash_date", "crash date"];
const CRASH_TIME: &[&str] = &["crash_time", "crash time"];
const CRASH_DATE_TIME: &[&str] = &["crash_date_crash_time"];
const LATITUDE: &[&str] = &["latitude"];
const LONGITUDE: &[&str] = &["longitude"];
const INJURED_PERSONS: &[&str] = &["injured_persons", "number of persons injured"];
const INJURED_PEDESTRIANS: &[&str] = &["injured_pedestrians", "number of pedestrians injured"];
const INJURED_CYCLISTS: &[&str] = &["injured_cyclists", "number of cyclist injured"];
const INJURED_MOTORISTS: &[&str] = &["injured_motorists", "number of motorist injured"];
const ON_STREET_NAME: &[&str] = &["on_street_name", "on street name"];

const DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Reject a zero row limit before any I/O happens.
fn check_row_limit(row_limit: usize) -> Result<(), LoaderError> {
    if row_limit == 0 {
        return Err(LoaderError::InvalidArgument(
            "row limit must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Stateless CSV to [`Dataset`] conversion.
pub struct DatasetLoader;

impl DatasetLoader {
    /// Fetch the source and parse at most `row_limit` data rows.
    pub fn load<F: Fetch + ?Sized>(source: &F, row_limit: usize) -> Result<Dataset, LoaderError> {
        check_row_limit(row_limit)?;
        let bytes = source.fetch()?;
        Self::parse_csv(bytes, row_limit)
    }

    /// Parse raw CSV bytes into a dataset.
    pub fn parse_csv(bytes: Vec<u8>, row_limit: usize) -> Result<Dataset, LoaderError> {
        check_row_limit(row_limit)?;

        // Every column is read as text; typed parsing happens per field below
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_n_rows(Some(row_limit))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        Self::from_frame(&df)
    }

    /// Convert a text-typed frame into collision records.
    pub fn from_frame(df: &DataFrame) -> Result<Dataset, LoaderError> {
        let height = df.height();
        let columns = Self::column_names(df)?;

        let latitudes = Self::required_column(df, LATITUDE)?;
        let longitudes = Self::required_column(df, LONGITUDE)?;
        let timestamps = Self::timestamps(df)?;

        let injured_persons = Self::optional_column(df, INJURED_PERSONS)?;
        let injured_pedestrians = Self::optional_column(df, INJURED_PEDESTRIANS)?;
        let injured_cyclists = Self::optional_column(df, INJURED_CYCLISTS)?;
        let injured_motorists = Self::optional_column(df, INJURED_MOTORISTS)?;
        let streets = Self::optional_column(df, ON_STREET_NAME)?;

        let mut records = Vec::with_capacity(height);
        let mut unparsed_timestamps = 0usize;
        for i in 0..height {
            let coords = (
                latitudes[i].as_deref().and_then(parse_coordinate),
                longitudes[i].as_deref().and_then(parse_coordinate),
            );
            let (Some(latitude), Some(longitude)) = coords else {
                continue;
            };

            let timestamp = timestamps[i];
            if timestamp.is_none() {
                unparsed_timestamps += 1;
            }

            records.push(CollisionRecord {
                timestamp,
                latitude,
                longitude,
                injured_persons: injured_persons[i].as_deref().and_then(parse_count),
                injured_pedestrians: injured_pedestrians[i].as_deref().and_then(parse_count),
                injured_cyclists: injured_cyclists[i].as_deref().and_then(parse_count),
                injured_motorists: injured_motorists[i].as_deref().and_then(parse_count),
                on_street_name: streets[i].clone(),
            });
        }

        debug!(
            rows = height,
            kept = records.len(),
            dropped = height - records.len(),
            "Dropped rows without coordinates"
        );
        if unparsed_timestamps > 0 {
            warn!(count = unparsed_timestamps, "Rows with missing or unparsable crash timestamp");
        }

        Ok(Dataset::new(columns, records))
    }

    /// Lowercased column names. Separate date and time columns are reported
    /// as the single merged timestamp column.
    fn column_names(df: &DataFrame) -> Result<Vec<String>, LoaderError> {
        let mut names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|c| c.as_str().trim().to_lowercase())
            .collect();

        {
            let mut seen = HashSet::new();
            if let Some(dup) = names.iter().find(|n| !seen.insert(n.as_str())) {
                return Err(LoaderError::DataUnavailable(format!(
                    "duplicate column '{}'",
                    dup
                )));
            }
        }

        let position = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));
        let merged = position(CRASH_DATE_TIME);
        let (date, time) = (position(CRASH_DATE), position(CRASH_TIME));
        if let (None, Some(date), Some(time)) = (merged, date, time) {
            names[date] = CRASH_DATE_TIME[0].to_string();
            names.remove(time);
        }
        Ok(names)
    }

    /// Combined crash timestamp per row, from either the merged column or
    /// the separate date and time columns.
    fn timestamps(df: &DataFrame) -> Result<Vec<Option<NaiveDateTime>>, LoaderError> {
        if let Some(combined) = Self::text_column(df, CRASH_DATE_TIME)? {
            return Ok(combined
                .iter()
                .map(|v| v.as_deref().and_then(parse_combined_timestamp))
                .collect());
        }

        let dates = Self::required_column(df, CRASH_DATE)?;
        let times = Self::required_column(df, CRASH_TIME)?;
        Ok(dates
            .iter()
            .zip(times.iter())
            .map(|(date, time)| match (date, time) {
                (Some(date), Some(time)) => parse_timestamp(date, time),
                _ => None,
            })
            .collect())
    }

    fn required_column(
        df: &DataFrame,
        aliases: &[&str],
    ) -> Result<Vec<Option<String>>, LoaderError> {
        Self::text_column(df, aliases)?.ok_or_else(|| {
            LoaderError::DataUnavailable(format!("missing required column '{}'", aliases[0]))
        })
    }

    /// Absent optional columns become all-missing instead of failing the load.
    fn optional_column(
        df: &DataFrame,
        aliases: &[&str],
    ) -> Result<Vec<Option<String>>, LoaderError> {
        match Self::text_column(df, aliases)? {
            Some(values) => Ok(values),
            None => {
                warn!(column = aliases[0], "Optional column missing; treating values as null");
                Ok(vec![None; df.height()])
            }
        }
    }

    /// Look a column up by case-insensitive name and return its trimmed,
    /// non-blank values.
    fn text_column(
        df: &DataFrame,
        aliases: &[&str],
    ) -> Result<Option<Vec<Option<String>>>, LoaderError> {
        let Some(column) = df.get_columns().iter().find(|col| {
            let name = col.name().as_str().trim().to_lowercase();
            aliases.contains(&name.as_str())
        }) else {
            return Ok(None);
        };

        let as_text = column.cast(&DataType::String)?;
        let values = as_text
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|v| {
                v.map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            })
            .collect();
        Ok(Some(values))
    }
}

/// Parse a date field and a time field into one timestamp.
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = parse_date(date)?;
    let time = parse_time(time)?;
    Some(date.and_time(time))
}

/// Parse an already merged `"<date> <time>"` or `"<date>T<time>"` value.
pub fn parse_combined_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let (date, time) = raw.trim().split_once([' ', 'T'])?;
    parse_timestamp(date, time)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // ISO exports carry a midnight time on the date column
    let day = raw.trim().split(['T', ' ']).next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    let raw = raw.split('.').next().unwrap_or(raw);
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Non-negative integral count. Float renderings such as `"2.0"` are accepted.
fn parse_count(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    let value: f64 = raw.parse().ok()?;
    let integral = value.is_finite() && value >= 0.0 && value.fract() == 0.0;
    (integral && value <= u32::MAX as f64).then_some(value as u32)
}

/// Caller-owned memo of loaded datasets keyed by row limit.
///
/// Entries live as long as the cache; a failed load is never stored.
pub struct DatasetCache<F: Fetch> {
    source: F,
    entries: HashMap<usize, Arc<Dataset>>,
}

impl<F: Fetch> DatasetCache<F> {
    pub fn new(source: F) -> Self {
        Self {
            source,
            entries: HashMap::new(),
        }
    }

    /// Return the dataset for `row_limit`, fetching it on first use.
    pub fn load(&mut self, row_limit: usize) -> Result<Arc<Dataset>, LoaderError> {
        check_row_limit(row_limit)?;

        if let Some(dataset) = self.entries.get(&row_limit) {
            debug!(row_limit, "Dataset cache hit");
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(DatasetLoader::load(&self.source, row_limit)?);
        info!(
            source = %self.source.describe(),
            row_limit,
            records = dataset.len(),
            "Loaded collision dataset"
        );
        self.entries.insert(row_limit, Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Cached dataset for `row_limit`, without fetching.
    pub fn get(&self, row_limit: usize) -> Option<Arc<Dataset>> {
        self.entries.get(&row_limit).cloned()
    }

    pub fn contains(&self, row_limit: usize) -> bool {
        self.entries.contains_key(&row_limit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached dataset.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn source(&self) -> &F {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::InMemorySource;
    use chrono::Timelike;

    const SAMPLE: &str = "\
CRASH_DATE,CRASH_TIME,LATITUDE,LONGITUDE,INJURED_PERSONS,INJURED_PEDESTRIANS,INJURED_CYCLISTS,INJURED_MOTORISTS,ON_STREET_NAME
01/01/2020,5:30,40.7,-73.9,2,2,0,0,Main St
01/01/2020,05:45,40.71,-73.91,1,1,0,0,Elm St
01/02/2020,17:05,,-73.92,3,0,3,0,Broadway
01/02/2020,23:59,40.72,-73.93,,,,,
";

    #[test]
    fn parse_csv_drops_rows_without_coordinates() {
        let ds = DatasetLoader::parse_csv(SAMPLE.as_bytes().to_vec(), 100).unwrap();
        assert_eq!(ds.len(), 3);
        assert!(ds.iter().all(|r| r.latitude.is_finite() && r.longitude.is_finite()));
    }

    #[test]
    fn parse_csv_lowercases_columns() {
        let ds = DatasetLoader::parse_csv(SAMPLE.as_bytes().to_vec(), 100).unwrap();
        assert_eq!(ds.columns().len(), 8);
        assert!(ds.columns().iter().all(|c| *c == c.to_lowercase()));
        assert_eq!(ds.columns()[0], "crash_date_crash_time");
        assert!(!ds.columns().iter().any(|c| c == "crash_time"));
    }

    #[test]
    fn parse_csv_combines_date_and_time() {
        let ds = DatasetLoader::parse_csv(SAMPLE.as_bytes().to_vec(), 100).unwrap();
        let first = ds.records()[0].timestamp.unwrap();
        assert_eq!(first.date(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!((first.hour(), first.minute()), (5, 30));
    }

    #[test]
    fn parse_csv_keeps_missing_counts_as_none() {
        let ds = DatasetLoader::parse_csv(SAMPLE.as_bytes().to_vec(), 100).unwrap();
        let last = ds.records().last().unwrap();
        assert_eq!(last.injured_persons, None);
        assert_eq!(last.on_street_name, None);
        assert_eq!(ds.records()[1].on_street_name.as_deref(), Some("Elm St"));
    }

    #[test]
    fn row_limit_caps_source_rows_before_dropping() {
        // Third source row has no latitude, so three rows keep two records
        let ds = DatasetLoader::parse_csv(SAMPLE.as_bytes().to_vec(), 3).unwrap();
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn zero_row_limit_is_invalid() {
        let err = DatasetLoader::parse_csv(SAMPLE.as_bytes().to_vec(), 0).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidArgument(_)));
    }

    #[test]
    fn missing_coordinate_column_is_data_unavailable() {
        let csv = "CRASH_DATE,CRASH_TIME,LATITUDE\n01/01/2020,5:30,40.7\n";
        let err = DatasetLoader::parse_csv(csv.as_bytes().to_vec(), 10).unwrap_err();
        assert!(matches!(err, LoaderError::DataUnavailable(msg) if msg.contains("longitude")));
    }

    #[test]
    fn missing_optional_columns_degrade_to_none() {
        let csv = "CRASH_DATE,CRASH_TIME,LATITUDE,LONGITUDE\n01/01/2020,5:30,40.7,-73.9\n";
        let ds = DatasetLoader::parse_csv(csv.as_bytes().to_vec(), 10).unwrap();
        assert_eq!(ds.len(), 1);
        let r = &ds.records()[0];
        assert_eq!(r.injured_persons, None);
        assert_eq!(r.injured_motorists, None);
        assert_eq!(r.on_street_name, None);
    }

    #[test]
    fn official_export_headers_are_recognised() {
        let csv = "\
CRASH DATE,CRASH TIME,LATITUDE,LONGITUDE,NUMBER OF PERSONS INJURED,ON STREET NAME
2021-09-11T00:00:00.000,2:39,40.66,-73.86,2,WHITESTONE EXPRESSWAY
";
        let ds = DatasetLoader::parse_csv(csv.as_bytes().to_vec(), 10).unwrap();
        let r = &ds.records()[0];
        assert_eq!(r.injured_persons, Some(2));
        assert_eq!(r.timestamp.map(|t| (t.hour(), t.minute())), Some((2, 39)));
        assert_eq!(
            ds.columns(),
            [
                "crash_date_crash_time",
                "latitude",
                "longitude",
                "number of persons injured",
                "on street name"
            ]
        );
    }

    #[test]
    fn merged_timestamp_column_is_used() {
        let csv = "crash_date_crash_time,latitude,longitude\n2020-01-01 05:30:00,40.7,-73.9\n";
        let ds = DatasetLoader::parse_csv(csv.as_bytes().to_vec(), 10).unwrap();
        assert_eq!(ds.records()[0].timestamp.map(|t| t.minute()), Some(30));
    }

    #[test]
    fn merged_timestamp_column_keeps_its_name() {
        let csv = "LATITUDE,CRASH_DATE_CRASH_TIME,LONGITUDE\n40.7,2020-01-01 05:30:00,-73.9\n";
        let ds = DatasetLoader::parse_csv(csv.as_bytes().to_vec(), 10).unwrap();
        assert_eq!(ds.columns(), ["latitude", "crash_date_crash_time", "longitude"]);
    }

    #[test]
    fn headers_differing_only_in_case_are_rejected() {
        let csv = "CRASH_DATE,CRASH_TIME,LATITUDE,latitude,LONGITUDE\n01/01/2020,5:30,,40.7,-73.9\n";
        let err = DatasetLoader::parse_csv(csv.as_bytes().to_vec(), 10).unwrap_err();
        assert!(matches!(err, LoaderError::DataUnavailable(msg) if msg.contains("duplicate column 'latitude'")));
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("07/29/2019", "0:00").is_some());
        assert!(parse_timestamp("2019-07-29", "17:05:00").is_some());
        assert!(parse_timestamp("2019-07-29T00:00:00.000", "23:59").is_some());
        assert!(parse_timestamp("not a date", "5:30").is_none());
        assert!(parse_timestamp("07/29/2019", "25:00").is_none());
        assert!(parse_combined_timestamp("2019-07-29T05:30:00").is_some());
    }

    #[test]
    fn count_parsing() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count("2.0"), Some(2));
        assert_eq!(parse_count("1.5"), None);
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("n/a"), None);
    }

    #[test]
    fn cache_rejects_zero_before_fetching() {
        let mut cache = DatasetCache::new(InMemorySource::new("sample", SAMPLE));
        assert!(matches!(cache.load(0), Err(LoaderError::InvalidArgument(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_returns_shared_dataset() {
        let mut cache = DatasetCache::new(InMemorySource::new("sample", SAMPLE));
        let a = cache.load(10).unwrap();
        let b = cache.load(10).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        let c = cache.load(2).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(!cache.contains(10));
    }
}
