//! Data module - collision CSV loading and queries

mod loader;
mod processor;
mod record;
mod source;

pub use loader::{parse_combined_timestamp, parse_timestamp, DatasetCache, DatasetLoader, LoaderError};
pub use processor::{DataProcessor, Point, DEFAULT_TOP_STREETS, MINUTES_PER_HOUR};
pub use record::{CollisionRecord, Dataset, InjuryType, ParseInjuryTypeError};
pub use source::{DataSource, Fetch, InMemorySource, DEFAULT_DATA_URL, DEFAULT_TIMEOUT_SECS};
