//! Data Source Module
//! Retrieves raw CSV bytes from a URL or a local file.

use crate::data::LoaderError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Public NYC motor vehicle collision extract used by default.
pub const DEFAULT_DATA_URL: &str = "https://media.githubusercontent.com/media/chairielazizi/streamlit-collision/master/Motor_Vehicle_Collisions_-_Crashes.csv";

/// Default HTTP timeout for dataset downloads.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Anything that can hand over the raw bytes of a CSV resource.
pub trait Fetch {
    fn fetch(&self) -> Result<Vec<u8>, LoaderError>;

    /// Human readable location, used in logs and error messages.
    fn describe(&self) -> String;
}

/// Where the collision CSV lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Url { url: String, timeout: Duration },
    Path(PathBuf),
}

impl DataSource {
    /// Interpret a string as a URL when it has an http(s) scheme, else as a path.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url {
                url: location.to_string(),
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            }
        } else {
            DataSource::Path(PathBuf::from(location))
        }
    }

    /// Override the download timeout. Has no effect on local paths.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match self {
            DataSource::Url { url, .. } => DataSource::Url { url, timeout },
            other => other,
        }
    }

    fn download(url: &str, timeout: Duration) -> Result<Vec<u8>, LoaderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        let response = client.get(url).send()?.error_for_status()?;
        let bytes = response.bytes()?;
        Ok(bytes.to_vec())
    }
}

impl Default for DataSource {
    fn default() -> Self {
        Self::parse(DEFAULT_DATA_URL)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Url { url, .. } => f.write_str(url),
            DataSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Fetch for DataSource {
    fn fetch(&self) -> Result<Vec<u8>, LoaderError> {
        info!(source = %self, "Fetching collision dataset");
        let bytes = match self {
            DataSource::Url { url, timeout } => Self::download(url, *timeout)?,
            DataSource::Path(path) => std::fs::read(path).map_err(|e| {
                LoaderError::DataUnavailable(format!("{}: {}", path.display(), e))
            })?,
        };
        debug!(bytes = bytes.len(), "Dataset fetched");
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// In-memory CSV, handy for embedding small tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemorySource {
    name: String,
    bytes: Vec<u8>,
}

impl InMemorySource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl Fetch for InMemorySource {
    fn fetch(&self) -> Result<Vec<u8>, LoaderError> {
        Ok(self.bytes.clone())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl<T: Fetch + ?Sized> Fetch for &T {
    fn fetch(&self) -> Result<Vec<u8>, LoaderError> {
        (**self).fetch()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_detects_urls_and_paths() {
        assert!(matches!(
            DataSource::parse("https://example.com/crashes.csv"),
            DataSource::Url { .. }
        ));
        assert!(matches!(
            DataSource::parse("HTTP://example.com/a.csv"),
            DataSource::Url { .. }
        ));
        assert_eq!(
            DataSource::parse("data/crashes.csv"),
            DataSource::Path(PathBuf::from("data/crashes.csv"))
        );
    }

    #[test]
    fn with_timeout_only_changes_urls() {
        let src = DataSource::parse("https://example.com/a.csv").with_timeout(Duration::from_secs(5));
        assert_eq!(
            src,
            DataSource::Url {
                url: "https://example.com/a.csv".to_string(),
                timeout: Duration::from_secs(5),
            }
        );
        let path = DataSource::parse("a.csv").with_timeout(Duration::from_secs(5));
        assert_eq!(path, DataSource::Path(PathBuf::from("a.csv")));
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let src = DataSource::Path(PathBuf::from("/definitely/not/here.csv"));
        assert!(matches!(src.fetch(), Err(LoaderError::DataUnavailable(_))));
    }
}
