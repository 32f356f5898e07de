//! Dashboard Configuration
//! Settings with defaults, optionally read from a JSON file.

use crate::data::{DataSource, InjuryType, DEFAULT_DATA_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_TOP_STREETS};
use crate::stats::DEFAULT_HEX_RADIUS_M;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Rows read from the source by default
pub const DEFAULT_ROW_LIMIT: usize = 10_000;
/// Highest selectable injured-persons threshold
pub const MAX_INJURED_THRESHOLD: u32 = 19;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// User settings for the collision report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// URL or local path of the collision CSV
    pub source: String,
    pub row_limit: usize,
    pub min_injured: u32,
    pub hour: u32,
    pub injury_type: InjuryType,
    pub top_streets_limit: usize,
    pub hex_radius_m: f64,
    /// Charts are only written when set
    pub output_dir: Option<PathBuf>,
    pub http_timeout_secs: u64,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_DATA_URL.to_string(),
            row_limit: DEFAULT_ROW_LIMIT,
            min_injured: 0,
            hour: 0,
            injury_type: InjuryType::default(),
            top_streets_limit: DEFAULT_TOP_STREETS,
            hex_radius_m: DEFAULT_HEX_RADIUS_M,
            output_dir: None,
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
            chart_width: 900,
            chart_height: 600,
        }
    }
}

impl DashboardConfig {
    /// Read settings from a JSON file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_limit == 0 {
            return Err(ConfigError::Invalid("row_limit must be positive".into()));
        }
        if self.top_streets_limit == 0 {
            return Err(ConfigError::Invalid("top_streets_limit must be positive".into()));
        }
        if self.min_injured > MAX_INJURED_THRESHOLD {
            return Err(ConfigError::Invalid(format!(
                "min_injured must be between 0 and {}",
                MAX_INJURED_THRESHOLD
            )));
        }
        if self.hour > 23 {
            return Err(ConfigError::Invalid("hour must be between 0 and 23".into()));
        }
        if self.hex_radius_m.is_nan() || self.hex_radius_m <= 0.0 {
            return Err(ConfigError::Invalid("hex_radius_m must be positive".into()));
        }
        if self.chart_width == 0 || self.chart_height == 0 {
            return Err(ConfigError::Invalid("chart size must be non-zero".into()));
        }
        Ok(())
    }

    /// Resolved data source with the configured download timeout.
    pub fn data_source(&self) -> DataSource {
        DataSource::parse(&self.source).with_timeout(Duration::from_secs(self.http_timeout_secs))
    }

    pub fn chart_size(&self) -> (u32, u32) {
        (self.chart_width, self.chart_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DashboardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.row_limit, 10_000);
        assert_eq!(config.top_streets_limit, 5);
        assert!(matches!(config.data_source(), DataSource::Url { .. }));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            DashboardConfig::from_json(r#"{"row_limit": 500, "injury_type": "cyclists"}"#).unwrap();
        assert_eq!(config.row_limit, 500);
        assert_eq!(config.injury_type, InjuryType::Cyclists);
        assert_eq!(config.hex_radius_m, DEFAULT_HEX_RADIUS_M);
        assert_eq!(config.output_dir, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            DashboardConfig::from_json(r#"{"row_limit": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            DashboardConfig::from_json(r#"{"hour": 24}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            DashboardConfig::from_json(r#"{"min_injured": 20}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            DashboardConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn local_source_is_a_path() {
        let config = DashboardConfig {
            source: "data/crashes.csv".into(),
            ..Default::default()
        };
        assert_eq!(
            config.data_source(),
            DataSource::Path(PathBuf::from("data/crashes.csv"))
        );
    }
}
