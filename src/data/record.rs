//! Collision Record Module
//! Typed rows of the loaded collision table.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One crash from the source table.
///
/// Nullable source columns are kept as `Option` so that a missing value is
/// never confused with a zero count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub latitude: f64,
    pub longitude: f64,
    pub injured_persons: Option<u32>,
    pub injured_pedestrians: Option<u32>,
    pub injured_cyclists: Option<u32>,
    pub injured_motorists: Option<u32>,
    pub on_street_name: Option<String>,
}

impl CollisionRecord {
    /// Coordinates as a `(latitude, longitude)` pair.
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Injured count for the given category.
    pub fn injured(&self, injury_type: InjuryType) -> Option<u32> {
        match injury_type {
            InjuryType::Pedestrians => self.injured_pedestrians,
            InjuryType::Cyclists => self.injured_cyclists,
            InjuryType::Motorists => self.injured_motorists,
        }
    }
}

/// Immutable table of collision records produced by the loader.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<CollisionRecord>,
}

impl Dataset {
    /// Build a dataset, lowercasing every column name.
    pub fn new<I, S>(columns: I, records: Vec<CollisionRecord>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|c| c.as_ref().to_lowercase())
                .collect(),
            records,
        }
    }

    /// Source column names, lowercased.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[CollisionRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CollisionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a CollisionRecord;
    type IntoIter = std::slice::Iter<'a, CollisionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown injury type '{0}' (expected pedestrians, cyclists or motorists)")]
pub struct ParseInjuryTypeError(pub String);

/// Category of injured people.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjuryType {
    #[default]
    Pedestrians,
    Cyclists,
    Motorists,
}

impl InjuryType {
    pub const ALL: [InjuryType; 3] = [
        InjuryType::Pedestrians,
        InjuryType::Cyclists,
        InjuryType::Motorists,
    ];

    /// Lowercased source column holding this category's count.
    pub fn column(self) -> &'static str {
        match self {
            InjuryType::Pedestrians => "injured_pedestrians",
            InjuryType::Cyclists => "injured_cyclists",
            InjuryType::Motorists => "injured_motorists",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InjuryType::Pedestrians => "Pedestrians",
            InjuryType::Cyclists => "Cyclists",
            InjuryType::Motorists => "Motorists",
        }
    }
}

impl fmt::Display for InjuryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InjuryType {
    type Err = ParseInjuryTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pedestrians" | "pedestrian" => Ok(InjuryType::Pedestrians),
            "cyclists" | "cyclist" => Ok(InjuryType::Cyclists),
            "motorists" | "motorist" => Ok(InjuryType::Motorists),
            _ => Err(ParseInjuryTypeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_lowercases_columns() {
        let ds = Dataset::new(["CRASH_DATE", "Latitude", "on_street_name"], Vec::new());
        assert_eq!(ds.columns(), ["crash_date", "latitude", "on_street_name"]);
        assert!(ds.is_empty());
    }

    #[test]
    fn injury_type_parses_case_insensitively() {
        assert_eq!("Pedestrians".parse::<InjuryType>(), Ok(InjuryType::Pedestrians));
        assert_eq!(" CYCLISTS ".parse::<InjuryType>(), Ok(InjuryType::Cyclists));
        assert_eq!("motorist".parse::<InjuryType>(), Ok(InjuryType::Motorists));
        assert!("drivers".parse::<InjuryType>().is_err());
    }

    #[test]
    fn injury_type_defaults_to_pedestrians() {
        assert_eq!(InjuryType::default(), InjuryType::Pedestrians);
    }

    #[test]
    fn injured_selects_matching_field() {
        let record = CollisionRecord {
            timestamp: None,
            latitude: 40.7,
            longitude: -73.9,
            injured_persons: Some(3),
            injured_pedestrians: Some(1),
            injured_cyclists: None,
            injured_motorists: Some(2),
            on_street_name: None,
        };
        assert_eq!(record.injured(InjuryType::Pedestrians), Some(1));
        assert_eq!(record.injured(InjuryType::Cyclists), None);
        assert_eq!(record.injured(InjuryType::Motorists), Some(2));
        assert_eq!(InjuryType::Cyclists.column(), "injured_cyclists");
    }
}
