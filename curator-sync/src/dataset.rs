//! Dataset type tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Closed set of importable datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatasetType {
    Schedule,
    FoodVendors,
}

impl DatasetType {
    pub const ALL: [DatasetType; 2] = [DatasetType::Schedule, DatasetType::FoodVendors];

    /// Canonical type tag.
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetType::Schedule => "schedule",
            DatasetType::FoodVendors => "foodVendors",
        }
    }

    /// Comma-separated canonical tags, for error messages.
    pub fn known() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schedule" => Ok(DatasetType::Schedule),
            "foodVendors" | "vendors" | "food-vendors" => Ok(DatasetType::FoodVendors),
            other => Err(SyncError::UnknownDataset(other.to_string())),
        }
    }
}
