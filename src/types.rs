use crate::error::FigureError;
use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One grid cell of the tree cover dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub location: String,
    // Native CRS of the dataset, see `Dataset::crs`
    pub position: Point<f64>,
    pub tree_cover_change: f64,
    pub tree_cover_2002: f64,
    pub tree_cover_2022: f64,
    pub color: String,
    pub marker_size: f64,
}

/// Direction of the 2002 -> 2022 change for a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeClass {
    Decrease,
    Increase,
    NoChange,
}

impl ChangeClass {
    /// Group order used by the grid view.
    pub const ALL: [ChangeClass; 3] = [
        ChangeClass::Decrease,
        ChangeClass::Increase,
        ChangeClass::NoChange,
    ];

    /// Classifies on the numeric value. NaN falls through to `NoChange`.
    pub fn classify(change: f64) -> Self {
        if change < 0.0 {
            ChangeClass::Decrease
        } else if change > 0.0 {
            ChangeClass::Increase
        } else {
            ChangeClass::NoChange
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChangeClass::Decrease => "Decrease",
            ChangeClass::Increase => "Increase",
            ChangeClass::NoChange => "No Change",
        }
    }
}

impl fmt::Display for ChangeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Map,
    Grid,
}

impl FromStr for ViewMode {
    type Err = FigureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "map" => Ok(ViewMode::Map),
            "grid" => Ok(ViewMode::Grid),
            other => Err(FigureError::InvalidArgument(format!(
                "unknown view mode '{}', expected 'map' or 'grid'",
                other
            ))),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Map => f.write_str("map"),
            ViewMode::Grid => f.write_str("grid"),
        }
    }
}
