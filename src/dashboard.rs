use crate::config::FigureSettings;
use crate::data::Dataset;
use crate::figure::FigureDescription;
use crate::figure_builder::build_figure_with;
use crate::types::ViewMode;
use serde::Serialize;
use tracing::warn;

/// City list shown when no records could be loaded.
pub const NO_DATA_SENTINEL: &str = "No data available";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigurePair {
    pub figure1: FigureDescription,
    pub figure2: FigureDescription,
}

/// Owns the loaded dataset and answers the two-city comparison requests.
#[derive(Debug)]
pub struct Dashboard {
    dataset: Dataset,
    cities: Vec<String>,
    settings: FigureSettings,
}

impl Dashboard {
    pub fn new(dataset: Dataset, settings: FigureSettings) -> Self {
        let cities = if dataset.locations().is_empty() {
            vec![NO_DATA_SENTINEL.to_string()]
        } else {
            dataset.locations().to_vec()
        };
        Self {
            dataset,
            cities,
            settings,
        }
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    /// Initial dropdown values: the first two cities.
    pub fn default_selection(&self) -> (&str, &str) {
        let first = self.cities[0].as_str();
        let second = self.cities.get(1).map(String::as_str).unwrap_or(first);
        (first, second)
    }

    /// Figures for both selectors. Unknown cities render as empty placeholders.
    pub fn update(&self, city1: &str, city2: &str, mode: ViewMode) -> FigurePair {
        let (figure1, figure2) = rayon::join(
            || self.figure_for(city1, mode),
            || self.figure_for(city2, mode),
        );
        FigurePair { figure1, figure2 }
    }

    pub fn figure_for(&self, city: &str, mode: ViewMode) -> FigureDescription {
        match build_figure_with(&self.dataset, city, mode, &self.settings) {
            Ok(figure) => figure,
            Err(e) => {
                if !self.dataset.is_empty() {
                    warn!("Showing empty figure for '{}': {}", city, e);
                }
                FigureDescription::placeholder(city, mode, &self.settings)
            }
        }
    }
}
