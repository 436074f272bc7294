use crate::projection::SourceCrs;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub figure: FigureSettings,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub dataset: PathBuf, // .geojson, .shp or .csv
    #[serde(default)]
    pub source_crs: SourceCrs,
    #[serde(default)]
    pub columns: ColumnConfig,
}

/// Attribute names in the dataset file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnConfig {
    pub location: String,
    pub tree_cover_change: String,
    pub tree_cover_2002: String,
    pub tree_cover_2022: String,
    pub color: String,
    pub marker_size: String,
    // CSV only
    pub x: String,
    pub y: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            location: "location".to_string(),
            tree_cover_change: "tree_cover_change".to_string(),
            tree_cover_2002: "tree_cover_2002".to_string(),
            tree_cover_2022: "tree_cover_2022".to_string(),
            color: "color".to_string(),
            marker_size: "markersize".to_string(),
            x: "x".to_string(),
            y: "y".to_string(),
        }
    }
}

/// Constants the figure builder lays figures out with.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FigureSettings {
    pub grid_columns: usize,
    pub map_zoom: f64,
    pub map_style: String,
    pub no_change_color: String,
    pub zero_change_marker_size: f64,
    pub grid_marker_opacity: f64,
    pub hover_text_color: String,
    pub hover_border_color: String,
    pub height: u32,
    pub title_font_family: String,
    pub map_title_font_family: String,
    pub title_font_size: u32,
    pub title_color: String,
}

impl Default for FigureSettings {
    fn default() -> Self {
        Self {
            grid_columns: 80,
            map_zoom: 10.0,
            map_style: "carto-positron".to_string(),
            no_change_color: "#E6E6E6".to_string(),
            zero_change_marker_size: 0.1,
            grid_marker_opacity: 0.9,
            hover_text_color: "white".to_string(),
            hover_border_color: "rgba(255,255,255,1.0)".to_string(),
            height: 600,
            title_font_family: "Open Sans, sans-serif".to_string(),
            map_title_font_family: "Open Sans, sans-serif bold".to_string(),
            title_font_size: 12,
            title_color: "black".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8050,
            static_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
