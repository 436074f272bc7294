//! Renderer-agnostic figure descriptions.
//!
//! A `FigureDescription` is built fresh for every request and handed to the
//! plotting layer as JSON. Positions are lon/lat in map view and column/row
//! in grid view.

use crate::config::FigureSettings;
use crate::types::{ChangeClass, ViewMode};
use geo::Coord;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureDescription {
    pub mode: ViewMode,
    pub groups: Vec<PointGroup>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointGroup {
    pub name: String,
    /// `None` for the single mixed group of the map view.
    pub class: Option<ChangeClass>,
    pub opacity: Option<f64>,
    pub hover_label: HoverLabel,
    pub points: Vec<PlotPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotPoint {
    pub position: Coord<f64>,
    pub marker_size: f64,
    pub color: String,
    pub hover_text: String,
    pub tree_cover_change: f64,
    /// Rank in the sorted grid layout.
    pub sequence: Option<usize>,
}

/// Hover box styling shared by every point of a group. The box background
/// follows each point's marker color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverLabel {
    pub font_color: String,
    pub border_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    pub height: u32,
    pub margin: Margin,
    pub paper_bgcolor: String,
    pub plot_bgcolor: String,
    pub show_legend: bool,
    pub viewport: Viewport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub family: String,
    pub size: u32,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Viewport {
    Map {
        style: String,
        center: Coord<f64>, // x = lon, y = lat
        zoom: f64,
    },
    Grid {
        x_axis: Axis,
        y_axis: Axis,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Axis {
    pub show_grid: bool,
    pub show_tick_labels: bool,
    pub zero_line: bool,
}

impl Axis {
    pub fn hidden() -> Self {
        Self {
            show_grid: false,
            show_tick_labels: false,
            zero_line: false,
        }
    }
}

const TRANSPARENT: &str = "rgba(0,0,0,0)";

impl Layout {
    pub fn new(title: &str, viewport: Viewport, settings: &FigureSettings) -> Self {
        let family = match &viewport {
            Viewport::Map { .. } => &settings.map_title_font_family,
            Viewport::Grid { .. } => &settings.title_font_family,
        };
        Self {
            title: Title {
                text: title.to_string(),
                x: 0.5,
                y: 0.98,
                font: Font {
                    family: family.clone(),
                    size: settings.title_font_size,
                    color: settings.title_color.clone(),
                },
            },
            height: settings.height,
            margin: Margin {
                l: 5,
                r: 5,
                t: 30,
                b: 5,
            },
            paper_bgcolor: TRANSPARENT.to_string(),
            plot_bgcolor: TRANSPARENT.to_string(),
            show_legend: false,
            viewport,
        }
    }
}

impl Viewport {
    pub fn map(center: Coord<f64>, settings: &FigureSettings) -> Self {
        Viewport::Map {
            style: settings.map_style.clone(),
            center,
            zoom: settings.map_zoom,
        }
    }

    pub fn grid() -> Self {
        Viewport::Grid {
            x_axis: Axis::hidden(),
            y_axis: Axis::hidden(),
        }
    }
}

impl FigureDescription {
    /// Figure with no points, used when a location has nothing to show.
    pub fn placeholder(title: &str, mode: ViewMode, settings: &FigureSettings) -> Self {
        let viewport = match mode {
            ViewMode::Map => Viewport::map(Coord { x: 0.0, y: 0.0 }, settings),
            ViewMode::Grid => Viewport::grid(),
        };
        Self {
            mode,
            groups: Vec::new(),
            layout: Layout::new(title, viewport, settings),
        }
    }

    pub fn point_count(&self) -> usize {
        self.groups.iter().map(|g| g.points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }

    pub fn group(&self, class: ChangeClass) -> Option<&PointGroup> {
        self.groups.iter().find(|g| g.class == Some(class))
    }

    pub fn points(&self) -> impl Iterator<Item = &PlotPoint> {
        self.groups.iter().flat_map(|g| g.points.iter())
    }
}
