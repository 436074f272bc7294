//! Turns the records of one location into a map or grid figure.

use crate::config::FigureSettings;
use crate::data::Dataset;
use crate::error::{FigureError, FigureResult};
use crate::figure::{FigureDescription, HoverLabel, Layout, PlotPoint, PointGroup, Viewport};
use crate::types::{ChangeClass, Record, ViewMode};
use geo::Coord;
use std::cmp::Ordering;
use tracing::debug;

/// Builds the figure for `location` with the default settings.
pub fn build_figure(
    dataset: &Dataset,
    location: &str,
    mode: ViewMode,
) -> FigureResult<FigureDescription> {
    build_figure_with(dataset, location, mode, &FigureSettings::default())
}

pub fn build_figure_with(
    dataset: &Dataset,
    location: &str,
    mode: ViewMode,
    settings: &FigureSettings,
) -> FigureResult<FigureDescription> {
    if !dataset.contains_location(location) {
        return Err(FigureError::NotFound {
            location: location.to_string(),
        });
    }
    if settings.grid_columns == 0 {
        return Err(FigureError::InvalidArgument(
            "grid_columns must be at least 1".to_string(),
        ));
    }

    let records: Vec<&Record> = dataset.records_for(location).collect();
    debug!(location, %mode, records = records.len(), "Building figure");

    if records.is_empty() {
        return Ok(FigureDescription::placeholder(location, mode, settings));
    }

    let figure = match mode {
        ViewMode::Map => map_figure(dataset, &records, location, settings),
        ViewMode::Grid => grid_figure(&records, location, settings),
    };
    Ok(figure)
}

fn map_figure(
    dataset: &Dataset,
    records: &[&Record],
    location: &str,
    settings: &FigureSettings,
) -> FigureDescription {
    let crs = dataset.crs();

    let points: Vec<PlotPoint> = records
        .iter()
        .map(|record| {
            let lon_lat = crs.to_lon_lat(record.position);
            PlotPoint {
                position: lon_lat.into(),
                marker_size: record.marker_size,
                color: record.color.clone(),
                hover_text: hover_text(ChangeClass::classify(record.tree_cover_change), record),
                tree_cover_change: record.tree_cover_change,
                sequence: None,
            }
        })
        .collect();

    let count = points.len() as f64;
    let center = Coord {
        x: points.iter().map(|p| p.position.x).sum::<f64>() / count,
        y: points.iter().map(|p| p.position.y).sum::<f64>() / count,
    };

    FigureDescription {
        mode: ViewMode::Map,
        groups: vec![PointGroup {
            name: "Points".to_string(),
            class: None,
            opacity: None,
            hover_label: hover_label(settings),
            points,
        }],
        layout: Layout::new(location, Viewport::map(center, settings), settings),
    }
}

fn grid_figure(records: &[&Record], location: &str, settings: &FigureSettings) -> FigureDescription {
    let mut ordered = records.to_vec();
    // sort_by is stable, ties keep dataset order
    ordered.sort_by(|a, b| cmp_change(a.tree_cover_change, b.tree_cover_change));

    let columns = settings.grid_columns;
    let mut buckets: [Vec<PlotPoint>; 3] = Default::default();

    for (i, record) in ordered.iter().enumerate() {
        let class = ChangeClass::classify(record.tree_cover_change);
        let color = match class {
            ChangeClass::NoChange => settings.no_change_color.clone(),
            _ => record.color.clone(),
        };

        buckets[bucket_index(class)].push(PlotPoint {
            position: grid_position(i, columns),
            marker_size: grid_marker_size(record.tree_cover_change, settings),
            color,
            hover_text: hover_text(class, record),
            tree_cover_change: record.tree_cover_change,
            sequence: Some(i),
        });
    }

    let groups = ChangeClass::ALL
        .into_iter()
        .zip(buckets)
        .filter(|(_, points)| !points.is_empty())
        .map(|(class, points)| PointGroup {
            name: class.label().to_string(),
            class: Some(class),
            opacity: Some(settings.grid_marker_opacity),
            hover_label: hover_label(settings),
            points,
        })
        .collect();

    FigureDescription {
        mode: ViewMode::Grid,
        groups,
        layout: Layout::new(location, Viewport::grid(), settings),
    }
}

fn bucket_index(class: ChangeClass) -> usize {
    match class {
        ChangeClass::Decrease => 0,
        ChangeClass::Increase => 1,
        ChangeClass::NoChange => 2,
    }
}

/// Numeric order with -0.0 == 0.0; NaN sorts last.
fn cmp_change(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

/// Row-major position in a grid that grows downward.
pub fn grid_position(index: usize, columns: usize) -> Coord<f64> {
    Coord {
        x: (index % columns) as f64,
        // 0.0 - row keeps the first row at +0.0
        y: 0.0 - (index / columns) as f64,
    }
}

pub fn grid_marker_size(change: f64, settings: &FigureSettings) -> f64 {
    if ChangeClass::classify(change) == ChangeClass::NoChange {
        settings.zero_change_marker_size
    } else {
        change.abs() / 2.0
    }
}

pub fn hover_text(class: ChangeClass, record: &Record) -> String {
    format!(
        "Type: {}<br>Change: {:.2} %<br>2002: {:.2} %<br>2022: {:.2} %",
        class.label(),
        unsigned_zero(record.tree_cover_change),
        unsigned_zero(record.tree_cover_2002),
        unsigned_zero(record.tree_cover_2022)
    )
}

/// Values that round to zero at two decimals print as `0.00`, never `-0.00`.
fn unsigned_zero(value: f64) -> f64 {
    if (value * 100.0).round() == 0.0 {
        0.0
    } else {
        value
    }
}

fn hover_label(settings: &FigureSettings) -> HoverLabel {
    HoverLabel {
        font_color: settings.hover_text_color.clone(),
        border_color: settings.hover_border_color.clone(),
    }
}
