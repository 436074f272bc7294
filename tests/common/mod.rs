#![allow(dead_code)]

use canopy_dash::projection::SourceCrs;
use canopy_dash::{Dataset, Record};
use geo::Point;

pub fn record(location: &str, x: f64, y: f64, change: f64) -> Record {
    Record {
        location: location.to_string(),
        position: Point::new(x, y),
        tree_cover_change: change,
        tree_cover_2002: 30.0,
        tree_cover_2022: 30.0 + change,
        color: if change < 0.0 { "#d73027" } else { "#1a9850" }.to_string(),
        marker_size: 4.0,
    }
}

/// Three Lagos cells given in unsorted order, plus an unrelated city.
pub fn lagos_dataset(crs: SourceCrs) -> Dataset {
    Dataset::new(
        vec![
            record("Lagos", 3.30, 6.40, 3.0),
            record("Nairobi", 36.80, -1.30, -1.0),
            record("Lagos", 3.40, 6.50, -5.0),
            record("Lagos", 3.50, 6.60, 0.0),
        ],
        crs,
    )
}
