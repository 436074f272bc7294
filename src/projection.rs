//! Inverse projections from the dataset's native CRS to WGS84 longitude/latitude.
//!
//! Pure Rust, no libproj. Covers the systems tree cover exports come in:
//! geographic WGS84, Web Mercator, UTM zones and the MODIS sinusoidal grid.

use crate::error::FigureError;
use geo::Point;
use serde::Deserialize;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

// WGS84 ellipsoid
const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;
const E2: f64 = 2.0 * F - F * F;
const E_PRIME2: f64 = E2 / (1.0 - E2);
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Sphere radius of the MODIS land grid (SR-ORG:6842).
const MODIS_SPHERE_RADIUS: f64 = 6_371_007.181;

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SourceCrs {
    /// EPSG:4326, positions are already lon/lat.
    #[default]
    Wgs84,
    /// EPSG:3857
    WebMercator,
    /// EPSG:326xx (north) / 327xx (south)
    Utm { zone: u32, north: bool },
    /// SR-ORG:6842
    ModisSinusoidal,
}

impl SourceCrs {
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(SourceCrs::Wgs84),
            3857 | 900913 => Some(SourceCrs::WebMercator),
            32601..=32660 => Some(SourceCrs::Utm {
                zone: code - 32600,
                north: true,
            }),
            32701..=32760 => Some(SourceCrs::Utm {
                zone: code - 32700,
                north: false,
            }),
            _ => None,
        }
    }

    /// Reproject a native position to WGS84, returned as `Point(lon, lat)` in degrees.
    pub fn to_lon_lat(&self, position: Point<f64>) -> Point<f64> {
        match *self {
            SourceCrs::Wgs84 => position,
            SourceCrs::WebMercator => web_mercator_to_wgs84(position.x(), position.y()),
            SourceCrs::Utm { zone, north } => utm_to_wgs84(position.x(), position.y(), zone, north),
            SourceCrs::ModisSinusoidal => sinusoidal_to_wgs84(position.x(), position.y()),
        }
    }
}

impl FromStr for SourceCrs {
    type Err = FigureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        if normalized == "SR-ORG:6842" || normalized == "MODIS-SINUSOIDAL" {
            return Ok(SourceCrs::ModisSinusoidal);
        }

        let code = normalized
            .strip_prefix("EPSG:")
            .unwrap_or(&normalized)
            .parse::<u32>()
            .map_err(|_| FigureError::InvalidArgument(format!("unrecognized CRS '{}'", s)))?;

        SourceCrs::from_epsg(code)
            .ok_or_else(|| FigureError::InvalidArgument(format!("unsupported CRS EPSG:{}", code)))
    }
}

impl TryFrom<String> for SourceCrs {
    type Error = FigureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for SourceCrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceCrs::Wgs84 => f.write_str("EPSG:4326"),
            SourceCrs::WebMercator => f.write_str("EPSG:3857"),
            SourceCrs::Utm { zone, north: true } => write!(f, "EPSG:{}", 32600 + zone),
            SourceCrs::Utm { zone, north: false } => write!(f, "EPSG:{}", 32700 + zone),
            SourceCrs::ModisSinusoidal => f.write_str("SR-ORG:6842"),
        }
    }
}

fn web_mercator_to_wgs84(x: f64, y: f64) -> Point<f64> {
    let lon = (x / A).to_degrees();
    let lat = (2.0 * (y / A).exp().atan() - FRAC_PI_2).to_degrees();
    Point::new(lon, lat)
}

fn sinusoidal_to_wgs84(x: f64, y: f64) -> Point<f64> {
    let lat = y / MODIS_SPHERE_RADIUS;
    let cos_lat = lat.cos();
    let lon = if cos_lat.abs() < f64::EPSILON {
        0.0
    } else {
        x / (MODIS_SPHERE_RADIUS * cos_lat)
    };
    Point::new(lon.clamp(-PI, PI).to_degrees(), lat.to_degrees())
}

// Snyder 1987, USGS Prof. Paper 1395, eqs. 8-17 to 8-25 and 3-26.
fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> Point<f64> {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let lon0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let sqrt_1me2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    // Footpoint latitude
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let denom = 1.0 - E2 * sin_phi1 * sin_phi1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = lon0
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d5
                / 120.0)
            / cos_phi1;

    Point::new(lon.to_degrees(), lat.to_degrees())
}
