use crate::config::{ColumnConfig, InputConfig};
use crate::projection::SourceCrs;
use crate::types::Record;
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::Point;
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Read-only handle over the loaded records.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<Record>,
    locations: Vec<String>,
    crs: SourceCrs,
}

impl Dataset {
    pub fn new(records: Vec<Record>, crs: SourceCrs) -> Self {
        let locations: BTreeSet<&str> = records.iter().map(|r| r.location.as_str()).collect();
        let locations = locations.into_iter().map(str::to_string).collect();
        Self {
            records,
            locations,
            crs,
        }
    }

    pub fn empty(crs: SourceCrs) -> Self {
        Self::new(Vec::new(), crs)
    }

    /// Distinct locations, sorted ascending by byte order.
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn contains_location(&self, location: &str) -> bool {
        self.locations
            .binary_search_by(|l| l.as_str().cmp(location))
            .is_ok()
    }

    /// Records of one location in dataset order.
    pub fn records_for<'a>(&'a self, location: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| r.location == location)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn crs(&self) -> SourceCrs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn load_dataset(input: &InputConfig) -> Result<Dataset> {
    info!("Loading dataset from {:?}", input.dataset);

    let extension = input.dataset.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Dataset file has no extension"))?;

    let records = match extension.as_str() {
        "json" | "geojson" => load_geojson(&input.dataset, &input.columns)?,
        "shp" => load_shapefile(&input.dataset, &input.columns)?,
        "csv" => load_csv(&input.dataset, &input.columns)?,
        _ => return Err(anyhow!("Unsupported dataset format: {}", extension)),
    };

    let dataset = Dataset::new(records, input.source_crs);
    info!(
        records = dataset.len(),
        locations = dataset.locations().len(),
        crs = %dataset.crs(),
        "Dataset loaded"
    );
    Ok(dataset)
}

/// Loads the dataset, degrading to an empty one when the file is missing or broken.
pub fn load_or_empty(input: &InputConfig) -> Dataset {
    match load_dataset(input) {
        Ok(dataset) => dataset,
        Err(e) => {
            warn!("Error loading data: {:#}. Serving an empty dataset.", e);
            Dataset::empty(input.source_crs)
        }
    }
}

fn load_geojson(path: &Path, columns: &ColumnConfig) -> Result<Vec<Record>> {
    use geojson::{GeoJson, Value};
    use std::io::BufReader;

    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut records = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for (idx, feature) in collection.features.into_iter().enumerate() {
        let position = match feature.geometry.map(|g| g.value) {
            Some(Value::Point(coords)) if coords.len() >= 2 => Point::new(coords[0], coords[1]),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let Some(props) = feature.properties else {
            skipped += 1;
            continue;
        };

        let location = match props.get(&columns.location) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let number = |name: &str| -> Result<f64> {
            let value = match props.get(name) {
                Some(serde_json::Value::Number(n)) => n.as_f64(),
                Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
                _ => None,
            };
            value.ok_or_else(|| anyhow!("Feature {}: '{}' is missing or not numeric", idx, name))
        };

        let color = match props.get(&columns.color) {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => return Err(anyhow!("Feature {}: '{}' is missing or not a string", idx, columns.color)),
        };

        records.push(Record {
            location,
            position,
            tree_cover_change: number(&columns.tree_cover_change)?,
            tree_cover_2002: number(&columns.tree_cover_2002)?,
            tree_cover_2022: number(&columns.tree_cover_2022)?,
            color,
            marker_size: number(&columns.marker_size)?,
        });
    }

    if skipped > 0 {
        debug!("Skipped {} features without a point geometry or location", skipped);
    }

    Ok(records)
}

fn load_shapefile(path: &Path, columns: &ColumnConfig) -> Result<Vec<Record>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (idx, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;

        let position = match shape {
            shapefile::Shape::Point(p) => Point::new(p.x, p.y),
            shapefile::Shape::PointM(p) => Point::new(p.x, p.y),
            shapefile::Shape::PointZ(p) => Point::new(p.x, p.y),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let location = match record.get(&columns.location) {
            Some(FieldValue::Character(Some(s))) if !s.trim().is_empty() => s.trim().to_string(),
            Some(FieldValue::Character(_)) => {
                skipped += 1;
                continue;
            }
            Some(_) => return Err(anyhow!("Shapefile location column must be a string")),
            None => {
                return Err(anyhow!(
                    "Location column '{}' not found in Shapefile",
                    columns.location
                ))
            }
        };

        let number = |name: &str| -> Result<f64> {
            record
                .get(name)
                .and_then(field_as_f64)
                .ok_or_else(|| anyhow!("Shape {}: '{}' is missing or not numeric", idx, name))
        };

        let color = match record.get(&columns.color) {
            Some(FieldValue::Character(Some(s))) => s.trim().to_string(),
            _ => return Err(anyhow!("Shape {}: '{}' is missing or not a string", idx, columns.color)),
        };

        records.push(Record {
            location,
            position,
            tree_cover_change: number(&columns.tree_cover_change)?,
            tree_cover_2002: number(&columns.tree_cover_2002)?,
            tree_cover_2022: number(&columns.tree_cover_2022)?,
            color,
            marker_size: number(&columns.marker_size)?,
        });
    }

    if skipped > 0 {
        debug!("Skipped {} shapes without a point geometry or location", skipped);
    }

    Ok(records)
}

fn field_as_f64(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Numeric(Some(v)) => Some(*v),
        FieldValue::Float(Some(v)) => Some(*v as f64),
        FieldValue::Double(v) => Some(*v),
        FieldValue::Integer(v) => Some(*v as f64),
        FieldValue::Currency(v) => Some(*v),
        FieldValue::Character(Some(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn load_csv(path: &Path, columns: &ColumnConfig) -> Result<Vec<Record>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr.headers()?.clone();

    let column_index = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h == name)
            .ok_or_else(|| anyhow!("Column '{}' not found in CSV", name))
    };

    let location_idx = column_index(&columns.location)?;
    let x_idx = column_index(&columns.x)?;
    let y_idx = column_index(&columns.y)?;
    let change_idx = column_index(&columns.tree_cover_change)?;
    let cover_2002_idx = column_index(&columns.tree_cover_2002)?;
    let cover_2022_idx = column_index(&columns.tree_cover_2022)?;
    let color_idx = column_index(&columns.color)?;
    let size_idx = column_index(&columns.marker_size)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let location = record.get(location_idx).unwrap_or("").trim();

        if location.is_empty() {
            skipped += 1;
            continue;
        }

        let number = |idx: usize| -> Result<f64> {
            let raw = record.get(idx).unwrap_or("");
            raw.trim().parse::<f64>().with_context(|| {
                format!("Row {}: '{}' is not a number in column '{}'", row + 1, raw, &headers[idx])
            })
        };

        let color = record.get(color_idx).unwrap_or("").trim();
        if color.is_empty() {
            return Err(anyhow!("Row {}: '{}' is missing", row + 1, columns.color));
        }

        records.push(Record {
            location: location.to_string(),
            position: Point::new(number(x_idx)?, number(y_idx)?),
            tree_cover_change: number(change_idx)?,
            tree_cover_2002: number(cover_2002_idx)?,
            tree_cover_2022: number(cover_2022_idx)?,
            color: color.to_string(),
            marker_size: number(size_idx)?,
        });
    }

    if skipped > 0 {
        debug!("Skipped {} CSV rows without a location", skipped);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::dbase::{FieldName, Record as DbfRecord, TableWriterBuilder};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn input_for(path: PathBuf) -> InputConfig {
        InputConfig {
            dataset: path,
            source_crs: SourceCrs::Wgs84,
            columns: ColumnConfig::default(),
        }
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn record(location: &str, change: f64) -> Record {
        Record {
            location: location.to_string(),
            position: Point::new(0.0, 0.0),
            tree_cover_change: change,
            tree_cover_2002: 10.0,
            tree_cover_2022: 10.0 + change,
            color: "#000000".to_string(),
            marker_size: 3.0,
        }
    }

    #[test]
    fn locations_are_distinct_and_sorted() {
        let dataset = Dataset::new(
            vec![
                record("Nairobi", 1.0),
                record("Lagos", 2.0),
                record("Nairobi", 3.0),
                record("Accra", 4.0),
                record("lagos", 5.0),
            ],
            SourceCrs::Wgs84,
        );
        assert_eq!(dataset.locations(), ["Accra", "Lagos", "Nairobi", "lagos"]);
        assert!(dataset.contains_location("Nairobi"));
        assert!(!dataset.contains_location("Kampala"));
        let changes: Vec<f64> = dataset.records_for("Nairobi").map(|r| r.tree_cover_change).collect();
        assert_eq!(changes, [1.0, 3.0]);
    }

    #[test]
    fn loads_csv_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "cells.csv",
            "location,x,y,tree_cover_change,tree_cover_2002,tree_cover_2022,color,markersize\n\
             Lagos,3.38,6.52,-5.0,20.0,15.0,#d73027,4.0\n\
             ,3.39,6.53,1.0,1.0,2.0,#1a9850,2.0\n\
             Lagos,3.40,6.54,3.0,10.0,13.0,#1a9850,3.0\n",
        );

        let dataset = load_dataset(&input_for(path)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.locations(), ["Lagos"]);
        let first = &dataset.records()[0];
        assert_eq!(first.position, Point::new(3.38, 6.52));
        assert_eq!(first.tree_cover_change, -5.0);
        assert_eq!(first.color, "#d73027");
        assert_eq!(first.marker_size, 4.0);
    }

    #[test]
    fn csv_with_bad_number_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "cells.csv",
            "location,x,y,tree_cover_change,tree_cover_2002,tree_cover_2022,color,markersize\n\
             Lagos,3.38,6.52,lots,20.0,15.0,#d73027,4.0\n",
        );
        assert!(load_dataset(&input_for(path)).is_err());
    }

    #[test]
    fn csv_without_color_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "cells.csv",
            "location,x,y,tree_cover_change,tree_cover_2002,tree_cover_2022,color,markersize\n\
             Lagos,3.38,6.52,-5.0,20.0,15.0,,4.0\n",
        );
        let err = load_dataset(&input_for(path)).unwrap_err();
        assert!(format!("{:#}", err).contains("'color' is missing"), "{:#}", err);
    }

    #[test]
    fn loads_geojson_points() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "cells.geojson",
            r##"{
              "type": "FeatureCollection",
              "features": [
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [3.38, 6.52]},
                 "properties": {"location": "Lagos", "tree_cover_change": -5.0,
                                "tree_cover_2002": 20.0, "tree_cover_2022": 15.0,
                                "color": "#d73027", "markersize": 4}},
                {"type": "Feature",
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
                 "properties": {"location": "Lagos"}},
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [36.82, -1.29]},
                 "properties": {"location": "Nairobi", "tree_cover_change": "0.0",
                                "tree_cover_2002": 7.5, "tree_cover_2022": 7.5,
                                "color": "#ffffbf", "markersize": 1.5}}
              ]
            }"##,
        );

        let dataset = load_dataset(&input_for(path)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.locations(), ["Lagos", "Nairobi"]);
        let nairobi: Vec<&Record> = dataset.records_for("Nairobi").collect();
        assert_eq!(nairobi[0].tree_cover_change, 0.0);
        assert_eq!(nairobi[0].position, Point::new(36.82, -1.29));
    }

    // dBase field names are capped at 10 characters
    fn short_columns() -> ColumnConfig {
        ColumnConfig {
            tree_cover_change: "change".to_string(),
            tree_cover_2002: "tc2002".to_string(),
            tree_cover_2022: "tc2022".to_string(),
            marker_size: "msize".to_string(),
            ..ColumnConfig::default()
        }
    }

    fn field(name: &str) -> FieldName {
        FieldName::try_from(name).unwrap()
    }

    fn cell_table() -> TableWriterBuilder {
        TableWriterBuilder::new()
            .add_character_field(field("location"), 32)
            .add_numeric_field(field("change"), 12, 4)
            .add_numeric_field(field("tc2002"), 12, 4)
            .add_numeric_field(field("tc2022"), 12, 4)
            .add_character_field(field("color"), 16)
            .add_float_field(field("msize"), 12, 4)
    }

    fn cell(location: Option<&str>, change: f64, color: &str) -> DbfRecord {
        let mut record = DbfRecord::default();
        record.insert(
            "location".to_string(),
            FieldValue::Character(location.map(str::to_string)),
        );
        record.insert("change".to_string(), FieldValue::Numeric(Some(change)));
        record.insert("tc2002".to_string(), FieldValue::Numeric(Some(20.0)));
        record.insert("tc2022".to_string(), FieldValue::Numeric(Some(20.0 + change)));
        record.insert("color".to_string(), FieldValue::Character(Some(color.to_string())));
        record.insert("msize".to_string(), FieldValue::Float(Some(4.5)));
        record
    }

    fn shapefile_input(path: PathBuf) -> InputConfig {
        InputConfig {
            dataset: path,
            source_crs: SourceCrs::Wgs84,
            columns: short_columns(),
        }
    }

    #[test]
    fn loads_shapefile_points() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cells.shp");
        {
            let mut writer = shapefile::Writer::from_path(&path, cell_table()).unwrap();
            writer
                .write_shape_and_record(
                    &shapefile::Point::new(3.38, 6.52),
                    &cell(Some("Lagos"), -5.0, "#d73027"),
                )
                .unwrap();
            writer
                .write_shape_and_record(&shapefile::Point::new(3.39, 6.53), &cell(None, 1.0, "#1a9850"))
                .unwrap();
            writer
                .write_shape_and_record(
                    &shapefile::Point::new(36.82, -1.29),
                    &cell(Some("Nairobi"), 0.0, "#ffffbf"),
                )
                .unwrap();
        }

        let dataset = load_dataset(&shapefile_input(path)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.locations(), ["Lagos", "Nairobi"]);

        let lagos = &dataset.records()[0];
        assert_eq!(lagos.location, "Lagos");
        assert_eq!(lagos.position, Point::new(3.38, 6.52));
        assert_eq!(lagos.tree_cover_change, -5.0);
        assert_eq!(lagos.tree_cover_2002, 20.0);
        assert_eq!(lagos.tree_cover_2022, 15.0);
        assert_eq!(lagos.color, "#d73027");
        assert_eq!(lagos.marker_size, 4.5);

        let nairobi = &dataset.records()[1];
        assert_eq!(nairobi.tree_cover_change, 0.0);
        assert_eq!(nairobi.color, "#ffffbf");
    }

    #[test]
    fn shapefile_without_points_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lines.shp");
        {
            let mut writer = shapefile::Writer::from_path(&path, cell_table()).unwrap();
            let line = shapefile::Polyline::new(vec![
                shapefile::Point::new(0.0, 0.0),
                shapefile::Point::new(1.0, 1.0),
            ]);
            writer
                .write_shape_and_record(&line, &cell(Some("Lagos"), 1.0, "#1a9850"))
                .unwrap();
        }

        let dataset = load_dataset(&shapefile_input(path)).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn shapefile_numeric_location_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coded.shp");
        {
            let table = TableWriterBuilder::new().add_numeric_field(field("location"), 8, 0);
            let mut writer = shapefile::Writer::from_path(&path, table).unwrap();
            let mut record = DbfRecord::default();
            record.insert("location".to_string(), FieldValue::Numeric(Some(7.0)));
            writer
                .write_shape_and_record(&shapefile::Point::new(0.0, 0.0), &record)
                .unwrap();
        }

        let err = load_dataset(&shapefile_input(path)).unwrap_err();
        assert!(err.to_string().contains("must be a string"), "{:#}", err);
    }

    #[test]
    fn dbase_numbers_convert_to_f64() {
        assert_eq!(field_as_f64(&FieldValue::Numeric(Some(-2.5))), Some(-2.5));
        assert_eq!(field_as_f64(&FieldValue::Float(Some(1.5))), Some(1.5));
        assert_eq!(field_as_f64(&FieldValue::Double(3.25)), Some(3.25));
        assert_eq!(field_as_f64(&FieldValue::Integer(4)), Some(4.0));
        assert_eq!(field_as_f64(&FieldValue::Character(Some(" 0.75 ".to_string()))), Some(0.75));
        assert_eq!(field_as_f64(&FieldValue::Numeric(None)), None);
        assert_eq!(field_as_f64(&FieldValue::Character(Some("n/a".to_string()))), None);
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "results_gdf.pkl", "not parsed");
        let err = load_dataset(&input_for(path)).unwrap_err();
        assert!(err.to_string().contains("Unsupported dataset format"));
    }

    #[test]
    fn missing_file_falls_back_to_empty_dataset() {
        let dir = TempDir::new().unwrap();
        let dataset = load_or_empty(&input_for(dir.path().join("missing.geojson")));
        assert!(dataset.is_empty());
        assert!(dataset.locations().is_empty());
    }
}
