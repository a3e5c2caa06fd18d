//! GeoJSON tables of detections, candidate tracks and nest summaries.
//!
//! Every table is a FeatureCollection with two foreign members:
//!
//! - `crs`: the coordinate reference system in the legacy named form
//!   `{"type": "name", "properties": {"name": "EPSG:32617"}}`
//! - `schema`: table name, schema version, geometry type and ordered columns
//!
//! Both are written for empty tables too, so a consumer can rely on the column
//! set whether or not any rows were produced.
//!
//! Readers skip rows whose geometry or required properties are missing or
//! malformed, logging each one, and report how many were skipped. Only a file
//! that is not a FeatureCollection at all is an error.

use crate::error::{NestError, Result};
use geo::BoundingRect;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use nestlink_types::bbox::BoundingBox2D;
use nestlink_types::date::ObservationDate;
use nestlink_types::detection::{Detection, PRIMARY_EVENT, TrackMember};
use nestlink_types::nest::NestSummary;
use serde_json::json;
use std::fs;
use std::path::Path;

pub const SCHEMA_VERSION: u32 = 1;

/// Column layout of one kind of table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub geometry: &'static str,
    pub columns: &'static [(&'static str, &'static str)],
}

impl TableSchema {
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|(name, _)| *name)
    }

    fn to_json(self) -> JsonValue {
        let columns: Vec<JsonValue> = self
            .columns
            .iter()
            .map(|(name, kind)| json!({ "name": name, "type": kind }))
            .collect();
        json!({
            "name": self.name,
            "version": SCHEMA_VERSION,
            "geometry": self.geometry,
            "columns": columns,
        })
    }
}

pub const DETECTION_SCHEMA: TableSchema = TableSchema {
    name: "detections",
    geometry: "Polygon",
    columns: &[
        ("xmin", "float"),
        ("ymin", "float"),
        ("xmax", "float"),
        ("ymax", "float"),
        ("label", "str"),
        ("score", "float"),
        ("image_path", "str"),
        ("site", "str"),
        ("date", "str"),
        ("year", "int"),
        ("event", "str"),
        ("bird_id", "int"),
    ],
};

pub const TRACK_SCHEMA: TableSchema = TableSchema {
    name: "detected_nests",
    geometry: "Polygon",
    columns: &[
        ("match_xmin", "float"),
        ("match_ymin", "float"),
        ("match_xmax", "float"),
        ("match_ymax", "float"),
        ("label", "str"),
        ("score", "float"),
        ("image_path", "str"),
        ("site", "str"),
        ("date", "str"),
        ("year", "int"),
        ("event", "str"),
        ("bird_id", "int"),
        ("target_ind", "int"),
    ],
};

pub const NEST_SCHEMA: TableSchema = TableSchema {
    name: "processed_nests",
    geometry: "Point",
    columns: &[
        ("nest_id", "int"),
        ("site", "str"),
        ("year", "int"),
        ("xmean", "float"),
        ("ymean", "float"),
        ("first_obs", "str"),
        ("last_obs", "str"),
        ("num_obs", "int"),
        ("species", "str"),
        ("sum_top1_score", "float"),
        ("num_obs_top1", "int"),
        ("bird_match", "str"),
    ],
};

/// A detection as written by the detector, before flight metadata is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub bbox: BoundingBox2D,
    pub label: String,
    pub score: f64,
    pub image_path: Option<String>,
}

/// Rows read from, or to be written to, one table file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTable<T> {
    pub rows: Vec<T>,
    /// Coordinate reference system, e.g. `EPSG:32617`
    pub crs: Option<String>,
    /// Rows dropped while reading
    pub skipped: usize,
}

impl<T> GeoTable<T> {
    pub fn new(rows: Vec<T>, crs: Option<String>) -> Self {
        Self {
            rows,
            crs,
            skipped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Use `default` when the table carries no CRS.
    pub fn crs_or(&self, default: Option<&str>) -> Option<String> {
        self.crs.clone().or_else(|| default.map(str::to_string))
    }
}

pub fn read_predictions(path: impl AsRef<Path>) -> Result<GeoTable<Prediction>> {
    read_table(path.as_ref(), |feature, props| {
        Ok(Prediction {
            bbox: row_bbox(feature, props, "")?,
            label: required_str(props, "label")?,
            score: required_f64(props, "score")?,
            image_path: optional_str(props, "image_path"),
        })
    })
}

pub fn read_detections(path: impl AsRef<Path>) -> Result<GeoTable<Detection>> {
    read_table(path.as_ref(), |feature, props| {
        detection_from_row(feature, props, "")
    })
}

pub fn read_tracks(path: impl AsRef<Path>) -> Result<GeoTable<TrackMember>> {
    read_table(path.as_ref(), |feature, props| {
        let detection = detection_from_row(feature, props, "match_")?;
        let target_ind = required_u64(props, "target_ind")? as usize;
        Ok(TrackMember::new(detection, target_ind))
    })
}

pub fn read_nests(path: impl AsRef<Path>) -> Result<GeoTable<NestSummary>> {
    read_table(path.as_ref(), |_, props| {
        Ok(NestSummary {
            nest_id: required_u64(props, "nest_id")? as usize,
            site: required_str(props, "site")?,
            year: required_i32(props, "year")?,
            xmean: required_f64(props, "xmean")?,
            ymean: required_f64(props, "ymean")?,
            first_obs: required_date(props, "first_obs")?,
            last_obs: required_date(props, "last_obs")?,
            num_obs: required_u64(props, "num_obs")? as usize,
            species: required_str(props, "species")?,
            sum_top1_score: required_f64(props, "sum_top1_score")?,
            num_obs_top1: required_u64(props, "num_obs_top1")? as usize,
            bird_match: optional_str(props, "bird_match").unwrap_or_default(),
        })
    })
}

pub fn write_detections(path: impl AsRef<Path>, table: &GeoTable<Detection>) -> Result<()> {
    let features = table
        .rows
        .iter()
        .map(|detection| {
            let mut props = bbox_properties(&detection.bbox, "");
            extend_detection_properties(&mut props, detection);
            box_feature(&detection.bbox, props)
        })
        .collect();
    write_table(path.as_ref(), &DETECTION_SCHEMA, table.crs.as_deref(), features)
}

pub fn write_tracks(path: impl AsRef<Path>, table: &GeoTable<TrackMember>) -> Result<()> {
    let features = table
        .rows
        .iter()
        .map(|member| {
            let mut props = bbox_properties(&member.detection.bbox, "match_");
            extend_detection_properties(&mut props, &member.detection);
            props.insert("target_ind".to_string(), json!(member.target_ind));
            box_feature(&member.detection.bbox, props)
        })
        .collect();
    write_table(path.as_ref(), &TRACK_SCHEMA, table.crs.as_deref(), features)
}

pub fn write_nests(path: impl AsRef<Path>, table: &GeoTable<NestSummary>) -> Result<()> {
    let features = table
        .rows
        .iter()
        .map(|nest| {
            let mut props = JsonObject::new();
            props.insert("nest_id".to_string(), json!(nest.nest_id));
            props.insert("site".to_string(), json!(nest.site));
            props.insert("year".to_string(), json!(nest.year));
            props.insert("xmean".to_string(), json!(nest.xmean));
            props.insert("ymean".to_string(), json!(nest.ymean));
            props.insert("first_obs".to_string(), json!(nest.first_obs.to_string()));
            props.insert("last_obs".to_string(), json!(nest.last_obs.to_string()));
            props.insert("num_obs".to_string(), json!(nest.num_obs));
            props.insert("species".to_string(), json!(nest.species));
            props.insert("sum_top1_score".to_string(), json!(nest.sum_top1_score));
            props.insert("num_obs_top1".to_string(), json!(nest.num_obs_top1));
            props.insert("bird_match".to_string(), json!(nest.bird_match));

            let location = nest.location();
            let point = Geometry::new(Value::Point(vec![location.x(), location.y()]));
            feature(point, props)
        })
        .collect();
    write_table(path.as_ref(), &NEST_SCHEMA, table.crs.as_deref(), features)
}

fn write_table(
    path: &Path,
    schema: &TableSchema,
    crs: Option<&str>,
    features: Vec<Feature>,
) -> Result<()> {
    let mut foreign_members = JsonObject::new();
    if let Some(crs) = crs {
        foreign_members.insert(
            "crs".to_string(),
            json!({ "type": "name", "properties": { "name": crs } }),
        );
    }
    foreign_members.insert("schema".to_string(), schema.to_json());

    let count = features.len();
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(&collection)?)?;

    log::info!(
        "Wrote {} {} rows to {}",
        count,
        schema.name,
        path.display()
    );
    Ok(())
}

fn read_table<T>(
    path: &Path,
    parse_row: impl Fn(&Feature, &JsonObject) -> Result<T>,
) -> Result<GeoTable<T>> {
    let contents = fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&contents)?;

    let JsonValue::Object(mut root) = root else {
        return Err(NestError::InvalidInput(format!(
            "{} is not a GeoJSON object",
            path.display()
        )));
    };
    if root.get("type").and_then(JsonValue::as_str) != Some("FeatureCollection") {
        return Err(NestError::InvalidInput(format!(
            "{} is not a GeoJSON FeatureCollection",
            path.display()
        )));
    }

    let crs = root.get("crs").and_then(crs_name);
    let features = match root.remove("features") {
        Some(JsonValue::Array(features)) => features,
        _ => {
            return Err(NestError::InvalidInput(format!(
                "{} has no features array",
                path.display()
            )));
        }
    };

    let mut rows = Vec::with_capacity(features.len());
    let mut skipped = 0;
    let empty = JsonObject::new();

    for (position, value) in features.into_iter().enumerate() {
        let parsed = Feature::try_from(value)
            .map_err(NestError::from)
            .and_then(|feature| {
                let props = feature.properties.as_ref().unwrap_or(&empty);
                parse_row(&feature, props)
            });

        match parsed {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                log::warn!(
                    "Skipping feature {} of {}: {}",
                    position,
                    path.display(),
                    e
                );
            }
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {} malformed rows in {}", skipped, path.display());
    }

    Ok(GeoTable { rows, crs, skipped })
}

fn crs_name(value: &JsonValue) -> Option<String> {
    value
        .get("properties")
        .and_then(|props| props.get("name"))
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}

fn detection_from_row(feature: &Feature, props: &JsonObject, prefix: &str) -> Result<Detection> {
    let date = required_date(props, "date")?;
    let year = match lookup(props, "year") {
        Some(_) => required_i32(props, "year")?,
        None => date.year(),
    };

    Ok(Detection {
        bbox: row_bbox(feature, props, prefix)?,
        label: required_str(props, "label")?,
        score: required_f64(props, "score")?,
        site: required_str(props, "site")?,
        date,
        year,
        event: optional_str(props, "event").unwrap_or_else(|| PRIMARY_EVENT.to_string()),
        bird_id: required_u64(props, "bird_id")?,
        image_path: optional_str(props, "image_path"),
    })
}

/// Box from the `<prefix>xmin`.. columns, or the geometry's bounds when the
/// columns are absent.
fn row_bbox(feature: &Feature, props: &JsonObject, prefix: &str) -> Result<BoundingBox2D> {
    let column = |axis: &str| format!("{}{}", prefix, axis);
    let has_columns = ["xmin", "ymin", "xmax", "ymax"]
        .iter()
        .all(|axis| lookup(props, &column(axis)).is_some());

    let bbox = if has_columns {
        BoundingBox2D::new(
            required_f64(props, &column("xmin"))?,
            required_f64(props, &column("ymin"))?,
            required_f64(props, &column("xmax"))?,
            required_f64(props, &column("ymax"))?,
        )
    } else {
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or_else(|| NestError::InvalidInput("feature has no geometry".to_string()))?;
        let shape: geo::Geometry<f64> = geometry.value.clone().try_into()?;
        let rect = shape
            .bounding_rect()
            .ok_or_else(|| NestError::InvalidInput("geometry is empty".to_string()))?;
        BoundingBox2D::from_rect(rect)
    };

    if !bbox.is_finite() {
        return Err(NestError::InvalidInput("box has non-finite corners".to_string()));
    }
    Ok(bbox)
}

fn bbox_properties(bbox: &BoundingBox2D, prefix: &str) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert(format!("{}xmin", prefix), json!(bbox.min_x()));
    props.insert(format!("{}ymin", prefix), json!(bbox.min_y()));
    props.insert(format!("{}xmax", prefix), json!(bbox.max_x()));
    props.insert(format!("{}ymax", prefix), json!(bbox.max_y()));
    props
}

fn extend_detection_properties(props: &mut JsonObject, detection: &Detection) {
    props.insert("label".to_string(), json!(detection.label));
    props.insert("score".to_string(), json!(detection.score));
    props.insert("image_path".to_string(), json!(detection.image_path));
    props.insert("site".to_string(), json!(detection.site));
    props.insert("date".to_string(), json!(detection.date.to_string()));
    props.insert("year".to_string(), json!(detection.year));
    props.insert("event".to_string(), json!(detection.event));
    props.insert("bird_id".to_string(), json!(detection.bird_id));
}

fn box_feature(bbox: &BoundingBox2D, props: JsonObject) -> Feature {
    let ring = bbox.exterior_ring().iter().map(|corner| corner.to_vec()).collect();
    feature(Geometry::new(Value::Polygon(vec![ring])), props)
}

fn feature(geometry: Geometry, props: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

/// Property lookup, exact name first, then ignoring ASCII case.
fn lookup<'a>(props: &'a JsonObject, name: &str) -> Option<&'a JsonValue> {
    props
        .get(name)
        .or_else(|| {
            props
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .filter(|value| !value.is_null())
}

fn missing(name: &str) -> NestError {
    NestError::InvalidInput(format!("missing property {:?}", name))
}

fn invalid(name: &str, value: &JsonValue) -> NestError {
    NestError::InvalidInput(format!("property {:?} has unusable value {}", name, value))
}

fn required_str(props: &JsonObject, name: &str) -> Result<String> {
    match lookup(props, name) {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(JsonValue::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(invalid(name, other)),
        None => Err(missing(name)),
    }
}

fn optional_str(props: &JsonObject, name: &str) -> Option<String> {
    required_str(props, name).ok()
}

fn required_f64(props: &JsonObject, name: &str) -> Result<f64> {
    let value = lookup(props, name).ok_or_else(|| missing(name))?;
    let number = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| invalid(name, value))
}

fn required_u64(props: &JsonObject, name: &str) -> Result<u64> {
    let value = lookup(props, name).ok_or_else(|| missing(name))?;
    let number = match value {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.ok_or_else(|| invalid(name, value))
}

fn required_i32(props: &JsonObject, name: &str) -> Result<i32> {
    let value = lookup(props, name).ok_or_else(|| missing(name))?;
    let number = match value {
        JsonValue::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.ok_or_else(|| invalid(name, value))
}

fn required_date(props: &JsonObject, name: &str) -> Result<ObservationDate> {
    let raw = required_str(props, name)?;
    raw.parse::<ObservationDate>()
        .map_err(|e| NestError::InvalidInput(e.to_string()))
}
