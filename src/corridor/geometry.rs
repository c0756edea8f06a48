//! GeoJSON geometry validation and the corridor point sampler.
//!
//! Coordinates are `[lon, lat]` in WGS84. Sampling works in planar lon/lat space, which is
//! adequate for the few-kilometre extents an event corridor covers.

use std::str::FromStr;

use geo::{BoundingRect, Centroid, Contains, EuclideanLength, LineInterpolatePoint};
use geo::{Coord, LineString, MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClimoError, Result};

/// Grid columns × rows laid over an area's bounding box.
pub const AREA_GRID: (usize, usize) = (4, 3);
/// Points sampled along a route.
pub const ROUTE_SAMPLES: usize = 12;

const VALID_TYPES: &[&str] = &[
    "LineString",
    "MultiLineString",
    "MultiPoint",
    "MultiPolygon",
    "Point",
    "Polygon",
];

/// A validated request geometry.
pub type Geometry = geo::Geometry<f64>;

/// A sample location as it appears in corridor output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<Point<f64>> for GeoPoint {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}

/// How the corridor's sample points are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryMode {
    Area,
    Route,
}

impl FromStr for GeometryMode {
    type Err = ClimoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "area" => Ok(GeometryMode::Area),
            "route" => Ok(GeometryMode::Route),
            other => Err(ClimoError::geometry_with_hint(
                format!("unsupported geometry_type '{other}'"),
                "geometry_type must be 'area' (Polygon) or 'route' (LineString)",
            )),
        }
    }
}

/// Validate a loosely typed GeoJSON geometry object and decode it.
pub fn parse_geometry(value: &Value) -> Result<Geometry> {
    let object = match value {
        Value::Object(object) => object,
        Value::String(_) => {
            return Err(ClimoError::geometry_with_hint(
                "geometry must be a GeoJSON geometry object, not a string",
                "geocode a place name to a Point first, e.g. {\"type\":\"Point\",\"coordinates\":[lon, lat]}",
            ))
        }
        _ => {
            return Err(ClimoError::geometry(
                "geometry must be an object like a GeoJSON geometry",
            ))
        }
    };

    let kind = object.get("type").and_then(Value::as_str).unwrap_or("");
    if !VALID_TYPES.contains(&kind) {
        return Err(ClimoError::geometry_with_hint(
            format!("unknown or unsupported GeoJSON geometry type '{kind}'"),
            format!("expected one of {}", VALID_TYPES.join(", ")),
        ));
    }

    let coords = object
        .get("coordinates")
        .ok_or_else(|| ClimoError::geometry(format!("{kind} is missing coordinates")))?;
    if coords.is_string() {
        return Err(ClimoError::geometry_with_hint(
            "coordinates must be an array, not a string",
            "example Point: {\"type\":\"Point\",\"coordinates\":[-84.334, 34.023]}",
        ));
    }

    match kind {
        "Point" => position(coords)?,
        "MultiPoint" => positions(coords)?,
        "LineString" => line(coords)?,
        "MultiLineString" => each(coords, "MultiLineString", line)?,
        "Polygon" => polygon(coords)?,
        _ => each(coords, "MultiPolygon", polygon)?,
    }

    let decoded: geojson::Geometry = serde_json::from_value(value.clone())
        .map_err(|err| ClimoError::geometry(format!("malformed {kind}: {err}")))?;
    Geometry::try_from(decoded)
        .map_err(|err| ClimoError::geometry(format!("malformed {kind}: {err}")))
}

fn array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| ClimoError::geometry(format!("{what} coordinates must be an array")))
}

fn each(value: &Value, what: &str, check: fn(&Value) -> Result<()>) -> Result<()> {
    array(value, what)?.iter().try_for_each(check)
}

fn position(value: &Value) -> Result<()> {
    let parts = array(value, "position")?;
    let numbers: Option<Vec<f64>> = parts.iter().map(Value::as_f64).collect();
    match numbers.as_deref() {
        Some([lon, lat]) | Some([lon, lat, _]) if lon.is_finite() && lat.is_finite() => Ok(()),
        _ => Err(ClimoError::geometry_with_hint(
            "positions must be [lon, lat]",
            "example: [-84.334, 34.023]",
        )),
    }
}

fn positions(value: &Value) -> Result<()> {
    each(value, "position list", position)
}

fn line(value: &Value) -> Result<()> {
    positions(value)?;
    if array(value, "LineString")?.len() < 2 {
        return Err(ClimoError::geometry("a LineString needs at least two positions"));
    }
    Ok(())
}

fn polygon(value: &Value) -> Result<()> {
    let rings = array(value, "Polygon")?;
    rings.iter().try_for_each(positions)?;
    match rings.first().and_then(Value::as_array) {
        Some(exterior) if exterior.len() >= 3 => Ok(()),
        _ => Err(ClimoError::geometry(
            "a Polygon needs an exterior ring of at least three positions",
        )),
    }
}

fn type_name(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Sample points for the requested mode.
pub fn sample_points(mode: GeometryMode, geometry: &Geometry) -> Result<Vec<GeoPoint>> {
    match (mode, geometry) {
        (GeometryMode::Area, Geometry::Polygon(polygon)) => {
            Ok(grid_centroids(&MultiPolygon::new(vec![polygon.clone()])))
        }
        (GeometryMode::Area, Geometry::MultiPolygon(polygons)) => Ok(grid_centroids(polygons)),
        (GeometryMode::Route, Geometry::LineString(line)) => Ok(points_along(line, ROUTE_SAMPLES)),
        (GeometryMode::Route, Geometry::MultiLineString(parts)) => {
            let joined: LineString<f64> = parts
                .iter()
                .flat_map(|part| part.0.iter().copied())
                .collect();
            Ok(points_along(&joined, ROUTE_SAMPLES))
        }
        (GeometryMode::Area, other) => Err(ClimoError::geometry_with_hint(
            format!("area mode needs a Polygon, got {}", type_name(other)),
            "send a Polygon or MultiPolygon for geometry_type 'area'",
        )),
        (GeometryMode::Route, other) => Err(ClimoError::geometry_with_hint(
            format!("route mode needs a LineString, got {}", type_name(other)),
            "send a LineString or MultiLineString for geometry_type 'route'",
        )),
    }
}

/// Centres of an nx × ny grid over the bounding box, kept when inside the area.
/// Holes are excluded; when no centre lands inside, the area's centroid stands in.
fn grid_centroids(area: &MultiPolygon<f64>) -> Vec<GeoPoint> {
    let Some(bounds) = area.bounding_rect() else {
        return Vec::new();
    };
    let (nx, ny) = AREA_GRID;
    let (min, width, height) = (bounds.min(), bounds.width(), bounds.height());

    let mut out = Vec::new();
    for j in 0..ny {
        let lat = min.y + (j as f64 + 0.5) * height / ny as f64;
        for i in 0..nx {
            let lon = min.x + (i as f64 + 0.5) * width / nx as f64;
            if area.contains(&Point::new(lon, lat)) {
                out.push(GeoPoint::new(lon, lat));
            }
        }
    }
    if out.is_empty() {
        out.extend(area.centroid().map(GeoPoint::from));
    }
    out
}

/// `count` points evenly spaced by arc length, both endpoints included.
pub fn points_along(line: &LineString<f64>, count: usize) -> Vec<GeoPoint> {
    let mut coords: Vec<Coord<f64>> = line.0.clone();
    coords.dedup();
    let Some(first) = coords.first().copied() else {
        return Vec::new();
    };
    let line = LineString::new(coords);
    if line.euclidean_length() == 0.0 || count < 2 {
        return vec![GeoPoint::new(first.x, first.y)];
    }

    (0..count)
        .filter_map(|i| line.line_interpolate_point(i as f64 / (count - 1) as f64))
        .map(GeoPoint::from)
        .collect()
}
