// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GeoJSON feature parsing into `geo_types` geometries.

use std::collections::HashMap;
use std::sync::Arc;

use geo_types::{
	Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
	Point, Polygon,
};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{json, Map, Value};

use crate::error::ParseError;

/// A parsed feature: optional id, geometry and its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeature {
	pub id: Option<Value>,
	pub geometry: Option<Geometry<f64>>,
	pub properties: Map<String, Value>,
}

impl ParsedFeature {
	pub fn property(&self, name: &str) -> Option<&Value> {
		self.properties.get(name)
	}

	pub fn to_geojson(&self) -> Value {
		let mut feature = Map::new();
		feature.insert("type".to_string(), Value::from("Feature"));
		if let Some(id) = &self.id {
			feature.insert("id".to_string(), id.clone());
		}
		feature.insert(
			"geometry".to_string(),
			self.geometry.as_ref().map(geometry_to_value).unwrap_or(Value::Null),
		);
		feature.insert(
			"properties".to_string(),
			Value::Object(self.properties.clone()),
		);
		Value::Object(feature)
	}
}

impl Serialize for ParsedFeature {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut state = serializer.serialize_struct("Feature", 4)?;
		state.serialize_field("type", "Feature")?;
		if let Some(id) = &self.id {
			state.serialize_field("id", id)?;
		} else {
			state.skip_field("id")?;
		}
		state.serialize_field(
			"geometry",
			&self.geometry.as_ref().map(geometry_to_value),
		)?;
		state.serialize_field("properties", &self.properties)?;
		state.end()
	}
}

/// Parses a raw payload produced by a service of a given version.
pub trait FeatureParser: Send + Sync {
	fn parse(&self, payload: &str) -> Result<Vec<ParsedFeature>, ParseError>;
}

/// Parser for GeoJSON `FeatureCollection`, `Feature` or bare feature arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonParser;

impl FeatureParser for GeoJsonParser {
	fn parse(&self, payload: &str) -> Result<Vec<ParsedFeature>, ParseError> {
		let document: Value = serde_json::from_str(payload)?;
		parse_features(&document)
	}
}

/// Parsers keyed by protocol version tag.
#[derive(Clone, Default)]
pub struct ParserRegistry {
	parsers: HashMap<String, Arc<dyn FeatureParser>>,
}

/// Version tags served as GeoJSON by the default registry.
pub const GEOJSON_VERSIONS: &[&str] = &["1.0.0", "1.1.0", "2.0.0", "oaf", "geojson"];

impl ParserRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		let parser: Arc<dyn FeatureParser> = Arc::new(GeoJsonParser);
		for version in GEOJSON_VERSIONS {
			registry.register(*version, parser.clone());
		}
		registry
	}

	pub fn register(&mut self, version: impl Into<String>, parser: Arc<dyn FeatureParser>) {
		self.parsers.insert(version.into(), parser);
	}

	pub fn parse(&self, version: &str, payload: &str) -> Result<Vec<ParsedFeature>, ParseError> {
		let parser = self
			.parsers
			.get(version)
			.ok_or_else(|| ParseError::UnsupportedVersion(version.to_string()))?;
		parser.parse(payload)
	}
}

pub fn parse_features(document: &Value) -> Result<Vec<ParsedFeature>, ParseError> {
	match document.get("type").and_then(Value::as_str) {
		Some("FeatureCollection") => document
			.get("features")
			.and_then(Value::as_array)
			.ok_or_else(|| invalid("FeatureCollection without features"))?
			.iter()
			.map(parse_feature)
			.collect(),
		Some("Feature") => Ok(vec![parse_feature(document)?]),
		_ => match document.as_array() {
			Some(features) => features.iter().map(parse_feature).collect(),
			None => Err(invalid("expected a FeatureCollection or Feature")),
		},
	}
}

pub fn parse_feature(feature: &Value) -> Result<ParsedFeature, ParseError> {
	let object = feature
		.as_object()
		.ok_or_else(|| invalid("feature is not an object"))?;

	let geometry = match object.get("geometry") {
		None | Some(Value::Null) => None,
		Some(geometry) => Some(parse_geometry(geometry)?),
	};

	let properties = match object.get("properties") {
		Some(Value::Object(properties)) => properties.clone(),
		_ => Map::new(),
	};

	Ok(ParsedFeature {
		id: object.get("id").cloned(),
		geometry,
		properties,
	})
}

pub fn parse_geometry(geometry: &Value) -> Result<Geometry<f64>, ParseError> {
	let kind = geometry
		.get("type")
		.and_then(Value::as_str)
		.ok_or_else(|| invalid("geometry without type"))?;

	if kind == "GeometryCollection" {
		let members = geometry
			.get("geometries")
			.and_then(Value::as_array)
			.ok_or_else(|| invalid("GeometryCollection without geometries"))?;
		let members = members
			.iter()
			.map(parse_geometry)
			.collect::<Result<Vec<_>, _>>()?;
		return Ok(Geometry::GeometryCollection(GeometryCollection(members)));
	}

	let coordinates = geometry
		.get("coordinates")
		.ok_or_else(|| invalid(format!("{kind} without coordinates")))?;

	let parsed = match kind {
		"Point" => Geometry::Point(Point(coord(coordinates)?)),
		"MultiPoint" => Geometry::MultiPoint(MultiPoint(
			array(coordinates)?
				.iter()
				.map(|c| coord(c).map(Point))
				.collect::<Result<_, _>>()?,
		)),
		"LineString" => Geometry::LineString(line_string(coordinates)?),
		"MultiLineString" => Geometry::MultiLineString(MultiLineString(
			array(coordinates)?
				.iter()
				.map(line_string)
				.collect::<Result<_, _>>()?,
		)),
		"Polygon" => Geometry::Polygon(polygon(coordinates)?),
		"MultiPolygon" => Geometry::MultiPolygon(MultiPolygon(
			array(coordinates)?
				.iter()
				.map(polygon)
				.collect::<Result<_, _>>()?,
		)),
		other => return Err(invalid(format!("unsupported geometry type {other}"))),
	};
	Ok(parsed)
}

/// Serializes a geometry back to a GeoJSON geometry object.
pub fn geometry_to_value(geometry: &Geometry<f64>) -> Value {
	match geometry {
		Geometry::Point(p) => json!({"type": "Point", "coordinates": coord_value(p.0)}),
		Geometry::MultiPoint(mp) => json!({
			"type": "MultiPoint",
			"coordinates": mp.0.iter().map(|p| coord_value(p.0)).collect::<Vec<_>>(),
		}),
		Geometry::Line(line) => json!({
			"type": "LineString",
			"coordinates": [coord_value(line.start), coord_value(line.end)],
		}),
		Geometry::LineString(ls) => json!({"type": "LineString", "coordinates": line_value(ls)}),
		Geometry::MultiLineString(mls) => json!({
			"type": "MultiLineString",
			"coordinates": mls.0.iter().map(line_value).collect::<Vec<_>>(),
		}),
		Geometry::Polygon(p) => json!({"type": "Polygon", "coordinates": polygon_value(p)}),
		Geometry::MultiPolygon(mp) => json!({
			"type": "MultiPolygon",
			"coordinates": mp.0.iter().map(polygon_value).collect::<Vec<_>>(),
		}),
		Geometry::GeometryCollection(gc) => json!({
			"type": "GeometryCollection",
			"geometries": gc.0.iter().map(geometry_to_value).collect::<Vec<_>>(),
		}),
		Geometry::Rect(rect) => geometry_to_value(&Geometry::Polygon(rect.to_polygon())),
		Geometry::Triangle(triangle) => {
			geometry_to_value(&Geometry::Polygon(triangle.to_polygon()))
		}
	}
}

fn invalid(message: impl Into<String>) -> ParseError {
	ParseError::InvalidGeoJson(message.into())
}

fn array(value: &Value) -> Result<&Vec<Value>, ParseError> {
	value
		.as_array()
		.ok_or_else(|| invalid("coordinates must be an array"))
}

fn coord(value: &Value) -> Result<Coord<f64>, ParseError> {
	let position = array(value)?;
	let x = position.first().and_then(Value::as_f64);
	let y = position.get(1).and_then(Value::as_f64);
	match (x, y) {
		(Some(x), Some(y)) => Ok(Coord { x, y }),
		_ => Err(invalid("position needs two numbers")),
	}
}

fn line_string(value: &Value) -> Result<LineString<f64>, ParseError> {
	Ok(LineString(
		array(value)?
			.iter()
			.map(coord)
			.collect::<Result<_, _>>()?,
	))
}

fn polygon(value: &Value) -> Result<Polygon<f64>, ParseError> {
	let mut rings = array(value)?
		.iter()
		.map(line_string)
		.collect::<Result<Vec<_>, _>>()?
		.into_iter();
	let exterior = rings
		.next()
		.ok_or_else(|| invalid("polygon without exterior ring"))?;
	Ok(Polygon::new(exterior, rings.collect()))
}

fn coord_value(c: Coord<f64>) -> Value {
	json!([c.x, c.y])
}

fn line_value(ls: &LineString<f64>) -> Vec<Value> {
	ls.0.iter().map(|c| coord_value(*c)).collect()
}

fn polygon_value(p: &Polygon<f64>) -> Vec<Vec<Value>> {
	std::iter::once(p.exterior())
		.chain(p.interiors())
		.map(line_value)
		.collect()
}
