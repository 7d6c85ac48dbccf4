// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Service catalog access.
//!
//! The catalog is the portal's registry of backend services, usually loaded
//! from a `services.json` array. Entries carry the raw fields the resolver
//! needs; everything else is preserved in `extra`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CatalogError;

/// Protocol family of a catalog entry, derived from its `typ` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogServiceType {
	Wfs,
	Oaf,
	SensorThings,
	GeoJson,
	Other(String),
}

impl CatalogServiceType {
	pub fn parse(typ: &str) -> Self {
		match typ.to_ascii_lowercase().as_str() {
			"wfs" => Self::Wfs,
			"oaf" => Self::Oaf,
			"sensorthings" => Self::SensorThings,
			"geojson" => Self::GeoJson,
			_ => Self::Other(typ.to_string()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
	pub id: String,
	#[serde(default)]
	pub typ: String,
	#[serde(default)]
	pub url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub feature_type: Option<String>,
	#[serde(rename = "featureNS", default, skip_serializing_if = "Option::is_none")]
	pub feature_ns: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub collection: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub limit: Option<u32>,
	#[serde(rename = "rootEl", default, skip_serializing_if = "Option::is_none")]
	pub root_el: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl CatalogEntry {
	pub fn service_type(&self) -> CatalogServiceType {
		CatalogServiceType::parse(&self.typ)
	}
}

/// Visual layer as configured in the portal's layer tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerModel {
	#[serde(default)]
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub typ: Option<String>,
	/// Id of a different catalog entry that supplies the filterable data.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

/// Lookup of catalog entries by predicate.
pub trait ServiceCatalog: Send + Sync {
	fn find(
		&self,
		predicate: &dyn Fn(&CatalogEntry) -> bool,
	) -> Result<Option<CatalogEntry>, CatalogError>;

	fn find_by_id(&self, id: &str) -> Result<Option<CatalogEntry>, CatalogError> {
		self.find(&|entry| entry.id == id)
	}
}

/// Catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
	entries: Vec<CatalogEntry>,
}

impl InMemoryCatalog {
	pub fn new(entries: Vec<CatalogEntry>) -> Self {
		Self { entries }
	}

	/// Parses a `services.json` style array.
	pub fn from_json(json: &str) -> Result<Self, CatalogError> {
		let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
		debug!(count = entries.len(), "catalog parsed");
		Ok(Self { entries })
	}

	pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
		let content = std::fs::read_to_string(path)?;
		Self::from_json(&content)
	}

	pub fn entries(&self) -> &[CatalogEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl ServiceCatalog for InMemoryCatalog {
	fn find(
		&self,
		predicate: &dyn Fn(&CatalogEntry) -> bool,
	) -> Result<Option<CatalogEntry>, CatalogError> {
		Ok(self.entries.iter().find(|entry| predicate(entry)).cloned())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const SERVICES: &str = r#"[
		{
			"id": "8712",
			"typ": "WFS",
			"url": "https://geodienste.example.org/wfs_schulen",
			"featureType": "schulen",
			"featureNS": "http://www.deegree.org/app",
			"version": "2.0.0",
			"name": "Schulen"
		},
		{
			"id": "sta-1",
			"typ": "SensorThings",
			"url": "https://iot.example.org/v1.1",
			"rootEl": "Datastreams"
		}
	]"#;

	#[test]
	fn parses_services_json() {
		let catalog = InMemoryCatalog::from_json(SERVICES).unwrap();
		assert_eq!(catalog.len(), 2);

		let wfs = &catalog.entries()[0];
		assert_eq!(wfs.service_type(), CatalogServiceType::Wfs);
		assert_eq!(wfs.feature_ns.as_deref(), Some("http://www.deegree.org/app"));
		assert_eq!(wfs.extra.get("name"), Some(&Value::from("Schulen")));
	}

	#[test]
	fn finds_by_predicate() {
		let catalog = InMemoryCatalog::from_json(SERVICES).unwrap();
		let found = catalog.find_by_id("sta-1").unwrap().unwrap();
		assert_eq!(found.root_el.as_deref(), Some("Datastreams"));
		assert!(catalog.find_by_id("missing").unwrap().is_none());
	}

	#[test]
	fn service_type_is_case_insensitive() {
		assert_eq!(CatalogServiceType::parse("oaf"), CatalogServiceType::Oaf);
		assert_eq!(CatalogServiceType::parse("OAF"), CatalogServiceType::Oaf);
		assert_eq!(
			CatalogServiceType::parse("WMS"),
			CatalogServiceType::Other("WMS".to_string())
		);
	}

	#[test]
	fn loads_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(SERVICES.as_bytes()).unwrap();

		let catalog = InMemoryCatalog::from_path(file.path()).unwrap();
		assert_eq!(catalog.len(), 2);
		assert!(matches!(
			InMemoryCatalog::from_path(Path::new("/nonexistent/services.json")),
			Err(CatalogError::Io(_))
		));
	}

	#[test]
	fn malformed_catalog_is_an_error() {
		let err = InMemoryCatalog::from_json("{\"id\": 1}").unwrap_err();
		assert!(matches!(err, CatalogError::Parse(_)));
	}
}
