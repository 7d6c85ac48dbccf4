// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The canonical description of the backend a layer is queried through.

use serde::{Deserialize, Serialize};

/// Query target for one filterable layer.
///
/// `layer_id` is always the id of the visual layer, even when the queried
/// entity is a different catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
	/// Whether the service lives outside the hosting deployment.
	#[serde(rename = "extern")]
	pub external: bool,
	pub layer_id: String,
	pub url: String,
	#[serde(flatten)]
	pub protocol: ServiceProtocol,
}

/// Protocol-specific part of a [`ServiceDescriptor`], tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServiceProtocol {
	/// WFS-like feature service.
	#[serde(rename = "wfs", rename_all = "camelCase")]
	FeatureService {
		#[serde(rename = "featureNS")]
		feature_ns: String,
		feature_prefix: String,
		/// Never empty.
		feature_types: Vec<String>,
	},
	/// A plain document (GeoJSON) filtered client-side.
	#[serde(rename = "geojson")]
	DocumentCollection,
	#[serde(rename = "sensorthings", rename_all = "camelCase")]
	SensorThings { version: String, root_entity: String },
	#[serde(rename = "oaf", rename_all = "camelCase")]
	OgcApiFeatures {
		collection: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		crs: Option<String>,
		limit: u32,
	},
}

impl ServiceProtocol {
	pub fn tag(&self) -> &'static str {
		match self {
			ServiceProtocol::FeatureService { .. } => "wfs",
			ServiceProtocol::DocumentCollection => "geojson",
			ServiceProtocol::SensorThings { .. } => "sensorthings",
			ServiceProtocol::OgcApiFeatures { .. } => "oaf",
		}
	}
}

/// Splits a WFS namespace string on its last `/` into namespace and prefix.
///
/// A string without `/` is treated as a namespace with an empty prefix.
pub fn split_feature_namespace(feature_ns: &str) -> (String, String) {
	match feature_ns.rsplit_once('/') {
		Some((ns, prefix)) => (ns.to_string(), prefix.to_string()),
		None => (feature_ns.to_string(), String::new()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn splits_namespace_on_last_slash() {
		assert_eq!(
			split_feature_namespace("ns/prefix"),
			("ns".to_string(), "prefix".to_string())
		);
		assert_eq!(
			split_feature_namespace("http://www.deegree.org/app"),
			("http://www.deegree.org".to_string(), "app".to_string())
		);
		assert_eq!(
			split_feature_namespace("plain"),
			("plain".to_string(), String::new())
		);
	}

	#[test]
	fn feature_service_wire_format() {
		let descriptor = ServiceDescriptor {
			external: false,
			layer_id: "visual".to_string(),
			url: "https://example.org/wfs".to_string(),
			protocol: ServiceProtocol::FeatureService {
				feature_ns: "ns".to_string(),
				feature_prefix: "prefix".to_string(),
				feature_types: vec!["schulen".to_string()],
			},
		};
		let value = serde_json::to_value(&descriptor).unwrap();
		assert_eq!(
			value,
			json!({
				"type": "wfs",
				"extern": false,
				"layerId": "visual",
				"url": "https://example.org/wfs",
				"featureNS": "ns",
				"featurePrefix": "prefix",
				"featureTypes": ["schulen"]
			})
		);
		let back: ServiceDescriptor = serde_json::from_value(value).unwrap();
		assert_eq!(back, descriptor);
	}

	#[test]
	fn document_collection_has_no_feature_fields() {
		let descriptor = ServiceDescriptor {
			external: true,
			layer_id: "1".to_string(),
			url: "https://example.org/data.json".to_string(),
			protocol: ServiceProtocol::DocumentCollection,
		};
		let value = serde_json::to_value(&descriptor).unwrap();
		assert_eq!(value["type"], "geojson");
		assert!(value.get("featureNS").is_none());
		assert!(value.get("featureTypes").is_none());
	}
}
