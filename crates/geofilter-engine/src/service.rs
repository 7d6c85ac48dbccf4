// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Resolution of a visual layer to the service it is queried through.

use std::sync::Arc;

use geofilter_core::{crs_code_to_uri, split_feature_namespace, ServiceDescriptor, ServiceProtocol};
use tracing::{debug, error, warn};

use crate::catalog::{CatalogEntry, CatalogServiceType, LayerModel, ServiceCatalog};
use crate::error::FilterError;

pub const DEFAULT_ROOT_ENTITY: &str = "Things";
pub const DEFAULT_SENSORTHINGS_VERSION: &str = "1.1";
pub const DEFAULT_OAF_LIMIT: u32 = 400;

/// Source of the current map projection code, e.g. `EPSG:25832`.
pub trait MapProjection: Send + Sync {
	fn map_projection(&self) -> String;
}

/// A projection that never changes.
#[derive(Debug, Clone)]
pub struct FixedProjection(pub String);

impl MapProjection for FixedProjection {
	fn map_projection(&self) -> String {
		self.0.clone()
	}
}

pub struct ServiceResolver {
	catalog: Arc<dyn ServiceCatalog>,
	projection: Arc<dyn MapProjection>,
	oaf_default_limit: u32,
	sensorthings_version: String,
}

impl ServiceResolver {
	pub fn new(catalog: Arc<dyn ServiceCatalog>, projection: Arc<dyn MapProjection>) -> Self {
		Self {
			catalog,
			projection,
			oaf_default_limit: DEFAULT_OAF_LIMIT,
			sensorthings_version: DEFAULT_SENSORTHINGS_VERSION.to_string(),
		}
	}

	pub fn with_oaf_default_limit(mut self, limit: u32) -> Self {
		self.oaf_default_limit = limit;
		self
	}

	pub fn with_sensorthings_version(mut self, version: impl Into<String>) -> Self {
		self.sensorthings_version = version.into();
		self
	}

	pub fn catalog(&self) -> &Arc<dyn ServiceCatalog> {
		&self.catalog
	}

	/// Determines the query target for `layer_id`.
	///
	/// The catalog entry named by the layer's `sourceId` (or its own id)
	/// decides the protocol. Layers without a usable entry fall back to a
	/// document collection at the visual layer's url.
	pub fn resolve_service(
		&self,
		layer_id: &str,
		layer: &LayerModel,
		external: bool,
	) -> Result<ServiceDescriptor, FilterError> {
		let layer_type = layer.typ.as_deref().unwrap_or_default();
		let source_id = layer.source_id.as_deref().unwrap_or(layer_id);

		let entry = self.catalog.find_by_id(source_id).map_err(|e| {
			error!(layer_id, source_id, error = %e, "catalog lookup failed");
			e
		})?;

		let protocol = match &entry {
			Some(entry) => self.protocol_for(layer_id, entry),
			None => {
				debug!(
					layer_id,
					layer_type,
					source_id,
					"no catalog entry, using document collection"
				);
				None
			}
		};

		let descriptor = match (protocol, entry) {
			(Some(protocol), Some(entry)) => ServiceDescriptor {
				external,
				layer_id: layer_id.to_string(),
				url: entry.url,
				protocol,
			},
			_ => ServiceDescriptor {
				external,
				layer_id: layer_id.to_string(),
				url: layer.url.clone().unwrap_or_default(),
				protocol: ServiceProtocol::DocumentCollection,
			},
		};

		debug!(
			layer_id,
			layer_type,
			protocol = descriptor.protocol.tag(),
			url = %descriptor.url,
			"service resolved"
		);
		Ok(descriptor)
	}

	fn protocol_for(&self, layer_id: &str, entry: &CatalogEntry) -> Option<ServiceProtocol> {
		match entry.service_type() {
			CatalogServiceType::Wfs => {
				let Some(feature_type) = entry.feature_type.clone().filter(|t| !t.is_empty()) else {
					warn!(layer_id, entry_id = %entry.id, "WFS entry without featureType");
					return None;
				};
				let (feature_ns, feature_prefix) =
					split_feature_namespace(entry.feature_ns.as_deref().unwrap_or_default());
				Some(ServiceProtocol::FeatureService {
					feature_ns,
					feature_prefix,
					feature_types: vec![feature_type],
				})
			}
			CatalogServiceType::Oaf => {
				let Some(collection) = entry.collection.clone().filter(|c| !c.is_empty()) else {
					warn!(layer_id, entry_id = %entry.id, "OAF entry without collection");
					return None;
				};
				let crs = crs_code_to_uri(&self.projection.map_projection());
				Some(ServiceProtocol::OgcApiFeatures {
					collection,
					crs: (!crs.is_empty()).then_some(crs),
					limit: entry.limit.unwrap_or(self.oaf_default_limit),
				})
			}
			CatalogServiceType::SensorThings => Some(ServiceProtocol::SensorThings {
				version: entry
					.version
					.clone()
					.unwrap_or_else(|| self.sensorthings_version.clone()),
				root_entity: entry
					.root_el
					.clone()
					.unwrap_or_else(|| DEFAULT_ROOT_ENTITY.to_string()),
			}),
			CatalogServiceType::GeoJson | CatalogServiceType::Other(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::InMemoryCatalog;
	use crate::error::CatalogError;

	const SERVICES: &str = r#"[
		{
			"id": "wfs-src",
			"typ": "WFS",
			"url": "https://geodienste.example.org/wfs",
			"featureType": "kitas",
			"featureNS": "http://www.deegree.org/app",
			"version": "1.1.0"
		},
		{
			"id": "oaf-src",
			"typ": "OAF",
			"url": "https://api.example.org/ogc",
			"collection": "trees"
		},
		{
			"id": "sta-src",
			"typ": "SensorThings",
			"url": "https://iot.example.org/v1.1"
		},
		{
			"id": "wms-src",
			"typ": "WMS",
			"url": "https://geodienste.example.org/wms"
		}
	]"#;

	fn resolver(projection: &str) -> ServiceResolver {
		ServiceResolver::new(
			Arc::new(InMemoryCatalog::from_json(SERVICES).unwrap()),
			Arc::new(FixedProjection(projection.to_string())),
		)
	}

	fn visual(source_id: Option<&str>) -> LayerModel {
		LayerModel {
			id: "visual-1".to_string(),
			typ: Some("WMS".to_string()),
			source_id: source_id.map(str::to_string),
			url: Some("https://portal.example.org/data.geojson".to_string()),
		}
	}

	#[test]
	fn feature_service_splits_namespace_and_uses_source_url() {
		let descriptor = resolver("EPSG:25832")
			.resolve_service("visual-1", &visual(Some("wfs-src")), false)
			.unwrap();

		assert_eq!(descriptor.layer_id, "visual-1");
		assert_eq!(descriptor.url, "https://geodienste.example.org/wfs");
		assert!(!descriptor.external);
		assert_eq!(
			descriptor.protocol,
			ServiceProtocol::FeatureService {
				feature_ns: "http://www.deegree.org".to_string(),
				feature_prefix: "app".to_string(),
				feature_types: vec!["kitas".to_string()],
			}
		);
	}

	#[test]
	fn missing_entry_falls_back_to_document_collection() {
		let descriptor = resolver("EPSG:25832")
			.resolve_service("visual-1", &visual(Some("unknown")), true)
			.unwrap();

		assert_eq!(descriptor.protocol, ServiceProtocol::DocumentCollection);
		assert_eq!(descriptor.url, "https://portal.example.org/data.geojson");
		assert!(descriptor.external);
	}

	#[test]
	fn declared_layer_type_does_not_override_catalog() {
		let mut layer = visual(Some("unknown"));
		layer.typ = Some("WFS".to_string());
		let descriptor = resolver("EPSG:25832")
			.resolve_service("visual-1", &layer, false)
			.unwrap();
		assert_eq!(descriptor.protocol, ServiceProtocol::DocumentCollection);

		let mut layer = visual(Some("sta-src"));
		layer.typ = None;
		let descriptor = resolver("EPSG:25832")
			.resolve_service("visual-1", &layer, false)
			.unwrap();
		assert_eq!(descriptor.protocol.tag(), "sensorthings");
	}

	#[test]
	fn source_id_defaults_to_layer_id() {
		let layer = LayerModel {
			id: "wfs-src".to_string(),
			..Default::default()
		};
		let descriptor = resolver("EPSG:25832")
			.resolve_service("wfs-src", &layer, false)
			.unwrap();
		assert_eq!(descriptor.protocol.tag(), "wfs");
	}

	#[test]
	fn oaf_entry_carries_crs_and_default_limit() {
		let descriptor = resolver("EPSG:25832")
			.with_oaf_default_limit(250)
			.resolve_service("visual-1", &visual(Some("oaf-src")), false)
			.unwrap();

		assert_eq!(
			descriptor.protocol,
			ServiceProtocol::OgcApiFeatures {
				collection: "trees".to_string(),
				crs: Some("http://www.opengis.net/def/crs/EPSG/0/25832".to_string()),
				limit: 250,
			}
		);
	}

	#[test]
	fn oaf_entry_with_unknown_projection_omits_crs() {
		let descriptor = resolver("EPSG:9999")
			.resolve_service("visual-1", &visual(Some("oaf-src")), false)
			.unwrap();
		match descriptor.protocol {
			ServiceProtocol::OgcApiFeatures { crs, .. } => assert!(crs.is_none()),
			other => panic!("unexpected protocol {other:?}"),
		}
	}

	#[test]
	fn sensorthings_entry_gets_defaults() {
		let descriptor = resolver("EPSG:25832")
			.resolve_service("visual-1", &visual(Some("sta-src")), false)
			.unwrap();
		assert_eq!(
			descriptor.protocol,
			ServiceProtocol::SensorThings {
				version: "1.1".to_string(),
				root_entity: "Things".to_string(),
			}
		);
	}

	#[test]
	fn other_types_fall_back_to_visual_url() {
		let descriptor = resolver("EPSG:25832")
			.resolve_service("visual-1", &visual(Some("wms-src")), false)
			.unwrap();
		assert_eq!(descriptor.protocol, ServiceProtocol::DocumentCollection);
		assert_eq!(descriptor.url, "https://portal.example.org/data.geojson");
	}

	#[test]
	fn resolution_is_idempotent() {
		let resolver = resolver("EPSG:25832");
		let layer = visual(Some("wfs-src"));
		let first = resolver.resolve_service("visual-1", &layer, false).unwrap();
		let second = resolver.resolve_service("visual-1", &layer, false).unwrap();
		assert_eq!(first, second);
	}

	struct BrokenCatalog;

	impl ServiceCatalog for BrokenCatalog {
		fn find(
			&self,
			_predicate: &dyn Fn(&CatalogEntry) -> bool,
		) -> Result<Option<CatalogEntry>, CatalogError> {
			Err(CatalogError::Unavailable("not loaded".to_string()))
		}
	}

	#[test]
	fn catalog_failure_is_returned() {
		let resolver = ServiceResolver::new(
			Arc::new(BrokenCatalog),
			Arc::new(FixedProjection("EPSG:25832".to_string())),
		);
		let err = resolver
			.resolve_service("visual-1", &visual(None), false)
			.unwrap_err();
		assert!(matches!(err, FilterError::Catalog(_)));
	}
}
