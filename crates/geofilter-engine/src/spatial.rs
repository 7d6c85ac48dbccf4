// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Resolution of additional geometries used as spatial filter predicates.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::catalog::{CatalogEntry, CatalogServiceType, ServiceCatalog};
use crate::error::{FilterError, TransportError};
use crate::geojson::{ParsedFeature, ParserRegistry};
use crate::transport::FeatureTransport;

const DEFAULT_WFS_VERSION: &str = "1.1.0";

/// Reference to a catalog layer whose features become filter geometries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryRef {
	pub layer_id: String,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// A [`GeometryRef`] with its fetched features attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialFilterGeometry {
	#[serde(flatten)]
	pub reference: GeometryRef,
	pub features: Vec<ParsedFeature>,
}

impl SpatialFilterGeometry {
	pub fn layer_id(&self) -> &str {
		&self.reference.layer_id
	}
}

pub struct SpatialGeometryProvider {
	catalog: Arc<dyn ServiceCatalog>,
	transport: Arc<dyn FeatureTransport>,
	parsers: ParserRegistry,
}

impl SpatialGeometryProvider {
	pub fn new(catalog: Arc<dyn ServiceCatalog>, transport: Arc<dyn FeatureTransport>) -> Self {
		Self {
			catalog,
			transport,
			parsers: ParserRegistry::with_defaults(),
		}
	}

	pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
		self.parsers = parsers;
		self
	}

	/// Resolves a JSON list of references. Anything but an array yields no
	/// geometries; entries without a `layerId` are skipped.
	///
	/// References whose catalog entry is missing, or whose type cannot serve
	/// features (SensorThings and unrecognized types), are skipped as well.
	pub async fn resolve_additional_geometries(
		&self,
		refs: &Value,
	) -> Result<Vec<SpatialFilterGeometry>, FilterError> {
		let Some(entries) = refs.as_array() else {
			return Ok(Vec::new());
		};

		let refs: Vec<GeometryRef> = entries
			.iter()
			.filter_map(|entry| match serde_json::from_value(entry.clone()) {
				Ok(reference) => Some(reference),
				Err(e) => {
					warn!(error = %e, "skipping malformed geometry reference");
					None
				}
			})
			.collect();

		self.resolve_refs(&refs).await
	}

	/// Fetches all references concurrently. Output follows input order and
	/// any failure fails the whole call.
	#[instrument(skip(self, refs), fields(count = refs.len()))]
	pub async fn resolve_refs(
		&self,
		refs: &[GeometryRef],
	) -> Result<Vec<SpatialFilterGeometry>, FilterError> {
		let resolved = try_join_all(refs.iter().map(|reference| self.resolve_one(reference))).await?;
		let geometries: Vec<_> = resolved.into_iter().flatten().collect();
		debug!(resolved = geometries.len(), "additional geometries resolved");
		Ok(geometries)
	}

	async fn resolve_one(
		&self,
		reference: &GeometryRef,
	) -> Result<Option<SpatialFilterGeometry>, FilterError> {
		let Some(entry) = self.catalog.find_by_id(&reference.layer_id)? else {
			debug!(layer_id = %reference.layer_id, "geometry layer not in catalog, skipping");
			return Ok(None);
		};

		let Some((url, version)) = features_request(&entry)? else {
			warn!(
				layer_id = %reference.layer_id,
				typ = %entry.typ,
				"geometry layer type cannot serve features, skipping"
			);
			return Ok(None);
		};

		let payload = self.transport.fetch_raw(&url).await?;
		let features = self.parsers.parse(&version, &payload)?;

		Ok(Some(SpatialFilterGeometry {
			reference: reference.clone(),
			features,
		}))
	}
}

/// Request URL and parser version tag for the features of `entry`.
pub fn features_request(entry: &CatalogEntry) -> Result<Option<(String, String)>, TransportError> {
	match entry.service_type() {
		CatalogServiceType::Wfs => {
			let version = entry
				.version
				.clone()
				.unwrap_or_else(|| DEFAULT_WFS_VERSION.to_string());
			let feature_type = entry.feature_type.clone().unwrap_or_default();
			let url = wfs_get_feature_url(&entry.url, &version, &feature_type)?;
			Ok(Some((url, version)))
		}
		CatalogServiceType::Oaf => {
			let collection = entry.collection.clone().unwrap_or_default();
			Ok(Some((oaf_items_url(&entry.url, &collection)?, "oaf".to_string())))
		}
		CatalogServiceType::GeoJson => Ok(Some((entry.url.clone(), "geojson".to_string()))),
		CatalogServiceType::SensorThings | CatalogServiceType::Other(_) => Ok(None),
	}
}

/// Builds a WFS `GetFeature` request asking for GeoJSON output.
pub fn wfs_get_feature_url(
	base: &str,
	version: &str,
	feature_type: &str,
) -> Result<String, TransportError> {
	let mut url = parse_url(base)?;
	let type_param = if version.starts_with('2') {
		"typeNames"
	} else {
		"typeName"
	};
	url.query_pairs_mut()
		.append_pair("service", "WFS")
		.append_pair("request", "GetFeature")
		.append_pair("version", version)
		.append_pair(type_param, feature_type)
		.append_pair("outputFormat", "application/json");
	Ok(url.into())
}

pub fn oaf_items_url(base: &str, collection: &str) -> Result<String, TransportError> {
	let joined = format!(
		"{}/collections/{}/items",
		base.trim_end_matches('/'),
		collection
	);
	let mut url = parse_url(&joined)?;
	url.query_pairs_mut().append_pair("f", "json");
	Ok(url.into())
}

fn parse_url(raw: &str) -> Result<Url, TransportError> {
	Url::parse(raw).map_err(|e| TransportError::InvalidUrl(format!("{raw}: {e}")))
}
