// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use geofilter_config::FilterConfig;
use geofilter_core::{crs_code_to_uri, resolve_default_operator, SnippetType};
use geofilter_engine::{
	FixedProjection, HttpTransport, InMemoryCatalog, LayerModel, ServiceResolver,
	SpatialGeometryProvider, ValueDomainHarvester,
};
use serde_json::{json, Value};
use tracing::info;

pub fn crs(code: &str) -> Value {
	json!({ "code": code, "uri": crs_code_to_uri(code) })
}

pub fn operator(snippet_type: &str, has_delimiter: bool) -> Value {
	let snippet_type = SnippetType::from(snippet_type);
	let operator = resolve_default_operator(&snippet_type, has_delimiter);
	json!({
		"snippetType": snippet_type.as_str(),
		"delimiter": has_delimiter,
		"operator": operator,
	})
}

fn load_catalog(path: &Path) -> Result<Arc<InMemoryCatalog>> {
	let catalog = InMemoryCatalog::from_path(path)
		.with_context(|| format!("failed to load catalog {}", path.display()))?;
	info!(entries = catalog.len(), "catalog loaded");
	Ok(Arc::new(catalog))
}

pub fn resolve(config: &FilterConfig, catalog: &Path, layer: &str, external: bool) -> Result<Value> {
	let layer: LayerModel = serde_json::from_str(layer).context("invalid layer JSON")?;
	if layer.id.is_empty() {
		anyhow::bail!("layer JSON needs an \"id\"");
	}

	let resolver = ServiceResolver::new(
		load_catalog(catalog)?,
		Arc::new(FixedProjection(config.map.projection.clone())),
	)
	.with_oaf_default_limit(config.oaf.default_limit)
	.with_sensorthings_version(config.sensorthings.version.clone());

	let descriptor = resolver
		.resolve_service(&layer.id, &layer, external)
		.context("failed to resolve service")?;
	Ok(serde_json::to_value(descriptor)?)
}

pub async fn harvest(config: &FilterConfig, url: &str, root: &str) -> Result<Value> {
	let transport = Arc::new(HttpTransport::from_config(config).context("failed to build HTTP client")?);
	let harvester = ValueDomainHarvester::new(transport);

	let harvested = harvester
		.harvest_values(url, root)
		.await
		.with_context(|| format!("failed to harvest {url}"))?;

	match harvested {
		Some(harvested) => Ok(serde_json::to_value(harvested)?),
		None => {
			info!(url, root, "service returned no entities");
			Ok(Value::Null)
		}
	}
}

pub async fn geometries(config: &FilterConfig, catalog: &Path, layer_ids: &[String]) -> Result<Value> {
	let transport = Arc::new(HttpTransport::from_config(config).context("failed to build HTTP client")?);
	let provider = SpatialGeometryProvider::new(load_catalog(catalog)?, transport);

	let refs = Value::Array(
		layer_ids
			.iter()
			.map(|id| json!({ "layerId": id }))
			.collect(),
	);
	let geometries = provider
		.resolve_additional_geometries(&refs)
		.await
		.context("failed to load geometries")?;
	Ok(serde_json::to_value(geometries)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn crs_output_contains_uri() {
		let out = crs("EPSG:4326");
		assert_eq!(out["uri"], "http://www.opengis.net/def/crs/EPSG/0/4326");
		assert_eq!(crs("EPSG:1")["uri"], "");
	}

	#[test]
	fn operator_output_uses_wire_names() {
		assert_eq!(operator("dropdown", true)["operator"], "IN");
		assert_eq!(operator("sliderRange", false)["operator"], "BETWEEN");
		assert_eq!(operator("colorPicker", false)["operator"], "EQ");
	}

	#[test]
	fn resolve_reads_catalog_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"[{{"id": "src", "typ": "WFS", "url": "https://x.example.org/wfs", "featureType": "ft", "featureNS": "http://ns/app"}}]"#
		)
		.unwrap();

		let out = resolve(
			&FilterConfig::default(),
			file.path(),
			r#"{"id": "visual", "sourceId": "src"}"#,
			true,
		)
		.unwrap();

		assert_eq!(out["type"], "wfs");
		assert_eq!(out["layerId"], "visual");
		assert_eq!(out["extern"], true);
		assert_eq!(out["featurePrefix"], "app");
		assert_eq!(out["featureTypes"], json!(["ft"]));
	}

	#[test]
	fn resolve_rejects_layer_without_id() {
		let file = tempfile::NamedTempFile::new().unwrap();
		assert!(resolve(&FilterConfig::default(), file.path(), "{}", false).is_err());
	}
}
