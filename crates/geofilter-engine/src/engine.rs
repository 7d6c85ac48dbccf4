// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The filter engine facade.
//!
//! One [`FilterEngine`] serves one filter module instance. It owns the rules
//! of every filter group, one service descriptor per registered layer, the
//! latest value domain per layer and the resolved additional geometries.
//! Only layer ids and snippet ids cross the boundary to the UI.

use std::collections::HashMap;
use std::sync::Arc;

use geofilter_config::FilterConfig;
use geofilter_core::{split_by_delimiter, Rule, ServiceDescriptor, ServiceProtocol, SnippetType};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::catalog::{LayerModel, ServiceCatalog};
use crate::error::{FilterError, Result};
use crate::geojson::ParsedFeature;
use crate::harvest::{HarvestedDomain, ValueDomainHarvester};
use crate::matcher::FeatureMatcher;
use crate::rules::{RuleInput, RuleSet};
use crate::service::{FixedProjection, ServiceResolver};
use crate::spatial::{SpatialFilterGeometry, SpatialGeometryProvider};
use crate::state::{StateSink, REPLACE_BY_ID_IN_LAYER_CONFIG};
use crate::transport::HttpTransport;

/// Outcome of [`FilterEngine::refresh_value_domain`].
#[derive(Debug, Clone, PartialEq)]
pub enum DomainRefresh {
	Updated(HarvestedDomain),
	/// The service returned no entities; the stored domain is unchanged.
	Empty,
	/// A newer refresh for the same layer was issued while this one ran.
	Superseded,
}

#[derive(Default)]
struct EngineState {
	groups: HashMap<u64, RuleSet>,
	services: HashMap<String, ServiceDescriptor>,
	domains: HashMap<String, HarvestedDomain>,
	generations: HashMap<String, u64>,
	geometries: HashMap<String, Vec<SpatialFilterGeometry>>,
}

pub struct FilterEngine {
	resolver: ServiceResolver,
	harvester: ValueDomainHarvester,
	geometries: SpatialGeometryProvider,
	sink: Arc<dyn StateSink>,
	state: Mutex<EngineState>,
}

impl FilterEngine {
	pub fn new(
		resolver: ServiceResolver,
		harvester: ValueDomainHarvester,
		geometries: SpatialGeometryProvider,
		sink: Arc<dyn StateSink>,
	) -> Self {
		Self {
			resolver,
			harvester,
			geometries,
			sink,
			state: Mutex::new(EngineState::default()),
		}
	}

	/// Wires an engine with the HTTP transport and a fixed projection taken
	/// from `config`.
	pub fn from_config(
		config: &FilterConfig,
		catalog: Arc<dyn ServiceCatalog>,
		sink: Arc<dyn StateSink>,
	) -> Result<Self> {
		let transport = Arc::new(HttpTransport::from_config(config)?);
		let projection = Arc::new(FixedProjection(config.map.projection.clone()));

		let resolver = ServiceResolver::new(catalog.clone(), projection)
			.with_oaf_default_limit(config.oaf.default_limit)
			.with_sensorthings_version(config.sensorthings.version.clone());
		let harvester = ValueDomainHarvester::new(transport.clone());
		let geometries = SpatialGeometryProvider::new(catalog, transport);

		Ok(Self::new(resolver, harvester, geometries, sink))
	}

	pub async fn set_rule(
		&self,
		group: u64,
		snippet_type: SnippetType,
		has_delimiter: bool,
		input: RuleInput,
	) -> Result<Rule> {
		let mut state = self.state.lock().await;
		let rules = state.groups.entry(group).or_default();
		rules.set(snippet_type, has_delimiter, input).cloned()
	}

	pub async fn delete_rule(&self, group: u64, snippet_id: u64) -> Result<Option<Rule>> {
		let mut state = self.state.lock().await;
		match state.groups.get_mut(&group) {
			Some(rules) => rules.delete(snippet_id),
			None => Ok(None),
		}
	}

	/// Removes every non-fixed rule of `group`.
	pub async fn clear_rules(&self, group: u64) -> Vec<Rule> {
		let mut state = self.state.lock().await;
		let cleared = state
			.groups
			.get_mut(&group)
			.map(RuleSet::clear)
			.unwrap_or_default();
		debug!(group, cleared = cleared.len(), "rules cleared");
		cleared
	}

	pub async fn has_unfixed_rules(&self, group: u64) -> bool {
		let state = self.state.lock().await;
		state.groups.get(&group).is_some_and(RuleSet::has_unfixed)
	}

	pub async fn rules(&self, group: u64) -> Vec<Rule> {
		let state = self.state.lock().await;
		state
			.groups
			.get(&group)
			.map(|rules| rules.rules().cloned().collect())
			.unwrap_or_default()
	}

	/// Resolves and stores the layer's service, then asks the application
	/// to show the layer.
	#[instrument(skip(self, layer))]
	pub async fn register_layer(
		&self,
		layer_id: &str,
		layer: &LayerModel,
		external: bool,
	) -> Result<ServiceDescriptor> {
		let descriptor = self.resolver.resolve_service(layer_id, layer, external)?;

		{
			let mut state = self.state.lock().await;
			state
				.services
				.insert(layer_id.to_string(), descriptor.clone());
		}

		self.sink.dispatch(
			REPLACE_BY_ID_IN_LAYER_CONFIG,
			json!({
				"layerConfigs": [{
					"id": layer_id,
					"layer": {
						"id": layer_id,
						"visibility": true,
						"showInLayerTree": true
					}
				}]
			}),
		);

		info!(protocol = descriptor.protocol.tag(), "layer registered");
		Ok(descriptor)
	}

	/// Forgets everything held for `layer_id`. Returns whether it was known.
	pub async fn unregister_layer(&self, layer_id: &str) -> bool {
		let mut state = self.state.lock().await;
		state.domains.remove(layer_id);
		state.geometries.remove(layer_id);
		state.services.remove(layer_id).is_some()
	}

	pub async fn service(&self, layer_id: &str) -> Option<ServiceDescriptor> {
		self.state.lock().await.services.get(layer_id).cloned()
	}

	/// Re-harvests the value domain of a SensorThings layer.
	///
	/// Each call takes a new generation; a harvest that completes after a
	/// newer one was issued is discarded.
	#[instrument(skip(self))]
	pub async fn refresh_value_domain(&self, layer_id: &str) -> Result<DomainRefresh> {
		let (generation, url, root_entity) = {
			let mut state = self.state.lock().await;
			let descriptor = state
				.services
				.get(layer_id)
				.ok_or_else(|| FilterError::UnknownLayer(layer_id.to_string()))?;

			let (url, root_entity) = match &descriptor.protocol {
				ServiceProtocol::SensorThings { root_entity, .. } => {
					(descriptor.url.clone(), root_entity.clone())
				}
				other => {
					return Err(FilterError::UnsupportedProtocol {
						layer_id: layer_id.to_string(),
						protocol: other.tag().to_string(),
					})
				}
			};

			let generation = state.generations.entry(layer_id.to_string()).or_insert(0);
			*generation += 1;
			(*generation, url, root_entity)
		};

		let harvested = self.harvester.harvest_values(&url, &root_entity).await;

		let mut state = self.state.lock().await;
		if state.generations.get(layer_id) != Some(&generation) {
			debug!(generation, failed = harvested.is_err(), "discarding superseded value domain");
			return Ok(DomainRefresh::Superseded);
		}

		match harvested? {
			Some(harvested) => {
				state
					.domains
					.insert(layer_id.to_string(), harvested.clone());
				Ok(DomainRefresh::Updated(harvested))
			}
			None => Ok(DomainRefresh::Empty),
		}
	}

	pub async fn value_domain(&self, layer_id: &str) -> Option<HarvestedDomain> {
		self.state.lock().await.domains.get(layer_id).cloned()
	}

	/// Values a snippet may offer for `attr_name`, split on `delimiter` when
	/// the attribute stores joined values.
	pub async fn offerable_values(
		&self,
		layer_id: &str,
		attr_name: &str,
		delimiter: Option<&str>,
	) -> Option<Value> {
		let state = self.state.lock().await;
		let values = state.domains.get(layer_id)?.domain.get_str(attr_name)?;
		Some(split_by_delimiter(&Value::Array(values.to_vec()), delimiter))
	}

	/// Resolves `refs` and stores the result for `layer_id`, replacing any
	/// earlier geometries. Nothing is stored when resolution fails.
	#[instrument(skip(self, refs))]
	pub async fn load_additional_geometries(
		&self,
		layer_id: &str,
		refs: &Value,
	) -> Result<Vec<SpatialFilterGeometry>> {
		let geometries = self.geometries.resolve_additional_geometries(refs).await?;

		let mut state = self.state.lock().await;
		state
			.geometries
			.insert(layer_id.to_string(), geometries.clone());
		Ok(geometries)
	}

	pub async fn additional_geometries(&self, layer_id: &str) -> Vec<SpatialFilterGeometry> {
		let state = self.state.lock().await;
		state.geometries.get(layer_id).cloned().unwrap_or_default()
	}

	/// Applies the rules of `group` to features of a document collection.
	pub async fn filter_features(&self, group: u64, features: &[ParsedFeature]) -> Vec<ParsedFeature> {
		let rules = self.rules(group).await;
		FeatureMatcher::filter(features, &rules).cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::InMemoryCatalog;
	use crate::error::TransportError;
	use crate::state::ChannelStateSink;
	use crate::transport::{FeatureTransport, SensorTransport};
	use async_trait::async_trait;
	use geofilter_core::Operator;
	use serde_json::json;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tokio::sync::Notify;

	const SERVICES: &str = r#"[
		{"id": "sta", "typ": "SensorThings", "url": "https://iot.example.org/v1.1"},
		{"id": "wfs", "typ": "WFS", "url": "https://geodienste.example.org/wfs", "featureType": "a", "featureNS": "http://ns/app"}
	]"#;

	/// First call blocks until the second has completed.
	#[derive(Default)]
	struct RacingTransport {
		calls: AtomicUsize,
		second_done: Notify,
		first_fails: bool,
	}

	#[async_trait]
	impl SensorTransport for RacingTransport {
		async fn fetch_entities(&self, _url: &str) -> std::result::Result<Value, TransportError> {
			match self.calls.fetch_add(1, Ordering::SeqCst) {
				0 => {
					self.second_done.notified().await;
					if self.first_fails {
						return Err(TransportError::InvalidBody("stale request failed".to_string()));
					}
					Ok(json!([{"properties": {"state": "stale"}}]))
				}
				_ => {
					self.second_done.notify_one();
					Ok(json!([{"properties": {"state": "fresh", "tags": "a|b"}}]))
				}
			}
		}
	}

	#[async_trait]
	impl FeatureTransport for RacingTransport {
		async fn fetch_raw(&self, url: &str) -> std::result::Result<String, TransportError> {
			Err(TransportError::InvalidUrl(url.to_string()))
		}
	}

	fn engine() -> (FilterEngine, tokio::sync::mpsc::UnboundedReceiver<crate::state::StateAction>) {
		engine_with(RacingTransport::default())
	}

	fn engine_with(
		transport: RacingTransport,
	) -> (FilterEngine, tokio::sync::mpsc::UnboundedReceiver<crate::state::StateAction>) {
		let catalog: Arc<dyn ServiceCatalog> = Arc::new(InMemoryCatalog::from_json(SERVICES).unwrap());
		let transport = Arc::new(transport);
		let (sink, rx) = ChannelStateSink::new();
		let engine = FilterEngine::new(
			ServiceResolver::new(
				catalog.clone(),
				Arc::new(FixedProjection("EPSG:25832".to_string())),
			),
			ValueDomainHarvester::new(transport.clone()),
			SpatialGeometryProvider::new(catalog, transport),
			Arc::new(sink),
		);
		(engine, rx)
	}

	#[tokio::test]
	async fn register_layer_stores_descriptor_and_dispatches() {
		let (engine, mut rx) = engine();
		let layer = LayerModel {
			id: "wfs".to_string(),
			..Default::default()
		};

		let descriptor = engine.register_layer("wfs", &layer, false).await.unwrap();
		assert_eq!(descriptor.protocol.tag(), "wfs");
		assert_eq!(engine.service("wfs").await, Some(descriptor));

		let action = rx.recv().await.unwrap();
		assert_eq!(action.action, REPLACE_BY_ID_IN_LAYER_CONFIG);
		assert_eq!(action.payload["layerConfigs"][0]["layer"]["visibility"], true);

		assert!(engine.unregister_layer("wfs").await);
		assert!(engine.service("wfs").await.is_none());
	}

	#[tokio::test]
	async fn rules_are_kept_per_group() {
		let (engine, _rx) = engine();
		engine
			.set_rule(1, SnippetType::Dropdown, true, RuleInput::new(1, "tags"))
			.await
			.unwrap();
		engine
			.set_rule(2, SnippetType::Checkbox, false, RuleInput::new(1, "open").fixed())
			.await
			.unwrap();

		assert_eq!(engine.rules(1).await[0].operator, Operator::In);
		assert!(engine.has_unfixed_rules(1).await);
		assert!(!engine.has_unfixed_rules(2).await);
		assert!(!engine.has_unfixed_rules(3).await);

		assert_eq!(engine.clear_rules(1).await.len(), 1);
		assert!(engine.clear_rules(2).await.is_empty());
		assert!(matches!(
			engine.delete_rule(2, 1).await,
			Err(FilterError::FixedRule(1))
		));
	}

	#[tokio::test]
	async fn latest_refresh_wins() {
		let (engine, _rx) = engine();
		let layer = LayerModel {
			id: "sta".to_string(),
			..Default::default()
		};
		engine.register_layer("sta", &layer, false).await.unwrap();

		let (first, second) = tokio::join!(
			engine.refresh_value_domain("sta"),
			engine.refresh_value_domain("sta")
		);

		assert_eq!(first.unwrap(), DomainRefresh::Superseded);
		assert!(matches!(second.unwrap(), DomainRefresh::Updated(_)));

		let stored = engine.value_domain("sta").await.unwrap();
		assert_eq!(stored.domain.get_str("state").unwrap(), &[json!("fresh")][..]);

		let values = engine.offerable_values("sta", "tags", Some("|")).await;
		assert_eq!(values, Some(json!(["a", "b"])));
	}

	#[tokio::test]
	async fn superseded_refresh_failure_is_discarded() {
		let (engine, _rx) = engine_with(RacingTransport {
			first_fails: true,
			..Default::default()
		});
		let layer = LayerModel {
			id: "sta".to_string(),
			..Default::default()
		};
		engine.register_layer("sta", &layer, false).await.unwrap();

		let (first, second) = tokio::join!(
			engine.refresh_value_domain("sta"),
			engine.refresh_value_domain("sta")
		);

		assert_eq!(first.unwrap(), DomainRefresh::Superseded);
		assert!(matches!(second.unwrap(), DomainRefresh::Updated(_)));
		let stored = engine.value_domain("sta").await.unwrap();
		assert_eq!(stored.domain.get_str("state").unwrap(), &[json!("fresh")][..]);
	}

	#[tokio::test]
	async fn refresh_requires_a_sensorthings_layer() {
		let (engine, _rx) = engine();
		assert!(matches!(
			engine.refresh_value_domain("sta").await,
			Err(FilterError::UnknownLayer(_))
		));

		let layer = LayerModel {
			id: "wfs".to_string(),
			..Default::default()
		};
		engine.register_layer("wfs", &layer, false).await.unwrap();
		assert!(matches!(
			engine.refresh_value_domain("wfs").await,
			Err(FilterError::UnsupportedProtocol { .. })
		));
	}

	#[tokio::test]
	async fn failed_geometry_load_keeps_previous_state() {
		let (engine, _rx) = engine();
		let result = engine
			.load_additional_geometries("layer", &json!([{"layerId": "wfs"}]))
			.await;
		assert!(result.is_err());
		assert!(engine.additional_geometries("layer").await.is_empty());

		let loaded = engine
			.load_additional_geometries("layer", &json!([{"layerId": "missing"}]))
			.await
			.unwrap();
		assert!(loaded.is_empty());
	}

	#[tokio::test]
	async fn filter_features_applies_group_rules() {
		let (engine, _rx) = engine();
		engine
			.set_rule(
				1,
				SnippetType::Text,
				false,
				RuleInput::new(1, "name").with_value(json!(["Alster"])),
			)
			.await
			.unwrap();

		let features = crate::geojson::parse_features(&json!([
			{"type": "Feature", "geometry": null, "properties": {"name": "Alster"}},
			{"type": "Feature", "geometry": null, "properties": {"name": "Elbe"}}
		]))
		.unwrap();

		let matched = engine.filter_features(1, &features).await;
		assert_eq!(matched.len(), 1);
		assert_eq!(matched[0].property("name"), Some(&json!("Alster")));
	}
}
