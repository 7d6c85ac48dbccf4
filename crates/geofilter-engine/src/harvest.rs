// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Harvesting of attribute value domains from SensorThings responses.
//!
//! A single request scoped at the root entity (with its sub-entities and
//! their latest observation expanded) is flattened into an
//! [`AttributeValueDomain`]. Nested values are addressed positionally, e.g.
//! `@Datastreams.0.properties.unit` or `@Datastreams.1.Observations.0.result`.

use std::sync::Arc;

use geofilter_core::{AttributeKey, AttributeValueDomain, DomainBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{FilterError, TransportError};
use crate::transport::SensorTransport;

/// The entity kind that carries observations and an `observationType`.
pub const OBSERVATION_BEARING_ENTITY: &str = "Datastreams";

const OBSERVATIONS: &str = "Observations";
const LATEST_OBSERVATION: &str = "Observations($top=1;$orderby=phenomenonTime desc)";
/// Key of a `Datastreams` root's own latest observation result.
pub const ROOT_OBSERVATION_RESULT: &str = "Observations.0.result";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestedDomain {
	pub domain: AttributeValueDomain,
	pub observation_type: Option<String>,
}

pub struct ValueDomainHarvester {
	transport: Arc<dyn SensorTransport>,
}

impl ValueDomainHarvester {
	pub fn new(transport: Arc<dyn SensorTransport>) -> Self {
		Self { transport }
	}

	/// Fetches `root_entity` below `url` and builds its value domain.
	///
	/// Returns `Ok(None)` when the service answers with no entities.
	#[instrument(skip(self))]
	pub async fn harvest_values(
		&self,
		url: &str,
		root_entity: &str,
	) -> Result<Option<HarvestedDomain>, FilterError> {
		let request_url = entities_url(url, root_entity)?;
		let entities = self.transport.fetch_entities(&request_url).await?;

		match entities.as_array() {
			Some(list) if !list.is_empty() => {
				let harvested = build_domain(list, root_entity);
				debug!(
					entities = list.len(),
					keys = harvested.domain.len(),
					"value domain harvested"
				);
				Ok(Some(harvested))
			}
			_ => {
				debug!("no entities returned");
				Ok(None)
			}
		}
	}
}

/// Builds the request URL for `root_entity`, expanding sub-entities and
/// their latest observation.
pub fn entities_url(base: &str, root_entity: &str) -> Result<String, TransportError> {
	let joined = format!("{}/{}", base.trim_end_matches('/'), root_entity);
	let mut url =
		Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(format!("{joined}: {e}")))?;

	let expand = if root_entity == OBSERVATION_BEARING_ENTITY {
		LATEST_OBSERVATION.to_string()
	} else {
		format!("{OBSERVATION_BEARING_ENTITY}($expand={LATEST_OBSERVATION})")
	};
	url.query_pairs_mut().append_pair("$expand", &expand);

	Ok(url.into())
}

/// Flattens `entities` into a value domain. Non-object entries are ignored.
pub fn build_domain(entities: &[Value], root_entity: &str) -> HarvestedDomain {
	let mut builder = DomainBuilder::new();
	let root_bears_observations = root_entity == OBSERVATION_BEARING_ENTITY;

	for entity in entities.iter().filter_map(Value::as_object) {
		if let Some(properties) = entity.get("properties").and_then(Value::as_object) {
			for (key, value) in properties {
				builder.record(&AttributeKey::direct(key.as_str()), value);
			}
		}

		if root_bears_observations {
			if let Some(result) = first_observation_result(entity.get(OBSERVATIONS)) {
				builder.record(&AttributeKey::direct(ROOT_OBSERVATION_RESULT), result);
			}
		}

		for (kind, children) in entity {
			if kind == OBSERVATIONS {
				continue;
			}
			let Some(children) = children.as_array() else {
				continue;
			};

			for (index, child) in children.iter().enumerate() {
				let Some(child) = child.as_object() else {
					continue;
				};

				if let Some(properties) = child.get("properties").and_then(Value::as_object) {
					for (key, value) in properties {
						builder.record(
							&AttributeKey::nested_property(kind.as_str(), index, key.as_str()),
							value,
						);
					}
				}

				if let Some(result) = first_observation_result(child.get(OBSERVATIONS)) {
					builder.record(&AttributeKey::first_observation(kind.as_str(), index), result);
				}
			}
		}
	}

	HarvestedDomain {
		domain: builder.build(),
		observation_type: observation_type(entities.first(), root_entity),
	}
}

fn first_observation_result(observations: Option<&Value>) -> Option<&Value> {
	observations?.as_array()?.first()?.get("result")
}

fn observation_type(first: Option<&Value>, root_entity: &str) -> Option<String> {
	let first = first?;
	let holder = if root_entity == OBSERVATION_BEARING_ENTITY {
		first
	} else {
		first.get(OBSERVATION_BEARING_ENTITY)?.as_array()?.first()?
	};
	holder
		.get("observationType")
		.and_then(Value::as_str)
		.map(str::to_string)
}
