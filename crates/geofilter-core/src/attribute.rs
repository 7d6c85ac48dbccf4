// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute addressing and value domains.
//!
//! Sensor-style backends nest sub-entities without a schema, so nested
//! attributes are addressed by position. The string form of a nested key is
//! part of existing portal configurations and must not change:
//!
//! - `@Datastreams.0.properties.<key>`
//! - `@Datastreams.0.Observations.0.result`

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// The field a nested attribute key points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NestedField {
	Property(String),
	FirstObservationResult,
}

/// Address of an attribute, either on the entity itself or on a
/// positionally addressed sub-entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKey {
	Direct(String),
	Nested {
		/// Plural entity kind, e.g. `Datastreams`.
		kind: String,
		index: usize,
		field: NestedField,
	},
}

impl AttributeKey {
	pub fn direct(name: impl Into<String>) -> Self {
		AttributeKey::Direct(name.into())
	}

	pub fn nested_property(kind: impl Into<String>, index: usize, key: impl Into<String>) -> Self {
		AttributeKey::Nested {
			kind: kind.into(),
			index,
			field: NestedField::Property(key.into()),
		}
	}

	pub fn first_observation(kind: impl Into<String>, index: usize) -> Self {
		AttributeKey::Nested {
			kind: kind.into(),
			index,
			field: NestedField::FirstObservationResult,
		}
	}

	pub fn is_nested(&self) -> bool {
		matches!(self, AttributeKey::Nested { .. })
	}
}

impl fmt::Display for AttributeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttributeKey::Direct(name) => f.write_str(name),
			AttributeKey::Nested {
				kind,
				index,
				field: NestedField::Property(key),
			} => write!(f, "@{kind}.{index}.properties.{key}"),
			AttributeKey::Nested {
				kind,
				index,
				field: NestedField::FirstObservationResult,
			} => write!(f, "@{kind}.{index}.Observations.0.result"),
		}
	}
}

impl FromStr for AttributeKey {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let Some(path) = s.strip_prefix('@') else {
			return Ok(AttributeKey::Direct(s.to_string()));
		};

		let malformed = || CoreError::MalformedAttributeKey(s.to_string());

		// Property keys may themselves contain dots.
		let mut parts = path.splitn(4, '.');
		let kind = parts.next().filter(|k| !k.is_empty()).ok_or_else(malformed)?;
		let index: usize = parts
			.next()
			.and_then(|i| i.parse().ok())
			.ok_or_else(malformed)?;

		match (parts.next(), parts.next()) {
			(Some("properties"), Some(key)) if !key.is_empty() => {
				Ok(AttributeKey::nested_property(kind, index, key))
			}
			(Some("Observations"), Some("0.result")) => Ok(AttributeKey::first_observation(kind, index)),
			_ => Err(malformed()),
		}
	}
}

impl Serialize for AttributeKey {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for AttributeKey {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Distinct observed values per attribute key.
///
/// Built once per fetch through [`DomainBuilder`]; a re-fetch produces a new
/// domain rather than mutating an existing one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeValueDomain {
	values: BTreeMap<String, Vec<Value>>,
}

impl AttributeValueDomain {
	pub fn get(&self, key: &AttributeKey) -> Option<&[Value]> {
		self.get_str(&key.to_string())
	}

	pub fn get_str(&self, key: &str) -> Option<&[Value]> {
		self.values.get(key).map(Vec::as_slice)
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.values.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

/// Accumulates values per key, keeping the first occurrence of each.
#[derive(Debug, Default)]
pub struct DomainBuilder {
	entries: HashMap<String, (HashSet<String>, Vec<Value>)>,
}

impl DomainBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record(&mut self, key: &AttributeKey, value: &Value) {
		let (seen, values) = self.entries.entry(key.to_string()).or_default();
		if seen.insert(value.to_string()) {
			values.push(value.clone());
		}
	}

	pub fn build(self) -> AttributeValueDomain {
		AttributeValueDomain {
			values: self
				.entries
				.into_iter()
				.map(|(key, (_, values))| (key, values))
				.collect(),
		}
	}
}
