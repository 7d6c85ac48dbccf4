// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Client-side rule evaluation for document collections.

use geo::Intersects;
use geofilter_core::{Operator, Rule};
use serde_json::Value;
use tracing::trace;

use crate::geojson::{parse_geometry, ParsedFeature};

pub struct FeatureMatcher;

impl FeatureMatcher {
	/// True when `feature` satisfies every rule that carries a value.
	pub fn matches<'a>(feature: &ParsedFeature, rules: impl IntoIterator<Item = &'a Rule>) -> bool {
		rules.into_iter().all(|rule| match &rule.value {
			None => true,
			Some(value) => Self::matches_rule(feature, rule, value),
		})
	}

	pub fn filter<'f, 'r>(
		features: &'f [ParsedFeature],
		rules: &'r [Rule],
	) -> impl Iterator<Item = &'f ParsedFeature> + 'r
	where
		'f: 'r,
	{
		features
			.iter()
			.filter(move |feature| Self::matches(feature, rules))
	}

	fn matches_rule(feature: &ParsedFeature, rule: &Rule, expected: &Value) -> bool {
		if rule.operator == Operator::Intersects {
			return Self::intersects(feature, expected);
		}

		let actual = feature.property(&rule.attr_name).unwrap_or(&Value::Null);
		let matched = match (rule.operator, expected) {
			(Operator::In | Operator::Between, _) => rule.operator.evaluate(actual, expected),
			// A multi-select value matches when any selected entry does.
			(_, Value::Array(candidates)) => candidates
				.iter()
				.any(|candidate| rule.operator.evaluate(actual, candidate)),
			_ => rule.operator.evaluate(actual, expected),
		};
		trace!(
			snippet_id = rule.snippet_id,
			attr_name = %rule.attr_name,
			matched,
			"rule evaluated"
		);
		matched
	}

	fn intersects(feature: &ParsedFeature, expected: &Value) -> bool {
		let Some(geometry) = &feature.geometry else {
			return false;
		};
		match parse_geometry(expected) {
			Ok(filter_geometry) => geometry.intersects(&filter_geometry),
			Err(_) => false,
		}
	}
}
