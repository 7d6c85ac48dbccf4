// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Comparison operators and the snippet-type default operator table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// UI widget type bound to one filter rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SnippetType {
	Checkbox,
	Date,
	DateRange,
	Dropdown,
	Text,
	Slider,
	SliderRange,
	/// Any snippet type this engine does not know about.
	Other(String),
}

impl SnippetType {
	pub fn as_str(&self) -> &str {
		match self {
			SnippetType::Checkbox => "checkbox",
			SnippetType::Date => "date",
			SnippetType::DateRange => "dateRange",
			SnippetType::Dropdown => "dropdown",
			SnippetType::Text => "text",
			SnippetType::Slider => "slider",
			SnippetType::SliderRange => "sliderRange",
			SnippetType::Other(name) => name,
		}
	}
}

impl From<&str> for SnippetType {
	fn from(s: &str) -> Self {
		match s {
			"checkbox" => SnippetType::Checkbox,
			"date" => SnippetType::Date,
			"dateRange" => SnippetType::DateRange,
			"dropdown" => SnippetType::Dropdown,
			"text" => SnippetType::Text,
			"slider" => SnippetType::Slider,
			"sliderRange" => SnippetType::SliderRange,
			other => SnippetType::Other(other.to_string()),
		}
	}
}

impl fmt::Display for SnippetType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Comparison operator of a filter rule.
///
/// Serialized with the upper-case names portal configurations use
/// (`"EQ"`, `"IN"`, `"BETWEEN"`, ...); any letter case is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
	Eq,
	Ne,
	Gt,
	Ge,
	Lt,
	Le,
	In,
	StartsWith,
	EndsWith,
	Between,
	Intersects,
}

impl Operator {
	pub fn as_str(&self) -> &'static str {
		match self {
			Operator::Eq => "EQ",
			Operator::Ne => "NE",
			Operator::Gt => "GT",
			Operator::Ge => "GE",
			Operator::Lt => "LT",
			Operator::Le => "LE",
			Operator::In => "IN",
			Operator::StartsWith => "STARTSWITH",
			Operator::EndsWith => "ENDSWITH",
			Operator::Between => "BETWEEN",
			Operator::Intersects => "INTERSECTS",
		}
	}

	/// Evaluates this operator against an attribute value and the rule value.
	///
	/// `Intersects` is geometric and always returns `false` here; geometry
	/// predicates are evaluated by the engine's feature matcher.
	pub fn evaluate(&self, actual: &serde_json::Value, expected: &serde_json::Value) -> bool {
		match self {
			Operator::Eq => loosely_equal(actual, expected),
			Operator::Ne => !loosely_equal(actual, expected),
			Operator::Gt => compare_values(actual, expected, |o| o.is_gt()),
			Operator::Ge => compare_values(actual, expected, |o| o.is_ge()),
			Operator::Lt => compare_values(actual, expected, |o| o.is_lt()),
			Operator::Le => compare_values(actual, expected, |o| o.is_le()),
			Operator::In => match expected.as_array() {
				Some(candidates) => candidates.iter().any(|c| loosely_equal(actual, c)),
				None => loosely_equal(actual, expected),
			},
			Operator::StartsWith => match (actual.as_str(), expected.as_str()) {
				(Some(a), Some(e)) => a.starts_with(e),
				_ => false,
			},
			Operator::EndsWith => match (actual.as_str(), expected.as_str()) {
				(Some(a), Some(e)) => a.ends_with(e),
				_ => false,
			},
			Operator::Between => match expected.as_array().map(|v| v.as_slice()) {
				Some([lo, hi]) => {
					compare_values(actual, lo, |o| o.is_ge()) && compare_values(actual, hi, |o| o.is_le())
				}
				_ => false,
			},
			Operator::Intersects => false,
		}
	}
}

impl fmt::Display for Operator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Operator {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"EQ" => Ok(Operator::Eq),
			"NE" => Ok(Operator::Ne),
			"GT" => Ok(Operator::Gt),
			"GE" => Ok(Operator::Ge),
			"LT" => Ok(Operator::Lt),
			"LE" => Ok(Operator::Le),
			"IN" => Ok(Operator::In),
			"STARTSWITH" => Ok(Operator::StartsWith),
			"ENDSWITH" => Ok(Operator::EndsWith),
			"BETWEEN" => Ok(Operator::Between),
			"INTERSECTS" => Ok(Operator::Intersects),
			_ => Err(CoreError::UnknownOperator(s.to_string())),
		}
	}
}

impl<'de> Deserialize<'de> for Operator {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Returns the operator a rule gets when its configuration omits one.
///
/// Unknown snippet types resolve to [`Operator::Eq`].
pub fn resolve_default_operator(snippet_type: &SnippetType, has_delimiter: bool) -> Operator {
	match snippet_type {
		SnippetType::Checkbox => Operator::Eq,
		SnippetType::Date => Operator::Eq,
		SnippetType::DateRange => Operator::Intersects,
		SnippetType::Dropdown if has_delimiter => Operator::In,
		SnippetType::Dropdown => Operator::Eq,
		SnippetType::Text => Operator::In,
		SnippetType::Slider => Operator::Eq,
		SnippetType::SliderRange => Operator::Between,
		SnippetType::Other(_) => Operator::Eq,
	}
}

// Backends frequently return numbers as strings, so "5" and 5 compare equal.
fn loosely_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
	if a == b {
		return true;
	}
	match (as_number(a), as_number(b)) {
		(Some(x), Some(y)) => x == y,
		_ => false,
	}
}

fn as_number(v: &serde_json::Value) -> Option<f64> {
	match v {
		serde_json::Value::Number(n) => n.as_f64(),
		serde_json::Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

fn compare_values<F>(actual: &serde_json::Value, expected: &serde_json::Value, cmp: F) -> bool
where
	F: Fn(std::cmp::Ordering) -> bool,
{
	if let (Some(a), Some(b)) = (as_number(actual), as_number(expected)) {
		return a.partial_cmp(&b).map(&cmp).unwrap_or(false);
	}
	// ISO dates compare correctly as strings.
	match (actual.as_str(), expected.as_str()) {
		(Some(a), Some(b)) => cmp(a.cmp(b)),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	#[test]
	fn default_operator_table() {
		let cases = [
			("checkbox", false, Operator::Eq),
			("date", false, Operator::Eq),
			("dateRange", false, Operator::Intersects),
			("dropdown", false, Operator::Eq),
			("dropdown", true, Operator::In),
			("text", false, Operator::In),
			("slider", false, Operator::Eq),
			("sliderRange", false, Operator::Between),
		];
		for (snippet, delimiter, expected) in cases {
			assert_eq!(
				resolve_default_operator(&SnippetType::from(snippet), delimiter),
				expected,
				"snippet type {snippet}"
			);
		}
	}

	#[test]
	fn delimiter_only_affects_dropdown() {
		assert_eq!(
			resolve_default_operator(&SnippetType::Checkbox, true),
			Operator::Eq
		);
		assert_eq!(
			resolve_default_operator(&SnippetType::SliderRange, true),
			Operator::Between
		);
	}

	#[test]
	fn operator_wire_names_roundtrip() {
		assert_eq!("BETWEEN".parse::<Operator>().unwrap(), Operator::Between);
		assert_eq!("startswith".parse::<Operator>().unwrap(), Operator::StartsWith);
		assert_eq!(
			serde_json::to_value(Operator::Intersects).unwrap(),
			json!("INTERSECTS")
		);
		assert_eq!(
			"LIKE".parse::<Operator>(),
			Err(CoreError::UnknownOperator("LIKE".to_string()))
		);
	}

	#[test]
	fn evaluate_membership_and_range() {
		assert!(Operator::In.evaluate(&json!("b"), &json!(["a", "b"])));
		assert!(!Operator::In.evaluate(&json!("c"), &json!(["a", "b"])));
		assert!(Operator::Between.evaluate(&json!(5), &json!([1, 10])));
		assert!(Operator::Between.evaluate(&json!("5"), &json!([5, 10])));
		assert!(!Operator::Between.evaluate(&json!(11), &json!([1, 10])));
		assert!(!Operator::Between.evaluate(&json!(5), &json!(3)));
	}

	#[test]
	fn evaluate_dates_as_strings() {
		assert!(Operator::Ge.evaluate(&json!("2024-03-01"), &json!("2024-01-01")));
		assert!(Operator::Lt.evaluate(&json!("2023-12-31"), &json!("2024-01-01")));
	}

	#[test]
	fn intersects_is_not_evaluated_on_scalars() {
		assert!(!Operator::Intersects.evaluate(&json!(1), &json!(1)));
	}

	proptest! {
		#[test]
		fn unknown_snippet_types_default_to_eq(name in "[a-z]{1,12}", delimiter: bool) {
			let known = ["checkbox", "date", "dropdown", "text", "slider"];
			prop_assume!(!known.contains(&name.as_str()));
			prop_assert_eq!(
				resolve_default_operator(&SnippetType::from(name.as_str()), delimiter),
				Operator::Eq
			);
		}

		#[test]
		fn ne_is_negation_of_eq(a: i64, b: i64) {
			let (a, b) = (json!(a), json!(b));
			prop_assert_eq!(Operator::Eq.evaluate(&a, &b), !Operator::Ne.evaluate(&a, &b));
		}
	}
}
