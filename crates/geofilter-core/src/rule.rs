// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Filter rules and the fixedness check used for reset affordances.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operator::Operator;

/// One filter predicate, edited through exactly one UI snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
	/// Unique within a filter group and stable across renders.
	pub snippet_id: u64,
	/// Backend attribute name or a synthetic nested path such as
	/// `@Datastreams.0.properties.type`.
	pub attr_name: String,
	pub operator: Operator,
	/// Fixed rules cannot be cleared by the end user.
	#[serde(default)]
	pub fixed: bool,
	/// Applied before any user interaction.
	#[serde(default)]
	pub startup: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<Value>,
}

impl Rule {
	pub fn new(snippet_id: u64, attr_name: impl Into<String>, operator: Operator) -> Self {
		Self {
			snippet_id,
			attr_name: attr_name.into(),
			operator,
			fixed: false,
			startup: false,
			value: None,
		}
	}

	pub fn with_value(mut self, value: Value) -> Self {
		self.value = Some(value);
		self
	}

	pub fn fixed(mut self) -> Self {
		self.fixed = true;
		self
	}

	pub fn at_startup(mut self) -> Self {
		self.startup = true;
		self
	}
}

/// Returns true if `value` has the shape of a rule object.
pub fn is_rule(value: &Value) -> bool {
	let Some(obj) = value.as_object() else {
		return false;
	};
	obj.get("snippetId").is_some_and(|v| v.is_u64() || v.is_i64())
		&& obj.get("attrName").is_some_and(Value::is_string)
		&& obj.get("operator").is_some_and(Value::is_string)
		&& obj.get("fixed").is_some_and(Value::is_boolean)
		&& obj.get("startup").is_some_and(Value::is_boolean)
}

/// Returns true if any entry in `rules` could be cleared by the user.
///
/// Non-array input and empty arrays yield `false`. Falsy entries and
/// well-formed fixed rules are skipped; any other entry, including a
/// malformed one, yields `true`.
pub fn has_unfixed_rules(rules: &Value) -> bool {
	let Some(entries) = rules.as_array() else {
		return false;
	};

	for entry in entries {
		if is_falsy(entry) {
			continue;
		}
		if is_rule(entry) && entry.get("fixed") == Some(&Value::Bool(true)) {
			continue;
		}
		return true;
	}

	false
}

fn is_falsy(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(b) => !b,
		Value::Number(n) => n.as_f64() == Some(0.0),
		Value::String(s) => s.is_empty(),
		Value::Array(_) | Value::Object(_) => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn rule_json(snippet_id: u64, fixed: bool) -> Value {
		json!({
			"snippetId": snippet_id,
			"attrName": "kategorie",
			"operator": "EQ",
			"fixed": fixed,
			"startup": false,
			"value": ["Schule"]
		})
	}

	#[test]
	fn empty_and_non_array_inputs_are_false() {
		assert!(!has_unfixed_rules(&json!([])));
		assert!(!has_unfixed_rules(&json!("not array")));
		assert!(!has_unfixed_rules(&json!({"0": rule_json(0, false)})));
		assert!(!has_unfixed_rules(&Value::Null));
	}

	#[test]
	fn only_fixed_rules_is_false() {
		assert!(!has_unfixed_rules(&json!([rule_json(0, true)])));
		assert!(!has_unfixed_rules(&json!([
			rule_json(0, true),
			rule_json(1, true)
		])));
	}

	#[test]
	fn one_unfixed_rule_is_true() {
		assert!(has_unfixed_rules(&json!([
			rule_json(0, true),
			rule_json(1, false)
		])));
	}

	#[test]
	fn falsy_entries_are_skipped() {
		assert!(!has_unfixed_rules(&json!([
			null,
			false,
			0,
			"",
			rule_json(3, true)
		])));
	}

	// Malformed entries count as "something to reset". Kept on purpose.
	#[test]
	fn malformed_entry_counts_as_unfixed() {
		assert!(has_unfixed_rules(&json!([{"fixed": true}])));
		assert!(has_unfixed_rules(&json!([rule_json(0, true), "garbage"])));
	}

	#[test]
	fn rule_serializes_camel_case() {
		let rule = Rule::new(4, "status", Operator::In)
			.with_value(json!(["a"]))
			.fixed();
		let value = serde_json::to_value(&rule).unwrap();
		assert!(is_rule(&value));
		assert_eq!(value["snippetId"], 4);
		assert_eq!(value["operator"], "IN");
		assert!(!has_unfixed_rules(&json!([value])));
	}

	#[test]
	fn rule_accepts_lower_case_operator() {
		let value = json!({
			"snippetId": 2,
			"attrName": "pupils",
			"operator": "between",
			"fixed": false,
			"startup": false,
			"value": [100, 500]
		});
		assert!(is_rule(&value));
		let rule: Rule = serde_json::from_value(value).unwrap();
		assert_eq!(rule.operator, Operator::Between);

		let unknown = json!({
			"snippetId": 2,
			"attrName": "pupils",
			"operator": "like",
			"fixed": false,
			"startup": false
		});
		assert!(serde_json::from_value::<Rule>(unknown).is_err());
	}
}
