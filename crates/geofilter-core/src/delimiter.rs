// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Splitting of delimiter-joined attribute values.

use std::collections::HashSet;

use serde_json::Value;

/// Splits every string in `values` on `delimiter` and returns the distinct
/// tokens in first-seen order.
///
/// A non-array `values` or a missing/empty delimiter returns `values`
/// unchanged. Non-string entries are kept as single tokens.
pub fn split_by_delimiter(values: &Value, delimiter: Option<&str>) -> Value {
	let Some(entries) = values.as_array() else {
		return values.clone();
	};
	let Some(delimiter) = delimiter.filter(|d| !d.is_empty()) else {
		return values.clone();
	};

	let mut seen = HashSet::new();
	let mut tokens = Vec::new();

	let mut push = |token: Value| {
		// Keyed on the JSON text so "1" and 1 stay distinct.
		if seen.insert(token.to_string()) {
			tokens.push(token);
		}
	};

	for entry in entries {
		match entry {
			Value::String(s) => {
				for part in s.split(delimiter) {
					push(Value::String(part.to_string()));
				}
			}
			other => push(other.clone()),
		}
	}

	Value::Array(tokens)
}
