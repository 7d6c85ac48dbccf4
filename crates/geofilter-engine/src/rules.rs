// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Typed rule storage for one filter group.

use std::collections::BTreeMap;

use geofilter_core::{resolve_default_operator, Operator, Rule, SnippetType};
use serde_json::Value;
use tracing::debug;

use crate::error::FilterError;

/// A rule change as issued by a snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleInput {
	pub snippet_id: u64,
	pub attr_name: String,
	/// Explicitly configured operator; the snippet default applies when absent.
	pub operator: Option<Operator>,
	pub fixed: bool,
	pub startup: bool,
	pub value: Option<Value>,
}

impl RuleInput {
	pub fn new(snippet_id: u64, attr_name: impl Into<String>) -> Self {
		Self {
			snippet_id,
			attr_name: attr_name.into(),
			operator: None,
			fixed: false,
			startup: false,
			value: None,
		}
	}

	pub fn with_operator(mut self, operator: Operator) -> Self {
		self.operator = Some(operator);
		self
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

#[derive(Debug, Clone)]
struct RuleEntry {
	snippet_type: SnippetType,
	rule: Rule,
}

/// Rules of one filter group keyed by snippet id.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
	entries: BTreeMap<u64, RuleEntry>,
}

impl RuleSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates or replaces the rule for `input.snippet_id`.
	///
	/// An existing rule keeps its operator while the snippet type stays the
	/// same. Fixed rules reject every change.
	pub fn set(
		&mut self,
		snippet_type: SnippetType,
		has_delimiter: bool,
		input: RuleInput,
	) -> Result<&Rule, FilterError> {
		let existing = self.entries.get(&input.snippet_id);

		if existing.is_some_and(|entry| entry.rule.fixed) {
			return Err(FilterError::FixedRule(input.snippet_id));
		}

		let operator = match existing {
			Some(entry) if entry.snippet_type == snippet_type => entry.rule.operator,
			_ => input
				.operator
				.unwrap_or_else(|| resolve_default_operator(&snippet_type, has_delimiter)),
		};

		let rule = Rule {
			snippet_id: input.snippet_id,
			attr_name: input.attr_name,
			operator,
			fixed: input.fixed,
			startup: input.startup,
			value: input.value,
		};
		debug!(
			snippet_id = rule.snippet_id,
			snippet_type = %snippet_type,
			operator = %operator,
			"rule set"
		);

		let entry = self
			.entries
			.entry(rule.snippet_id)
			.and_modify(|entry| {
				entry.snippet_type = snippet_type.clone();
				entry.rule = rule.clone();
			})
			.or_insert(RuleEntry { snippet_type, rule });
		Ok(&entry.rule)
	}

	pub fn get(&self, snippet_id: u64) -> Option<&Rule> {
		self.entries.get(&snippet_id).map(|entry| &entry.rule)
	}

	/// Removes a non-fixed rule. Returns `None` when no rule exists.
	pub fn delete(&mut self, snippet_id: u64) -> Result<Option<Rule>, FilterError> {
		match self.entries.get(&snippet_id) {
			Some(entry) if entry.rule.fixed => Err(FilterError::FixedRule(snippet_id)),
			_ => Ok(self.entries.remove(&snippet_id).map(|entry| entry.rule)),
		}
	}

	/// Removes every non-fixed rule and returns them.
	pub fn clear(&mut self) -> Vec<Rule> {
		let removable: Vec<u64> = self
			.entries
			.iter()
			.filter(|(_, entry)| !entry.rule.fixed)
			.map(|(id, _)| *id)
			.collect();

		removable
			.into_iter()
			.filter_map(|id| self.entries.remove(&id).map(|entry| entry.rule))
			.collect()
	}

	pub fn has_unfixed(&self) -> bool {
		self.entries.values().any(|entry| !entry.rule.fixed)
	}

	/// Rules in snippet id order.
	pub fn rules(&self) -> impl Iterator<Item = &Rule> {
		self.entries.values().map(|entry| &entry.rule)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
