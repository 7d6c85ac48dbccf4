// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use serde::Deserialize;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub http: Option<HttpLayer>,
	#[serde(default)]
	pub retry: Option<RetryLayer>,
	#[serde(default)]
	pub sensorthings: Option<SensorThingsLayer>,
	#[serde(default)]
	pub oaf: Option<OafLayer>,
	#[serde(default)]
	pub map: Option<MapLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpLayer {
	#[serde(default)]
	pub timeout_secs: Option<u64>,
	#[serde(default)]
	pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryLayer {
	#[serde(default)]
	pub max_attempts: Option<u32>,
	#[serde(default)]
	pub base_delay_ms: Option<u64>,
	#[serde(default)]
	pub max_delay_ms: Option<u64>,
	#[serde(default)]
	pub backoff_factor: Option<f64>,
	#[serde(default)]
	pub jitter: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorThingsLayer {
	#[serde(default)]
	pub max_pages: Option<u32>,
	#[serde(default)]
	pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OafLayer {
	#[serde(default)]
	pub default_limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapLayer {
	#[serde(default)]
	pub projection: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

// Fields set in `other` win.
fn merge_opt<T>(base: &mut Option<T>, other: Option<T>) {
	if other.is_some() {
		*base = other;
	}
}

impl ConfigLayer {
	/// Merge another layer on top of this one.
	pub fn merge(&mut self, other: ConfigLayer) {
		if let Some(o) = other.http {
			let s = self.http.get_or_insert_with(Default::default);
			merge_opt(&mut s.timeout_secs, o.timeout_secs);
			merge_opt(&mut s.user_agent, o.user_agent);
		}
		if let Some(o) = other.retry {
			let s = self.retry.get_or_insert_with(Default::default);
			merge_opt(&mut s.max_attempts, o.max_attempts);
			merge_opt(&mut s.base_delay_ms, o.base_delay_ms);
			merge_opt(&mut s.max_delay_ms, o.max_delay_ms);
			merge_opt(&mut s.backoff_factor, o.backoff_factor);
			merge_opt(&mut s.jitter, o.jitter);
		}
		if let Some(o) = other.sensorthings {
			let s = self.sensorthings.get_or_insert_with(Default::default);
			merge_opt(&mut s.max_pages, o.max_pages);
			merge_opt(&mut s.version, o.version);
		}
		if let Some(o) = other.oaf {
			let s = self.oaf.get_or_insert_with(Default::default);
			merge_opt(&mut s.default_limit, o.default_limit);
		}
		if let Some(o) = other.map {
			let s = self.map.get_or_insert_with(Default::default);
			merge_opt(&mut s.projection, o.projection);
		}
		if let Some(o) = other.logging {
			let s = self.logging.get_or_insert_with(Default::default);
			merge_opt(&mut s.level, o.level);
			merge_opt(&mut s.format, o.format);
		}
	}
}
