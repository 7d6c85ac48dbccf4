// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::layer::*;
use crate::ConfigError;

/// The final, validated configuration for the filter engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
	pub http: HttpConfig,
	pub retry: RetryConfig,
	pub sensorthings: SensorThingsConfig,
	pub oaf: OafConfig,
	pub map: MapConfig,
	pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
	pub timeout_secs: u64,
	/// Overrides the standard geofilter User-Agent.
	pub user_agent: Option<String>,
}

impl HttpConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			timeout_secs: 30,
			user_agent: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay_ms: 200,
			max_delay_ms: 5_000,
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorThingsConfig {
	/// Upper bound on `@iot.nextLink` pages followed per harvest.
	pub max_pages: u32,
	pub version: String,
}

impl Default for SensorThingsConfig {
	fn default() -> Self {
		Self {
			max_pages: 10,
			version: "1.1".to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OafConfig {
	pub default_limit: u32,
}

impl Default for OafConfig {
	fn default() -> Self {
		Self { default_limit: 400 }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
	pub projection: String,
}

impl Default for MapConfig {
	fn default() -> Self {
		Self {
			projection: "EPSG:25832".to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
	Compact,
}

impl FilterConfig {
	/// Build the runtime config from a merged layer, filling defaults.
	pub fn from_layer(layer: ConfigLayer) -> Result<Self, ConfigError> {
		let defaults = FilterConfig::default();

		let http = layer.http.unwrap_or_default();
		let retry = layer.retry.unwrap_or_default();
		let sta = layer.sensorthings.unwrap_or_default();
		let oaf = layer.oaf.unwrap_or_default();
		let map = layer.map.unwrap_or_default();
		let logging = layer.logging.unwrap_or_default();

		Ok(FilterConfig {
			http: HttpConfig {
				timeout_secs: http.timeout_secs.unwrap_or(defaults.http.timeout_secs),
				user_agent: http.user_agent,
			},
			retry: RetryConfig {
				max_attempts: retry.max_attempts.unwrap_or(defaults.retry.max_attempts),
				base_delay_ms: retry.base_delay_ms.unwrap_or(defaults.retry.base_delay_ms),
				max_delay_ms: retry.max_delay_ms.unwrap_or(defaults.retry.max_delay_ms),
				backoff_factor: retry.backoff_factor.unwrap_or(defaults.retry.backoff_factor),
				jitter: retry.jitter.unwrap_or(defaults.retry.jitter),
			},
			sensorthings: SensorThingsConfig {
				max_pages: sta.max_pages.unwrap_or(defaults.sensorthings.max_pages),
				version: sta.version.unwrap_or(defaults.sensorthings.version),
			},
			oaf: OafConfig {
				default_limit: oaf.default_limit.unwrap_or(defaults.oaf.default_limit),
			},
			map: MapConfig {
				projection: map.projection.unwrap_or(defaults.map.projection),
			},
			logging: LoggingConfig {
				level: parse_log_level(logging.level.as_deref())?,
				format: parse_log_format(logging.format.as_deref())?,
			},
		})
	}
}

fn parse_log_level(s: Option<&str>) -> Result<LogLevel, ConfigError> {
	match s {
		None => Ok(LogLevel::default()),
		Some("error") => Ok(LogLevel::Error),
		Some("warn") => Ok(LogLevel::Warn),
		Some("info") => Ok(LogLevel::Info),
		Some("debug") => Ok(LogLevel::Debug),
		Some("trace") => Ok(LogLevel::Trace),
		Some(other) => Err(ConfigError::invalid_value(
			"logging.level",
			format!("unknown level '{other}'"),
		)),
	}
}

fn parse_log_format(s: Option<&str>) -> Result<LogFormat, ConfigError> {
	match s {
		None => Ok(LogFormat::default()),
		Some("pretty") => Ok(LogFormat::Pretty),
		Some("json") => Ok(LogFormat::Json),
		Some("compact") => Ok(LogFormat::Compact),
		Some(other) => Err(ConfigError::invalid_value(
			"logging.format",
			format!("unknown format '{other}'"),
		)),
	}
}
