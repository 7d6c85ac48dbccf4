// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, files, environment, CLI.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::layer::*;
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	UserFile = 30,
	ExplicitFile = 40,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	fn precedence(&self) -> Precedence;

	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		// Defaults are applied in FilterConfig::from_layer.
		Ok(ConfigLayer::default())
	}
}

/// TOML file source. A missing file yields an empty layer.
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
}

impl FileSource {
	/// User config: ~/.config/geofilter/config.toml
	pub fn user() -> Option<Self> {
		let path = dirs::config_dir()?.join("geofilter").join("config.toml");
		Some(Self {
			path,
			precedence: Precedence::UserFile,
			name: "user-config",
		})
	}

	/// A file passed explicitly, e.g. with `--config`.
	pub fn explicit(path: PathBuf) -> Self {
		Self {
			path,
			precedence: Precedence::ExplicitFile,
			name: "explicit-config",
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}

	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path)?;
		toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})
	}
}

/// Environment variable source.
///
/// Convention: GEOFILTER_<SECTION>__<FIELD>, e.g. `GEOFILTER_MAP__PROJECTION`.
pub struct EnvSource {
	vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
	/// Reads the process environment at load time.
	pub fn new() -> Self {
		Self { vars: None }
	}

	/// Reads a fixed set of variables instead of the process environment.
	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
	value
		.parse()
		.map_err(|_| ConfigError::Env(format!("{key}: cannot parse '{value}'")))
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		let vars = match &self.vars {
			Some(vars) => vars.clone(),
			None => std::env::vars().collect(),
		};

		let mut layer = ConfigLayer::default();

		for (key, value) in vars {
			if !key.starts_with("GEOFILTER_") {
				continue;
			}
			let value = value.trim().to_string();
			if value.is_empty() {
				continue;
			}

			trace!(key = %key, "processing env var");

			match key.as_str() {
				"GEOFILTER_HTTP__TIMEOUT_SECS" => {
					layer.http.get_or_insert_with(Default::default).timeout_secs =
						Some(parse_env(&key, &value)?);
				}
				"GEOFILTER_HTTP__USER_AGENT" => {
					layer.http.get_or_insert_with(Default::default).user_agent = Some(value);
				}
				"GEOFILTER_RETRY__MAX_ATTEMPTS" => {
					layer.retry.get_or_insert_with(Default::default).max_attempts =
						Some(parse_env(&key, &value)?);
				}
				"GEOFILTER_SENSORTHINGS__MAX_PAGES" => {
					layer.sensorthings.get_or_insert_with(Default::default).max_pages =
						Some(parse_env(&key, &value)?);
				}
				"GEOFILTER_OAF__DEFAULT_LIMIT" => {
					layer.oaf.get_or_insert_with(Default::default).default_limit =
						Some(parse_env(&key, &value)?);
				}
				"GEOFILTER_MAP__PROJECTION" => {
					layer.map.get_or_insert_with(Default::default).projection = Some(value);
				}
				"GEOFILTER_LOGGING__LEVEL" => {
					layer.logging.get_or_insert_with(Default::default).level = Some(value);
				}
				"GEOFILTER_LOGGING__FORMAT" => {
					layer.logging.get_or_insert_with(Default::default).format = Some(value);
				}
				_ => {
					debug!(key = %key, "ignoring unknown GEOFILTER_ variable");
				}
			}
		}

		Ok(layer)
	}
}

/// Overrides taken from command line flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub log_level: Option<String>,
	pub map_projection: Option<String>,
}

pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		let mut layer = ConfigLayer::default();
		if let Some(level) = &self.overrides.log_level {
			layer.logging = Some(LoggingLayer {
				level: Some(level.clone()),
				format: None,
			});
		}
		if let Some(projection) = &self.overrides.map_projection {
			layer.map = Some(MapLayer {
				projection: Some(projection.clone()),
			});
		}
		Ok(layer)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn missing_file_is_empty_layer() {
		let source = FileSource::explicit(PathBuf::from("/nonexistent/geofilter.toml"));
		let layer = source.load().unwrap();
		assert!(layer.http.is_none());
	}

	#[test]
	fn file_source_parses_toml() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[oaf]\ndefault_limit = 50").unwrap();

		let layer = FileSource::explicit(file.path().to_path_buf()).load().unwrap();
		assert_eq!(layer.oaf.unwrap().default_limit, Some(50));
	}

	#[test]
	fn invalid_toml_reports_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[oaf\ndefault_limit = ").unwrap();

		let err = FileSource::explicit(file.path().to_path_buf())
			.load()
			.unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn env_source_reads_prefixed_vars() {
		let source = EnvSource::from_vars([
			("GEOFILTER_MAP__PROJECTION", "EPSG:4326"),
			("GEOFILTER_SENSORTHINGS__MAX_PAGES", " 3 "),
			("GEOFILTER_HTTP__USER_AGENT", ""),
			("HOME", "/root"),
		]);
		let layer = source.load().unwrap();
		assert_eq!(layer.map.unwrap().projection.as_deref(), Some("EPSG:4326"));
		assert_eq!(layer.sensorthings.unwrap().max_pages, Some(3));
		assert!(layer.http.is_none());
	}

	#[test]
	fn env_source_rejects_unparseable_numbers() {
		let source = EnvSource::from_vars([("GEOFILTER_RETRY__MAX_ATTEMPTS", "many")]);
		assert!(matches!(source.load(), Err(ConfigError::Env(_))));
	}
}
