// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration registry - manages sources and merges layers.

use tracing::{debug, info};

use crate::layer::ConfigLayer;
use crate::runtime::FilterConfig;
use crate::sources::ConfigSource;
use crate::validation::validate_config;
use crate::ConfigError;

pub struct ConfigRegistry {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigRegistry {
	pub fn new() -> Self {
		Self {
			sources: Vec::new(),
		}
	}

	pub fn register(&mut self, source: Box<dyn ConfigSource>) {
		debug!(source = source.name(), precedence = ?source.precedence(), "registering config source");
		self.sources.push(source);
	}

	/// Load configuration from all sources, merge, and validate.
	///
	/// Sources are merged lowest precedence first. Unlike missing files, a
	/// source that fails to parse aborts loading.
	pub fn load(&self) -> Result<FilterConfig, ConfigError> {
		let mut sorted: Vec<_> = self.sources.iter().collect();
		sorted.sort_by_key(|s| s.precedence());

		let mut merged = ConfigLayer::default();
		for source in sorted {
			let layer = source.load()?;
			debug!(source = source.name(), "merging config layer");
			merged.merge(layer);
		}

		let config = FilterConfig::from_layer(merged)?;
		validate_config(&config)?;

		info!(
			projection = %config.map.projection,
			max_pages = config.sensorthings.max_pages,
			log_level = ?config.logging.level,
			"configuration loaded"
		);

		Ok(config)
	}

	pub fn source_count(&self) -> usize {
		self.sources.len()
	}
}

impl Default for ConfigRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layer::MapLayer;
	use crate::sources::{DefaultsSource, EnvSource, Precedence};

	struct FixedSource {
		precedence: Precedence,
		projection: &'static str,
	}

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.precedence
		}

		fn load(&self) -> Result<ConfigLayer, ConfigError> {
			Ok(ConfigLayer {
				map: Some(MapLayer {
					projection: Some(self.projection.to_string()),
				}),
				..Default::default()
			})
		}
	}

	#[test]
	fn loads_defaults() {
		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(DefaultsSource));
		assert_eq!(registry.source_count(), 1);

		let config = registry.load().unwrap();
		assert_eq!(config, FilterConfig::default());
	}

	/// Registration order must not matter; precedence decides.
	#[test]
	fn higher_precedence_wins_regardless_of_order() {
		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(FixedSource {
			precedence: Precedence::Cli,
			projection: "EPSG:4326",
		}));
		registry.register(Box::new(FixedSource {
			precedence: Precedence::UserFile,
			projection: "EPSG:25833",
		}));

		let config = registry.load().unwrap();
		assert_eq!(config.map.projection, "EPSG:4326");
	}

	#[test]
	fn invalid_env_value_fails_load() {
		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(EnvSource::from_vars([(
			"GEOFILTER_OAF__DEFAULT_LIMIT",
			"0",
		)])));
		assert!(registry.load().is_err());
	}
}
