// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the geofilter engine.
//!
//! This crate provides:
//! - Layered configuration from multiple sources
//! - TOML configuration file parsing
//! - Environment variable overrides (`GEOFILTER_<SECTION>__<FIELD>`)
//! - Configuration validation

pub mod error;
pub mod layer;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

use std::path::PathBuf;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use registry::ConfigRegistry;
pub use runtime::{
	FilterConfig, HttpConfig, LogFormat, LogLevel, LoggingConfig, MapConfig, OafConfig, RetryConfig,
	SensorThingsConfig,
};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration from defaults, the user file, an optional explicit
/// file, the environment and CLI overrides.
pub fn load_config(
	explicit: Option<PathBuf>,
	cli: CliOverrides,
) -> Result<FilterConfig, ConfigError> {
	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	if let Some(user) = sources::FileSource::user() {
		registry.register(Box::new(user));
	}
	if let Some(path) = explicit {
		registry.register(Box::new(sources::FileSource::explicit(path)));
	}
	registry.register(Box::new(sources::EnvSource::new()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load()
}
