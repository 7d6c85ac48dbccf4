// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use tracing::warn;

use crate::runtime::FilterConfig;
use crate::ConfigError;

pub fn validate_config(config: &FilterConfig) -> Result<(), ConfigError> {
	if config.http.timeout_secs == 0 {
		return Err(ConfigError::invalid_value(
			"http.timeout_secs",
			"timeout must be at least one second",
		));
	}

	if config.retry.max_attempts == 0 {
		return Err(ConfigError::invalid_value(
			"retry.max_attempts",
			"at least one attempt is required",
		));
	}

	if config.retry.backoff_factor < 1.0 {
		return Err(ConfigError::invalid_value(
			"retry.backoff_factor",
			"backoff factor must be >= 1.0",
		));
	}

	if config.retry.base_delay_ms > config.retry.max_delay_ms {
		warn!(
			base_delay_ms = config.retry.base_delay_ms,
			max_delay_ms = config.retry.max_delay_ms,
			"retry base delay exceeds max delay; every retry waits max_delay"
		);
	}

	if config.sensorthings.max_pages == 0 {
		return Err(ConfigError::invalid_value(
			"sensorthings.max_pages",
			"at least one page must be fetched",
		));
	}

	if config.oaf.default_limit == 0 {
		return Err(ConfigError::invalid_value(
			"oaf.default_limit",
			"limit must be positive",
		));
	}

	if config.map.projection.trim().is_empty() {
		return Err(ConfigError::invalid_value(
			"map.projection",
			"projection cannot be empty",
		));
	}

	Ok(())
}
