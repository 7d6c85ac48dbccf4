// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Raw transports for sensor and feature backends.

use async_trait::async_trait;
use geofilter_config::FilterConfig;
use geofilter_http::{builder_with_user_agent, new_client_with_timeout, retry, RetryConfig};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::TransportError;

pub const DEFAULT_MAX_PAGES: u32 = 10;

/// Fetches SensorThings entity collections.
#[async_trait]
pub trait SensorTransport: Send + Sync {
	/// Returns the entities at `url`.
	///
	/// Implementations return a JSON array for well-formed collections; any
	/// other shape is passed through for the caller to reject.
	async fn fetch_entities(&self, url: &str) -> Result<Value, TransportError>;
}

/// Fetches raw feature payloads.
#[async_trait]
pub trait FeatureTransport: Send + Sync {
	async fn fetch_raw(&self, url: &str) -> Result<String, TransportError>;
}

/// `reqwest` transport with retry and SensorThings paging.
#[derive(Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
	retry: RetryConfig,
	max_pages: u32,
}

impl HttpTransport {
	pub fn new(client: reqwest::Client) -> Self {
		Self {
			client,
			retry: RetryConfig::default(),
			max_pages: DEFAULT_MAX_PAGES,
		}
	}

	pub fn from_config(config: &FilterConfig) -> Result<Self, TransportError> {
		let client = match &config.http.user_agent {
			Some(agent) => builder_with_user_agent(agent.clone())
				.timeout(config.http.timeout())
				.build()?,
			None => new_client_with_timeout(config.http.timeout())?,
		};

		let retry = RetryConfig {
			max_attempts: config.retry.max_attempts,
			base_delay: Duration::from_millis(config.retry.base_delay_ms),
			max_delay: Duration::from_millis(config.retry.max_delay_ms),
			backoff_factor: config.retry.backoff_factor,
			jitter: config.retry.jitter,
			..RetryConfig::default()
		};

		Ok(Self {
			client,
			retry,
			max_pages: config.sensorthings.max_pages,
		})
	}

	pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
		self.retry = retry;
		self
	}

	pub fn with_max_pages(mut self, max_pages: u32) -> Self {
		self.max_pages = max_pages;
		self
	}

	async fn get_text(&self, url: &str) -> Result<String, TransportError> {
		retry(&self.retry, || async move {
			let response = self.client.get(url).send().await?;
			let status = response.status();
			if !status.is_success() {
				let body = response.text().await.unwrap_or_default();
				return Err(TransportError::Status {
					status,
					url: url.to_string(),
					body,
				});
			}
			Ok(response.text().await?)
		})
		.await
	}

	async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
		let text = self.get_text(url).await?;
		serde_json::from_str(&text)
			.map_err(|e| TransportError::InvalidBody(format!("{url}: {e}")))
	}
}

#[async_trait]
impl SensorTransport for HttpTransport {
	#[instrument(skip(self), fields(max_pages = self.max_pages))]
	async fn fetch_entities(&self, url: &str) -> Result<Value, TransportError> {
		let mut entities = Vec::new();
		let mut next = Some(url.to_string());
		let mut pages = 0;

		while let Some(page_url) = next.take() {
			if pages >= self.max_pages.max(1) {
				warn!(pages, "page limit reached, remaining entities are not fetched");
				break;
			}
			pages += 1;

			let mut page = match self.get_json(&page_url).await? {
				Value::Object(page) => page,
				// A bare document on the first page is handed back unchanged.
				other if pages == 1 => return Ok(other),
				_ => {
					return Err(TransportError::InvalidBody(format!(
						"{page_url}: expected a SensorThings collection"
					)))
				}
			};

			match page.remove("value") {
				Some(Value::Array(values)) => entities.extend(values),
				other => {
					if pages == 1 {
						debug!("response has no value array");
						return Ok(other.unwrap_or(Value::Null));
					}
					return Err(TransportError::InvalidBody(format!(
						"{page_url}: missing value array"
					)));
				}
			}

			next = page
				.get("@iot.nextLink")
				.and_then(Value::as_str)
				.map(str::to_string);
		}

		debug!(pages, count = entities.len(), "entities fetched");
		Ok(Value::Array(entities))
	}
}

#[async_trait]
impl FeatureTransport for HttpTransport {
	#[instrument(skip(self))]
	async fn fetch_raw(&self, url: &str) -> Result<String, TransportError> {
		let text = self.get_text(url).await?;
		debug!(bytes = text.len(), "features fetched");
		Ok(text)
	}
}
