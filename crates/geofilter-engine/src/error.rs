// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use geofilter_http::{RetryableError, DEFAULT_RETRYABLE_STATUSES};
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Debug, Error)]
pub enum TransportError {
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("unexpected status {status} from {url}: {body}")]
	Status {
		status: StatusCode,
		url: String,
		body: String,
	},

	#[error("invalid response body: {0}")]
	InvalidBody(String),

	#[error("invalid URL: {0}")]
	InvalidUrl(String),
}

impl RetryableError for TransportError {
	fn is_retryable(&self) -> bool {
		match self {
			Self::Network(e) => e.is_retryable(),
			Self::Status { status, .. } => DEFAULT_RETRYABLE_STATUSES.contains(status),
			Self::InvalidBody(_) => false,
			Self::InvalidUrl(_) => false,
		}
	}

	fn http_status(&self) -> Option<StatusCode> {
		match self {
			Self::Network(e) => e.status(),
			Self::Status { status, .. } => Some(*status),
			_ => None,
		}
	}
}

#[derive(Debug, Error)]
pub enum ParseError {
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("invalid GeoJSON: {0}")]
	InvalidGeoJson(String),

	#[error("no parser registered for version '{0}'")]
	UnsupportedVersion(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("catalog unavailable: {0}")]
	Unavailable(String),

	#[error("failed to read catalog: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to parse catalog: {0}")]
	Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FilterError {
	#[error("catalog error: {0}")]
	Catalog(#[from] CatalogError),

	#[error("transport error: {0}")]
	Transport(#[from] TransportError),

	#[error("parse error: {0}")]
	Parse(#[from] ParseError),

	#[error("layer not registered: {0}")]
	UnknownLayer(String),

	#[error("layer {layer_id} uses protocol '{protocol}' which does not support this operation")]
	UnsupportedProtocol { layer_id: String, protocol: String },

	#[error("rule {0} is fixed and cannot be changed")]
	FixedRule(u64),
}
