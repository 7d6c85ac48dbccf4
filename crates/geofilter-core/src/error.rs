// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for geofilter core types.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while parsing core types from their wire form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
	#[error("unknown operator: {0}")]
	UnknownOperator(String),

	#[error("malformed attribute key: {0}")]
	MalformedAttributeKey(String),
}
