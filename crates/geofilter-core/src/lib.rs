// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the geofilter engine.
//!
//! This crate holds the data model shared by the engine and its callers
//! together with the pure helpers that need no I/O:
//! - default operator resolution per snippet type
//! - the rule fixedness check behind "reset" affordances
//! - splitting of delimiter-joined values
//! - CRS code to URI mapping
//! - positional attribute keys and value domains
//!
//! # Example
//!
//! ```
//! use geofilter_core::{resolve_default_operator, Operator, SnippetType};
//!
//! let op = resolve_default_operator(&SnippetType::Dropdown, true);
//! assert_eq!(op, Operator::In);
//! ```

pub mod attribute;
pub mod crs;
pub mod delimiter;
pub mod error;
pub mod operator;
pub mod rule;
pub mod service;

pub use attribute::{AttributeKey, AttributeValueDomain, DomainBuilder, NestedField};
pub use crs::{crs_code_to_uri, supported_crs_codes};
pub use delimiter::split_by_delimiter;
pub use error::{CoreError, Result};
pub use operator::{resolve_default_operator, Operator, SnippetType};
pub use rule::{has_unfixed_rules, is_rule, Rule};
pub use service::{split_feature_namespace, ServiceDescriptor, ServiceProtocol};
