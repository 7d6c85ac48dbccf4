// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mapping from internal CRS codes to the canonical URIs CRS-aware
//! backends (OGC API Features) expect.

use tracing::warn;

const CRS_URIS: &[(&str, &str)] = &[
	("EPSG:25832", "http://www.opengis.net/def/crs/EPSG/0/25832"),
	("EPSG:25833", "http://www.opengis.net/def/crs/EPSG/0/25833"),
	("EPSG:31467", "http://www.opengis.net/def/crs/EPSG/0/31467"),
	("EPSG:3857", "http://www.opengis.net/def/crs/EPSG/0/3857"),
	("EPSG:4258", "http://www.opengis.net/def/crs/EPSG/0/4258"),
	("EPSG:4326", "http://www.opengis.net/def/crs/EPSG/0/4326"),
	("CRS84", "http://www.opengis.net/def/crs/OGC/1.3/CRS84"),
];

/// Returns the URI for `code`, or an empty string for unsupported codes.
///
/// Callers treat the empty string as "omit the crs parameter".
pub fn crs_code_to_uri(code: &str) -> String {
	match CRS_URIS.iter().find(|(c, _)| *c == code) {
		Some((_, uri)) => (*uri).to_string(),
		None => {
			warn!(code = %code, "no URI known for CRS code");
			String::new()
		}
	}
}

/// Returns the CRS codes with a known URI.
pub fn supported_crs_codes() -> impl Iterator<Item = &'static str> {
	CRS_URIS.iter().map(|(code, _)| *code)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn known_code_maps_to_uri() {
		assert_eq!(
			crs_code_to_uri("EPSG:25832"),
			"http://www.opengis.net/def/crs/EPSG/0/25832"
		);
		assert_eq!(
			crs_code_to_uri("CRS84"),
			"http://www.opengis.net/def/crs/OGC/1.3/CRS84"
		);
	}

	#[test]
	fn unknown_code_is_empty() {
		assert_eq!(crs_code_to_uri("EPSG:9999"), "");
		assert_eq!(crs_code_to_uri(""), "");
	}

	#[test]
	fn no_pattern_matching_on_code_text() {
		// Looks like a valid EPSG code but is not in the table.
		assert_eq!(crs_code_to_uri("EPSG:2583"), "");
		assert_eq!(crs_code_to_uri("epsg:25832"), "");
	}

	#[test]
	fn every_supported_code_has_a_uri() {
		for code in supported_crs_codes() {
			assert!(!crs_code_to_uri(code).is_empty(), "{code}");
		}
	}
}
