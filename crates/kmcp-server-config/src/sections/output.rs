// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Response shaping section. Resolves to [`OutputConfig`], whose own
//! clamping keeps every limit within its hard ceiling.

use kmcp_server_output::OutputConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct OutputConfigLayer {
	pub max_items: Option<i64>,
	pub max_clusters: Option<i64>,
	pub max_response_bytes: Option<i64>,
	pub slim_output: Option<bool>,
	pub mask_secrets: Option<bool>,
	pub summary_threshold: Option<i64>,
	pub excluded_fields: Option<Vec<String>>,
}

impl OutputConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.max_items.is_some() {
			self.max_items = other.max_items;
		}
		if other.max_clusters.is_some() {
			self.max_clusters = other.max_clusters;
		}
		if other.max_response_bytes.is_some() {
			self.max_response_bytes = other.max_response_bytes;
		}
		if other.slim_output.is_some() {
			self.slim_output = other.slim_output;
		}
		if other.mask_secrets.is_some() {
			self.mask_secrets = other.mask_secrets;
		}
		if other.summary_threshold.is_some() {
			self.summary_threshold = other.summary_threshold;
		}
		if other.excluded_fields.is_some() {
			self.excluded_fields = other.excluded_fields;
		}
	}

	pub fn finalize(self) -> OutputConfig {
		let defaults = OutputConfig::default();
		OutputConfig {
			max_items: self.max_items.unwrap_or(defaults.max_items),
			max_clusters: self.max_clusters.unwrap_or(defaults.max_clusters),
			max_response_bytes: self.max_response_bytes.unwrap_or(defaults.max_response_bytes),
			slim_output: self.slim_output.unwrap_or(defaults.slim_output),
			mask_secrets: self.mask_secrets.unwrap_or(defaults.mask_secrets),
			summary_threshold: self.summary_threshold.unwrap_or(defaults.summary_threshold),
			excluded_fields: self.excluded_fields.unwrap_or(defaults.excluded_fields),
		}
		.validated()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kmcp_server_output::{ABSOLUTE_MAX_ITEMS, DEFAULT_MAX_CLUSTERS};

	#[test]
	fn test_defaults_match_output_config() {
		assert_eq!(OutputConfigLayer::default().finalize(), OutputConfig::default());
	}

	#[test]
	fn test_limits_are_clamped_not_rejected() {
		let config = OutputConfigLayer {
			max_items: Some(50_000),
			max_clusters: Some(-3),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.max_items, ABSOLUTE_MAX_ITEMS);
		assert_eq!(config.max_clusters, DEFAULT_MAX_CLUSTERS);
	}
}
