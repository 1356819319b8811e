// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ITEMS: i64 = 100;
pub const DEFAULT_MAX_CLUSTERS: i64 = 20;
pub const DEFAULT_MAX_RESPONSE_BYTES: i64 = 512 * 1024;
pub const DEFAULT_SUMMARY_THRESHOLD: i64 = 500;

/// Hard ceilings. Requests above these are capped, never rejected.
pub const ABSOLUTE_MAX_ITEMS: i64 = 1000;
pub const ABSOLUTE_MAX_CLUSTERS: i64 = 100;
pub const ABSOLUTE_MAX_RESPONSE_BYTES: i64 = 2 * 1024 * 1024;

/// Process-wide output limits. Built once at startup and passed to each
/// [`Processor`](crate::Processor) explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
	pub max_items: i64,
	pub max_clusters: i64,
	pub max_response_bytes: i64,
	pub slim_output: bool,
	pub mask_secrets: bool,
	pub summary_threshold: i64,
	/// Dotted paths removed in slim mode. A `[*]` suffix on a segment walks
	/// every element of that array.
	pub excluded_fields: Vec<String>,
}

impl Default for OutputConfig {
	fn default() -> Self {
		Self {
			max_items: DEFAULT_MAX_ITEMS,
			max_clusters: DEFAULT_MAX_CLUSTERS,
			max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
			slim_output: true,
			mask_secrets: true,
			summary_threshold: DEFAULT_SUMMARY_THRESHOLD,
			excluded_fields: default_excluded_fields(),
		}
	}
}

pub fn default_excluded_fields() -> Vec<String> {
	[
		"metadata.managedFields",
		"metadata.annotations.kubectl.kubernetes.io/last-applied-configuration",
		"metadata.annotations.deployment.kubernetes.io/revision",
		"status.conditions[*].lastTransitionTime",
		"status.conditions[*].lastProbeTime",
		"status.conditions[*].lastHeartbeatTime",
		"metadata.ownerReferences",
		"metadata.finalizers",
		"metadata.generation",
		"metadata.resourceVersion",
		"metadata.uid",
		"metadata.selfLink",
	]
	.into_iter()
	.map(String::from)
	.collect()
}

fn clamp(value: i64, default: i64, ceiling: i64) -> i64 {
	if value <= 0 {
		default
	} else {
		value.min(ceiling)
	}
}

impl OutputConfig {
	/// Copy with every limit brought into range: non-positive values fall
	/// back to their default and anything above the hard ceiling is capped.
	pub fn validated(&self) -> Self {
		let mut config = self.clone();
		config.max_items = clamp(config.max_items, DEFAULT_MAX_ITEMS, ABSOLUTE_MAX_ITEMS);
		config.max_clusters = clamp(
			config.max_clusters,
			DEFAULT_MAX_CLUSTERS,
			ABSOLUTE_MAX_CLUSTERS,
		);
		config.max_response_bytes = clamp(
			config.max_response_bytes,
			DEFAULT_MAX_RESPONSE_BYTES,
			ABSOLUTE_MAX_RESPONSE_BYTES,
		);
		if config.summary_threshold <= 0 {
			config.summary_threshold = DEFAULT_SUMMARY_THRESHOLD;
		}
		if config.slim_output && config.excluded_fields.is_empty() {
			config.excluded_fields = default_excluded_fields();
		}
		config
	}
}
