// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Serialize;

use crate::config::{
	ABSOLUTE_MAX_CLUSTERS, ABSOLUTE_MAX_ITEMS, DEFAULT_MAX_CLUSTERS, DEFAULT_MAX_ITEMS,
};

/// Raised whenever items were dropped to stay within a limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TruncationWarning {
	pub shown: usize,
	pub total: usize,
	pub message: String,
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub suggest_summary: bool,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub suggest_filters: Vec<String>,
}

fn bounded(limit: i64, default: i64, ceiling: i64) -> usize {
	let limit = if limit <= 0 { default } else { limit };
	limit.min(ceiling) as usize
}

/// Keep at most `max_items` items (default 100, never more than 1000).
pub fn truncate<T>(mut items: Vec<T>, max_items: i64) -> (Vec<T>, Option<TruncationWarning>) {
	let limit = bounded(max_items, DEFAULT_MAX_ITEMS, ABSOLUTE_MAX_ITEMS);
	let total = items.len();
	if total <= limit {
		return (items, None);
	}
	items.truncate(limit);

	let mut warning = TruncationWarning {
		shown: limit,
		total,
		message: format!(
			"Output truncated. Showing {limit} of {total} items. Refine your query with namespace, label, or field filters for complete results."
		),
		suggest_summary: false,
		suggest_filters: Vec::new(),
	};
	if total as i64 > DEFAULT_MAX_ITEMS * 5 {
		warning.suggest_summary = true;
		warning.suggest_filters = vec![
			"Use labelSelector to filter by labels (e.g., app=nginx)".to_string(),
			"Use namespace to limit to a specific namespace".to_string(),
			"Use summary=true to get counts instead of full objects".to_string(),
		];
	}
	(items, Some(warning))
}

/// Keep at most `max_clusters` clusters (default 20, never more than 100).
pub fn truncate_clusters<T>(
	mut clusters: Vec<T>,
	max_clusters: i64,
) -> (Vec<T>, Option<TruncationWarning>) {
	let limit = bounded(max_clusters, DEFAULT_MAX_CLUSTERS, ABSOLUTE_MAX_CLUSTERS);
	let total = clusters.len();
	if total <= limit {
		return (clusters, None);
	}
	clusters.truncate(limit);

	(
		clusters,
		Some(TruncationWarning {
			shown: limit,
			total,
			message: format!(
				"Cluster results truncated. Showing {limit} of {total} clusters. Use organization or provider filters to narrow results."
			),
			suggest_summary: false,
			suggest_filters: vec![
				"Use organization to filter by namespace/org".to_string(),
				"Use provider to filter by infrastructure provider".to_string(),
				"Use status to filter by cluster phase".to_string(),
			],
		}),
	)
}

fn combine(request: i64, config: i64, default: i64, ceiling: i64) -> i64 {
	let effective = match (request > 0, config > 0) {
		(false, false) => default,
		(false, true) => config,
		(true, true) => request.min(config),
		(true, false) => request,
	};
	effective.min(ceiling)
}

/// The tighter of the caller's and the configured item limit.
pub fn effective_limit(request: i64, config: i64) -> i64 {
	combine(request, config, DEFAULT_MAX_ITEMS, ABSOLUTE_MAX_ITEMS)
}

pub fn effective_cluster_limit(request: i64, config: i64) -> i64 {
	combine(request, config, DEFAULT_MAX_CLUSTERS, ABSOLUTE_MAX_CLUSTERS)
}
