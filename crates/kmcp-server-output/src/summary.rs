// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::DEFAULT_SUMMARY_THRESHOLD;

/// Aggregate counts standing in for a large result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
	pub total: usize,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub by_status: BTreeMap<String, usize>,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub by_cluster: BTreeMap<String, usize>,
	/// Only the busiest namespaces; see `namespaces_truncated`.
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub by_namespace: BTreeMap<String, usize>,
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub namespaces_truncated: bool,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub by_kind: BTreeMap<String, usize>,
	/// `namespace/name` of the first few items.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub sample: Vec<String>,
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
	pub max_sample_size: usize,
	pub max_namespaces: usize,
	pub by_status: bool,
	pub by_cluster: bool,
	pub by_namespace: bool,
	pub by_kind: bool,
	/// Dotted path to the cluster name on each item.
	pub cluster_field: String,
}

impl Default for SummaryOptions {
	fn default() -> Self {
		Self {
			max_sample_size: 10,
			max_namespaces: 10,
			by_status: true,
			by_cluster: false,
			by_namespace: true,
			by_kind: false,
			cluster_field: "metadata.labels.cluster".to_string(),
		}
	}
}

impl SummaryOptions {
	/// Options for results gathered from many clusters.
	pub fn fleet(cluster_field: Option<&str>) -> Self {
		let mut opts = Self {
			by_cluster: true,
			by_namespace: false,
			..Self::default()
		};
		if let Some(field) = cluster_field.filter(|f| !f.is_empty()) {
			opts.cluster_field = field.to_string();
		}
		opts
	}
}

pub fn should_use_summary(count: usize, threshold: i64) -> bool {
	let threshold = if threshold <= 0 {
		DEFAULT_SUMMARY_THRESHOLD
	} else {
		threshold
	};
	count as i64 > threshold
}

/// Summarize `items`. The output size depends on the options, not on how
/// many items there are.
pub fn summarize(items: &[Value], opts: &SummaryOptions) -> ResourceSummary {
	let mut summary = ResourceSummary {
		total: items.len(),
		..Default::default()
	};
	let mut namespaces: BTreeMap<String, usize> = BTreeMap::new();

	for (i, item) in items.iter().enumerate() {
		if i < opts.max_sample_size {
			if let Some(name) = qualified_name(item) {
				summary.sample.push(name);
			}
		}
		if opts.by_status {
			let status = extract_status(item);
			if !status.is_empty() {
				*summary.by_status.entry(status).or_default() += 1;
			}
		}
		if opts.by_cluster {
			if let Some(cluster) = string_at(item, &opts.cluster_field) {
				*summary.by_cluster.entry(cluster.to_string()).or_default() += 1;
			}
		}
		if opts.by_namespace {
			if let Some(ns) = item.pointer("/metadata/namespace").and_then(Value::as_str) {
				*namespaces.entry(ns.to_string()).or_default() += 1;
			}
		}
		if opts.by_kind {
			if let Some(kind) = item.get("kind").and_then(Value::as_str) {
				*summary.by_kind.entry(kind.to_string()).or_default() += 1;
			}
		}
	}

	summary.has_more = items.len() > opts.max_sample_size;
	summary.namespaces_truncated = opts.max_namespaces > 0 && namespaces.len() > opts.max_namespaces;
	summary.by_namespace = top_counts(&namespaces, opts.max_namespaces)
		.into_iter()
		.map(|e| (e.key, e.count))
		.collect();
	summary
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
	pub key: String,
	pub count: usize,
}

/// The `n` largest counts, highest first, ties broken by key. `n == 0`
/// keeps everything.
pub fn top_counts(counts: &BTreeMap<String, usize>, n: usize) -> Vec<CountEntry> {
	let mut entries: Vec<CountEntry> = counts
		.iter()
		.map(|(key, count)| CountEntry {
			key: key.clone(),
			count: *count,
		})
		.collect();
	entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
	if n > 0 {
		entries.truncate(n);
	}
	entries
}

fn qualified_name(item: &Value) -> Option<String> {
	let name = item.pointer("/metadata/name").and_then(Value::as_str)?;
	match item.pointer("/metadata/namespace").and_then(Value::as_str) {
		Some(ns) if !ns.is_empty() => Some(format!("{ns}/{name}")),
		_ => Some(name.to_string()),
	}
}

fn string_at<'a>(item: &'a Value, path: &str) -> Option<&'a str> {
	path.split('.')
		.try_fold(item, |v, key| v.get(key))
		.and_then(Value::as_str)
		.filter(|s| !s.is_empty())
}

fn int_at(item: &Value, pointer: &str) -> i64 {
	item.pointer(pointer).and_then(Value::as_i64).unwrap_or(0)
}

fn condition_status<'a>(item: &'a Value, kind: &str) -> Option<&'a str> {
	item.pointer("/status/conditions")?
		.as_array()?
		.iter()
		.find(|c| c.get("type").and_then(Value::as_str) == Some(kind))
		.and_then(|c| c.get("status").and_then(Value::as_str))
}

/// Status label for one item, derived per kind.
pub fn extract_status(item: &Value) -> String {
	let kind = item
		.get("kind")
		.and_then(Value::as_str)
		.unwrap_or_default()
		.to_lowercase();
	let status = item.get("status").filter(|s| s.is_object());

	match kind.as_str() {
		"pod" => status
			.and_then(|s| s.get("phase"))
			.and_then(Value::as_str)
			.filter(|p| !p.is_empty())
			.unwrap_or("Unknown")
			.to_string(),
		"deployment" | "replicaset" | "statefulset" | "daemonset" => {
			if status.is_none() {
				return "Unknown".to_string();
			}
			let replicas = int_at(item, "/spec/replicas");
			let ready = int_at(item, "/status/readyReplicas");
			let available = int_at(item, "/status/availableReplicas");
			if replicas == 0 {
				"Scaled to Zero"
			} else if ready >= replicas && available >= replicas {
				"Ready"
			} else if ready > 0 {
				"Partially Ready"
			} else {
				"Not Ready"
			}
			.to_string()
		}
		"node" => match condition_status(item, "Ready") {
			Some("True") => "Ready",
			Some(_) => "NotReady",
			None => "Unknown",
		}
		.to_string(),
		"job" => {
			if status.is_none() {
				return "Unknown".to_string();
			}
			if condition_status(item, "Complete") == Some("True") {
				"Succeeded"
			} else if condition_status(item, "Failed") == Some("True") {
				"Failed"
			} else if int_at(item, "/status/succeeded") > 0 {
				"Succeeded"
			} else if int_at(item, "/status/failed") > 0 {
				"Failed"
			} else {
				"Running"
			}
			.to_string()
		}
		_ => status
			.and_then(|s| s.get("phase"))
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string(),
	}
}
