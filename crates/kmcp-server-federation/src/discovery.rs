// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! CAPI cluster discovery: summaries, filtering and name resolution.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use kmcp_server_k8s::DynamicObject;
use serde::Serialize;
use serde_json::Value;

use crate::error::FederationResult;
use crate::selector::LabelSelector;

pub const LABEL_ORGANIZATION: &str = "giantswarm.io/organization";
pub const LABEL_RELEASE: &str = "release.giantswarm.io/version";
pub const ANNOTATION_DESCRIPTION: &str = "cluster.giantswarm.io/description";

pub const PROVIDER_AWS: &str = "aws";
pub const PROVIDER_AZURE: &str = "azure";
pub const PROVIDER_VSPHERE: &str = "vsphere";
pub const PROVIDER_GCP: &str = "gcp";
pub const PROVIDER_UNKNOWN: &str = "unknown";

/// Lifecycle phase reported by a CAPI `Cluster`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterPhase {
	Pending,
	Provisioning,
	Provisioned,
	Deleting,
	Failed,
	Unknown,
}

impl ClusterPhase {
	pub fn as_str(&self) -> &'static str {
		match self {
			ClusterPhase::Pending => "Pending",
			ClusterPhase::Provisioning => "Provisioning",
			ClusterPhase::Provisioned => "Provisioned",
			ClusterPhase::Deleting => "Deleting",
			ClusterPhase::Failed => "Failed",
			ClusterPhase::Unknown => "Unknown",
		}
	}

	/// Parse a reported phase. Unrecognized phases map to `None`.
	pub fn parse(phase: &str) -> Option<Self> {
		match phase {
			"Pending" => Some(ClusterPhase::Pending),
			"Provisioning" => Some(ClusterPhase::Provisioning),
			"Provisioned" => Some(ClusterPhase::Provisioned),
			"Deleting" => Some(ClusterPhase::Deleting),
			"Failed" => Some(ClusterPhase::Failed),
			"Unknown" => Some(ClusterPhase::Unknown),
			_ => None,
		}
	}
}

impl fmt::Display for ClusterPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Read-only snapshot of one workload cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
	pub name: String,
	pub namespace: String,
	pub provider: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub release: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub kubernetes_version: String,
	/// Raw phase string as reported by the cluster.
	pub status: String,
	pub ready: bool,
	pub control_plane_ready: bool,
	pub infrastructure_ready: bool,
	pub node_count: i64,
	pub created_at: Option<DateTime<Utc>>,
	pub labels: BTreeMap<String, String>,
	pub annotations: BTreeMap<String, String>,
}

impl ClusterSummary {
	pub fn phase(&self) -> Option<ClusterPhase> {
		ClusterPhase::parse(&self.status)
	}

	pub fn organization(&self) -> Option<&str> {
		self.labels.get(LABEL_ORGANIZATION).map(String::as_str)
	}

	pub fn description(&self) -> Option<&str> {
		self.annotations
			.get(ANNOTATION_DESCRIPTION)
			.map(String::as_str)
	}

	pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
		self.created_at.map(|created| now - created)
	}

	/// Human-readable age, `<1m` when the creation time is unknown.
	pub fn age_string(&self, now: DateTime<Utc>) -> String {
		self.age(now)
			.map(format_age)
			.unwrap_or_else(|| "<1m".to_string())
	}
}

fn nested<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
	path.iter().try_fold(value, |v, key| v.get(key))
}

fn nested_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
	nested(value, path).and_then(Value::as_str)
}

/// Map an infrastructure kind such as `AWSCluster` to a provider name.
pub fn provider_from_kind(kind: &str) -> String {
	let kind = kind.to_lowercase();
	if kind.contains("aws") {
		PROVIDER_AWS.to_string()
	} else if kind.contains("azure") {
		PROVIDER_AZURE.to_string()
	} else if kind.contains("vsphere") {
		PROVIDER_VSPHERE.to_string()
	} else if kind.contains("gcp") || kind.contains("google") {
		PROVIDER_GCP.to_string()
	} else {
		kind.strip_suffix("cluster").unwrap_or(&kind).to_string()
	}
}

/// Build a summary from a CAPI `Cluster` object.
pub fn summary_from_object(obj: &DynamicObject) -> ClusterSummary {
	let data = &obj.data;

	let provider = nested_str(data, &["spec", "infrastructureRef", "kind"])
		.map(provider_from_kind)
		.unwrap_or_else(|| PROVIDER_UNKNOWN.to_string());

	let kubernetes_version = [
		&["spec", "topology", "version"][..],
		&["status", "version"][..],
		&["spec", "controlPlaneRef", "version"][..],
	]
	.iter()
	.find_map(|path| nested_str(data, path).filter(|v| !v.is_empty()))
	.unwrap_or_default()
	.to_string();

	let status = nested_str(data, &["status", "phase"])
		.unwrap_or(ClusterPhase::Unknown.as_str())
		.to_string();
	let control_plane_ready = nested(data, &["status", "controlPlaneReady"])
		.and_then(Value::as_bool)
		.unwrap_or(false);
	let infrastructure_ready = nested(data, &["status", "infrastructureReady"])
		.and_then(Value::as_bool)
		.unwrap_or(false);
	let ready = control_plane_ready
		&& infrastructure_ready
		&& status == ClusterPhase::Provisioned.as_str();

	let node_count = nested(data, &["status", "workerNodes"])
		.and_then(Value::as_i64)
		.or_else(|| nested(data, &["status", "readyReplicas"]).and_then(Value::as_i64))
		.unwrap_or(0);

	let labels = obj.metadata.labels.clone().unwrap_or_default();
	let release = labels.get(LABEL_RELEASE).cloned().unwrap_or_default();

	ClusterSummary {
		name: obj.metadata.name.clone().unwrap_or_default(),
		namespace: obj.metadata.namespace.clone().unwrap_or_default(),
		provider,
		release,
		kubernetes_version,
		status,
		ready,
		control_plane_ready,
		infrastructure_ready,
		node_count,
		created_at: obj.metadata.creation_timestamp.as_ref().map(|t| t.0),
		labels,
		annotations: obj.metadata.annotations.clone().unwrap_or_default(),
	}
}

/// Client-side filters applied to a discovered cluster list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterListOptions {
	/// Organization namespace.
	pub namespace: String,
	/// Compared case-insensitively.
	pub provider: String,
	/// Exact phase string.
	pub status: String,
	pub ready_only: bool,
	pub label_selector: String,
}

impl ClusterListOptions {
	pub fn is_empty(&self) -> bool {
		self.namespace.is_empty()
			&& self.provider.is_empty()
			&& self.status.is_empty()
			&& !self.ready_only
			&& self.label_selector.is_empty()
	}
}

/// Filter clusters. An invalid label selector fails the whole call.
pub fn filter(
	clusters: &[ClusterSummary],
	options: &ClusterListOptions,
) -> FederationResult<Vec<ClusterSummary>> {
	let selector = LabelSelector::parse(&options.label_selector)?;
	let provider = options.provider.to_lowercase();

	Ok(clusters
		.iter()
		.filter(|c| options.namespace.is_empty() || c.namespace == options.namespace)
		.filter(|c| provider.is_empty() || c.provider.to_lowercase() == provider)
		.filter(|c| options.status.is_empty() || c.status == options.status)
		.filter(|c| !options.ready_only || c.ready)
		.filter(|c| selector.matches(&c.labels))
		.cloned()
		.collect())
}

/// Outcome of resolving a name pattern against known clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternResolution {
	pub resolved: Option<ClusterSummary>,
	pub matches: Vec<ClusterSummary>,
}

/// Resolve `pattern` to a cluster.
///
/// An exact name match wins outright. Otherwise every cluster whose name
/// contains the pattern (case-insensitively) is collected, and the pattern
/// resolves only when exactly one does.
pub fn resolve_pattern(clusters: &[ClusterSummary], pattern: &str) -> PatternResolution {
	if let Some(exact) = clusters.iter().find(|c| c.name == pattern) {
		return PatternResolution {
			resolved: Some(exact.clone()),
			matches: vec![exact.clone()],
		};
	}

	let needle = pattern.to_lowercase();
	let matches: Vec<ClusterSummary> = clusters
		.iter()
		.filter(|c| c.name.to_lowercase().contains(&needle))
		.cloned()
		.collect();

	let resolved = match matches.as_slice() {
		[only] => Some(only.clone()),
		_ => None,
	};
	PatternResolution { resolved, matches }
}

/// Render an age as `<1m`, `Nm`, `Nh` or `Nd`.
pub fn format_age(age: chrono::Duration) -> String {
	let minutes = age.num_minutes();
	if minutes < 1 {
		"<1m".to_string()
	} else if minutes < 60 {
		format!("{minutes}m")
	} else if age.num_hours() < 24 {
		format!("{}h", age.num_hours())
	} else {
		format!("{}d", age.num_days())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::FederationError;
	use proptest::prelude::*;
	use serde_json::json;

	fn cluster(name: &str, namespace: &str) -> ClusterSummary {
		ClusterSummary {
			name: name.to_string(),
			namespace: namespace.to_string(),
			provider: PROVIDER_AWS.to_string(),
			release: String::new(),
			kubernetes_version: String::new(),
			status: "Provisioned".to_string(),
			ready: true,
			control_plane_ready: true,
			infrastructure_ready: true,
			node_count: 3,
			created_at: None,
			labels: BTreeMap::new(),
			annotations: BTreeMap::new(),
		}
	}

	fn capi_object(manifest: Value) -> DynamicObject {
		serde_json::from_value(manifest).unwrap()
	}

	#[test]
	fn summary_extracts_metadata_and_status() {
		let obj = capi_object(json!({
			"apiVersion": "cluster.x-k8s.io/v1beta2",
			"kind": "Cluster",
			"metadata": {
				"name": "prod-wc-01",
				"namespace": "org-acme",
				"creationTimestamp": "2025-01-01T00:00:00Z",
				"labels": {
					"giantswarm.io/organization": "acme",
					"release.giantswarm.io/version": "29.1.0"
				},
				"annotations": { "cluster.giantswarm.io/description": "Production" }
			},
			"spec": {
				"infrastructureRef": { "kind": "AWSCluster" },
				"topology": { "version": "v1.31.2" }
			},
			"status": {
				"phase": "Provisioned",
				"controlPlaneReady": true,
				"infrastructureReady": true,
				"workerNodes": 6
			}
		}));

		let s = summary_from_object(&obj);
		assert_eq!(s.name, "prod-wc-01");
		assert_eq!(s.namespace, "org-acme");
		assert_eq!(s.provider, "aws");
		assert_eq!(s.release, "29.1.0");
		assert_eq!(s.kubernetes_version, "v1.31.2");
		assert!(s.ready);
		assert_eq!(s.node_count, 6);
		assert_eq!(s.organization(), Some("acme"));
		assert_eq!(s.description(), Some("Production"));
		assert!(s.created_at.is_some());
	}

	#[test]
	fn summary_defaults_for_sparse_objects() {
		let obj = capi_object(json!({
			"apiVersion": "cluster.x-k8s.io/v1beta2",
			"kind": "Cluster",
			"metadata": { "name": "bare", "namespace": "default" },
			"status": { "controlPlaneReady": true, "infrastructureReady": true, "readyReplicas": 2 }
		}));

		let s = summary_from_object(&obj);
		assert_eq!(s.provider, PROVIDER_UNKNOWN);
		assert_eq!(s.status, "Unknown");
		assert!(!s.ready, "ready requires the Provisioned phase");
		assert_eq!(s.node_count, 2);
	}

	#[test]
	fn kubernetes_version_falls_back_through_locations() {
		let obj = capi_object(json!({
			"apiVersion": "cluster.x-k8s.io/v1beta2",
			"kind": "Cluster",
			"metadata": { "name": "a" },
			"spec": { "controlPlaneRef": { "version": "v1.29.0" } },
			"status": { "version": "" }
		}));
		assert_eq!(summary_from_object(&obj).kubernetes_version, "v1.29.0");
	}

	#[test]
	fn provider_mapping() {
		assert_eq!(provider_from_kind("AWSCluster"), "aws");
		assert_eq!(provider_from_kind("AWSManagedCluster"), "aws");
		assert_eq!(provider_from_kind("AzureCluster"), "azure");
		assert_eq!(provider_from_kind("VSphereCluster"), "vsphere");
		assert_eq!(provider_from_kind("GCPCluster"), "gcp");
		assert_eq!(provider_from_kind("GoogleManagedCluster"), "gcp");
		assert_eq!(provider_from_kind("DockerCluster"), "docker");
	}

	#[test]
	fn filter_by_fields() {
		let mut azure = cluster("b", "org-two");
		azure.provider = "azure".to_string();
		let mut provisioning = cluster("c", "org-one");
		provisioning.status = "Provisioning".to_string();
		provisioning.ready = false;
		let clusters = vec![cluster("a", "org-one"), azure, provisioning];

		let names = |opts: ClusterListOptions| -> Vec<String> {
			filter(&clusters, &opts)
				.unwrap()
				.into_iter()
				.map(|c| c.name)
				.collect()
		};

		assert_eq!(names(ClusterListOptions::default()), vec!["a", "b", "c"]);
		assert_eq!(
			names(ClusterListOptions {
				namespace: "org-one".to_string(),
				..Default::default()
			}),
			vec!["a", "c"]
		);
		assert_eq!(
			names(ClusterListOptions {
				provider: "AZURE".to_string(),
				..Default::default()
			}),
			vec!["b"]
		);
		assert_eq!(
			names(ClusterListOptions {
				status: "Provisioning".to_string(),
				..Default::default()
			}),
			vec!["c"]
		);
		assert_eq!(
			names(ClusterListOptions {
				ready_only: true,
				..Default::default()
			}),
			vec!["a", "b"]
		);
	}

	#[test]
	fn filter_by_label_selector() {
		let mut labelled = cluster("a", "ns");
		labelled
			.labels
			.insert("env".to_string(), "prod".to_string());
		let clusters = vec![labelled, cluster("b", "ns")];

		let opts = ClusterListOptions {
			label_selector: "env=prod".to_string(),
			..Default::default()
		};
		let got = filter(&clusters, &opts).unwrap();
		assert_eq!(got.len(), 1);
		assert_eq!(got[0].name, "a");
	}

	#[test]
	fn invalid_selector_fails_whole_filter() {
		let opts = ClusterListOptions {
			label_selector: "env in (prod".to_string(),
			..Default::default()
		};
		assert!(matches!(
			filter(&[], &opts),
			Err(FederationError::InvalidSelector { .. })
		));
	}

	#[test]
	fn substring_pattern_with_multiple_matches_is_unresolved() {
		let clusters = vec![
			cluster("prod-wc-01", "a"),
			cluster("staging-wc", "a"),
			cluster("dev-cluster", "a"),
		];
		let r = resolve_pattern(&clusters, "wc");
		assert!(r.resolved.is_none());
		let names: Vec<_> = r.matches.iter().map(|c| c.name.as_str()).collect();
		assert_eq!(names, vec!["prod-wc-01", "staging-wc"]);
	}

	#[test]
	fn single_case_insensitive_match_resolves() {
		let clusters = vec![cluster("Prod-WC-01", "a"), cluster("dev", "a")];
		let r = resolve_pattern(&clusters, "prod");
		assert_eq!(r.resolved.map(|c| c.name), Some("Prod-WC-01".to_string()));
	}

	#[test]
	fn no_match_is_unresolved_and_empty() {
		let clusters = vec![cluster("alpha", "a")];
		let r = resolve_pattern(&clusters, "zeta");
		assert!(r.resolved.is_none());
		assert!(r.matches.is_empty());
	}

	#[test]
	fn age_formatting() {
		assert_eq!(format_age(chrono::Duration::seconds(30)), "<1m");
		assert_eq!(format_age(chrono::Duration::minutes(5)), "5m");
		assert_eq!(format_age(chrono::Duration::hours(2)), "2h");
		assert_eq!(format_age(chrono::Duration::days(12)), "12d");
		assert_eq!(format_age(chrono::Duration::seconds(-10)), "<1m");
	}

	proptest! {
		#[test]
		fn exact_match_wins(name in "[a-z]{1,8}", prefix in "[a-z]{1,4}", suffix in "[a-z]{1,4}") {
			let clusters = vec![
				cluster(&format!("{prefix}{name}"), "a"),
				cluster(&name, "b"),
				cluster(&format!("{name}{suffix}"), "c"),
			];
			let r = resolve_pattern(&clusters, &name);
			let resolved = r.resolved.expect("exact match resolves");
			prop_assert_eq!(resolved.name, name);
			prop_assert_eq!(r.matches.len(), 1);
		}

		#[test]
		fn unmatched_patterns_resolve_to_nothing(pattern in "[0-9]{3,6}") {
			let clusters = vec![cluster("alpha", "a"), cluster("beta", "b")];
			let r = resolve_pattern(&clusters, &pattern);
			prop_assert!(r.resolved.is_none());
			prop_assert!(r.matches.is_empty());
		}
	}
}
