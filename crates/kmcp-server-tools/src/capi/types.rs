// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kmcp_server_federation::ClusterSummary;
use serde::Serialize;

fn is_zero(n: &i64) -> bool {
	*n == 0
}

/// One row of a cluster listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterListItem {
	pub name: String,
	pub namespace: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub organization: Option<String>,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub provider: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub release: String,
	pub status: String,
	pub ready: bool,
	pub age: String,
	#[serde(skip_serializing_if = "is_zero")]
	pub node_count: i64,
}

impl ClusterListItem {
	pub fn from_summary(cluster: &ClusterSummary, now: DateTime<Utc>) -> Self {
		Self {
			name: cluster.name.clone(),
			namespace: cluster.namespace.clone(),
			organization: cluster.organization().map(str::to_string),
			provider: cluster.provider.clone(),
			release: cluster.release.clone(),
			status: cluster.status.clone(),
			ready: cluster.ready,
			age: cluster.age_string(now),
			node_count: cluster.node_count,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterListOutput {
	pub clusters: Vec<ClusterListItem>,
	pub total_count: usize,
	pub returned_count: usize,
	pub truncated: bool,
	pub filter_applied: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub organization: Option<String>,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub provider: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub release: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub kubernetes_version: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub created_at: Option<DateTime<Utc>>,
	pub age: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
	pub phase: String,
	pub ready: bool,
	pub control_plane_ready: bool,
	pub infrastructure_ready: bool,
	#[serde(skip_serializing_if = "is_zero")]
	pub node_count: i64,
}

/// Full view of a single cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterDetail {
	pub name: String,
	pub namespace: String,
	pub metadata: ClusterMetadata,
	pub status: ClusterStatus,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub labels: BTreeMap<String, String>,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub annotations: BTreeMap<String, String>,
}

impl ClusterDetail {
	pub fn from_summary(cluster: &ClusterSummary, now: DateTime<Utc>) -> Self {
		Self {
			name: cluster.name.clone(),
			namespace: cluster.namespace.clone(),
			metadata: ClusterMetadata {
				organization: cluster.organization().map(str::to_string),
				provider: cluster.provider.clone(),
				release: cluster.release.clone(),
				kubernetes_version: cluster.kubernetes_version.clone(),
				created_at: cluster.created_at,
				age: cluster.age_string(now),
				description: cluster.description().map(str::to_string),
			},
			status: ClusterStatus {
				phase: cluster.status.clone(),
				ready: cluster.ready,
				control_plane_ready: cluster.control_plane_ready,
				infrastructure_ready: cluster.infrastructure_ready,
				node_count: cluster.node_count,
			},
			labels: cluster.labels.clone(),
			annotations: cluster.annotations.clone(),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterResolveOutput {
	pub resolved: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cluster: Option<ClusterListItem>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub matches: Vec<ClusterListItem>,
	pub message: String,
}
