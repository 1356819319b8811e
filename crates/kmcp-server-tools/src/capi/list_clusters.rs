// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::Utc;
use kmcp_server_federation::ClusterListOptions;
use serde::Deserialize;
use serde_json::Value;

use super::types::{ClusterListItem, ClusterListOutput};
use super::{federation_error, preconditions};
use crate::context::{RequestContext, ServerContext};
use crate::error::ToolError;
use crate::registry::{parse_args, to_output, Tool};

pub const DEFAULT_MAX_RESULTS: usize = 100;
/// Requests above this are capped, not rejected.
pub const MAX_RESULTS_LIMIT: usize = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ListClustersArgs {
	organization: Option<String>,
	provider: Option<String>,
	status: Option<String>,
	ready_only: Option<bool>,
	label_selector: Option<String>,
	limit: Option<f64>,
}

impl ListClustersArgs {
	fn limit(&self) -> usize {
		match self.limit {
			Some(limit) if limit > 0.0 => (limit as usize).clamp(1, MAX_RESULTS_LIMIT),
			_ => DEFAULT_MAX_RESULTS,
		}
	}

	fn options(&self) -> ClusterListOptions {
		ClusterListOptions {
			namespace: self.organization.clone().unwrap_or_default(),
			provider: self.provider.as_deref().unwrap_or_default().to_lowercase(),
			status: self.status.clone().unwrap_or_default(),
			ready_only: self.ready_only.unwrap_or(false),
			label_selector: self.label_selector.clone().unwrap_or_default(),
		}
	}
}

pub struct ListClustersTool;

#[async_trait]
impl Tool for ListClustersTool {
	fn name(&self) -> &str {
		"capi_list_clusters"
	}

	fn description(&self) -> &str {
		"List all Workload Clusters managed by CAPI that you have access to. Returns cluster \
		 name, organization, provider, release version, status, and age. Results are limited \
		 by default; use filters or increase limit to see more."
	}

	fn input_schema(&self) -> Value {
		serde_json::json!({
			"type": "object",
			"properties": {
				"organization": {
					"type": "string",
					"description": "Filter by organization namespace (e.g. 'org-acme')"
				},
				"provider": {
					"type": "string",
					"description": "Filter by infrastructure provider (aws, azure, gcp, vsphere)"
				},
				"status": {
					"type": "string",
					"description": "Filter by cluster status (Provisioned, Provisioning, Deleting, Failed)"
				},
				"readyOnly": {
					"type": "boolean",
					"description": "Only show clusters that are fully ready (default: false)"
				},
				"labelSelector": {
					"type": "string",
					"description": "Filter clusters by Kubernetes label selector (e.g. 'environment=production')"
				},
				"limit": {
					"type": "number",
					"description": "Maximum number of clusters to return (default: 100, max: 500)"
				}
			}
		})
	}

	async fn invoke(
		&self,
		args: Value,
		request: &RequestContext,
		server: &ServerContext,
	) -> Result<Value, ToolError> {
		let (manager, identity) = preconditions(request, server)?;
		let args: ListClustersArgs = parse_args(args)?;
		let options = args.options();
		let limit = args.limit();

		let mut clusters = manager
			.list_clusters_with_options(Some(identity), &options)
			.await
			.map_err(|e| federation_error(e, "list clusters"))?;

		let total_count = clusters.len();
		let truncated = total_count > limit;
		clusters.truncate(limit);

		let now = Utc::now();
		to_output(&ClusterListOutput {
			clusters: clusters
				.iter()
				.map(|c| ClusterListItem::from_summary(c, now))
				.collect(),
			total_count,
			returned_count: clusters.len(),
			truncated,
			filter_applied: !options.is_empty(),
		})
	}
}
