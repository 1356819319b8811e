// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::Utc;
use kmcp_server_federation::resolve_pattern;
use serde::Deserialize;
use serde_json::Value;

use super::types::{ClusterListItem, ClusterResolveOutput};
use super::{federation_error, preconditions, required_string};
use crate::context::{RequestContext, ServerContext};
use crate::error::ToolError;
use crate::registry::{parse_args, to_output, Tool};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResolveClusterArgs {
	pattern: Option<String>,
}

pub struct ResolveClusterTool;

#[async_trait]
impl Tool for ResolveClusterTool {
	fn name(&self) -> &str {
		"capi_resolve_cluster"
	}

	fn description(&self) -> &str {
		"Resolve a partial cluster name pattern to its full identifier. Useful when you only \
		 know part of a cluster name."
	}

	fn input_schema(&self) -> Value {
		serde_json::json!({
			"type": "object",
			"properties": {
				"pattern": {
					"type": "string",
					"description": "Partial cluster name to search for (e.g. 'prod' to find 'prod-wc-01')"
				}
			},
			"required": ["pattern"]
		})
	}

	async fn invoke(
		&self,
		args: Value,
		request: &RequestContext,
		server: &ServerContext,
	) -> Result<Value, ToolError> {
		let (manager, identity) = preconditions(request, server)?;
		let args: ResolveClusterArgs = parse_args(args)?;
		let pattern = required_string(args.pattern, "pattern")?;

		let clusters = manager
			.list_clusters(Some(identity))
			.await
			.map_err(|e| federation_error(e, "resolve cluster"))?;

		let resolution = resolve_pattern(&clusters, &pattern);
		let now = Utc::now();

		let output = match (resolution.resolved, resolution.matches.len()) {
			(_, 0) => ClusterResolveOutput {
				resolved: false,
				cluster: None,
				matches: Vec::new(),
				message: format!(
					"No clusters match pattern '{pattern}'. Use capi_list_clusters to see available clusters."
				),
			},
			(Some(cluster), 1) => ClusterResolveOutput {
				resolved: true,
				message: format!(
					"Pattern '{pattern}' resolved to cluster '{}' in namespace '{}'.",
					cluster.name, cluster.namespace
				),
				cluster: Some(ClusterListItem::from_summary(&cluster, now)),
				matches: Vec::new(),
			},
			_ => ClusterResolveOutput {
				resolved: false,
				cluster: None,
				matches: resolution
					.matches
					.iter()
					.map(|c| ClusterListItem::from_summary(c, now))
					.collect(),
				message: format!(
					"Multiple clusters match pattern '{pattern}'. Please use a more specific name."
				),
			},
		};
		to_output(&output)
	}
}
