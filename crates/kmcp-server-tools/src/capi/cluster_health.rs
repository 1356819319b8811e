// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use kmcp_server_federation::assess;
use serde::Deserialize;
use serde_json::Value;

use super::{federation_error, preconditions, required_string};
use crate::context::{RequestContext, ServerContext};
use crate::error::ToolError;
use crate::registry::{parse_args, to_output, Tool};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClusterHealthArgs {
	name: Option<String>,
}

pub struct ClusterHealthTool;

#[async_trait]
impl Tool for ClusterHealthTool {
	fn name(&self) -> &str {
		"capi_cluster_health"
	}

	fn description(&self) -> &str {
		"Check the health status of a CAPI cluster. Returns overall health, component status, \
		 and individual health checks."
	}

	fn input_schema(&self) -> Value {
		serde_json::json!({
			"type": "object",
			"properties": {
				"name": {
					"type": "string",
					"description": "The name of the cluster to check health for"
				}
			},
			"required": ["name"]
		})
	}

	async fn invoke(
		&self,
		args: Value,
		request: &RequestContext,
		server: &ServerContext,
	) -> Result<Value, ToolError> {
		let (manager, identity) = preconditions(request, server)?;
		let args: ClusterHealthArgs = parse_args(args)?;
		let name = required_string(args.name, "name")?;

		let cluster = manager
			.get_cluster_summary(&name, Some(identity))
			.await
			.map_err(|e| federation_error(e, "check cluster health"))?;

		to_output(&assess(&cluster))
	}
}
