// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::ClusterDetail;
use super::{federation_error, preconditions, required_string};
use crate::context::{RequestContext, ServerContext};
use crate::error::ToolError;
use crate::registry::{parse_args, to_output, Tool};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GetClusterArgs {
	name: Option<String>,
}

pub struct GetClusterTool;

/// Run the cluster's annotations through the response pipeline so that
/// bulky ones such as `last-applied-configuration` are dropped.
fn shape_annotations(
	server: &ServerContext,
	annotations: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
	if annotations.is_empty() {
		return annotations;
	}
	let shaped = server
		.processor()
		.process_single(&json!({ "metadata": { "annotations": annotations } }));
	shaped
		.pointer("/metadata/annotations")
		.and_then(Value::as_object)
		.map(|obj| {
			obj.iter()
				.filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
				.collect()
		})
		.unwrap_or_default()
}

#[async_trait]
impl Tool for GetClusterTool {
	fn name(&self) -> &str {
		"capi_get_cluster"
	}

	fn description(&self) -> &str {
		"Get detailed information about a specific CAPI cluster including metadata, status, \
		 labels, and annotations."
	}

	fn input_schema(&self) -> Value {
		json!({
			"type": "object",
			"properties": {
				"name": {
					"type": "string",
					"description": "The name of the cluster to get details for"
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
		let args: GetClusterArgs = parse_args(args)?;
		let name = required_string(args.name, "name")?;

		let cluster = manager
			.get_cluster_summary(&name, Some(identity))
			.await
			.map_err(|e| federation_error(e, "get cluster"))?;

		let mut detail = ClusterDetail::from_summary(&cluster, Utc::now());
		detail.annotations = shape_annotations(server, detail.annotations);
		to_output(&detail)
	}
}
