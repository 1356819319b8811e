// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use kmcp_common_identity::anonymize_email;
use kmcp_server_federation::AccessCheck;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::{RequestContext, ServerContext};
use crate::error::ToolError;
use crate::registry::{parse_args, to_output, Tool};

const LOCAL_CLUSTER: &str = "local";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CanIArgs {
	verb: Option<String>,
	resource: Option<String>,
	api_group: Option<String>,
	namespace: Option<String>,
	name: Option<String>,
	subresource: Option<String>,
	cluster: Option<String>,
}

#[derive(Debug, Serialize)]
struct CanIResponse {
	allowed: bool,
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	denied: bool,
	#[serde(skip_serializing_if = "String::is_empty")]
	reason: String,
	user: String,
	cluster: String,
	check: AccessCheck,
}

fn required(value: Option<String>, message: &str) -> Result<String, ToolError> {
	value
		.filter(|v| !v.is_empty())
		.ok_or_else(|| ToolError::InvalidArguments(message.to_string()))
}

/// Asks the target cluster whether the caller may perform an action, using
/// a SelfSubjectAccessReview issued under the caller's own identity.
pub struct CanITool;

#[async_trait]
impl Tool for CanITool {
	fn name(&self) -> &str {
		"can_i"
	}

	fn description(&self) -> &str {
		"Check if you have permission to perform an action on a Kubernetes resource. \
		 The check runs with your own identity, so the answer matches what the cluster \
		 would decide for the real operation."
	}

	fn input_schema(&self) -> Value {
		serde_json::json!({
			"type": "object",
			"properties": {
				"verb": {
					"type": "string",
					"description": "The action to check (get, list, watch, create, update, patch, delete)"
				},
				"resource": {
					"type": "string",
					"description": "The resource type to check (pods, deployments, secrets, etc.)"
				},
				"apiGroup": {
					"type": "string",
					"description": "API group for the resource (empty for core resources, 'apps' for deployments)"
				},
				"namespace": {
					"type": "string",
					"description": "Namespace to check permissions in (empty for cluster-scoped resources)"
				},
				"name": {
					"type": "string",
					"description": "Specific resource name to check"
				},
				"subresource": {
					"type": "string",
					"description": "Subresource to check (e.g. 'log', 'exec', 'portforward' for pods)"
				},
				"cluster": {
					"type": "string",
					"description": "Target cluster name (empty for the management cluster)"
				}
			},
			"required": ["verb", "resource"]
		})
	}

	async fn invoke(
		&self,
		args: Value,
		request: &RequestContext,
		server: &ServerContext,
	) -> Result<Value, ToolError> {
		let args: CanIArgs = parse_args(args)?;
		let verb = required(args.verb, "verb is required")?;
		let resource = required(args.resource, "resource is required")?;

		let Some(manager) = server.federation() else {
			return Err(ToolError::Rejected(
				"permission checks require federation mode to be enabled".to_string(),
			));
		};
		let Some(identity) = request.identity() else {
			return Err(ToolError::Rejected(
				"authentication required: no user info in context".to_string(),
			));
		};

		let check = AccessCheck {
			verb,
			resource,
			api_group: args.api_group.unwrap_or_default(),
			namespace: args.namespace.unwrap_or_default(),
			name: args.name.unwrap_or_default(),
			subresource: args.subresource.unwrap_or_default(),
		};
		let cluster = args.cluster.unwrap_or_default();

		let result = match manager.check_access(&cluster, Some(identity), &check).await {
			Ok(result) => result,
			Err(err) if err.is_validation_error() => {
				return Err(ToolError::InvalidArguments(format!(
					"invalid request: {}",
					err.user_facing()
				)));
			}
			Err(err) => {
				tracing::error!(
					user_hash = %anonymize_email(&identity.email),
					cluster = %cluster,
					error = %err,
					"access check failed"
				);
				return Err(ToolError::Rejected(
					"failed to check permissions - please try again".to_string(),
				));
			}
		};

		to_output(&CanIResponse {
			allowed: result.allowed,
			denied: result.denied,
			reason: result.display_reason(),
			user: identity.email.clone(),
			cluster: if cluster.is_empty() {
				LOCAL_CLUSTER.to_string()
			} else {
				cluster
			},
			check,
		})
	}
}
