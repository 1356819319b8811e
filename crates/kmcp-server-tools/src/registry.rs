// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::capi::{ClusterHealthTool, GetClusterTool, ListClustersTool, ResolveClusterTool};
use crate::can_i::CanITool;
use crate::context::{RequestContext, ServerContext};
use crate::error::ToolError;

/// Name, description and argument schema advertised for a tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
	pub name: String,
	pub description: String,
	pub input_schema: Value,
}

/// What the transport sends back for one call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
	pub is_error: bool,
	pub text: String,
}

impl ToolResult {
	/// Pretty-printed JSON of `value`.
	pub fn success(value: &Value) -> Self {
		match serde_json::to_string_pretty(value) {
			Ok(text) => Self {
				is_error: false,
				text,
			},
			Err(e) => Self::error(ToolError::from(e).to_string()),
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			is_error: true,
			text: message.into(),
		}
	}
}

#[async_trait]
pub trait Tool: Send + Sync {
	fn name(&self) -> &str;

	fn description(&self) -> &str;

	fn input_schema(&self) -> Value;

	fn to_definition(&self) -> ToolDefinition {
		ToolDefinition {
			name: self.name().to_string(),
			description: self.description().to_string(),
			input_schema: self.input_schema(),
		}
	}

	async fn invoke(
		&self,
		args: Value,
		request: &RequestContext,
		server: &ServerContext,
	) -> Result<Value, ToolError>;
}

/// Decode tool arguments. A missing argument object counts as empty.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
	let args = if args.is_null() {
		Value::Object(Default::default())
	} else {
		args
	};
	serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(format!("invalid arguments: {e}")))
}

pub(crate) fn to_output<T: Serialize>(output: &T) -> Result<Value, ToolError> {
	serde_json::to_value(output).map_err(ToolError::from)
}

pub struct ToolRegistry {
	tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
	pub fn new() -> Self {
		Self {
			tools: BTreeMap::new(),
		}
	}

	/// Registry holding the permission check and every cluster-fleet tool.
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry.register(Box::new(CanITool));
		registry.register(Box::new(ListClustersTool));
		registry.register(Box::new(GetClusterTool));
		registry.register(Box::new(ResolveClusterTool));
		registry.register(Box::new(ClusterHealthTool));
		registry
	}

	pub fn register(&mut self, tool: Box<dyn Tool>) {
		let name = tool.name().to_string();
		tracing::debug!(tool_name = %name, "registering tool");
		self.tools.insert(name, tool);
	}

	pub fn get(&self, name: &str) -> Option<&dyn Tool> {
		self.tools.get(name).map(|t| t.as_ref())
	}

	pub fn definitions(&self) -> Vec<ToolDefinition> {
		self.tools.values().map(|t| t.to_definition()).collect()
	}

	/// Run `name`. Every outcome, including an unknown tool or a cancelled
	/// request, becomes a [`ToolResult`].
	#[instrument(skip(self, args, request, server), fields(tool = %name))]
	pub async fn dispatch(
		&self,
		name: &str,
		args: Value,
		request: &RequestContext,
		server: &ServerContext,
	) -> ToolResult {
		let Some(tool) = self.get(name) else {
			return ToolResult::error(format!("unknown tool: {name}"));
		};

		let outcome = tokio::select! {
			biased;
			_ = request.cancellation().cancelled() => {
				tracing::debug!("request cancelled");
				return ToolResult::error("request cancelled");
			}
			outcome = tool.invoke(args, request, server) => outcome,
		};

		match outcome {
			Ok(value) => ToolResult::success(&value),
			Err(err) => {
				tracing::debug!(error = %err, "tool returned an error");
				ToolResult::error(err.to_string())
			}
		}
	}
}

impl Default for ToolRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kmcp_server_output::OutputConfig;
	use proptest::prelude::*;
	use serde_json::json;

	struct EchoTool {
		name: String,
	}

	#[async_trait]
	impl Tool for EchoTool {
		fn name(&self) -> &str {
			&self.name
		}

		fn description(&self) -> &str {
			"Echo the arguments back"
		}

		fn input_schema(&self) -> Value {
			json!({ "type": "object", "properties": {} })
		}

		async fn invoke(
			&self,
			args: Value,
			_request: &RequestContext,
			_server: &ServerContext,
		) -> Result<Value, ToolError> {
			Ok(args)
		}
	}

	struct StuckTool;

	#[async_trait]
	impl Tool for StuckTool {
		fn name(&self) -> &str {
			"stuck"
		}

		fn description(&self) -> &str {
			"Never finishes"
		}

		fn input_schema(&self) -> Value {
			json!({ "type": "object" })
		}

		async fn invoke(
			&self,
			_args: Value,
			_request: &RequestContext,
			_server: &ServerContext,
		) -> Result<Value, ToolError> {
			std::future::pending().await
		}
	}

	fn server() -> ServerContext {
		ServerContext::new(None, OutputConfig::default())
	}

	proptest! {
		#[test]
		fn registry_stores_and_retrieves_tools_by_name(name in "[a-z][a-z0-9_]{0,30}") {
			let mut registry = ToolRegistry::new();
			registry.register(Box::new(EchoTool { name: name.clone() }));

			prop_assert!(registry.get(&name).is_some());
			prop_assert_eq!(registry.get(&name).unwrap().name(), name);
		}
	}

	#[test]
	fn defaults_register_every_tool() {
		let names: Vec<String> = ToolRegistry::with_defaults()
			.definitions()
			.into_iter()
			.map(|d| d.name)
			.collect();
		assert_eq!(
			names,
			vec![
				"can_i",
				"capi_cluster_health",
				"capi_get_cluster",
				"capi_list_clusters",
				"capi_resolve_cluster"
			]
		);
	}

	#[tokio::test]
	async fn success_is_pretty_json() {
		let mut registry = ToolRegistry::new();
		registry.register(Box::new(EchoTool {
			name: "echo".to_string(),
		}));

		let result = registry
			.dispatch("echo", json!({ "a": 1 }), &RequestContext::anonymous(), &server())
			.await;
		assert!(!result.is_error);
		assert_eq!(result.text, "{\n  \"a\": 1\n}");
	}

	#[tokio::test]
	async fn unknown_tool_is_an_error_result() {
		let result = ToolRegistry::new()
			.dispatch("nope", Value::Null, &RequestContext::anonymous(), &server())
			.await;
		assert!(result.is_error);
		assert_eq!(result.text, "unknown tool: nope");
	}

	#[tokio::test]
	async fn cancelled_request_abandons_the_call() {
		let mut registry = ToolRegistry::new();
		registry.register(Box::new(StuckTool));
		let request = RequestContext::anonymous();
		request.cancellation().cancel();

		let result = registry
			.dispatch("stuck", Value::Null, &request, &server())
			.await;
		assert!(result.is_error);
		assert_eq!(result.text, "request cancelled");
	}

	#[test]
	fn null_arguments_decode_as_empty() {
		#[derive(Debug, Default, serde::Deserialize)]
		struct Args {
			name: Option<String>,
		}
		let args: Args = parse_args(Value::Null).unwrap();
		assert!(args.name.is_none());

		let err = parse_args::<Args>(json!({ "name": 5 })).unwrap_err();
		assert!(matches!(err, ToolError::InvalidArguments(_)));
	}
}
