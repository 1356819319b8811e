// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-shot tool invocation from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use kmcp_common_identity::{anonymize_email, RawIdentity};
use kmcp_server_config::ServerConfig;
use kmcp_server_federation::{CredentialMode, FederationManager};
use kmcp_server_k8s::KubeClientFactory;
use kmcp_server_tools::{RequestContext, ServerContext, ToolRegistry, ToolResult};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

#[derive(clap::Args, Debug)]
pub struct CallArgs {
	/// Tool to invoke, e.g. `capi_list_clusters`
	pub tool: String,

	/// Tool arguments as a JSON object
	#[arg(long, default_value = "{}")]
	pub args: String,

	/// Email of the caller to impersonate
	#[arg(long, env = "KMCP_EMAIL")]
	pub email: Option<String>,

	/// Group of the caller (repeatable)
	#[arg(long = "group")]
	pub groups: Vec<String>,

	/// Subject identifier of the caller
	#[arg(long)]
	pub subject: Option<String>,

	/// Config file (defaults to /etc/kmcp/server.toml)
	#[arg(long)]
	pub config: Option<PathBuf>,
}

impl CallArgs {
	pub fn load_config(&self) -> anyhow::Result<ServerConfig> {
		let config = match &self.config {
			Some(path) => kmcp_server_config::load_config_with_file(path),
			None => kmcp_server_config::load_config(),
		};
		config.context("failed to load configuration")
	}

	pub fn tool_args(&self) -> anyhow::Result<Value> {
		let args: Value =
			serde_json::from_str(&self.args).context("--args must be valid JSON")?;
		if !args.is_object() {
			anyhow::bail!("--args must be a JSON object");
		}
		Ok(args)
	}

	/// Identity assembled from flags. No email means an anonymous call.
	pub fn identity(&self) -> Option<RawIdentity> {
		let email = self.email.as_deref().filter(|e| !e.is_empty())?;
		let mut identity = RawIdentity::new(email).with_groups(self.groups.iter().cloned());
		if let Some(subject) = self.subject.as_deref().filter(|s| !s.is_empty()) {
			identity = identity.with_subject(subject);
		}
		Some(identity)
	}
}

async fn federation(config: &ServerConfig) -> anyhow::Result<Option<Arc<FederationManager>>> {
	if !config.federation.enabled {
		tracing::info!("federation disabled");
		return Ok(None);
	}

	let privileged = config.federation.credential_mode == CredentialMode::Privileged;
	let factory = KubeClientFactory::infer(privileged)
		.await
		.context("failed to initialize the Kubernetes client factory")?;

	Ok(Some(Arc::new(FederationManager::new(
		Arc::new(factory),
		config.federation.cache_config(),
		config.federation.credential_mode,
	))))
}

/// Run one tool and return its result. The manager is closed before
/// returning, whatever the outcome.
pub async fn run(args: &CallArgs, config: &ServerConfig) -> anyhow::Result<ToolResult> {
	let tool_args = args.tool_args()?;
	let identity = args.identity();
	let manager = federation(config).await?;
	let server = ServerContext::new(manager.clone(), config.output.clone());

	let cancel = CancellationToken::new();
	let on_interrupt = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			on_interrupt.cancel();
		}
	});

	tracing::info!(
		tool = %args.tool,
		user_hash = %identity.as_ref().map(|i| anonymize_email(&i.email)).unwrap_or_default(),
		"invoking tool"
	);
	let request = RequestContext::new(identity).with_cancellation(cancel);
	let result = ToolRegistry::with_defaults()
		.dispatch(&args.tool, tool_args, &request, &server)
		.await;

	if let Some(manager) = manager {
		manager.close().await;
	}
	Ok(result)
}
