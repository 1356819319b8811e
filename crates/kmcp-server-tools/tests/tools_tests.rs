// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests for the agent-facing tools against mock clusters.
//!
//! Tests cover:
//! - can_i argument checks, identity and federation preconditions
//! - can_i verdicts with sanitized evaluation errors
//! - capi_list_clusters filters, limits and truncation reporting
//! - capi_get_cluster detail shape and annotation shaping
//! - secret masking on items listed without a kind
//! - capi_resolve_cluster exact, partial and ambiguous patterns
//! - capi_cluster_health verdicts
//! - generic error messages for unavailable or failing backends

use std::sync::Arc;

use kmcp_common_identity::RawIdentity;
use kmcp_server_federation::{CacheConfig, CredentialMode, FederationManager};
use kmcp_server_k8s::{
	AccessReviewStatus, ClusterClient, K8sError, ListOptions, MockClientFactory,
	MockClusterClient, ResourceType,
};
use kmcp_server_output::{to_json_values, OutputConfig};
use kmcp_server_tools::{RequestContext, ServerContext, ToolRegistry, ToolResult};
use serde_json::{json, Value};

fn jane_identity() -> RawIdentity {
	RawIdentity::new("jane@example.com").with_groups(["dev"])
}

fn jane() -> RequestContext {
	RequestContext::new(Some(jane_identity()))
}

fn add_cluster(mock: &MockClusterClient, name: &str, namespace: &str, status: Value) {
	let environment = if name.starts_with("prod") {
		"production"
	} else {
		"testing"
	};
	mock.insert_json(
		&ResourceType::capi_cluster(),
		json!({
			"apiVersion": "cluster.x-k8s.io/v1beta2",
			"kind": "Cluster",
			"metadata": {
				"name": name,
				"namespace": namespace,
				"creationTimestamp": "2025-01-01T00:00:00Z",
				"labels": {
					"giantswarm.io/organization": namespace.trim_start_matches("org-"),
					"environment": environment
				},
				"annotations": {
					"cluster.giantswarm.io/description": format!("{name} cluster"),
					"kubectl.kubernetes.io/last-applied-configuration": "{\"huge\":true}"
				}
			},
			"spec": {
				"infrastructureRef": { "kind": "AWSCluster" },
				"topology": { "version": "v1.29.4" }
			},
			"status": status
		}),
	)
	.unwrap();
}

fn healthy() -> Value {
	json!({
		"phase": "Provisioned",
		"controlPlaneReady": true,
		"infrastructureReady": true,
		"workerNodes": 3
	})
}

struct Harness {
	factory: Arc<MockClientFactory>,
	manager: Arc<FederationManager>,
	server: ServerContext,
	registry: ToolRegistry,
}

impl Harness {
	fn new() -> Self {
		let factory = Arc::new(MockClientFactory::new());
		let manager = Arc::new(FederationManager::new(
			factory.clone(),
			CacheConfig::default(),
			CredentialMode::User,
		));
		let server = ServerContext::new(Some(manager.clone()), OutputConfig::default());
		Self {
			factory,
			manager,
			server,
			registry: ToolRegistry::with_defaults(),
		}
	}

	fn with_fleet() -> Self {
		let harness = Self::new();
		let local = harness.factory.local();
		add_cluster(&local, "prod-wc-01", "org-acme", healthy());
		add_cluster(&local, "staging-wc", "org-acme", healthy());
		add_cluster(&local, "dev-cluster", "org-beta", healthy());
		harness
	}

	async fn call(&self, tool: &str, args: Value, request: &RequestContext) -> ToolResult {
		self.registry.dispatch(tool, args, request, &self.server).await
	}
}

fn body(result: &ToolResult) -> Value {
	assert!(!result.is_error, "unexpected error result: {}", result.text);
	serde_json::from_str(&result.text).unwrap()
}

fn without_federation() -> ServerContext {
	ServerContext::new(None, OutputConfig::default())
}

// ============================================================================
// can_i
// ============================================================================

#[tokio::test]
async fn can_i_requires_verb_and_resource() {
	let harness = Harness::new();

	let result = harness.call("can_i", json!({ "resource": "pods" }), &jane()).await;
	assert!(result.is_error);
	assert_eq!(result.text, "verb is required");

	let result = harness.call("can_i", json!({ "verb": "get" }), &jane()).await;
	assert!(result.is_error);
	assert_eq!(result.text, "resource is required");
}

#[tokio::test]
async fn can_i_without_federation_mentions_federation_mode() {
	let registry = ToolRegistry::with_defaults();
	let result = registry
		.dispatch(
			"can_i",
			json!({ "verb": "get", "resource": "pods" }),
			&jane(),
			&without_federation(),
		)
		.await;
	assert!(result.is_error);
	assert!(result.text.contains("federation mode"));
}

#[tokio::test]
async fn can_i_without_identity_requires_authentication() {
	let harness = Harness::new();
	let result = harness
		.call(
			"can_i",
			json!({ "verb": "get", "resource": "pods" }),
			&RequestContext::anonymous(),
		)
		.await;
	assert!(result.is_error);
	assert!(result.text.starts_with("authentication required"));
}

#[tokio::test]
async fn can_i_reports_local_cluster_and_echoes_check() {
	let harness = Harness::new();
	harness
		.factory
		.local()
		.set_access_status(AccessReviewStatus::allowed("RBAC: allowed by ClusterRoleBinding"));

	let result = harness
		.call(
			"can_i",
			json!({ "verb": "list", "resource": "deployments", "apiGroup": "apps", "namespace": "web" }),
			&jane(),
		)
		.await;
	let body = body(&result);

	assert_eq!(body["allowed"], true);
	assert!(body.get("denied").is_none());
	assert_eq!(body["user"], "jane@example.com");
	assert_eq!(body["cluster"], "local");
	assert_eq!(
		body["check"],
		json!({ "verb": "list", "resource": "deployments", "apiGroup": "apps", "namespace": "web" })
	);

	let reviews = harness.factory.local().access_reviews();
	assert_eq!(reviews.len(), 1);
	assert_eq!(reviews[0].group, "apps");
}

#[tokio::test]
async fn can_i_sanitizes_evaluation_errors() {
	let harness = Harness::new();
	harness.factory.local().set_access_status(AccessReviewStatus {
		allowed: false,
		evaluation_error: "unable to find resource definition for custom.io/v1".to_string(),
		..Default::default()
	});

	let result = harness
		.call("can_i", json!({ "verb": "get", "resource": "widgets" }), &jane())
		.await;
	let body = body(&result);

	assert_eq!(body["allowed"], false);
	let reason = body["reason"].as_str().unwrap();
	assert!(reason.contains("resource type not recognized"));
	assert!(!reason.contains("custom.io"));
	assert!(!result.text.contains("custom.io"));
}

#[tokio::test]
async fn can_i_rejects_unknown_verbs_as_invalid_request() {
	let harness = Harness::new();
	let result = harness
		.call("can_i", json!({ "verb": "destroy", "resource": "pods" }), &jane())
		.await;
	assert!(result.is_error);
	assert!(result.text.starts_with("invalid request:"));
	assert_eq!(harness.factory.local().access_reviews().len(), 0);
}

#[tokio::test]
async fn can_i_hides_backend_failures() {
	let harness = Harness::new();
	harness.factory.local().fail_method(
		"self_subject_access_review",
		K8sError::Connection {
			message: "dial tcp 10.0.0.1:6443: connection refused".to_string(),
		},
	);

	let result = harness
		.call("can_i", json!({ "verb": "get", "resource": "pods" }), &jane())
		.await;
	assert!(result.is_error);
	assert_eq!(result.text, "failed to check permissions - please try again");
}

// ============================================================================
// capi_list_clusters
// ============================================================================

#[tokio::test]
async fn list_clusters_returns_every_visible_cluster() {
	let harness = Harness::with_fleet();

	let body = body(&harness.call("capi_list_clusters", Value::Null, &jane()).await);

	assert_eq!(body["totalCount"], 3);
	assert_eq!(body["returnedCount"], 3);
	assert_eq!(body["truncated"], false);
	assert_eq!(body["filterApplied"], false);
	let first = &body["clusters"][0];
	assert_eq!(first["provider"], "aws");
	assert_eq!(first["ready"], true);
	assert_eq!(first["nodeCount"], 3);
}

#[tokio::test]
async fn list_clusters_applies_filters() {
	let harness = Harness::with_fleet();

	let body = body(
		&harness
			.call(
				"capi_list_clusters",
				json!({ "organization": "org-acme", "provider": "AWS", "labelSelector": "environment=production" }),
				&jane(),
			)
			.await,
	);

	assert_eq!(body["totalCount"], 1);
	assert_eq!(body["filterApplied"], true);
	assert_eq!(body["clusters"][0]["name"], "prod-wc-01");
}

#[tokio::test]
async fn list_clusters_reports_truncation() {
	let harness = Harness::new();
	let local = harness.factory.local();
	for i in 0..7 {
		add_cluster(&local, &format!("wc-{i:02}"), "org-acme", healthy());
	}

	let body = body(
		&harness
			.call("capi_list_clusters", json!({ "limit": 5 }), &jane())
			.await,
	);

	assert_eq!(body["totalCount"], 7);
	assert_eq!(body["returnedCount"], 5);
	assert_eq!(body["truncated"], true);
	assert_eq!(body["clusters"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn list_clusters_hides_selector_parse_detail() {
	let harness = Harness::with_fleet();
	let result = harness
		.call(
			"capi_list_clusters",
			json!({ "labelSelector": "env in (a,," }),
			&jane(),
		)
		.await;
	assert!(result.is_error);
	assert_eq!(result.text, "invalid label selector");
}

#[tokio::test]
async fn list_clusters_without_capi_is_not_available() {
	let harness = Harness::new();
	harness
		.factory
		.local()
		.mark_not_installed(&ResourceType::capi_cluster());

	let result = harness.call("capi_list_clusters", Value::Null, &jane()).await;
	assert!(result.is_error);
	assert_eq!(result.text, "this operation is not available");
}

#[tokio::test]
async fn fleet_tools_require_federation_and_identity() {
	let registry = ToolRegistry::with_defaults();
	let result = registry
		.dispatch("capi_list_clusters", Value::Null, &jane(), &without_federation())
		.await;
	assert_eq!(result.text, "this operation is not available");

	let harness = Harness::with_fleet();
	let result = harness
		.call("capi_list_clusters", Value::Null, &RequestContext::anonymous())
		.await;
	assert!(result.is_error);
	assert_eq!(result.text, "authentication required");
}

#[tokio::test]
async fn closed_manager_reports_service_unavailable() {
	let harness = Harness::with_fleet();
	harness.manager.close().await;

	let result = harness.call("capi_list_clusters", Value::Null, &jane()).await;
	assert!(result.is_error);
	assert_eq!(result.text, "service temporarily unavailable");
}

// ============================================================================
// capi_get_cluster
// ============================================================================

#[tokio::test]
async fn get_cluster_returns_detail() {
	let harness = Harness::with_fleet();

	let body = body(
		&harness
			.call("capi_get_cluster", json!({ "name": "prod-wc-01" }), &jane())
			.await,
	);

	assert_eq!(body["name"], "prod-wc-01");
	assert_eq!(body["namespace"], "org-acme");
	assert_eq!(body["metadata"]["organization"], "acme");
	assert_eq!(body["metadata"]["kubernetesVersion"], "v1.29.4");
	assert_eq!(body["metadata"]["description"], "prod-wc-01 cluster");
	assert_eq!(body["metadata"]["createdAt"], "2025-01-01T00:00:00Z");
	assert_eq!(body["status"]["phase"], "Provisioned");
	assert_eq!(body["status"]["nodeCount"], 3);
	assert_eq!(body["labels"]["environment"], "production");
	assert!(body["annotations"]
		.get("kubectl.kubernetes.io/last-applied-configuration")
		.is_none());
	assert_eq!(
		body["annotations"]["cluster.giantswarm.io/description"],
		"prod-wc-01 cluster"
	);
}

#[tokio::test]
async fn get_cluster_requires_name() {
	let harness = Harness::with_fleet();
	let result = harness.call("capi_get_cluster", json!({}), &jane()).await;
	assert!(result.is_error);
	assert_eq!(result.text, "name parameter is required");
}

#[tokio::test]
async fn get_cluster_unknown_name_is_generic() {
	let harness = Harness::with_fleet();
	let result = harness
		.call("capi_get_cluster", json!({ "name": "ghost" }), &jane())
		.await;
	assert!(result.is_error);
	assert_eq!(result.text, "cluster access denied or unavailable");
}

#[tokio::test]
async fn malformed_cluster_name_is_reported_as_invalid_input() {
	let harness = Harness::with_fleet();
	for tool in ["capi_get_cluster", "capi_cluster_health"] {
		let result = harness
			.call(tool, json!({ "name": "Prod_WC/../x" }), &jane())
			.await;
		assert!(result.is_error, "{tool}");
		assert_eq!(result.text, "invalid cluster name provided", "{tool}");
	}
}

#[tokio::test]
async fn listed_secrets_are_masked_before_output() {
	let harness = Harness::new();
	harness
		.factory
		.local()
		.insert_json(
			&ResourceType::secret(),
			json!({
				"metadata": { "name": "db-creds", "namespace": "default" },
				"type": "Opaque",
				"data": { "password": "aHVudGVyMg==" }
			}),
		)
		.unwrap();

	let client = harness.manager.resolve("", Some(&jane_identity())).await.unwrap();
	let page = client
		.list(&ResourceType::secret(), Some("default"), &ListOptions::default())
		.await
		.unwrap();
	let items = to_json_values(&page.items).unwrap();
	let result = harness.server.processor().process(items);

	assert!(result.metadata.secrets_masked);
	assert_eq!(result.items[0]["kind"], "Secret");
	assert_eq!(result.items[0]["data"]["password"], "***REDACTED***");
}

// ============================================================================
// capi_resolve_cluster
// ============================================================================

#[tokio::test]
async fn resolve_cluster_with_ambiguous_pattern_lists_matches() {
	let harness = Harness::with_fleet();

	let body = body(
		&harness
			.call("capi_resolve_cluster", json!({ "pattern": "wc" }), &jane())
			.await,
	);

	assert_eq!(body["resolved"], false);
	let names: Vec<&str> = body["matches"]
		.as_array()
		.unwrap()
		.iter()
		.map(|m| m["name"].as_str().unwrap())
		.collect();
	assert_eq!(names.len(), 2);
	assert!(names.contains(&"prod-wc-01"));
	assert!(names.contains(&"staging-wc"));
	assert_eq!(
		body["message"],
		"Multiple clusters match pattern 'wc'. Please use a more specific name."
	);
}

#[tokio::test]
async fn resolve_cluster_single_partial_match() {
	let harness = Harness::with_fleet();

	let body = body(
		&harness
			.call("capi_resolve_cluster", json!({ "pattern": "STAGING" }), &jane())
			.await,
	);

	assert_eq!(body["resolved"], true);
	assert_eq!(body["cluster"]["name"], "staging-wc");
	assert_eq!(
		body["message"],
		"Pattern 'STAGING' resolved to cluster 'staging-wc' in namespace 'org-acme'."
	);
}

#[tokio::test]
async fn resolve_cluster_exact_match_wins() {
	let harness = Harness::with_fleet();
	add_cluster(&harness.factory.local(), "staging-wc-2", "org-acme", healthy());

	let body = body(
		&harness
			.call("capi_resolve_cluster", json!({ "pattern": "staging-wc" }), &jane())
			.await,
	);
	assert_eq!(body["resolved"], true);
	assert_eq!(body["cluster"]["name"], "staging-wc");
}

#[tokio::test]
async fn resolve_cluster_without_match() {
	let harness = Harness::with_fleet();

	let body = body(
		&harness
			.call("capi_resolve_cluster", json!({ "pattern": "zzz" }), &jane())
			.await,
	);
	assert_eq!(body["resolved"], false);
	assert!(body.get("matches").is_none());
	assert_eq!(
		body["message"],
		"No clusters match pattern 'zzz'. Use capi_list_clusters to see available clusters."
	);
}

// ============================================================================
// capi_cluster_health
// ============================================================================

#[tokio::test]
async fn cluster_health_for_ready_cluster() {
	let harness = Harness::with_fleet();

	let body = body(
		&harness
			.call("capi_cluster_health", json!({ "name": "prod-wc-01" }), &jane())
			.await,
	);

	assert_eq!(body["status"], "HEALTHY");
	assert_eq!(body["components"]["controlPlane"]["status"], "healthy");
	assert_eq!(body["components"]["nodes"]["ready"], 3);
	let checks: Vec<&str> = body["checks"]
		.as_array()
		.unwrap()
		.iter()
		.map(|c| c["name"].as_str().unwrap())
		.collect();
	assert_eq!(
		checks,
		vec!["control-plane-ready", "infrastructure-ready", "cluster-phase", "nodes"]
	);
}

#[tokio::test]
async fn cluster_health_for_broken_cluster() {
	let harness = Harness::new();
	add_cluster(
		&harness.factory.local(),
		"broken",
		"org-acme",
		json!({ "phase": "Failed", "controlPlaneReady": false, "infrastructureReady": false }),
	);

	let body = body(
		&harness
			.call("capi_cluster_health", json!({ "name": "broken" }), &jane())
			.await,
	);

	assert_eq!(body["status"], "UNHEALTHY");
	assert_eq!(body["components"]["nodes"]["status"], "unknown");
	assert_eq!(body["checks"][2]["status"], "fail");
}

#[tokio::test]
async fn cluster_health_for_provisioning_cluster_is_degraded() {
	let harness = Harness::new();
	add_cluster(
		&harness.factory.local(),
		"new-wc",
		"org-acme",
		json!({ "phase": "Provisioning", "controlPlaneReady": false, "infrastructureReady": true }),
	);

	let body = body(
		&harness
			.call("capi_cluster_health", json!({ "name": "new-wc" }), &jane())
			.await,
	);
	assert_eq!(body["status"], "DEGRADED");
	assert_eq!(body["checks"][2]["status"], "warn");
}
