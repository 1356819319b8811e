// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug_span, Instrument};

use crate::client::ClusterClient;
use crate::error::K8sError;
use crate::types::{
	AccessReview, AccessReviewStatus, DynamicObject, ListOptions, LogOptions, PaginatedResult,
	PatchRequest, ResourceType, SecretData,
};

/// A workload-cluster handle that behaves exactly like a direct client.
///
/// Every call is delegated to the wrapped client inside a span tagged with the
/// cluster name, so logs from a federated call can be told apart from local
/// ones.
#[derive(Clone)]
pub struct FederatedClient {
	cluster: String,
	inner: Arc<dyn ClusterClient>,
}

impl FederatedClient {
	pub fn new(cluster: impl Into<String>, inner: Arc<dyn ClusterClient>) -> Self {
		Self {
			cluster: cluster.into(),
			inner,
		}
	}

	/// Name of the workload cluster this handle targets.
	pub fn cluster_name(&self) -> &str {
		&self.cluster
	}
}

impl std::fmt::Debug for FederatedClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FederatedClient")
			.field("cluster", &self.cluster)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl ClusterClient for FederatedClient {
	async fn get(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
	) -> Result<DynamicObject, K8sError> {
		self.inner
			.get(resource, namespace, name)
			.instrument(debug_span!("federated_get", cluster = %self.cluster))
			.await
	}

	async fn list(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		opts: &ListOptions,
	) -> Result<PaginatedResult, K8sError> {
		self.inner
			.list(resource, namespace, opts)
			.instrument(debug_span!("federated_list", cluster = %self.cluster))
			.await
	}

	async fn create(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		object: &DynamicObject,
	) -> Result<DynamicObject, K8sError> {
		self.inner
			.create(resource, namespace, object)
			.instrument(debug_span!("federated_create", cluster = %self.cluster))
			.await
	}

	async fn apply(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		object: &DynamicObject,
	) -> Result<DynamicObject, K8sError> {
		self.inner
			.apply(resource, namespace, object)
			.instrument(debug_span!("federated_apply", cluster = %self.cluster))
			.await
	}

	async fn delete(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
	) -> Result<(), K8sError> {
		self.inner
			.delete(resource, namespace, name)
			.instrument(debug_span!("federated_delete", cluster = %self.cluster))
			.await
	}

	async fn patch(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
		patch: &PatchRequest,
	) -> Result<DynamicObject, K8sError> {
		self.inner
			.patch(resource, namespace, name, patch)
			.instrument(debug_span!("federated_patch", cluster = %self.cluster))
			.await
	}

	async fn scale(
		&self,
		resource: &ResourceType,
		namespace: &str,
		name: &str,
		replicas: i32,
	) -> Result<(), K8sError> {
		self.inner
			.scale(resource, namespace, name, replicas)
			.instrument(debug_span!("federated_scale", cluster = %self.cluster))
			.await
	}

	async fn logs(&self, namespace: &str, pod: &str, opts: &LogOptions) -> Result<String, K8sError> {
		self.inner
			.logs(namespace, pod, opts)
			.instrument(debug_span!("federated_logs", cluster = %self.cluster))
			.await
	}

	async fn self_subject_access_review(
		&self,
		review: &AccessReview,
	) -> Result<AccessReviewStatus, K8sError> {
		self.inner
			.self_subject_access_review(review)
			.instrument(debug_span!("federated_access_review", cluster = %self.cluster))
			.await
	}

	async fn get_secret_data(&self, namespace: &str, name: &str) -> Result<SecretData, K8sError> {
		self.inner
			.get_secret_data(namespace, name)
			.instrument(debug_span!("federated_get_secret", cluster = %self.cluster))
			.await
	}
}
