// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{
	AccessReview, AccessReviewStatus, DynamicObject, ListOptions, LogOptions, PaginatedResult,
	PatchRequest, ResourceType, SecretData,
};

/// Capability contract for operating on a single cluster.
///
/// Implementations differ only in how they obtain the underlying handle; the
/// semantics of every verb are identical whether the target is the local
/// management cluster or a federated workload cluster. Every call is made
/// with whatever identity the handle impersonates.
#[async_trait]
pub trait ClusterClient: Send + Sync {
	/// Get a single object by name.
	async fn get(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
	) -> Result<DynamicObject, K8sError>;

	/// List objects, one page at a time.
	///
	/// A `None` namespace (or `all_namespaces`) lists across the cluster.
	async fn list(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		opts: &ListOptions,
	) -> Result<PaginatedResult, K8sError>;

	/// Create a new object.
	async fn create(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		object: &DynamicObject,
	) -> Result<DynamicObject, K8sError>;

	/// Server-side apply an object under this service's field manager.
	async fn apply(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		object: &DynamicObject,
	) -> Result<DynamicObject, K8sError>;

	/// Delete an object by name.
	async fn delete(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
	) -> Result<(), K8sError>;

	/// Patch an object by name.
	async fn patch(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
		patch: &PatchRequest,
	) -> Result<DynamicObject, K8sError>;

	/// Set the replica count through the scale subresource.
	async fn scale(
		&self,
		resource: &ResourceType,
		namespace: &str,
		name: &str,
		replicas: i32,
	) -> Result<(), K8sError>;

	/// Fetch a bounded chunk of container logs.
	async fn logs(&self, namespace: &str, pod: &str, opts: &LogOptions) -> Result<String, K8sError>;

	/// Ask the cluster whether the impersonated identity may perform an action.
	///
	/// This is a SelfSubjectAccessReview and never mutates cluster state.
	async fn self_subject_access_review(
		&self,
		review: &AccessReview,
	) -> Result<AccessReviewStatus, K8sError>;

	/// Read the data of a Secret.
	async fn get_secret_data(&self, namespace: &str, name: &str) -> Result<SecretData, K8sError>;
}
