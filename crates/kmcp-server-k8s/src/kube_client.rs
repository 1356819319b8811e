// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use k8s_openapi::api::authorization::v1::{
	ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec,
};
use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::{
	api::{Api, DeleteParams, LogParams, Patch, PatchParams, PostParams},
	Client, Config,
};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::client::ClusterClient;
use crate::error::K8sError;
use crate::types::{
	AccessReview, AccessReviewStatus, DynamicObject, ListOptions, LogOptions, PaginatedResult,
	PatchKind, PatchRequest, ResourceType, SecretData,
};

/// Field manager recorded on server-side apply.
const FIELD_MANAGER: &str = "kmcp";

/// Upper bound on a single log fetch.
const MAX_LOG_BYTES: i64 = 1024 * 1024;

fn non_empty(value: &str) -> Option<String> {
	if value.is_empty() {
		None
	} else {
		Some(value.to_string())
	}
}

/// Production cluster client implementation using the kube crate.
#[derive(Clone)]
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn new() -> Result<Self, K8sError> {
		let client = Client::try_default().await?;
		debug!("K8s client initialized");
		Ok(Self { client })
	}

	/// Build a client from an already prepared configuration.
	pub fn from_config(config: Config) -> Result<Self, K8sError> {
		let client = Client::try_from(config).map_err(|e| K8sError::Kubeconfig {
			message: e.to_string(),
		})?;
		Ok(Self { client })
	}

	fn api(&self, resource: &ResourceType, namespace: Option<&str>) -> Api<DynamicObject> {
		let ar = resource.api_resource();
		match namespace {
			Some(ns) if resource.namespaced && !ns.is_empty() => {
				Api::namespaced_with(self.client.clone(), ns, &ar)
			}
			_ => Api::all_with(self.client.clone(), &ar),
		}
	}
}

fn not_found(resource: &ResourceType, name: &str) -> K8sError {
	K8sError::NotFound {
		kind: resource.kind.clone(),
		name: name.to_string(),
	}
}

#[async_trait]
impl ClusterClient for KubeClient {
	async fn get(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
	) -> Result<DynamicObject, K8sError> {
		match self.api(resource, namespace).get(name).await {
			Ok(obj) => Ok(obj),
			Err(kube::Error::Api(err)) if err.code == 404 => Err(not_found(resource, name)),
			Err(e) => Err(e.into()),
		}
	}

	#[instrument(skip(self, opts), fields(resource = %resource.qualified_name(), namespace = ?namespace))]
	async fn list(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		opts: &ListOptions,
	) -> Result<PaginatedResult, K8sError> {
		let api = if opts.all_namespaces {
			self.api(resource, None)
		} else {
			self.api(resource, namespace)
		};

		match api.list(&opts.to_list_params()).await {
			Ok(list) => {
				debug!(count = list.items.len(), "listed resources");
				let mut items = list.items;
				resource.stamp_types(&mut items);
				Ok(PaginatedResult {
					items,
					continue_token: list.metadata.continue_.filter(|t| !t.is_empty()),
					resource_version: list.metadata.resource_version,
					remaining_items: list.metadata.remaining_item_count,
				})
			}
			Err(kube::Error::Api(err)) if err.code == 404 => Err(K8sError::ResourceNotInstalled {
				resource: resource.qualified_name(),
			}),
			Err(e) => Err(e.into()),
		}
	}

	async fn create(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		object: &DynamicObject,
	) -> Result<DynamicObject, K8sError> {
		let created = self
			.api(resource, namespace)
			.create(&PostParams::default(), object)
			.await?;
		Ok(created)
	}

	async fn apply(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		object: &DynamicObject,
	) -> Result<DynamicObject, K8sError> {
		let name = object
			.metadata
			.name
			.clone()
			.ok_or_else(|| K8sError::InvalidRequest {
				message: "object to apply has no metadata.name".to_string(),
			})?;

		let mut object = object.clone();
		resource.stamp_types(std::slice::from_mut(&mut object));

		let params = PatchParams::apply(FIELD_MANAGER).force();
		let applied = self
			.api(resource, namespace)
			.patch(&name, &params, &Patch::Apply(&object))
			.await?;
		Ok(applied)
	}

	async fn delete(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
	) -> Result<(), K8sError> {
		match self
			.api(resource, namespace)
			.delete(name, &DeleteParams::default())
			.await
		{
			Ok(_) => Ok(()),
			Err(kube::Error::Api(err)) if err.code == 404 => Err(not_found(resource, name)),
			Err(e) => Err(e.into()),
		}
	}

	async fn patch(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
		patch: &PatchRequest,
	) -> Result<DynamicObject, K8sError> {
		let body = match patch.kind {
			PatchKind::Merge => Patch::Merge(&patch.body),
			PatchKind::Strategic => Patch::Strategic(&patch.body),
		};
		match self
			.api(resource, namespace)
			.patch(name, &PatchParams::default(), &body)
			.await
		{
			Ok(obj) => Ok(obj),
			Err(kube::Error::Api(err)) if err.code == 404 => Err(not_found(resource, name)),
			Err(e) => Err(e.into()),
		}
	}

	#[instrument(skip(self), fields(resource = %resource.qualified_name()))]
	async fn scale(
		&self,
		resource: &ResourceType,
		namespace: &str,
		name: &str,
		replicas: i32,
	) -> Result<(), K8sError> {
		if replicas < 0 {
			return Err(K8sError::InvalidRequest {
				message: "replicas must not be negative".to_string(),
			});
		}
		let body = serde_json::json!({ "spec": { "replicas": replicas } });
		match self
			.api(resource, Some(namespace))
			.patch_scale(name, &PatchParams::default(), &Patch::Merge(&body))
			.await
		{
			Ok(_) => Ok(()),
			Err(kube::Error::Api(err)) if err.code == 404 => Err(not_found(resource, name)),
			Err(e) => Err(e.into()),
		}
	}

	async fn logs(&self, namespace: &str, pod: &str, opts: &LogOptions) -> Result<String, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let lp = LogParams {
			container: opts.container.clone(),
			tail_lines: opts.tail_lines,
			previous: opts.previous,
			timestamps: opts.timestamps,
			limit_bytes: Some(MAX_LOG_BYTES),
			..Default::default()
		};
		match pods.logs(pod, &lp).await {
			Ok(logs) => Ok(logs),
			Err(kube::Error::Api(err)) if err.code == 404 => Err(K8sError::NotFound {
				kind: "Pod".to_string(),
				name: pod.to_string(),
			}),
			Err(e) => Err(e.into()),
		}
	}

	#[instrument(skip(self, review), fields(verb = %review.verb, resource = %review.resource))]
	async fn self_subject_access_review(
		&self,
		review: &AccessReview,
	) -> Result<AccessReviewStatus, K8sError> {
		let request = SelfSubjectAccessReview {
			metadata: Default::default(),
			spec: SelfSubjectAccessReviewSpec {
				resource_attributes: Some(ResourceAttributes {
					namespace: non_empty(&review.namespace),
					verb: non_empty(&review.verb),
					group: non_empty(&review.group),
					resource: non_empty(&review.resource),
					name: non_empty(&review.name),
					subresource: non_empty(&review.subresource),
					..Default::default()
				}),
				non_resource_attributes: None,
			},
			status: None,
		};

		let reviews: Api<SelfSubjectAccessReview> = Api::all(self.client.clone());
		let response = reviews.create(&PostParams::default(), &request).await?;
		let status = response.status.unwrap_or_default();

		Ok(AccessReviewStatus {
			allowed: status.allowed,
			denied: status.denied.unwrap_or(false),
			reason: status.reason.unwrap_or_default(),
			evaluation_error: status.evaluation_error.unwrap_or_default(),
		})
	}

	async fn get_secret_data(&self, namespace: &str, name: &str) -> Result<SecretData, K8sError> {
		let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
		let secret = match secrets.get(name).await {
			Ok(secret) => secret,
			Err(kube::Error::Api(err)) if err.code == 404 => {
				return Err(K8sError::NotFound {
					kind: "Secret".to_string(),
					name: name.to_string(),
				})
			}
			Err(e) => return Err(e.into()),
		};

		let mut data = SecretData::new();
		for (key, value) in secret.data.unwrap_or_default() {
			data.insert(key, Zeroizing::new(value.0));
		}
		for (key, value) in secret.string_data.unwrap_or_default() {
			data.entry(key)
				.or_insert_with(|| Zeroizing::new(value.into_bytes()));
		}
		Ok(data)
	}
}
