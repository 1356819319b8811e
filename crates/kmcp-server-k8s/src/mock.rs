// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory cluster and factory used by tests that must not reach an API
//! server.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use kmcp_common_identity::Identity;
use serde_json::Value;
use zeroize::Zeroizing;

use crate::client::ClusterClient;
use crate::error::{K8sError, K8sResult};
use crate::factory::ClientFactory;
use crate::types::{
	AccessReview, AccessReviewStatus, DynamicObject, KubeconfigData, ListOptions, LogOptions,
	PaginatedResult, PatchRequest, ResourceType, SecretData,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

type ObjectKey = (String, String, String);

/// Mock cluster holding objects, secrets and access verdicts in memory.
#[derive(Default)]
pub struct MockClusterClient {
	objects: Mutex<BTreeMap<ObjectKey, DynamicObject>>,
	secrets: Mutex<BTreeMap<(String, String), BTreeMap<String, Vec<u8>>>>,
	logs: Mutex<HashMap<(String, String), String>>,
	not_installed: Mutex<Vec<String>>,
	access_status: Mutex<AccessReviewStatus>,
	access_reviews: Mutex<Vec<AccessReview>>,
	errors: Mutex<VecDeque<K8sError>>,
	method_errors: Mutex<HashMap<String, K8sError>>,
	calls: Mutex<HashMap<String, usize>>,
}

impl MockClusterClient {
	pub fn new() -> Self {
		Self::default()
	}

	/// Store an object with the given name and top-level data.
	pub fn add_object(&self, resource: &ResourceType, namespace: &str, name: &str, data: Value) {
		let mut obj = DynamicObject::new(name, &resource.api_resource()).data(data);
		if resource.namespaced {
			obj = obj.within(namespace);
		}
		self.insert(resource, obj);
	}

	/// Store a fully formed object, replacing any object with the same name.
	pub fn insert(&self, resource: &ResourceType, obj: DynamicObject) {
		let key = (
			resource.qualified_name(),
			obj.metadata.namespace.clone().unwrap_or_default(),
			obj.metadata.name.clone().unwrap_or_default(),
		);
		lock(&self.objects).insert(key, obj);
	}

	/// Store an object from its JSON manifest.
	pub fn insert_json(&self, resource: &ResourceType, manifest: Value) -> K8sResult<()> {
		let obj: DynamicObject =
			serde_json::from_value(manifest).map_err(|e| K8sError::InvalidRequest {
				message: e.to_string(),
			})?;
		self.insert(resource, obj);
		Ok(())
	}

	pub fn add_secret(&self, namespace: &str, name: &str, data: BTreeMap<String, Vec<u8>>) {
		lock(&self.secrets).insert((namespace.to_string(), name.to_string()), data);
	}

	pub fn set_logs(&self, namespace: &str, pod: &str, logs: impl Into<String>) {
		lock(&self.logs).insert((namespace.to_string(), pod.to_string()), logs.into());
	}

	/// Make list calls for `resource` fail as if its CRD were absent.
	pub fn mark_not_installed(&self, resource: &ResourceType) {
		lock(&self.not_installed).push(resource.qualified_name());
	}

	/// Verdict returned by every subsequent access review.
	pub fn set_access_status(&self, status: AccessReviewStatus) {
		*lock(&self.access_status) = status;
	}

	/// Access reviews received so far, in order.
	pub fn access_reviews(&self) -> Vec<AccessReview> {
		lock(&self.access_reviews).clone()
	}

	/// Fail the next call, whichever method it is.
	pub fn fail_next(&self, err: K8sError) {
		lock(&self.errors).push_back(err);
	}

	/// Fail every call to `method` until cleared.
	pub fn fail_method(&self, method: &str, err: K8sError) {
		lock(&self.method_errors).insert(method.to_string(), err);
	}

	pub fn clear_failures(&self) {
		lock(&self.errors).clear();
		lock(&self.method_errors).clear();
	}

	pub fn call_count(&self, method: &str) -> usize {
		lock(&self.calls).get(method).copied().unwrap_or(0)
	}

	pub fn object(&self, resource: &ResourceType, namespace: &str, name: &str) -> Option<DynamicObject> {
		let key = (resource.qualified_name(), namespace_key(resource, Some(namespace)), name.to_string());
		lock(&self.objects).get(&key).cloned()
	}

	fn record(&self, method: &str) -> K8sResult<()> {
		*lock(&self.calls).entry(method.to_string()).or_insert(0) += 1;
		if let Some(err) = lock(&self.errors).pop_front() {
			return Err(err);
		}
		if let Some(err) = lock(&self.method_errors).get(method) {
			return Err(err.clone());
		}
		Ok(())
	}
}

fn namespace_key(resource: &ResourceType, namespace: Option<&str>) -> String {
	if resource.namespaced {
		namespace.unwrap_or_default().to_string()
	} else {
		String::new()
	}
}

fn not_found(resource: &ResourceType, name: &str) -> K8sError {
	K8sError::NotFound {
		kind: resource.kind.clone(),
		name: name.to_string(),
	}
}

/// Evaluate a field selector limited to `metadata.name` and
/// `metadata.namespace` equality, which is all the callers need.
fn field_selector_matches(selector: &str, obj: &DynamicObject) -> bool {
	selector.split(',').filter(|s| !s.is_empty()).all(|term| {
		let (field, expected, negate) = if let Some((f, v)) = term.split_once("!=") {
			(f, v, true)
		} else if let Some((f, v)) = term.split_once("==") {
			(f, v, false)
		} else if let Some((f, v)) = term.split_once('=') {
			(f, v, false)
		} else {
			return false;
		};
		let actual = match field.trim() {
			"metadata.name" => obj.metadata.name.as_deref(),
			"metadata.namespace" => obj.metadata.namespace.as_deref(),
			_ => return false,
		};
		(actual == Some(expected.trim())) != negate
	})
}

/// Equality and existence label selectors only.
fn label_selector_matches(selector: &str, obj: &DynamicObject) -> bool {
	let empty = BTreeMap::new();
	let labels = obj.metadata.labels.as_ref().unwrap_or(&empty);
	selector.split(',').filter(|s| !s.is_empty()).all(|term| {
		let term = term.trim();
		if let Some((k, v)) = term.split_once("!=") {
			labels.get(k.trim()).map(String::as_str) != Some(v.trim())
		} else if let Some((k, v)) = term.split_once('=') {
			let v = v.trim_start_matches('=');
			labels.get(k.trim()).map(String::as_str) == Some(v.trim())
		} else if let Some(k) = term.strip_prefix('!') {
			!labels.contains_key(k.trim())
		} else {
			labels.contains_key(term)
		}
	})
}

fn merge_json(target: &mut Value, patch: &Value) {
	match (target, patch) {
		(Value::Object(target), Value::Object(patch)) => {
			for (key, value) in patch {
				if value.is_null() {
					target.remove(key);
				} else {
					merge_json(target.entry(key.clone()).or_insert(Value::Null), value);
				}
			}
		}
		(target, patch) => *target = patch.clone(),
	}
}

#[async_trait]
impl ClusterClient for MockClusterClient {
	async fn get(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
	) -> Result<DynamicObject, K8sError> {
		self.record("get")?;
		let key = (resource.qualified_name(), namespace_key(resource, namespace), name.to_string());
		lock(&self.objects)
			.get(&key)
			.cloned()
			.ok_or_else(|| not_found(resource, name))
	}

	async fn list(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		opts: &ListOptions,
	) -> Result<PaginatedResult, K8sError> {
		self.record("list")?;
		let qualified = resource.qualified_name();
		if lock(&self.not_installed).contains(&qualified) {
			return Err(K8sError::ResourceNotInstalled { resource: qualified });
		}

		let scope = if opts.all_namespaces || !resource.namespaced {
			None
		} else {
			namespace.filter(|ns| !ns.is_empty())
		};

		let matching: Vec<DynamicObject> = lock(&self.objects)
			.iter()
			.filter(|((r, ns, _), _)| *r == qualified && scope.map_or(true, |s| s == ns.as_str()))
			.map(|(_, obj)| obj)
			.filter(|obj| {
				opts.field_selector
					.as_deref()
					.map_or(true, |s| field_selector_matches(s, obj))
			})
			.filter(|obj| {
				opts.label_selector
					.as_deref()
					.map_or(true, |s| label_selector_matches(s, obj))
			})
			.cloned()
			.collect();

		let offset: usize = opts
			.continue_token
			.as_deref()
			.and_then(|t| t.parse().ok())
			.unwrap_or(0);
		let limit = opts.effective_limit() as usize;
		let end = (offset + limit).min(matching.len());
		let mut items = matching.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
		resource.stamp_types(&mut items);
		let remaining = matching.len().saturating_sub(end);

		Ok(PaginatedResult {
			items,
			continue_token: (remaining > 0).then(|| end.to_string()),
			resource_version: Some("1".to_string()),
			remaining_items: (remaining > 0).then_some(remaining as i64),
		})
	}

	async fn create(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		object: &DynamicObject,
	) -> Result<DynamicObject, K8sError> {
		self.record("create")?;
		let name = object.metadata.name.clone().unwrap_or_default();
		let key = (resource.qualified_name(), namespace_key(resource, namespace), name.clone());
		let mut objects = lock(&self.objects);
		if objects.contains_key(&key) {
			return Err(K8sError::ApiError {
				code: 409,
				message: format!("{} \"{}\" already exists", resource.plural, name),
			});
		}
		let mut obj = object.clone();
		if resource.namespaced {
			obj.metadata.namespace = Some(key.1.clone());
		}
		objects.insert(key, obj.clone());
		Ok(obj)
	}

	async fn apply(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		object: &DynamicObject,
	) -> Result<DynamicObject, K8sError> {
		self.record("apply")?;
		let name = object
			.metadata
			.name
			.clone()
			.ok_or_else(|| K8sError::InvalidRequest {
				message: "object to apply has no metadata.name".to_string(),
			})?;
		let key = (resource.qualified_name(), namespace_key(resource, namespace), name);
		let mut obj = object.clone();
		if resource.namespaced {
			obj.metadata.namespace = Some(key.1.clone());
		}
		lock(&self.objects).insert(key, obj.clone());
		Ok(obj)
	}

	async fn delete(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
	) -> Result<(), K8sError> {
		self.record("delete")?;
		let key = (resource.qualified_name(), namespace_key(resource, namespace), name.to_string());
		lock(&self.objects)
			.remove(&key)
			.map(|_| ())
			.ok_or_else(|| not_found(resource, name))
	}

	async fn patch(
		&self,
		resource: &ResourceType,
		namespace: Option<&str>,
		name: &str,
		patch: &PatchRequest,
	) -> Result<DynamicObject, K8sError> {
		self.record("patch")?;
		let key = (resource.qualified_name(), namespace_key(resource, namespace), name.to_string());
		let mut objects = lock(&self.objects);
		let obj = objects.get_mut(&key).ok_or_else(|| not_found(resource, name))?;
		merge_json(&mut obj.data, &patch.body);
		Ok(obj.clone())
	}

	async fn scale(
		&self,
		resource: &ResourceType,
		namespace: &str,
		name: &str,
		replicas: i32,
	) -> Result<(), K8sError> {
		self.record("scale")?;
		let key = (resource.qualified_name(), namespace_key(resource, Some(namespace)), name.to_string());
		let mut objects = lock(&self.objects);
		let obj = objects.get_mut(&key).ok_or_else(|| not_found(resource, name))?;
		merge_json(&mut obj.data, &serde_json::json!({ "spec": { "replicas": replicas } }));
		Ok(())
	}

	async fn logs(&self, namespace: &str, pod: &str, opts: &LogOptions) -> Result<String, K8sError> {
		self.record("logs")?;
		let logs = lock(&self.logs)
			.get(&(namespace.to_string(), pod.to_string()))
			.cloned()
			.ok_or_else(|| K8sError::NotFound {
				kind: "Pod".to_string(),
				name: pod.to_string(),
			})?;
		match opts.tail_lines {
			Some(n) if n >= 0 => {
				let lines: Vec<&str> = logs.lines().collect();
				let start = lines.len().saturating_sub(n as usize);
				Ok(lines[start..].join("\n"))
			}
			_ => Ok(logs),
		}
	}

	async fn self_subject_access_review(
		&self,
		review: &AccessReview,
	) -> Result<AccessReviewStatus, K8sError> {
		self.record("self_subject_access_review")?;
		lock(&self.access_reviews).push(review.clone());
		Ok(lock(&self.access_status).clone())
	}

	async fn get_secret_data(&self, namespace: &str, name: &str) -> Result<SecretData, K8sError> {
		self.record("get_secret_data")?;
		let secrets = lock(&self.secrets);
		let data = secrets
			.get(&(namespace.to_string(), name.to_string()))
			.ok_or_else(|| K8sError::NotFound {
				kind: "Secret".to_string(),
				name: name.to_string(),
			})?;
		Ok(data
			.iter()
			.map(|(k, v)| (k.clone(), Zeroizing::new(v.clone())))
			.collect())
	}
}

/// Factory handing out preconfigured mock clusters and recording what it was
/// asked to build.
#[derive(Default)]
pub struct MockClientFactory {
	local: Arc<MockClusterClient>,
	workloads: Mutex<HashMap<String, Arc<MockClusterClient>>>,
	privileged: Mutex<Option<Arc<MockClusterClient>>>,
	delay: Mutex<Option<Duration>>,
	local_failure: Mutex<Option<K8sError>>,
	workload_failure: Mutex<Option<K8sError>>,
	local_constructions: AtomicUsize,
	workload_constructions: AtomicUsize,
	identities: Mutex<Vec<Identity>>,
	kubeconfigs: Mutex<Vec<(String, String)>>,
}

impl MockClientFactory {
	pub fn new() -> Self {
		Self::default()
	}

	/// The mock standing in for the management cluster.
	pub fn local(&self) -> Arc<MockClusterClient> {
		self.local.clone()
	}

	/// Register (or fetch) the mock behind a workload cluster.
	pub fn workload(&self, cluster: &str) -> Arc<MockClusterClient> {
		lock(&self.workloads)
			.entry(cluster.to_string())
			.or_insert_with(|| Arc::new(MockClusterClient::new()))
			.clone()
	}

	/// Provide a non-impersonating client for privileged discovery.
	pub fn set_privileged(&self, client: Arc<MockClusterClient>) {
		*lock(&self.privileged) = Some(client);
	}

	/// Delay every construction, to widen race windows in tests.
	pub fn set_delay(&self, delay: Duration) {
		*lock(&self.delay) = Some(delay);
	}

	pub fn fail_local(&self, err: Option<K8sError>) {
		*lock(&self.local_failure) = err;
	}

	pub fn fail_workload(&self, err: Option<K8sError>) {
		*lock(&self.workload_failure) = err;
	}

	pub fn local_constructions(&self) -> usize {
		self.local_constructions.load(Ordering::SeqCst)
	}

	pub fn workload_constructions(&self) -> usize {
		self.workload_constructions.load(Ordering::SeqCst)
	}

	/// Identities passed to either constructor, in order.
	pub fn identities(&self) -> Vec<Identity> {
		lock(&self.identities).clone()
	}

	/// `(cluster, kubeconfig)` pairs passed to the workload constructor.
	pub fn kubeconfigs(&self) -> Vec<(String, String)> {
		lock(&self.kubeconfigs).clone()
	}

	async fn pause(&self) {
		let delay = *lock(&self.delay);
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
	}
}

#[async_trait]
impl ClientFactory for MockClientFactory {
	async fn local_client(&self, identity: &Identity) -> K8sResult<Arc<dyn ClusterClient>> {
		self.local_constructions.fetch_add(1, Ordering::SeqCst);
		lock(&self.identities).push(identity.clone());
		self.pause().await;
		let failure = lock(&self.local_failure).clone();
		if let Some(err) = failure {
			return Err(err);
		}
		Ok(self.local.clone())
	}

	async fn workload_client(
		&self,
		cluster: &str,
		kubeconfig: &KubeconfigData,
		identity: &Identity,
	) -> K8sResult<Arc<dyn ClusterClient>> {
		self.workload_constructions.fetch_add(1, Ordering::SeqCst);
		lock(&self.identities).push(identity.clone());
		lock(&self.kubeconfigs).push((cluster.to_string(), kubeconfig.expose().to_string()));
		self.pause().await;
		let failure = lock(&self.workload_failure).clone();
		if let Some(err) = failure {
			return Err(err);
		}
		Ok(self.workload(cluster))
	}

	fn privileged_client(&self) -> Option<Arc<dyn ClusterClient>> {
		lock(&self.privileged)
			.clone()
			.map(|c| c as Arc<dyn ClusterClient>)
	}
}
