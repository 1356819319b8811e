// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request and response types shared by all cluster client implementations.

use std::collections::BTreeMap;

use kube::api::{ApiResource, ListParams, TypeMeta};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub use kube::api::DynamicObject;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// Largest page size ever sent to a cluster.
pub const MAX_LIST_LIMIT: u32 = 500;

/// Addressing information for a resource collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceType {
	pub group: String,
	pub version: String,
	pub kind: String,
	pub plural: String,
	pub namespaced: bool,
}

impl ResourceType {
	pub fn new(
		group: impl Into<String>,
		version: impl Into<String>,
		kind: impl Into<String>,
		plural: impl Into<String>,
		namespaced: bool,
	) -> Self {
		Self {
			group: group.into(),
			version: version.into(),
			kind: kind.into(),
			plural: plural.into(),
			namespaced,
		}
	}

	/// Cluster API `Cluster` resources on the management cluster.
	pub fn capi_cluster() -> Self {
		Self::new("cluster.x-k8s.io", "v1beta2", "Cluster", "clusters", true)
	}

	pub fn pod() -> Self {
		Self::new("", "v1", "Pod", "pods", true)
	}

	pub fn secret() -> Self {
		Self::new("", "v1", "Secret", "secrets", true)
	}

	pub fn api_version(&self) -> String {
		if self.group.is_empty() {
			self.version.clone()
		} else {
			format!("{}/{}", self.group, self.version)
		}
	}

	/// `plural.group`, or just `plural` for the core group.
	pub fn qualified_name(&self) -> String {
		if self.group.is_empty() {
			self.plural.clone()
		} else {
			format!("{}.{}", self.plural, self.group)
		}
	}

	pub fn type_meta(&self) -> TypeMeta {
		TypeMeta {
			api_version: self.api_version(),
			kind: self.kind.clone(),
		}
	}

	/// Fill in `apiVersion`/`kind` on objects that lack them. List responses
	/// omit both on their items, and output masking keys off `kind`.
	pub fn stamp_types(&self, items: &mut [DynamicObject]) {
		for item in items.iter_mut().filter(|item| item.types.is_none()) {
			item.types = Some(self.type_meta());
		}
	}

	pub fn api_resource(&self) -> ApiResource {
		ApiResource {
			group: self.group.clone(),
			version: self.version.clone(),
			api_version: self.api_version(),
			kind: self.kind.clone(),
			plural: self.plural.clone(),
		}
	}
}

/// Options for a list call.
///
/// `continue_token` is opaque and must be passed back exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
	pub label_selector: Option<String>,
	pub field_selector: Option<String>,
	pub all_namespaces: bool,
	pub limit: Option<i64>,
	pub continue_token: Option<String>,
}

impl ListOptions {
	pub fn with_field_selector(mut self, selector: impl Into<String>) -> Self {
		self.field_selector = Some(selector.into());
		self
	}

	pub fn with_label_selector(mut self, selector: impl Into<String>) -> Self {
		self.label_selector = Some(selector.into());
		self
	}

	pub fn with_limit(mut self, limit: i64) -> Self {
		self.limit = Some(limit);
		self
	}

	/// Page size actually sent to the API server.
	///
	/// Missing or non-positive limits fall back to [`DEFAULT_LIST_LIMIT`];
	/// anything above [`MAX_LIST_LIMIT`] is capped.
	pub fn effective_limit(&self) -> u32 {
		match self.limit {
			Some(n) if n > 0 => n.min(i64::from(MAX_LIST_LIMIT)) as u32,
			_ => DEFAULT_LIST_LIMIT,
		}
	}

	pub fn to_list_params(&self) -> ListParams {
		ListParams {
			label_selector: self.label_selector.clone().filter(|s| !s.is_empty()),
			field_selector: self.field_selector.clone().filter(|s| !s.is_empty()),
			limit: Some(self.effective_limit()),
			continue_token: self.continue_token.clone().filter(|s| !s.is_empty()),
			..Default::default()
		}
	}
}

/// One page of a list call together with its pagination bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct PaginatedResult {
	pub items: Vec<DynamicObject>,
	pub continue_token: Option<String>,
	pub resource_version: Option<String>,
	pub remaining_items: Option<i64>,
}

impl PaginatedResult {
	/// Total number of items across all pages, when the server reported it.
	pub fn total_items(&self) -> Option<usize> {
		match (self.remaining_items, self.continue_token.as_deref()) {
			(Some(remaining), _) if remaining >= 0 => Some(self.items.len() + remaining as usize),
			(_, None) | (_, Some("")) => Some(self.items.len()),
			_ => None,
		}
	}

	pub fn has_more(&self) -> bool {
		self.continue_token.as_deref().is_some_and(|t| !t.is_empty())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
	Merge,
	Strategic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
	pub kind: PatchKind,
	pub body: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
	pub container: Option<String>,
	pub tail_lines: Option<i64>,
	pub previous: bool,
	pub timestamps: bool,
}

/// A single permission question, evaluated by the cluster for the
/// impersonated identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessReview {
	pub verb: String,
	pub resource: String,
	pub group: String,
	pub namespace: String,
	pub name: String,
	pub subresource: String,
}

/// Verdict returned by a SelfSubjectAccessReview.
///
/// `evaluation_error` is raw cluster text and must be sanitized before it is
/// shown to anyone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessReviewStatus {
	pub allowed: bool,
	pub denied: bool,
	pub reason: String,
	pub evaluation_error: String,
}

impl AccessReviewStatus {
	pub fn allowed(reason: impl Into<String>) -> Self {
		Self {
			allowed: true,
			reason: reason.into(),
			..Default::default()
		}
	}

	pub fn denied(reason: impl Into<String>) -> Self {
		Self {
			denied: true,
			reason: reason.into(),
			..Default::default()
		}
	}
}

/// Secret payload keyed by data key. Values are wiped on drop.
pub type SecretData = BTreeMap<String, Zeroizing<Vec<u8>>>;

/// Raw kubeconfig document for a workload cluster. Wiped on drop.
#[derive(Clone)]
pub struct KubeconfigData(Zeroizing<String>);

impl KubeconfigData {
	pub fn new(contents: String) -> Self {
		Self(Zeroizing::new(contents))
	}

	pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
		std::str::from_utf8(bytes).ok().map(|s| Self::new(s.to_string()))
	}

	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Debug for KubeconfigData {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("KubeconfigData").field(&"[REDACTED]").finish()
	}
}
