// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access checks evaluated by the target cluster as the impersonated user.

use kmcp_common_identity::{anonymize_email, RawIdentity};
use kmcp_server_k8s::{AccessReview, AccessReviewStatus};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{FederationError, FederationResult};
use crate::manager::FederationManager;

/// Verbs the API server understands. `*` is the wildcard.
pub const VALID_VERBS: &[&str] = &[
	"get",
	"list",
	"watch",
	"create",
	"update",
	"patch",
	"delete",
	"deletecollection",
	"impersonate",
	"bind",
	"escalate",
	"*",
];

/// A question of the form "may I <verb> <resource>".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheck {
	pub verb: String,
	pub resource: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub api_group: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub namespace: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub subresource: String,
}

impl AccessCheck {
	pub fn new(verb: impl Into<String>, resource: impl Into<String>) -> Self {
		Self {
			verb: verb.into(),
			resource: resource.into(),
			..Default::default()
		}
	}

	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();
		self
	}

	pub fn with_api_group(mut self, group: impl Into<String>) -> Self {
		self.api_group = group.into();
		self
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	/// `group/resource[/name]`, or `resource[/name]` for the core group.
	pub fn target(&self) -> String {
		let mut target = if self.api_group.is_empty() {
			self.resource.clone()
		} else {
			format!("{}/{}", self.api_group, self.resource)
		};
		if !self.name.is_empty() {
			target.push('/');
			target.push_str(&self.name);
		}
		target
	}

	fn to_review(&self) -> AccessReview {
		AccessReview {
			verb: self.verb.clone(),
			resource: self.resource.clone(),
			group: self.api_group.clone(),
			namespace: self.namespace.clone(),
			name: self.name.clone(),
			subresource: self.subresource.clone(),
		}
	}
}

/// Outcome of an access check.
///
/// `reason` is safe to display. `evaluation_error` is raw cluster text and
/// must pass through [`sanitize`] before anyone sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessCheckResult {
	pub allowed: bool,
	pub denied: bool,
	pub reason: String,
	pub evaluation_error: String,
}

impl From<AccessReviewStatus> for AccessCheckResult {
	fn from(status: AccessReviewStatus) -> Self {
		Self {
			allowed: status.allowed,
			denied: status.denied,
			reason: status.reason,
			evaluation_error: status.evaluation_error,
		}
	}
}

impl AccessCheckResult {
	/// Reason text with any evaluation error appended in sanitized form.
	pub fn display_reason(&self) -> String {
		display_reason(&self.reason, &self.evaluation_error)
	}
}

pub fn validate_access_check(check: &AccessCheck) -> FederationResult<()> {
	let invalid = |message: String| Err(FederationError::InvalidAccessCheck { message });

	if check.verb.is_empty() {
		return invalid("verb is required".to_string());
	}
	if check.resource.is_empty() {
		return invalid("resource is required".to_string());
	}
	if !VALID_VERBS.contains(&check.verb.as_str()) {
		return invalid(format!("unknown verb {:?}", check.verb));
	}
	Ok(())
}

/// Ordered classifier table. The first row with a matching keyword wins.
const SANITIZE_RULES: &[(&[&str], &str)] = &[
	(
		&["unable to find", "not found", "no matches for kind"],
		"resource type not recognized",
	),
	(&["webhook", "admission controller"], "policy evaluation failed"),
	(&["timeout", "deadline exceeded"], "permission check timed out"),
	(&["internal error", "server error"], "internal evaluation error"),
];

const SANITIZE_FALLBACK: &str = "unable to evaluate permissions";

/// Reduce a raw evaluation error to a fixed message.
///
/// The output is always one of a handful of constant strings. Nothing from
/// the input is echoed.
pub fn sanitize(raw: &str) -> String {
	if raw.is_empty() {
		return String::new();
	}
	let lower = raw.to_lowercase();
	SANITIZE_RULES
		.iter()
		.find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
		.map(|(_, message)| *message)
		.unwrap_or(SANITIZE_FALLBACK)
		.to_string()
}

pub fn display_reason(reason: &str, evaluation_error: &str) -> String {
	if evaluation_error.is_empty() {
		return reason.to_string();
	}
	let sanitized = sanitize(evaluation_error);
	if reason.is_empty() {
		format!("evaluation error: {sanitized}")
	} else {
		format!("{reason} (evaluation error: {sanitized})")
	}
}

impl FederationManager {
	/// Ask `cluster` whether `identity` may perform `check`.
	///
	/// The review runs through the same impersonating client the operation
	/// itself would use, so it reflects the caller's real permissions.
	#[instrument(skip(self, identity, check), fields(cluster = %cluster, verb = %check.verb, resource = %check.resource))]
	pub async fn check_access(
		&self,
		cluster: &str,
		identity: Option<&RawIdentity>,
		check: &AccessCheck,
	) -> FederationResult<AccessCheckResult> {
		let identity = self.preflight(cluster, identity)?;
		validate_access_check(check)?;
		let user_hash = anonymize_email(identity.email());

		let client = self
			.client_for(cluster, &identity)
			.await
			.map_err(|err| {
				tracing::debug!(%user_hash, error = %err, "access check could not resolve a client");
				FederationError::AccessCheckFailed {
					cluster: cluster.to_string(),
					message: format!("failed to get cluster client: {err}"),
				}
			})?;

		let status = client
			.self_subject_access_review(&check.to_review())
			.await
			.map_err(|err| {
				tracing::debug!(%user_hash, error = %err, "access review call failed");
				FederationError::AccessCheckFailed {
					cluster: cluster.to_string(),
					message: format!("SelfSubjectAccessReview API call failed: {err}"),
				}
			})?;

		let result = AccessCheckResult::from(status);
		tracing::debug!(
			%user_hash,
			allowed = result.allowed,
			denied = result.denied,
			"access check completed"
		);
		Ok(result)
	}

	/// Like [`check_access`](Self::check_access), but a negative answer is an
	/// [`FederationError::AccessDenied`].
	pub async fn check_access_allowed(
		&self,
		cluster: &str,
		identity: Option<&RawIdentity>,
		check: &AccessCheck,
	) -> FederationResult<()> {
		let result = self.check_access(cluster, identity, check).await?;
		if result.allowed {
			return Ok(());
		}
		Err(FederationError::AccessDenied {
			cluster: cluster.to_string(),
			verb: check.verb.clone(),
			target: check.target(),
			namespace: check.namespace.clone(),
			reason: result.reason,
		})
	}
}
