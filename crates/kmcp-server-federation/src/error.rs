// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use kmcp_common_identity::IdentityError;
use kmcp_server_k8s::K8sError;
use thiserror::Error;

/// Result type alias for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;

/// Single message for every cluster lookup or connection failure, so callers
/// cannot tell a missing cluster from one they are not allowed to see.
const CLUSTER_UNAVAILABLE: &str = "cluster access denied or unavailable";

/// Errors raised while resolving clients, discovering clusters or checking
/// access.
///
/// `Display` carries internal detail for logs. Anything shown to a caller goes
/// through [`FederationError::user_facing`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FederationError {
	// Lifecycle
	#[error("federation manager is closed")]
	ManagerClosed,

	// Identity
	#[error("user info is required for federated operations")]
	UserInfoRequired,

	#[error(transparent)]
	Identity(#[from] IdentityError),

	// Cluster resolution
	#[error("cluster {cluster:?} not found: {reason}")]
	ClusterNotFound { cluster: String, reason: String },

	#[error("CAPI cluster resources are not installed on the management cluster")]
	CapiNotInstalled,

	#[error("cluster discovery failed: {message}")]
	Discovery { message: String },

	#[error("kubeconfig error for cluster {cluster:?}: {message}")]
	Kubeconfig { cluster: String, message: String },

	#[error("connection to cluster {cluster:?} failed: {message}")]
	Connection { cluster: String, message: String },

	#[error("impersonation failed for cluster {cluster:?} (user {user_hash}): {message}")]
	Impersonation {
		cluster: String,
		user_hash: String,
		message: String,
	},

	// Access checks
	#[error("invalid access check: {message}")]
	InvalidAccessCheck { message: String },

	#[error("access check failed for cluster {cluster:?}: {message}")]
	AccessCheckFailed { cluster: String, message: String },

	#[error("access denied: cannot {verb} {target} on cluster {cluster:?}: {reason}")]
	AccessDenied {
		cluster: String,
		verb: String,
		target: String,
		namespace: String,
		reason: String,
	},

	// Filtering
	#[error("invalid label selector: {message}")]
	InvalidSelector { message: String },

	#[error("invalid pattern: {message}")]
	InvalidPattern { message: String },

	// Operations on a resolved client
	#[error(transparent)]
	Cluster(#[from] K8sError),
}

impl FederationError {
	/// Message safe to show to the caller.
	pub fn user_facing(&self) -> String {
		match self {
			FederationError::ManagerClosed => "federation manager is unavailable".to_string(),
			FederationError::UserInfoRequired => {
				"authentication required for multi-cluster operations".to_string()
			}
			FederationError::Identity(err) => err.user_facing(),
			FederationError::ClusterNotFound { .. }
			| FederationError::Kubeconfig { .. }
			| FederationError::Connection { .. } => CLUSTER_UNAVAILABLE.to_string(),
			FederationError::CapiNotInstalled => {
				"this management cluster does not have CAPI installed".to_string()
			}
			FederationError::Discovery { .. } => "cluster discovery failed".to_string(),
			FederationError::Impersonation { .. } => "insufficient permissions to access this cluster - please contact your administrator to verify your RBAC configuration".to_string(),
			FederationError::InvalidAccessCheck { message } => {
				format!("invalid access check: {message}")
			}
			FederationError::AccessCheckFailed { .. } => {
				"unable to verify permissions - please try again or contact your administrator"
					.to_string()
			}
			FederationError::AccessDenied {
				verb,
				target,
				namespace,
				..
			} => {
				let location = if namespace.is_empty() {
					String::new()
				} else {
					format!(" in namespace {namespace:?}")
				};
				format!(
					"permission denied: you cannot {verb} {target}{location} - please contact your administrator to request access"
				)
			}
			FederationError::InvalidSelector { .. } => "invalid label selector".to_string(),
			FederationError::InvalidPattern { .. } => "invalid cluster name pattern provided".to_string(),
			FederationError::Cluster(K8sError::Forbidden { .. }) => {
				"permission denied".to_string()
			}
			FederationError::Cluster(K8sError::NotFound { .. }) => "resource not found".to_string(),
			FederationError::Cluster(_) => "cluster operation failed".to_string(),
		}
	}

	/// Whether the failure describes the caller's own malformed request.
	///
	/// These are safe to show verbatim and will not go away on retry.
	pub fn is_validation_error(&self) -> bool {
		matches!(
			self,
			FederationError::InvalidAccessCheck { .. }
				| FederationError::UserInfoRequired
				| FederationError::Identity(_)
				| FederationError::InvalidSelector { .. }
				| FederationError::InvalidPattern { .. }
		)
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, FederationError::ClusterNotFound { .. })
	}
}
