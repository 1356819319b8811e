// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-only tools over the CAPI cluster fleet.
//!
//! Every failure leaves through [`federation_error`], which collapses
//! internal detail into a small set of fixed messages.

mod cluster_health;
mod get_cluster;
mod list_clusters;
mod resolve_cluster;
mod types;

pub use cluster_health::ClusterHealthTool;
pub use get_cluster::GetClusterTool;
pub use list_clusters::{ListClustersTool, DEFAULT_MAX_RESULTS, MAX_RESULTS_LIMIT};
pub use resolve_cluster::ResolveClusterTool;
pub use types::{
	ClusterDetail, ClusterListItem, ClusterListOutput, ClusterMetadata, ClusterResolveOutput,
	ClusterStatus,
};

use kmcp_common_identity::{IdentityError, RawIdentity};
use kmcp_server_federation::{FederationError, FederationManager};

use crate::context::{RequestContext, ServerContext};
use crate::error::ToolError;

pub(crate) const ERR_NOT_AVAILABLE: &str = "this operation is not available";
pub(crate) const ERR_SERVICE_UNAVAILABLE: &str = "service temporarily unavailable";
pub(crate) const ERR_AUTH_REQUIRED: &str = "authentication required";

/// The manager and caller identity every fleet tool needs, in that order.
pub(crate) fn preconditions<'a>(
	request: &'a RequestContext,
	server: &'a ServerContext,
) -> Result<(&'a FederationManager, &'a RawIdentity), ToolError> {
	let manager = server
		.federation()
		.ok_or_else(|| ToolError::Rejected(ERR_NOT_AVAILABLE.to_string()))?;
	let identity = request
		.identity()
		.ok_or_else(|| ToolError::Rejected(ERR_AUTH_REQUIRED.to_string()))?;
	Ok((manager, identity))
}

pub(crate) fn required_string(value: Option<String>, field: &str) -> Result<String, ToolError> {
	value
		.filter(|v| !v.is_empty())
		.ok_or_else(|| ToolError::InvalidArguments(format!("{field} parameter is required")))
}

/// Map a federation failure to a caller-safe message. Anything not listed
/// here is logged and reported only as an unexpected failure of `operation`.
pub(crate) fn federation_error(err: FederationError, operation: &str) -> ToolError {
	let message = match &err {
		FederationError::ClusterNotFound { .. }
		| FederationError::Discovery { .. }
		| FederationError::AccessDenied { .. }
		| FederationError::Identity(IdentityError::InvalidClusterName(_)) => err.user_facing(),
		FederationError::UserInfoRequired | FederationError::Identity(_) => {
			ERR_AUTH_REQUIRED.to_string()
		}
		FederationError::ManagerClosed => ERR_SERVICE_UNAVAILABLE.to_string(),
		FederationError::CapiNotInstalled => ERR_NOT_AVAILABLE.to_string(),
		FederationError::InvalidSelector { .. } => "invalid label selector".to_string(),
		_ => {
			tracing::error!(operation, error = %err, "unexpected federation error");
			format!("failed to {operation}: an unexpected error occurred")
		}
	};
	ToolError::Rejected(message)
}
