// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for cluster operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur during cluster operations.
///
/// Messages may carry cluster-internal detail and are meant for logs; callers
/// crossing the identity boundary translate them first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum K8sError {
	#[error("K8s API error ({code}): {message}")]
	ApiError { code: u16, message: String },

	#[error("{kind} not found: {name}")]
	NotFound { kind: String, name: String },

	#[error("forbidden: {message}")]
	Forbidden { message: String },

	#[error("resource type {resource} is not served by this cluster")]
	ResourceNotInstalled { resource: String },

	#[error("kubeconfig error: {message}")]
	Kubeconfig { message: String },

	#[error("connection error: {message}")]
	Connection { message: String },

	#[error("Operation timed out")]
	Timeout,

	#[error("invalid request: {message}")]
	InvalidRequest { message: String },
}

impl K8sError {
	/// Whether the cluster rejected the impersonated identity.
	pub fn is_forbidden(&self) -> bool {
		matches!(self, K8sError::Forbidden { .. })
	}
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		match err {
			kube::Error::Api(resp) if resp.code == 403 => K8sError::Forbidden {
				message: resp.message,
			},
			kube::Error::Api(resp) => K8sError::ApiError {
				code: resp.code,
				message: resp.message,
			},
			kube::Error::HyperError(e) => K8sError::Connection {
				message: e.to_string(),
			},
			kube::Error::Service(e) => {
				let message = e.to_string();
				if message.contains("timed out") || message.contains("elapsed") {
					K8sError::Timeout
				} else {
					K8sError::Connection { message }
				}
			}
			other => K8sError::ApiError {
				code: 0,
				message: other.to_string(),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kube::core::ErrorResponse;

	fn api_error(code: u16, message: &str) -> kube::Error {
		kube::Error::Api(ErrorResponse {
			status: "Failure".to_string(),
			message: message.to_string(),
			reason: "Test".to_string(),
			code,
		})
	}

	#[test]
	fn forbidden_api_errors_are_classified() {
		let err: K8sError = api_error(403, "users \"x\" is forbidden").into();
		assert!(err.is_forbidden());
	}

	#[test]
	fn other_api_errors_keep_code() {
		let err: K8sError = api_error(409, "conflict").into();
		assert_eq!(
			err,
			K8sError::ApiError {
				code: 409,
				message: "conflict".to_string()
			}
		);
	}
}
