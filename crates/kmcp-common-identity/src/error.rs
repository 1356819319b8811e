// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity validation error types.

use std::fmt;

use thiserror::Error;

const MAX_DISPLAYED_VALUE: usize = 20;

/// Details about a rejected identity field.
///
/// The offending value is truncated in `Display` so that a malicious or
/// oversized input never ends up verbatim in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
	pub field: String,
	pub value: String,
	pub reason: String,
}

impl ValidationError {
	pub fn new(field: impl Into<String>, value: impl AsRef<str>, reason: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			value: truncate_value(value.as_ref()),
			reason: reason.into(),
		}
	}

	/// Message that is safe to return to the calling agent.
	pub fn user_facing(&self) -> String {
		format!("invalid {} provided", self.field)
	}
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.value.is_empty() {
			write!(f, "validation failed for {}: {}", self.field, self.reason)
		} else {
			write!(
				f,
				"validation failed for {} ({:?}): {}",
				self.field, self.value, self.reason
			)
		}
	}
}

impl std::error::Error for ValidationError {}

fn truncate_value(value: &str) -> String {
	if value.chars().count() <= MAX_DISPLAYED_VALUE {
		return value.to_string();
	}
	let mut truncated: String = value.chars().take(MAX_DISPLAYED_VALUE).collect();
	truncated.push_str("...");
	truncated
}

/// Errors produced while normalizing an identity or validating a cluster name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
	#[error("email is required for impersonation")]
	MissingEmail,

	#[error("invalid email: {0}")]
	InvalidEmail(ValidationError),

	#[error("invalid group name: {0}")]
	InvalidGroupName(ValidationError),

	#[error("invalid extra header: {0}")]
	InvalidExtraHeader(ValidationError),

	#[error("invalid cluster name: {0}")]
	InvalidClusterName(ValidationError),
}

impl IdentityError {
	/// Message that is safe to return to the calling agent.
	pub fn user_facing(&self) -> String {
		match self {
			IdentityError::MissingEmail => "invalid email provided".to_string(),
			IdentityError::InvalidEmail(e)
			| IdentityError::InvalidGroupName(e)
			| IdentityError::InvalidExtraHeader(e)
			| IdentityError::InvalidClusterName(e) => e.user_facing(),
		}
	}
}
