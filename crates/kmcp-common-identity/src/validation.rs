// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Field-level validation for values that end up in `Impersonate-*` headers
//! or in cluster lookups.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{IdentityError, ValidationError};

/// RFC 5321 path limit.
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_GROUP_NAME_LENGTH: usize = 256;
pub const MAX_GROUP_COUNT: usize = 100;
pub const MAX_EXTRA_KEY_LENGTH: usize = 256;
pub const MAX_EXTRA_VALUE_LENGTH: usize = 1024;
pub const MAX_EXTRA_COUNT: usize = 50;
/// DNS-1123 subdomain limit.
pub const MAX_CLUSTER_NAME_LENGTH: usize = 253;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex")
});

static EXTRA_KEY_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex")
});

static CLUSTER_NAME_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex")
});

fn has_control_chars(value: &str) -> bool {
	value.chars().any(char::is_control)
}

/// Validate an impersonation principal.
pub fn validate_email(email: &str) -> Result<(), IdentityError> {
	if email.is_empty() {
		return Err(IdentityError::MissingEmail);
	}
	if email.len() > MAX_EMAIL_LENGTH {
		return Err(IdentityError::InvalidEmail(ValidationError::new(
			"email",
			email,
			format!("exceeds maximum length of {MAX_EMAIL_LENGTH}"),
		)));
	}
	if has_control_chars(email) {
		return Err(IdentityError::InvalidEmail(ValidationError::new(
			"email",
			"",
			"contains control characters",
		)));
	}
	if !EMAIL_RE.is_match(email) {
		return Err(IdentityError::InvalidEmail(ValidationError::new(
			"email",
			email,
			"invalid email format",
		)));
	}
	Ok(())
}

/// Validate impersonation group claims.
pub fn validate_groups(groups: &[String]) -> Result<(), IdentityError> {
	if groups.len() > MAX_GROUP_COUNT {
		return Err(IdentityError::InvalidGroupName(ValidationError::new(
			"group",
			"",
			format!("too many groups: {} exceeds maximum of {MAX_GROUP_COUNT}", groups.len()),
		)));
	}

	for group in groups {
		if group.is_empty() {
			return Err(IdentityError::InvalidGroupName(ValidationError::new(
				"group",
				"",
				"group name cannot be empty",
			)));
		}
		if group.len() > MAX_GROUP_NAME_LENGTH {
			return Err(IdentityError::InvalidGroupName(ValidationError::new(
				"group",
				group,
				format!("exceeds maximum length of {MAX_GROUP_NAME_LENGTH}"),
			)));
		}
		if has_control_chars(group) {
			return Err(IdentityError::InvalidGroupName(ValidationError::new(
				"group",
				"",
				"contains control characters",
			)));
		}
	}
	Ok(())
}

/// Validate extra impersonation claims (`Impersonate-Extra-<key>`).
pub fn validate_extra(extra: &BTreeMap<String, Vec<String>>) -> Result<(), IdentityError> {
	if extra.len() > MAX_EXTRA_COUNT {
		return Err(IdentityError::InvalidExtraHeader(ValidationError::new(
			"extra",
			"",
			format!("too many extra headers: {} exceeds maximum of {MAX_EXTRA_COUNT}", extra.len()),
		)));
	}

	for (key, values) in extra {
		if key.is_empty() || key.len() > MAX_EXTRA_KEY_LENGTH {
			return Err(IdentityError::InvalidExtraHeader(ValidationError::new(
				"extra key",
				key,
				format!("key length must be between 1 and {MAX_EXTRA_KEY_LENGTH}"),
			)));
		}
		if !EXTRA_KEY_RE.is_match(key) {
			return Err(IdentityError::InvalidExtraHeader(ValidationError::new(
				"extra key",
				key,
				"key must contain only alphanumerics, '-' or '_'",
			)));
		}
		for value in values {
			if value.len() > MAX_EXTRA_VALUE_LENGTH {
				return Err(IdentityError::InvalidExtraHeader(ValidationError::new(
					"extra value",
					value,
					format!("exceeds maximum length of {MAX_EXTRA_VALUE_LENGTH}"),
				)));
			}
			if has_control_chars(value) {
				return Err(IdentityError::InvalidExtraHeader(ValidationError::new(
					"extra value",
					"",
					"contains control characters",
				)));
			}
		}
	}
	Ok(())
}

/// Validate a workload cluster name before it is used in any lookup.
///
/// Cluster names double as Secret name prefixes, so path separators and
/// traversal sequences are rejected even though the DNS-1123 pattern would
/// already exclude most of them.
pub fn validate_cluster_name(name: &str) -> Result<(), IdentityError> {
	let invalid = |reason: String| {
		Err(IdentityError::InvalidClusterName(ValidationError::new(
			"cluster name",
			name,
			reason,
		)))
	};

	if name.is_empty() {
		return invalid("cluster name cannot be empty".to_string());
	}
	if name.len() > MAX_CLUSTER_NAME_LENGTH {
		return invalid(format!("exceeds maximum length of {MAX_CLUSTER_NAME_LENGTH}"));
	}
	if name.contains("..") || name.contains('/') || name.contains('\\') {
		return invalid("contains path traversal characters".to_string());
	}
	if !CLUSTER_NAME_RE.is_match(name) {
		return invalid("must be a lowercase DNS-1123 label".to_string());
	}
	Ok(())
}
