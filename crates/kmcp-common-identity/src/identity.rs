// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, ValidationError};
use crate::validation::{validate_email, validate_extra, validate_groups, MAX_EXTRA_VALUE_LENGTH};

/// Extra claim carrying the authenticated subject identifier.
pub const SUBJECT_EXTRA_KEY: &str = "sub";

/// An authenticated identity as delivered by the transport layer.
///
/// Nothing about this value has been checked yet; it must pass through
/// [`normalize`] before being used for impersonation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIdentity {
	#[serde(default)]
	pub subject_id: String,
	#[serde(default)]
	pub email: String,
	#[serde(default)]
	pub groups: Vec<String>,
	#[serde(default)]
	pub extra: BTreeMap<String, Vec<String>>,
}

impl RawIdentity {
	pub fn new(email: impl Into<String>) -> Self {
		Self {
			email: email.into(),
			..Default::default()
		}
	}

	pub fn with_groups<I, S>(mut self, groups: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.groups = groups.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
		self.subject_id = subject_id.into();
		self
	}
}

/// A validated identity, ready to be used as an impersonation principal.
///
/// Identities are immutable; the only way to obtain one is through
/// [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
	email: String,
	groups: Vec<String>,
	extra: BTreeMap<String, Vec<String>>,
}

impl Identity {
	pub fn email(&self) -> &str {
		&self.email
	}

	pub fn groups(&self) -> &[String] {
		&self.groups
	}

	pub fn extra(&self) -> &BTreeMap<String, Vec<String>> {
		&self.extra
	}

	pub fn subject_id(&self) -> Option<&str> {
		self
			.extra
			.get(SUBJECT_EXTRA_KEY)
			.and_then(|v| v.first())
			.map(String::as_str)
	}

	/// Principal used to key per-user state such as the client cache.
	pub fn principal(&self) -> &str {
		&self.email
	}
}

/// Normalize and validate a raw identity.
///
/// Surrounding whitespace is trimmed from the email and from group names,
/// duplicate groups are dropped (first occurrence wins), and a non-empty
/// subject id is recorded as the `sub` extra claim. Validation runs on the
/// normalized values.
pub fn normalize(raw: &RawIdentity) -> Result<Identity, IdentityError> {
	let email = raw.email.trim().to_string();
	validate_email(&email)?;

	let mut groups: Vec<String> = Vec::with_capacity(raw.groups.len());
	for group in &raw.groups {
		let group = group.trim().to_string();
		if !groups.contains(&group) {
			groups.push(group);
		}
	}
	// Checked against the caller's count so duplicates cannot hide an oversized list.
	if raw.groups.len() > groups.len() {
		validate_groups(&raw.groups)?;
	}
	validate_groups(&groups)?;

	let mut extra = raw.extra.clone();
	let subject = raw.subject_id.trim();
	if !subject.is_empty() {
		if subject.len() > MAX_EXTRA_VALUE_LENGTH || subject.chars().any(char::is_control) {
			return Err(IdentityError::InvalidExtraHeader(ValidationError::new(
				"subject",
				"",
				"subject id is not a valid header value",
			)));
		}
		extra.insert(SUBJECT_EXTRA_KEY.to_string(), vec![subject.to_string()]);
	}
	validate_extra(&extra)?;

	Ok(Identity {
		email,
		groups,
		extra,
	})
}
