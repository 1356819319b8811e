// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sha2::{Digest, Sha256};

/// Stable, non-reversible stand-in for an email address in logs.
///
/// Produces `user:` followed by the first 8 bytes of the SHA-256 digest in
/// hex, so the same user can be correlated across log lines without the
/// address itself being recorded.
pub fn anonymize_email(email: &str) -> String {
	if email.is_empty() {
		return "user:<empty>".to_string();
	}
	let digest = Sha256::digest(email.as_bytes());
	format!("user:{}", hex::encode(&digest[..8]))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn anonymized_email_is_stable_and_opaque() {
		let a = anonymize_email("jane@example.com");
		let b = anonymize_email("jane@example.com");
		assert_eq!(a, b);
		assert!(a.starts_with("user:"));
		assert_eq!(a.len(), "user:".len() + 16);
		assert!(!a.contains("jane"));
	}

	#[test]
	fn different_emails_differ() {
		assert_ne!(
			anonymize_email("jane@example.com"),
			anonymize_email("john@example.com")
		);
	}

	#[test]
	fn empty_email_has_placeholder() {
		assert_eq!(anonymize_email(""), "user:<empty>");
	}
}
