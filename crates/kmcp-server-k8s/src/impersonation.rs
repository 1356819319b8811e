// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Impersonation settings applied to outgoing API server requests.

use std::collections::BTreeMap;

use http::{HeaderName, HeaderValue};
use kmcp_common_identity::Identity;
use kube::Config;

use crate::error::{K8sError, K8sResult};

/// Extra key identifying the agent acting on the user's behalf.
pub const IMPERSONATION_AGENT_KEY: &str = "agent";

/// Value recorded under [`IMPERSONATION_AGENT_KEY`] in audit logs.
pub const IMPERSONATION_AGENT_NAME: &str = "mcp-kubernetes";

const EXTRA_HEADER_PREFIX: &str = "impersonate-extra-";

/// The user, groups and extra attributes a client impersonates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpersonationConfig {
	pub user: String,
	pub groups: Vec<String>,
	pub extra: BTreeMap<String, Vec<String>>,
}

impl ImpersonationConfig {
	/// Build the impersonation settings for a normalized identity.
	///
	/// The agent marker always overrides any caller-supplied value under the
	/// same key.
	pub fn for_identity(identity: &Identity) -> Self {
		let mut extra = identity.extra().clone();
		extra.insert(
			IMPERSONATION_AGENT_KEY.to_string(),
			vec![IMPERSONATION_AGENT_NAME.to_string()],
		);
		Self {
			user: identity.email().to_string(),
			groups: identity.groups().to_vec(),
			extra,
		}
	}

	/// Header pairs carrying the extra attributes, one per value.
	pub fn extra_headers(&self) -> K8sResult<Vec<(HeaderName, HeaderValue)>> {
		let mut headers = Vec::new();
		for (key, values) in &self.extra {
			let name = HeaderName::from_bytes(
				format!("{EXTRA_HEADER_PREFIX}{}", key.to_ascii_lowercase()).as_bytes(),
			)
			.map_err(|_| K8sError::InvalidRequest {
				message: format!("invalid impersonation extra key: {key}"),
			})?;
			for value in values {
				let value = HeaderValue::from_str(value).map_err(|_| K8sError::InvalidRequest {
					message: format!("invalid impersonation extra value for key: {key}"),
				})?;
				headers.push((name.clone(), value));
			}
		}
		Ok(headers)
	}

	/// Apply the impersonation to a client configuration.
	pub fn apply(&self, config: &mut Config) -> K8sResult<()> {
		config.auth_info.impersonate = Some(self.user.clone());
		config.auth_info.impersonate_groups = if self.groups.is_empty() {
			None
		} else {
			Some(self.groups.clone())
		};
		config
			.headers
			.retain(|(name, _)| !name.as_str().starts_with(EXTRA_HEADER_PREFIX));
		config.headers.extend(self.extra_headers()?);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kmcp_common_identity::{normalize, RawIdentity};

	fn identity() -> Identity {
		let mut raw = RawIdentity::new("jane@example.com").with_groups(["devs", "ops"]);
		raw.extra
			.insert("team".to_string(), vec!["platform".to_string()]);
		normalize(&raw).unwrap()
	}

	#[test]
	fn agent_marker_is_always_present() {
		let config = ImpersonationConfig::for_identity(&identity());
		assert_eq!(config.user, "jane@example.com");
		assert_eq!(config.groups, vec!["devs", "ops"]);
		assert_eq!(
			config.extra.get(IMPERSONATION_AGENT_KEY),
			Some(&vec![IMPERSONATION_AGENT_NAME.to_string()])
		);
		assert_eq!(config.extra.get("team"), Some(&vec!["platform".to_string()]));
	}

	#[test]
	fn caller_agent_value_is_overridden() {
		let mut raw = RawIdentity::new("jane@example.com");
		raw.extra
			.insert("agent".to_string(), vec!["something-else".to_string()]);
		let identity = normalize(&raw).unwrap();

		let config = ImpersonationConfig::for_identity(&identity);
		assert_eq!(
			config.extra.get("agent"),
			Some(&vec!["mcp-kubernetes".to_string()])
		);
	}

	#[test]
	fn extra_headers_emit_one_pair_per_value() {
		let mut config = ImpersonationConfig::for_identity(&identity());
		config
			.extra
			.insert("scopes".to_string(), vec!["a".to_string(), "b".to_string()]);

		let headers = config.extra_headers().unwrap();
		let scopes: Vec<_> = headers
			.iter()
			.filter(|(name, _)| name.as_str() == "impersonate-extra-scopes")
			.map(|(_, value)| value.to_str().unwrap().to_string())
			.collect();
		assert_eq!(scopes, vec!["a", "b"]);
		assert!(headers
			.iter()
			.any(|(name, value)| name.as_str() == "impersonate-extra-agent"
				&& value == "mcp-kubernetes"));
	}

	#[test]
	fn apply_sets_user_groups_and_replaces_extra_headers() {
		let mut kube_config = Config::new("https://cluster.example.com".parse().unwrap());
		kube_config.headers.push((
			HeaderName::from_static("impersonate-extra-stale"),
			HeaderValue::from_static("old"),
		));

		ImpersonationConfig::for_identity(&identity())
			.apply(&mut kube_config)
			.unwrap();

		assert_eq!(
			kube_config.auth_info.impersonate.as_deref(),
			Some("jane@example.com")
		);
		assert_eq!(
			kube_config.auth_info.impersonate_groups,
			Some(vec!["devs".to_string(), "ops".to_string()])
		);
		assert!(!kube_config
			.headers
			.iter()
			.any(|(name, _)| name.as_str() == "impersonate-extra-stale"));
		assert!(kube_config
			.headers
			.iter()
			.any(|(name, _)| name.as_str() == "impersonate-extra-team"));
	}

	#[test]
	fn control_characters_in_values_are_rejected() {
		let mut config = ImpersonationConfig::for_identity(&identity());
		config
			.extra
			.insert("bad".to_string(), vec!["line\nbreak".to_string()]);
		assert!(matches!(
			config.extra_headers(),
			Err(K8sError::InvalidRequest { .. })
		));
	}
}
