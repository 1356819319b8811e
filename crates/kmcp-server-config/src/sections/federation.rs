// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Multi-cluster federation section.

use std::time::Duration;

use kmcp_server_federation::{
	CacheConfig, CredentialMode, DEFAULT_CACHE_CLEANUP_INTERVAL, DEFAULT_CACHE_MAX_ENTRIES,
	DEFAULT_CACHE_TTL,
};
use serde::Deserialize;

use crate::error::ConfigError;

/// Federation configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationConfig {
	pub enabled: bool,
	pub cache_ttl_secs: u64,
	pub cache_max_entries: usize,
	pub cache_cleanup_interval_secs: u64,
	pub credential_mode: CredentialMode,
}

impl Default for FederationConfig {
	fn default() -> Self {
		FederationConfigLayer::default().finalize()
	}
}

impl FederationConfig {
	pub fn cache_config(&self) -> CacheConfig {
		CacheConfig {
			ttl: Duration::from_secs(self.cache_ttl_secs),
			max_entries: self.cache_max_entries,
			cleanup_interval: Duration::from_secs(self.cache_cleanup_interval_secs),
		}
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.cache_ttl_secs == 0 {
			return Err(ConfigError::Validation(
				"federation.cache_ttl_secs must be greater than zero".to_string(),
			));
		}
		if self.cache_max_entries == 0 {
			return Err(ConfigError::Validation(
				"federation.cache_max_entries must be greater than zero".to_string(),
			));
		}
		if self.cache_cleanup_interval_secs == 0 {
			return Err(ConfigError::Validation(
				"federation.cache_cleanup_interval_secs must be greater than zero".to_string(),
			));
		}
		Ok(())
	}
}

/// Federation configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FederationConfigLayer {
	pub enabled: Option<bool>,
	pub cache_ttl_secs: Option<u64>,
	pub cache_max_entries: Option<usize>,
	pub cache_cleanup_interval_secs: Option<u64>,
	pub credential_mode: Option<CredentialMode>,
}

impl FederationConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.cache_ttl_secs.is_some() {
			self.cache_ttl_secs = other.cache_ttl_secs;
		}
		if other.cache_max_entries.is_some() {
			self.cache_max_entries = other.cache_max_entries;
		}
		if other.cache_cleanup_interval_secs.is_some() {
			self.cache_cleanup_interval_secs = other.cache_cleanup_interval_secs;
		}
		if other.credential_mode.is_some() {
			self.credential_mode = other.credential_mode;
		}
	}

	pub fn finalize(self) -> FederationConfig {
		FederationConfig {
			enabled: self.enabled.unwrap_or(true),
			cache_ttl_secs: self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL.as_secs()),
			cache_max_entries: self.cache_max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
			cache_cleanup_interval_secs: self
				.cache_cleanup_interval_secs
				.unwrap_or(DEFAULT_CACHE_CLEANUP_INTERVAL.as_secs()),
			credential_mode: self.credential_mode.unwrap_or_default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = FederationConfig::default();
		assert!(config.enabled);
		assert_eq!(config.cache_ttl_secs, 600);
		assert_eq!(config.cache_max_entries, 1000);
		assert_eq!(config.cache_cleanup_interval_secs, 60);
		assert_eq!(config.credential_mode, CredentialMode::User);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_cache_config_conversion() {
		let config = FederationConfigLayer {
			cache_ttl_secs: Some(30),
			cache_max_entries: Some(5),
			..Default::default()
		}
		.finalize();
		let cache = config.cache_config();
		assert_eq!(cache.ttl, Duration::from_secs(30));
		assert_eq!(cache.max_entries, 5);
		assert_eq!(cache.cleanup_interval, Duration::from_secs(60));
	}

	#[test]
	fn test_zero_values_rejected() {
		for layer in [
			FederationConfigLayer {
				cache_ttl_secs: Some(0),
				..Default::default()
			},
			FederationConfigLayer {
				cache_max_entries: Some(0),
				..Default::default()
			},
			FederationConfigLayer {
				cache_cleanup_interval_secs: Some(0),
				..Default::default()
			},
		] {
			let err = layer.finalize().validate().unwrap_err();
			assert!(matches!(err, ConfigError::Validation(_)));
		}
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = FederationConfigLayer {
			enabled: Some(true),
			cache_ttl_secs: Some(600),
			..Default::default()
		};
		base.merge(FederationConfigLayer {
			enabled: Some(false),
			credential_mode: Some(CredentialMode::Privileged),
			..Default::default()
		});
		assert_eq!(base.enabled, Some(false));
		assert_eq!(base.cache_ttl_secs, Some(600));
		assert_eq!(base.credential_mode, Some(CredentialMode::Privileged));
	}

	#[test]
	fn test_deserialize_credential_mode() {
		let layer: FederationConfigLayer = toml::from_str(r#"credential_mode = "privileged""#).unwrap();
		assert_eq!(layer.credential_mode, Some(CredentialMode::Privileged));

		let err = toml::from_str::<FederationConfigLayer>(r#"credential_mode = "root""#);
		assert!(err.is_err());
	}
}
