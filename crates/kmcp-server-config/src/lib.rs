// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the kmcp server.
//!
//! Values are merged from built-in defaults, an optional TOML file and
//! `KMCP_SERVER_*` environment variables, in that order of precedence.
//!
//! # Usage
//!
//! ```ignore
//! use kmcp_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("cache ttl {}s", config.federation.cache_ttl_secs);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

use std::path::PathBuf;

pub use error::ConfigError;
pub use kmcp_server_federation::CredentialMode;
pub use kmcp_server_output::OutputConfig;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH,
};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
	pub federation: FederationConfig,
	pub output: OutputConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`KMCP_SERVER_*`)
/// 2. Config file (`/etc/kmcp/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer, filling defaults and validating.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let federation = layer.federation.unwrap_or_default().finalize();
	let output = layer.output.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	federation.validate()?;

	info!(
		federation_enabled = federation.enabled,
		credential_mode = %federation.credential_mode,
		cache_ttl_secs = federation.cache_ttl_secs,
		cache_max_entries = federation.cache_max_entries,
		max_items = output.max_items,
		max_response_bytes = output.max_response_bytes,
		"server configuration loaded"
	);

	Ok(ServerConfig {
		federation,
		output,
		logging,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_layer_resolves_to_defaults() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert_eq!(config, ServerConfig::default());
	}

	#[test]
	fn test_validation_runs_after_merge() {
		let layer = ServerConfigLayer {
			federation: Some(FederationConfigLayer {
				cache_ttl_secs: Some(0),
				..Default::default()
			}),
			..Default::default()
		};
		let err = finalize(layer).unwrap_err();
		assert!(err.to_string().contains("cache_ttl_secs"));
	}
}
