// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use kmcp_server_federation::CredentialMode;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{FederationConfigLayer, LoggingConfigLayer, OutputConfigLayer};

/// Default location of the server config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/kmcp/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: KMCP_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl EnvSource {
	/// Build a layer from an arbitrary variable lookup. Empty values count
	/// as unset.
	pub fn load_with<F>(lookup: F) -> Result<ServerConfigLayer, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let env = Env { lookup };
		Ok(ServerConfigLayer {
			federation: Some(env.federation()?),
			output: Some(env.output()?),
			logging: Some(env.logging()?),
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Self::load_with(|name| std::env::var(name).ok())
	}
}

struct Env<F> {
	lookup: F,
}

impl<F> Env<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parse<T: FromStr>(&self, name: &str, type_name: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {type_name} value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn list(&self, name: &str) -> Option<Vec<String>> {
		self.var(name).map(|s| {
			s.split(',')
				.map(|s| s.trim().to_string())
				.filter(|s| !s.is_empty())
				.collect()
		})
	}

	fn federation(&self) -> Result<FederationConfigLayer, ConfigError> {
		let credential_mode = match self.var("KMCP_SERVER_FEDERATION_CREDENTIAL_MODE") {
			Some(v) => Some(CredentialMode::from_str(&v).map_err(|message| {
				ConfigError::InvalidValue {
					key: "KMCP_SERVER_FEDERATION_CREDENTIAL_MODE".to_string(),
					message,
				}
			})?),
			None => None,
		};

		Ok(FederationConfigLayer {
			enabled: self.bool("KMCP_SERVER_FEDERATION_ENABLED"),
			cache_ttl_secs: self.parse("KMCP_SERVER_FEDERATION_CACHE_TTL_SECS", "u64")?,
			cache_max_entries: self.parse("KMCP_SERVER_FEDERATION_CACHE_MAX_ENTRIES", "usize")?,
			cache_cleanup_interval_secs: self
				.parse("KMCP_SERVER_FEDERATION_CACHE_CLEANUP_INTERVAL_SECS", "u64")?,
			credential_mode,
		})
	}

	fn output(&self) -> Result<OutputConfigLayer, ConfigError> {
		Ok(OutputConfigLayer {
			max_items: self.parse("KMCP_SERVER_OUTPUT_MAX_ITEMS", "i64")?,
			max_clusters: self.parse("KMCP_SERVER_OUTPUT_MAX_CLUSTERS", "i64")?,
			max_response_bytes: self.parse("KMCP_SERVER_OUTPUT_MAX_RESPONSE_BYTES", "i64")?,
			slim_output: self.bool("KMCP_SERVER_OUTPUT_SLIM_OUTPUT"),
			mask_secrets: self.bool("KMCP_SERVER_OUTPUT_MASK_SECRETS"),
			summary_threshold: self.parse("KMCP_SERVER_OUTPUT_SUMMARY_THRESHOLD", "i64")?,
			excluded_fields: self.list("KMCP_SERVER_OUTPUT_EXCLUDED_FIELDS"),
		})
	}

	fn logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		Ok(LoggingConfigLayer {
			level: self.var("KMCP_SERVER_LOGGING_LEVEL"),
			json: self.bool("KMCP_SERVER_LOGGING_JSON"),
		})
	}
}
