// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tests cover:
//! - TOML files overriding built-in defaults
//! - environment-style layers overriding TOML
//! - parse and read failures surfacing as typed errors
//! - validation of merged values

use std::io::Write;

use kmcp_server_config::{
	load_from_sources, ConfigError, ConfigSource, CredentialMode, DefaultsSource, EnvSource,
	Precedence, ServerConfigLayer, TomlSource,
};

fn write_config(content: &str) -> tempfile::NamedTempFile {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	file.write_all(content.as_bytes()).unwrap();
	file
}

/// Environment stand-in fed from a fixed list of variables.
struct FixedEnv(Vec<(&'static str, &'static str)>);

impl ConfigSource for FixedEnv {
	fn name(&self) -> &'static str {
		"fixed-env"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		EnvSource::load_with(|name| {
			self.0
				.iter()
				.find(|(k, _)| *k == name)
				.map(|(_, v)| v.to_string())
		})
	}
}

// ============================================================================
// Layering
// ============================================================================

#[test]
fn toml_overrides_defaults() {
	let file = write_config(
		r#"
[federation]
cache_ttl_secs = 120
credential_mode = "privileged"

[output]
max_items = 40
mask_secrets = false

[logging]
level = "kmcp=debug"
"#,
	);

	let config = load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(file.path())),
	])
	.unwrap();

	assert_eq!(config.federation.cache_ttl_secs, 120);
	assert_eq!(config.federation.cache_max_entries, 1000);
	assert_eq!(config.federation.credential_mode, CredentialMode::Privileged);
	assert_eq!(config.output.max_items, 40);
	assert!(!config.output.mask_secrets);
	assert!(config.output.slim_output);
	assert_eq!(config.logging.level, "kmcp=debug");
}

#[test]
fn environment_wins_over_toml_regardless_of_order() {
	let file = write_config("[federation]\ncache_ttl_secs = 120\nenabled = true\n");

	let config = load_from_sources(vec![
		Box::new(FixedEnv(vec![("KMCP_SERVER_FEDERATION_CACHE_TTL_SECS", "45")])),
		Box::new(TomlSource::new(file.path())),
		Box::new(DefaultsSource),
	])
	.unwrap();

	assert_eq!(config.federation.cache_ttl_secs, 45);
	assert!(config.federation.enabled);
}

#[test]
fn output_limits_from_file_are_clamped() {
	let file = write_config("[output]\nmax_items = 5000\nmax_response_bytes = 0\n");

	let config = load_from_sources(vec![Box::new(TomlSource::new(file.path()))]).unwrap();

	assert_eq!(config.output.max_items, 1000);
	assert_eq!(config.output.max_response_bytes, 512 * 1024);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn malformed_toml_is_a_parse_error() {
	let file = write_config("[federation\ncache_ttl_secs = ");

	let err = load_from_sources(vec![Box::new(TomlSource::new(file.path()))]).unwrap_err();
	assert!(matches!(err, ConfigError::TomlParse { .. }));
}

#[test]
fn directory_path_is_a_read_error() {
	let dir = tempfile::tempdir().unwrap();

	let err = load_from_sources(vec![Box::new(TomlSource::new(dir.path()))]).unwrap_err();
	assert!(matches!(err, ConfigError::FileRead { .. }));
}

#[test]
fn zero_cache_entries_fail_validation() {
	let file = write_config("[federation]\ncache_max_entries = 0\n");

	let err = load_from_sources(vec![Box::new(TomlSource::new(file.path()))]).unwrap_err();
	assert!(matches!(err, ConfigError::Validation(_)));
}
