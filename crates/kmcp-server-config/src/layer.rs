// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{FederationConfigLayer, LoggingConfigLayer, OutputConfigLayer};

/// Partial configuration as produced by a single source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfigLayer {
	pub federation: Option<FederationConfigLayer>,
	pub output: Option<OutputConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(b), Some(o)) => merge(b, o),
		(None, Some(o)) => *base = Some(o),
		(_, None) => {}
	}
}

impl ServerConfigLayer {
	/// Overlay `other` on top of `self`; fields set in `other` win.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.federation, other.federation, FederationConfigLayer::merge);
		merge_section(&mut self.output, other.output, OutputConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_keeps_unset_sections() {
		let mut base = ServerConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: Some("debug".to_string()),
				json: None,
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: None,
				json: Some(true),
			}),
			..Default::default()
		});

		let logging = base.logging.unwrap();
		assert_eq!(logging.level.as_deref(), Some("debug"));
		assert_eq!(logging.json, Some(true));
		assert!(base.federation.is_none());
	}

	#[test]
	fn test_deserialize_nested_sections() {
		let layer: ServerConfigLayer = toml::from_str(
			r#"
[federation]
cache_ttl_secs = 120

[output]
max_items = 50
"#,
		)
		.unwrap();
		assert_eq!(layer.federation.unwrap().cache_ttl_secs, Some(120));
		assert_eq!(layer.output.unwrap().max_items, Some(50));
		assert!(layer.logging.is_none());
	}
}
