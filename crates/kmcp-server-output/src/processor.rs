// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::instrument;

use crate::config::OutputConfig;
use crate::error::OutputResult;
use crate::secrets::{is_secret_resource, mask_secrets};
use crate::slim::slim_resource;
use crate::summary::{should_use_summary, summarize, ResourceSummary, SummaryOptions};
use crate::truncation::{effective_limit, truncate, TruncationWarning};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMetadata {
	pub processed_at: DateTime<Utc>,
	pub original_count: usize,
	pub final_count: usize,
	pub truncated: bool,
	pub slim_applied: bool,
	pub secrets_masked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
	pub items: Vec<Value>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub warnings: Vec<TruncationWarning>,
	pub metadata: ProcessingMetadata,
}

/// Applies an [`OutputConfig`] to resources on their way out.
///
/// Each item is masked before it is slimmed, so a secret that loses fields
/// in slimming is still never emitted in the clear.
#[derive(Debug, Clone)]
pub struct Processor {
	config: OutputConfig,
}

impl Default for Processor {
	fn default() -> Self {
		Self::new(OutputConfig::default())
	}
}

impl Processor {
	pub fn new(config: OutputConfig) -> Self {
		Self {
			config: config.validated(),
		}
	}

	pub fn config(&self) -> &OutputConfig {
		&self.config
	}

	pub fn process(&self, items: Vec<Value>) -> ProcessingResult {
		self.process_with_limit(items, 0)
	}

	/// Process `items`, keeping at most the tighter of `limit` and the
	/// configured maximum, then dropping trailing items until the encoded
	/// response fits the byte budget.
	#[instrument(skip(self, items), fields(count = items.len()))]
	pub fn process_with_limit(&self, items: Vec<Value>, limit: i64) -> ProcessingResult {
		let original_count = items.len();
		let mut secrets_masked = false;

		let shaped: Vec<Value> = items
			.into_iter()
			.map(|item| {
				let item = if self.config.mask_secrets && is_secret_resource(&item) {
					secrets_masked = true;
					mask_secrets(&item)
				} else {
					item
				};
				if self.config.slim_output {
					slim_resource(&item, &self.config.excluded_fields)
				} else {
					item
				}
			})
			.collect();

		let limit = effective_limit(limit, self.config.max_items);
		let (mut kept, warning) = truncate(shaped, limit);
		let mut warnings: Vec<TruncationWarning> = warning.into_iter().collect();

		if let Some(warning) = self.fit_to_budget(&mut kept, original_count) {
			warnings.push(warning);
		}

		let final_count = kept.len();
		if final_count < original_count {
			tracing::debug!(original_count, final_count, "output truncated");
		}

		ProcessingResult {
			items: kept,
			warnings,
			metadata: ProcessingMetadata {
				processed_at: Utc::now(),
				original_count,
				final_count,
				truncated: final_count < original_count,
				slim_applied: self.config.slim_output,
				secrets_masked,
			},
		}
	}

	fn fit_to_budget(&self, items: &mut Vec<Value>, total: usize) -> Option<TruncationWarning> {
		let budget = self.config.max_response_bytes as usize;
		// Two bytes for the brackets, one separator per element after the first.
		let sizes: Vec<usize> = items.iter().map(encoded_len).collect();
		let mut used = 2 + sizes.iter().sum::<usize>() + sizes.len().saturating_sub(1);
		if used <= budget {
			return None;
		}

		let before = items.len();
		while used > budget && !items.is_empty() {
			let idx = items.len() - 1;
			items.pop();
			used -= sizes[idx] + usize::from(idx > 0);
		}
		tracing::warn!(
			budget,
			before,
			after = items.len(),
			"response exceeded byte budget"
		);

		Some(TruncationWarning {
			shown: items.len(),
			total,
			message: format!(
				"Response size limit of {budget} bytes reached. Showing {} of {total} items. Use filters or summary mode to reduce the response.",
				items.len()
			),
			suggest_summary: true,
			suggest_filters: Vec::new(),
		})
	}

	/// Shape a single resource. Single gets are never truncated.
	pub fn process_single(&self, item: &Value) -> Value {
		let item = if self.config.mask_secrets {
			mask_secrets(item)
		} else {
			item.clone()
		};
		if self.config.slim_output {
			slim_resource(&item, &self.config.excluded_fields)
		} else {
			item
		}
	}

	pub fn summarize(&self, items: &[Value], opts: &SummaryOptions) -> ResourceSummary {
		summarize(items, opts)
	}

	pub fn should_suggest_summary(&self, count: usize) -> bool {
		should_use_summary(count, self.config.summary_threshold)
	}
}

/// Encode typed values so they can pass through a [`Processor`].
pub fn to_json_values<T: Serialize>(items: &[T]) -> OutputResult<Vec<Value>> {
	items
		.iter()
		.map(|item| serde_json::to_value(item).map_err(Into::into))
		.collect()
}

fn encoded_len(value: &Value) -> usize {
	serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0)
}

/// Wrap processed items with the underscore-prefixed bookkeeping fields
/// callers use to detect partial results.
pub fn format_result_with_metadata(
	items: Vec<Value>,
	metadata: &ProcessingMetadata,
	warnings: &[TruncationWarning],
) -> Value {
	let mut out = json!({ "items": items });
	if metadata.truncated {
		out["_truncated"] = Value::Bool(true);
		out["_originalCount"] = json!(metadata.original_count);
		out["_returnedCount"] = json!(metadata.final_count);
	}
	if !warnings.is_empty() {
		out["_warnings"] = warnings.iter().map(|w| Value::String(w.message.clone())).collect();
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn configmap(i: usize) -> Value {
		json!({
			"kind": "ConfigMap",
			"metadata": {
				"name": format!("cm-{i}"),
				"namespace": "default",
				"uid": "abc",
				"managedFields": [{ "manager": "kubectl" }]
			},
			"data": { "key": "value" }
		})
	}

	fn secret() -> Value {
		json!({
			"kind": "Secret",
			"metadata": { "name": "db", "namespace": "default" },
			"data": { "password": "aHVudGVyMg==" }
		})
	}

	#[test]
	fn masks_then_slims() {
		let result = Processor::default().process(vec![secret(), configmap(0)]);

		assert!(result.metadata.secrets_masked);
		assert!(result.metadata.slim_applied);
		assert!(!result.metadata.truncated);
		assert_eq!(result.items[0]["data"]["password"], crate::REDACTED);
		assert!(result.items[1]["metadata"].get("managedFields").is_none());
		assert!(result.items[1]["metadata"].get("uid").is_none());
	}

	#[test]
	fn masks_secrets_listed_without_kind() {
		let listed = json!({
			"metadata": { "name": "db-creds" },
			"type": "Opaque",
			"data": { "password": "aHVudGVyMg==" }
		});
		let result = Processor::default().process(vec![listed]);

		assert!(result.metadata.secrets_masked);
		assert_eq!(result.items[0]["data"]["password"], crate::REDACTED);
	}

	#[test]
	fn masking_can_be_disabled() {
		let processor = Processor::new(OutputConfig {
			mask_secrets: false,
			slim_output: false,
			..OutputConfig::default()
		});
		let result = processor.process(vec![secret()]);
		assert_eq!(result.items[0]["data"]["password"], "aHVudGVyMg==");
		assert!(!result.metadata.secrets_masked);
	}

	#[test]
	fn request_limit_tightens_config() {
		let items: Vec<Value> = (0..50).map(configmap).collect();
		let result = Processor::default().process_with_limit(items, 10);

		assert_eq!(result.items.len(), 10);
		assert_eq!(result.metadata.original_count, 50);
		assert!(result.metadata.truncated);
		assert_eq!(result.warnings.len(), 1);
	}

	#[test]
	fn byte_budget_drops_trailing_items() {
		let processor = Processor::new(OutputConfig {
			max_response_bytes: 1024,
			..OutputConfig::default()
		});
		let items: Vec<Value> = (0..50).map(configmap).collect();
		let result = processor.process(items);

		let encoded = serde_json::to_vec(&result.items).unwrap();
		assert!(encoded.len() <= 1024);
		assert!(!result.items.is_empty());
		assert!(result.warnings.iter().any(|w| w.suggest_summary));
		assert_eq!(result.items[0]["metadata"]["name"], "cm-0");
	}

	#[test]
	fn single_item_is_shaped_without_truncation() {
		let out = Processor::default().process_single(&secret());
		assert_eq!(out["data"]["password"], crate::REDACTED);
	}

	#[test]
	fn metadata_fields_only_when_truncated() {
		let processor = Processor::default();
		let small = processor.process(vec![configmap(0)]);
		let out = format_result_with_metadata(small.items, &small.metadata, &small.warnings);
		assert!(out.get("_truncated").is_none());

		let big = processor.process((0..150).map(configmap).collect());
		let out = format_result_with_metadata(big.items, &big.metadata, &big.warnings);
		assert_eq!(out["_truncated"], true);
		assert_eq!(out["_originalCount"], 150);
		assert_eq!(out["_returnedCount"], 100);
		assert_eq!(out["_warnings"].as_array().unwrap().len(), 1);
	}

	#[test]
	fn summary_suggestion_follows_threshold() {
		let processor = Processor::default();
		assert!(!processor.should_suggest_summary(100));
		assert!(processor.should_suggest_summary(501));
	}

	#[test]
	fn typed_values_encode() {
		#[derive(Serialize)]
		struct Row {
			name: &'static str,
		}
		let values = to_json_values(&[Row { name: "a" }]).unwrap();
		assert_eq!(values[0]["name"], "a");
	}
}
