// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::{json, Map, Value};

/// Placeholder written over masked values.
pub const REDACTED: &str = "***REDACTED***";

const SENSITIVE_ANNOTATIONS: &[&str] = &[
	"kubernetes.io/service-account.uid",
	"kubernetes.io/service-account.name",
	"kubernetes.io/service-account-token",
];

const SENSITIVE_NAME_PATTERNS: &[&str] = &[
	"credentials",
	"password",
	"secret",
	"auth",
	"token",
	"kubeconfig",
];

fn kind(obj: &Value) -> &str {
	obj.get("kind").and_then(Value::as_str).unwrap_or_default()
}

/// A Secret by `kind`, or a kind-less item shaped like one: a string
/// `type` next to a `data` or `stringData` map. List items come back
/// from the API server without `kind`.
pub fn is_secret_resource(obj: &Value) -> bool {
	match obj.get("kind").and_then(Value::as_str) {
		Some(kind) if !kind.is_empty() => kind.eq_ignore_ascii_case("Secret"),
		_ => {
			obj.get("type").is_some_and(Value::is_string)
				&& ["data", "stringData"]
					.iter()
					.any(|field| obj.get(*field).is_some_and(Value::is_object))
		}
	}
}

/// Copy of `obj` with Secret payloads replaced by [`REDACTED`]. Keys stay
/// visible; anything that is not a Secret is returned unchanged.
pub fn mask_secrets(obj: &Value) -> Value {
	let mut out = obj.clone();
	if !is_secret_resource(&out) {
		return out;
	}
	if let Some(secret) = out.as_object_mut() {
		for field in ["data", "stringData"] {
			if let Some(Value::Object(values)) = secret.get_mut(field) {
				for value in values.values_mut() {
					*value = Value::String(REDACTED.to_string());
				}
			}
		}
		if let Some(Value::Object(annotations)) = secret
			.get_mut("metadata")
			.and_then(|m| m.get_mut("annotations"))
		{
			for (key, value) in annotations.iter_mut() {
				if SENSITIVE_ANNOTATIONS.contains(&key.as_str()) {
					*value = Value::String(REDACTED.to_string());
				}
			}
		}
	}
	out
}

/// Metadata-only view of a Secret: name, namespace, labels, type and the
/// number of data keys.
pub fn mask_secret_summary(secret: &Value) -> Value {
	let mut summary = Map::new();
	for field in ["kind", "apiVersion", "type"] {
		if let Some(value) = secret.get(field).filter(|v| v.is_string()) {
			summary.insert(field.to_string(), value.clone());
		}
	}

	if let Some(metadata) = secret.get("metadata").and_then(Value::as_object) {
		let mut meta = Map::new();
		for field in ["name", "namespace", "creationTimestamp"] {
			if let Some(value) = metadata.get(field).filter(|v| v.is_string()) {
				meta.insert(field.to_string(), value.clone());
			}
		}
		if let Some(labels) = metadata.get("labels").filter(|v| v.is_object()) {
			meta.insert("labels".to_string(), labels.clone());
		}
		summary.insert("metadata".to_string(), Value::Object(meta));
	}

	if let Some(data) = secret.get("data").and_then(Value::as_object) {
		summary.insert("dataKeys".to_string(), json!(data.len()));
	}
	summary.insert("_dataRedacted".to_string(), Value::Bool(true));
	Value::Object(summary)
}

/// Whether `obj` is likely to carry credentials: every Secret and
/// ServiceAccount, and ConfigMaps with credential-like names.
pub fn contains_sensitive_data(obj: &Value) -> bool {
	match kind(obj).to_lowercase().as_str() {
		"secret" | "serviceaccount" => true,
		"configmap" => obj
			.pointer("/metadata/name")
			.and_then(Value::as_str)
			.map(|name| {
				let name = name.to_lowercase();
				SENSITIVE_NAME_PATTERNS.iter().any(|p| name.contains(p))
			})
			.unwrap_or(false),
		_ => false,
	}
}
