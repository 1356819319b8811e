// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::Value;

/// Copy of `obj` with every path in `excluded` removed.
///
/// Paths are dotted. Keys that themselves contain dots, such as annotation
/// names, are matched by trying the joined remainder of the path as one key
/// before descending.
pub fn slim_resource(obj: &Value, excluded: &[String]) -> Value {
	let mut out = obj.clone();
	for path in excluded.iter().filter(|p| !p.is_empty()) {
		let parts: Vec<&str> = path.split('.').collect();
		remove_path(&mut out, &parts);
	}
	out
}

fn remove_path(value: &mut Value, parts: &[&str]) {
	let Some(map) = value.as_object_mut() else {
		return;
	};
	let Some((head, rest)) = parts.split_first() else {
		return;
	};

	if !rest.is_empty() && map.remove(&parts.join(".")).is_some() {
		return;
	}

	if let Some(field) = head.strip_suffix("[*]") {
		if rest.is_empty() {
			return;
		}
		if let Some(Value::Array(items)) = map.get_mut(field) {
			for item in items {
				remove_path(item, rest);
			}
		}
		return;
	}

	if rest.is_empty() {
		map.remove(*head);
	} else if let Some(next) = map.get_mut(*head) {
		remove_path(next, rest);
	}
}
