// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Label selector parsing and matching.
//!
//! Supports the comma-conjunctive equality and set-based grammar:
//! `k=v`, `k==v`, `k!=v`, `k in (a,b)`, `k notin (a,b)`, `k` and `!k`.

use std::collections::BTreeMap;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FederationError;

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]{0,61}[A-Za-z0-9])?$").expect("valid regex")
});

static PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
		.expect("valid regex")
});

const MAX_PREFIX_LENGTH: usize = 253;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operator {
	Equals,
	NotEquals,
	In,
	NotIn,
	Exists,
	DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Requirement {
	key: String,
	op: Operator,
	values: Vec<String>,
}

impl Requirement {
	fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
		let value = labels.get(&self.key);
		match self.op {
			Operator::Exists => value.is_some(),
			Operator::DoesNotExist => value.is_none(),
			Operator::Equals | Operator::In => value.is_some_and(|v| self.values.contains(v)),
			Operator::NotEquals | Operator::NotIn => !value.is_some_and(|v| self.values.contains(v)),
		}
	}
}

/// A parsed label selector. The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
	requirements: Vec<Requirement>,
}

impl LabelSelector {
	pub fn parse(input: &str) -> Result<Self, FederationError> {
		let mut requirements = Vec::new();
		for term in split_terms(input)? {
			requirements.push(parse_term(&term)?);
		}
		Ok(Self { requirements })
	}

	pub fn is_empty(&self) -> bool {
		self.requirements.is_empty()
	}

	pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
		self.requirements.iter().all(|r| r.matches(labels))
	}
}

impl FromStr for LabelSelector {
	type Err = FederationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

fn invalid(message: impl Into<String>) -> FederationError {
	FederationError::InvalidSelector {
		message: message.into(),
	}
}

/// Split on commas that are not inside a value set.
fn split_terms(input: &str) -> Result<Vec<String>, FederationError> {
	let mut terms = Vec::new();
	let mut current = String::new();
	let mut depth = 0u32;

	for c in input.chars() {
		match c {
			'(' => {
				depth += 1;
				current.push(c);
			}
			')' => {
				depth = depth
					.checked_sub(1)
					.ok_or_else(|| invalid("unbalanced parenthesis"))?;
				current.push(c);
			}
			',' if depth == 0 => terms.push(std::mem::take(&mut current)),
			_ => current.push(c),
		}
	}
	if depth != 0 {
		return Err(invalid("unbalanced parenthesis"));
	}
	terms.push(current);

	let terms: Vec<String> = terms.into_iter().map(|t| t.trim().to_string()).collect();
	if terms.len() == 1 && terms[0].is_empty() {
		return Ok(Vec::new());
	}
	if terms.iter().any(String::is_empty) {
		return Err(invalid("empty requirement"));
	}
	Ok(terms)
}

fn parse_term(term: &str) -> Result<Requirement, FederationError> {
	if let Some(key) = term.strip_prefix('!') {
		return Ok(Requirement {
			key: parse_key(key.trim())?,
			op: Operator::DoesNotExist,
			values: Vec::new(),
		});
	}

	if let Some((key, value)) = term.split_once("!=") {
		return equality(key, value, Operator::NotEquals);
	}
	if let Some((key, value)) = term.split_once("==") {
		return equality(key, value, Operator::Equals);
	}
	if let Some((key, value)) = term.split_once('=') {
		return equality(key, value, Operator::Equals);
	}

	if let Some(open) = term.find('(') {
		let head = term[..open].trim();
		let (key, op) = if let Some(key) = head.strip_suffix(" notin") {
			(key, Operator::NotIn)
		} else if let Some(key) = head.strip_suffix(" in") {
			(key, Operator::In)
		} else {
			return Err(invalid(format!("unknown operator in {term:?}")));
		};
		let body = term[open + 1..]
			.strip_suffix(')')
			.ok_or_else(|| invalid("value set must end with ')'"))?;
		let values = body
			.split(',')
			.map(|v| parse_value(v.trim()))
			.collect::<Result<Vec<_>, _>>()?;
		if values.iter().all(String::is_empty) {
			return Err(invalid("value set must not be empty"));
		}
		return Ok(Requirement {
			key: parse_key(key.trim())?,
			op,
			values,
		});
	}

	Ok(Requirement {
		key: parse_key(term)?,
		op: Operator::Exists,
		values: Vec::new(),
	})
}

fn equality(key: &str, value: &str, op: Operator) -> Result<Requirement, FederationError> {
	Ok(Requirement {
		key: parse_key(key.trim())?,
		op,
		values: vec![parse_value(value.trim())?],
	})
}

fn parse_key(key: &str) -> Result<String, FederationError> {
	let name = match key.split_once('/') {
		Some((prefix, name)) => {
			if prefix.is_empty() || prefix.len() > MAX_PREFIX_LENGTH || !PREFIX_RE.is_match(prefix) {
				return Err(invalid(format!("invalid key prefix in {key:?}")));
			}
			name
		}
		None => key,
	};
	if !NAME_RE.is_match(name) {
		return Err(invalid(format!("invalid key {key:?}")));
	}
	Ok(key.to_string())
}

fn parse_value(value: &str) -> Result<String, FederationError> {
	if !value.is_empty() && !NAME_RE.is_match(value) {
		return Err(invalid(format!("invalid value {value:?}")));
	}
	Ok(value.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn empty_selector_matches_everything() {
		let sel = LabelSelector::parse("").unwrap();
		assert!(sel.is_empty());
		assert!(sel.matches(&labels(&[])));
	}

	#[test]
	fn equality_and_inequality() {
		let l = labels(&[("env", "prod"), ("tier", "web")]);
		assert!(LabelSelector::parse("env=prod").unwrap().matches(&l));
		assert!(LabelSelector::parse("env==prod").unwrap().matches(&l));
		assert!(!LabelSelector::parse("env!=prod").unwrap().matches(&l));
		assert!(LabelSelector::parse("env=prod,tier=web").unwrap().matches(&l));
		assert!(!LabelSelector::parse("env=prod,tier=db").unwrap().matches(&l));
	}

	#[test]
	fn inequality_matches_missing_key() {
		assert!(LabelSelector::parse("env!=prod")
			.unwrap()
			.matches(&labels(&[])));
	}

	#[test]
	fn set_based_requirements() {
		let l = labels(&[("env", "staging")]);
		assert!(LabelSelector::parse("env in (prod, staging)")
			.unwrap()
			.matches(&l));
		assert!(!LabelSelector::parse("env notin (prod,staging)")
			.unwrap()
			.matches(&l));
		assert!(LabelSelector::parse("env in (prod,staging),!legacy")
			.unwrap()
			.matches(&l));
	}

	#[test]
	fn existence_requirements() {
		let l = labels(&[("giantswarm.io/organization", "acme")]);
		assert!(LabelSelector::parse("giantswarm.io/organization")
			.unwrap()
			.matches(&l));
		assert!(!LabelSelector::parse("!giantswarm.io/organization")
			.unwrap()
			.matches(&l));
	}

	#[test]
	fn invalid_selectors_are_rejected() {
		for input in [
			"env=prod,",
			"env in (prod",
			"env in prod)",
			"env (prod)",
			"bad key=x",
			"env=in valid",
			"Bad_Prefix/name=x",
			"env in ()",
		] {
			assert!(
				matches!(
					LabelSelector::parse(input),
					Err(FederationError::InvalidSelector { .. })
				),
				"expected {input:?} to be rejected"
			);
		}
	}
}
