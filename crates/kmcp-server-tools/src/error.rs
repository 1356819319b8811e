// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Failure returned by a tool. The display text is shown to the caller as is,
/// so every variant must already hold a caller-safe message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
	#[error("{0}")]
	InvalidArguments(String),

	#[error("{0}")]
	Rejected(String),

	#[error("failed to format output: {0}")]
	Serialization(String),
}

impl From<serde_json::Error> for ToolError {
	fn from(err: serde_json::Error) -> Self {
		ToolError::Serialization(err.to_string())
	}
}
