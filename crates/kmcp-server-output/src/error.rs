// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type OutputResult<T> = Result<T, OutputError>;

#[derive(Error, Debug)]
pub enum OutputError {
	#[error("failed to encode resource: {0}")]
	Encode(#[from] serde_json::Error),
}
