// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Response shaping for cluster results.
//!
//! Results leaving the process pass through a [`Processor`], which masks
//! secret material, removes verbose fields, and bounds both the item count
//! and the encoded size. Large result sets can be replaced by a
//! [`ResourceSummary`] of aggregate counts.

mod config;
mod error;
mod processor;
mod secrets;
mod slim;
mod summary;
mod truncation;

pub use config::{
	default_excluded_fields, OutputConfig, ABSOLUTE_MAX_CLUSTERS, ABSOLUTE_MAX_ITEMS,
	ABSOLUTE_MAX_RESPONSE_BYTES, DEFAULT_MAX_CLUSTERS, DEFAULT_MAX_ITEMS,
	DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_SUMMARY_THRESHOLD,
};
pub use error::{OutputError, OutputResult};
pub use processor::{
	format_result_with_metadata, to_json_values, ProcessingMetadata, ProcessingResult, Processor,
};
pub use secrets::{
	contains_sensitive_data, is_secret_resource, mask_secret_summary, mask_secrets, REDACTED,
};
pub use slim::slim_resource;
pub use summary::{
	extract_status, should_use_summary, summarize, top_counts, CountEntry, ResourceSummary,
	SummaryOptions,
};
pub use truncation::{
	effective_cluster_limit, effective_limit, truncate, truncate_clusters, TruncationWarning,
};
