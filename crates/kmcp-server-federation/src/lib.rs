// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Multi-cluster federation for impersonated cluster access.
//!
//! This crate provides:
//! - [`FederationManager`], which resolves and caches per-user, per-cluster
//!   clients and answers discovery and access questions
//! - [`ClientCache`], the single-flight, rolling-TTL cache behind it
//! - CAPI cluster discovery, filtering and name resolution
//! - Health verdicts derived from cluster status
//! - Access checks and the sanitizer for evaluation errors

mod access;
mod cache;
mod discovery;
mod error;
mod health;
mod manager;
mod selector;

pub use access::{
	display_reason, sanitize, validate_access_check, AccessCheck, AccessCheckResult, VALID_VERBS,
};
pub use cache::{
	CacheConfig, CacheKey, CacheStats, ClientCache, DEFAULT_CACHE_CLEANUP_INTERVAL,
	DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL,
};
pub use discovery::{
	filter, format_age, provider_from_kind, resolve_pattern, summary_from_object,
	ClusterListOptions, ClusterPhase, ClusterSummary, PatternResolution, ANNOTATION_DESCRIPTION,
	LABEL_ORGANIZATION, LABEL_RELEASE,
};
pub use error::{FederationError, FederationResult};
pub use health::{
	assess, CheckStatus, ClusterHealth, ComponentHealth, ComponentStatus, HealthCheck,
	HealthComponents, HealthStatus,
};
pub use manager::{
	CredentialMode, FederationManager, ManagerStats, KUBECONFIG_SECRET_KEYS,
	KUBECONFIG_SECRET_SUFFIX,
};
pub use selector::LabelSelector;
