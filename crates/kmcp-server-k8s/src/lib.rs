// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster client abstraction for impersonated, multi-cluster access.
//!
//! This crate provides:
//! - The [`ClusterClient`] capability contract with verb-specific methods
//! - [`KubeClient`], the direct implementation over the kube crate
//! - [`FederatedClient`], the same operations on a workload-cluster handle
//! - [`ClientFactory`] for building impersonating clients per identity
//! - Mock implementations for tests that must not touch a real cluster

mod client;
mod error;
mod factory;
mod federated;
mod host;
mod impersonation;
mod kube_client;
mod mock;
mod types;

pub use client::ClusterClient;
pub use error::{K8sError, K8sResult};
pub use factory::{ClientFactory, KubeClientFactory};
pub use federated::FederatedClient;
pub use host::sanitize_host;
pub use impersonation::{ImpersonationConfig, IMPERSONATION_AGENT_KEY, IMPERSONATION_AGENT_NAME};
pub use kube_client::KubeClient;
pub use mock::{MockClientFactory, MockClusterClient};
pub use types::{
	AccessReview, AccessReviewStatus, DynamicObject, KubeconfigData, ListOptions, LogOptions,
	PaginatedResult, PatchKind, PatchRequest, ResourceType, SecretData, DEFAULT_LIST_LIMIT,
	MAX_LIST_LIMIT,
};
