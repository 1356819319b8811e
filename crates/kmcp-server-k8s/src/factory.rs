// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kmcp_common_identity::{anonymize_email, Identity};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Config;
use tracing::{debug, instrument};

use crate::client::ClusterClient;
use crate::error::{K8sError, K8sResult};
use crate::host::sanitize_host;
use crate::impersonation::ImpersonationConfig;
use crate::kube_client::KubeClient;
use crate::types::KubeconfigData;

/// Builds cluster clients that impersonate a given identity.
#[async_trait]
pub trait ClientFactory: Send + Sync {
	/// A client for the local (management) cluster acting as `identity`.
	async fn local_client(&self, identity: &Identity) -> K8sResult<Arc<dyn ClusterClient>>;

	/// A client for a workload cluster described by `kubeconfig`, acting as
	/// `identity`.
	async fn workload_client(
		&self,
		cluster: &str,
		kubeconfig: &KubeconfigData,
		identity: &Identity,
	) -> K8sResult<Arc<dyn ClusterClient>>;

	/// The service's own, non-impersonating client, if one is configured.
	fn privileged_client(&self) -> Option<Arc<dyn ClusterClient>>;
}

/// Production factory backed by the ambient kube configuration.
pub struct KubeClientFactory {
	base: Config,
	timeout: Option<Duration>,
	privileged: Option<Arc<dyn ClusterClient>>,
}

impl KubeClientFactory {
	/// Infer the base configuration from the environment.
	///
	/// When `with_privileged` is set the factory also keeps a client that uses
	/// the service's own credentials, for kubeconfig secret discovery.
	pub async fn infer(with_privileged: bool) -> K8sResult<Self> {
		let base = Config::infer().await.map_err(|e| K8sError::Kubeconfig {
			message: e.to_string(),
		})?;
		Self::from_config(base, with_privileged)
	}

	pub fn from_config(base: Config, with_privileged: bool) -> K8sResult<Self> {
		debug!(host = %sanitize_host(&base.cluster_url.to_string()), "client factory initialized");
		let privileged = if with_privileged {
			Some(Arc::new(KubeClient::from_config(base.clone())?) as Arc<dyn ClusterClient>)
		} else {
			None
		};
		Ok(Self {
			base,
			timeout: None,
			privileged,
		})
	}

	/// Connect and read timeout applied to every client this factory builds.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	fn finish(&self, mut config: Config, identity: &Identity) -> K8sResult<Arc<dyn ClusterClient>> {
		ImpersonationConfig::for_identity(identity).apply(&mut config)?;
		if let Some(timeout) = self.timeout {
			config.connect_timeout = Some(timeout);
			config.read_timeout = Some(timeout);
		}
		Ok(Arc::new(KubeClient::from_config(config)?))
	}
}

#[async_trait]
impl ClientFactory for KubeClientFactory {
	#[instrument(skip(self, identity), fields(user_hash = %anonymize_email(identity.email())))]
	async fn local_client(&self, identity: &Identity) -> K8sResult<Arc<dyn ClusterClient>> {
		self.finish(self.base.clone(), identity)
	}

	#[instrument(skip(self, kubeconfig, identity), fields(user_hash = %anonymize_email(identity.email())))]
	async fn workload_client(
		&self,
		cluster: &str,
		kubeconfig: &KubeconfigData,
		identity: &Identity,
	) -> K8sResult<Arc<dyn ClusterClient>> {
		let parsed = Kubeconfig::from_yaml(kubeconfig.expose()).map_err(|e| K8sError::Kubeconfig {
			message: format!("failed to parse kubeconfig for cluster {cluster}: {e}"),
		})?;
		let config = Config::from_custom_kubeconfig(parsed, &KubeConfigOptions::default())
			.await
			.map_err(|e| K8sError::Kubeconfig {
				message: format!("failed to load kubeconfig for cluster {cluster}: {e}"),
			})?;
		debug!(host = %sanitize_host(&config.cluster_url.to_string()), "workload cluster config loaded");
		self.finish(config, identity)
	}

	fn privileged_client(&self) -> Option<Arc<dyn ClusterClient>> {
		self.privileged.clone()
	}
}
