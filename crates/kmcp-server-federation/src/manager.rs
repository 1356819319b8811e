// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use kmcp_common_identity::{
	anonymize_email, normalize, validate_cluster_name, Identity, IdentityError, RawIdentity,
	ValidationError,
};
use kmcp_server_k8s::{
	ClientFactory, ClusterClient, FederatedClient, K8sError, KubeconfigData, ListOptions,
	ResourceType, MAX_LIST_LIMIT,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cache::{CacheConfig, CacheKey, CacheStats, ClientCache};
use crate::discovery::{filter, summary_from_object, ClusterListOptions, ClusterSummary};
use crate::error::{FederationError, FederationResult};

/// Suffix of the Secret holding a workload cluster's kubeconfig.
pub const KUBECONFIG_SECRET_SUFFIX: &str = "-kubeconfig";

/// Secret data keys tried in order.
pub const KUBECONFIG_SECRET_KEYS: &[&str] = &["value", "kubeconfig"];

/// Which credential reads CAPI clusters and kubeconfig secrets when resolving
/// a workload cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
	/// The caller's impersonated management-cluster client.
	#[default]
	User,
	/// The service's own client, falling back to the caller's when none is
	/// configured.
	Privileged,
}

impl fmt::Display for CredentialMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CredentialMode::User => f.write_str("user"),
			CredentialMode::Privileged => f.write_str("privileged"),
		}
	}
}

impl FromStr for CredentialMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"user" => Ok(CredentialMode::User),
			"privileged" => Ok(CredentialMode::Privileged),
			other => Err(format!("unknown credential mode {other:?}")),
		}
	}
}

/// Manager-level view of the client cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStats {
	pub cache_size: usize,
	pub hits: u64,
	pub misses: u64,
	pub evictions: u64,
	pub max_entries: usize,
	#[serde(with = "secs")]
	pub ttl: Duration,
	#[serde(with = "opt_secs")]
	pub oldest_entry: Option<Duration>,
	#[serde(with = "opt_secs")]
	pub newest_entry: Option<Duration>,
	pub closed: bool,
}

impl From<CacheStats> for ManagerStats {
	fn from(stats: CacheStats) -> Self {
		Self {
			cache_size: stats.size,
			hits: stats.hits,
			misses: stats.misses,
			evictions: stats.evictions,
			max_entries: stats.max_entries,
			ttl: stats.ttl,
			oldest_entry: stats.oldest_entry,
			newest_entry: stats.newest_entry,
			closed: stats.closed,
		}
	}
}

mod secs {
	use serde::Serializer;
	use std::time::Duration;

	pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
		s.serialize_u64(d.as_secs())
	}
}

mod opt_secs {
	use serde::Serializer;
	use std::time::Duration;

	pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
		match d {
			Some(d) => s.serialize_some(&d.as_secs()),
			None => s.serialize_none(),
		}
	}
}

/// Resolves per-user, per-cluster clients and answers discovery questions.
///
/// Every client the manager hands out impersonates the caller. Clients are
/// cached per `(cluster, principal)` and built at most once per key at a
/// time.
pub struct FederationManager {
	factory: Arc<dyn ClientFactory>,
	cache: ClientCache<Arc<dyn ClusterClient>>,
	credential_mode: CredentialMode,
}

impl fmt::Debug for FederationManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FederationManager")
			.field("credential_mode", &self.credential_mode)
			.field("closed", &self.cache.is_closed())
			.finish_non_exhaustive()
	}
}

impl FederationManager {
	pub fn new(
		factory: Arc<dyn ClientFactory>,
		cache_config: CacheConfig,
		credential_mode: CredentialMode,
	) -> Self {
		tracing::info!(
			ttl_secs = cache_config.ttl.as_secs(),
			max_entries = cache_config.max_entries,
			%credential_mode,
			"federation manager created"
		);
		Self {
			factory,
			cache: ClientCache::new(cache_config),
			credential_mode,
		}
	}

	pub fn credential_mode(&self) -> CredentialMode {
		self.credential_mode
	}

	pub fn is_closed(&self) -> bool {
		self.cache.is_closed()
	}

	/// Checks every public operation runs first, in order: the manager is
	/// open, the identity is present and valid, the cluster name is valid.
	pub(crate) fn preflight(
		&self,
		cluster: &str,
		identity: Option<&RawIdentity>,
	) -> FederationResult<Identity> {
		if self.is_closed() {
			return Err(FederationError::ManagerClosed);
		}
		let raw = identity.ok_or(FederationError::UserInfoRequired)?;
		let identity = normalize(raw)?;
		if !cluster.is_empty() {
			validate_cluster_name(cluster)?;
		}
		Ok(identity)
	}

	/// A client for `cluster` that impersonates `identity`. An empty cluster
	/// name is the management cluster.
	#[instrument(skip(self, identity), fields(cluster = %cluster))]
	pub async fn resolve(
		&self,
		cluster: &str,
		identity: Option<&RawIdentity>,
	) -> FederationResult<Arc<dyn ClusterClient>> {
		let identity = self.preflight(cluster, identity)?;
		self.client_for(cluster, &identity).await
	}

	pub(crate) async fn client_for(
		&self,
		cluster: &str,
		identity: &Identity,
	) -> FederationResult<Arc<dyn ClusterClient>> {
		let key = CacheKey::new(cluster, identity.principal());
		let factory = Arc::clone(&self.factory);
		let cluster = cluster.to_string();
		let identity = identity.clone();
		let mode = self.credential_mode;
		self.cache
			.get_or_create(key, move || build_client(factory, cluster, identity, mode))
			.await
	}

	/// Every CAPI cluster the caller can see on the management cluster.
	pub async fn list_clusters(
		&self,
		identity: Option<&RawIdentity>,
	) -> FederationResult<Vec<ClusterSummary>> {
		self.list_clusters_with_options(identity, &ClusterListOptions::default())
			.await
	}

	/// Visible clusters narrowed by `options`.
	#[instrument(skip(self, identity, options))]
	pub async fn list_clusters_with_options(
		&self,
		identity: Option<&RawIdentity>,
		options: &ClusterListOptions,
	) -> FederationResult<Vec<ClusterSummary>> {
		let identity = self.preflight("", identity)?;
		let client = self.client_for("", &identity).await?;

		let mut clusters = Vec::new();
		let mut opts = ListOptions::default().with_limit(i64::from(MAX_LIST_LIMIT));
		opts.all_namespaces = true;
		loop {
			let page = client
				.list(&ResourceType::capi_cluster(), None, &opts)
				.await
				.map_err(discovery_error)?;
			clusters.extend(page.items.iter().map(summary_from_object));
			if !page.has_more() {
				break;
			}
			opts.continue_token = page.continue_token;
		}

		let filtered = filter(&clusters, options)?;
		tracing::debug!(
			user_hash = %anonymize_email(identity.email()),
			discovered = clusters.len(),
			returned = filtered.len(),
			"listed clusters"
		);
		Ok(filtered)
	}

	/// One cluster by exact name.
	#[instrument(skip(self, identity), fields(cluster = %cluster))]
	pub async fn get_cluster_summary(
		&self,
		cluster: &str,
		identity: Option<&RawIdentity>,
	) -> FederationResult<ClusterSummary> {
		let identity = self.preflight(cluster, identity)?;
		if cluster.is_empty() {
			return Err(IdentityError::InvalidClusterName(ValidationError::new(
				"cluster name",
				cluster,
				"must not be empty",
			))
			.into());
		}
		let client = self.client_for("", &identity).await?;

		let opts = ListOptions {
			all_namespaces: true,
			..ListOptions::default().with_field_selector(format!("metadata.name={cluster}"))
		};
		let page = client
			.list(&ResourceType::capi_cluster(), None, &opts)
			.await
			.map_err(discovery_error)?;

		page.items
			.iter()
			.find(|obj| obj.metadata.name.as_deref() == Some(cluster))
			.map(summary_from_object)
			.ok_or_else(|| {
				tracing::debug!(
					user_hash = %anonymize_email(identity.email()),
					"cluster not found"
				);
				FederationError::ClusterNotFound {
					cluster: cluster.to_string(),
					reason: "no CAPI Cluster resource found with this name".to_string(),
				}
			})
	}

	/// Drop the cached client for one `(cluster, identity)` pair.
	pub async fn invalidate(&self, cluster: &str, identity: &RawIdentity) -> bool {
		self.cache
			.invalidate(&CacheKey::new(cluster, identity.email.trim()))
			.await
	}

	/// Drop every cached client for `cluster`.
	pub async fn invalidate_cluster(&self, cluster: &str) -> usize {
		self.cache.invalidate_cluster(cluster).await
	}

	pub async fn stats(&self) -> ManagerStats {
		self.cache.stats().await.into()
	}

	/// Release every cached client. Later calls fail with
	/// [`FederationError::ManagerClosed`]. Idempotent.
	pub async fn close(&self) {
		if self.is_closed() {
			return;
		}
		tracing::info!("closing federation manager");
		self.cache.close().await;
	}
}

fn discovery_error(err: K8sError) -> FederationError {
	match err {
		K8sError::ResourceNotInstalled { .. } => FederationError::CapiNotInstalled,
		other => FederationError::Discovery {
			message: other.to_string(),
		},
	}
}

/// Translate a client construction failure for `cluster`.
fn construction_error(cluster: &str, user_hash: &str, err: K8sError) -> FederationError {
	let cluster = cluster.to_string();
	match err {
		K8sError::Forbidden { message } => FederationError::Impersonation {
			cluster,
			user_hash: user_hash.to_string(),
			message,
		},
		K8sError::Kubeconfig { message } => FederationError::Kubeconfig { cluster, message },
		other => FederationError::Connection {
			cluster,
			message: other.to_string(),
		},
	}
}

async fn build_client(
	factory: Arc<dyn ClientFactory>,
	cluster: String,
	identity: Identity,
	mode: CredentialMode,
) -> FederationResult<Arc<dyn ClusterClient>> {
	let user_hash = anonymize_email(identity.email());

	if cluster.is_empty() {
		let client = factory
			.local_client(&identity)
			.await
			.map_err(|e| construction_error("", &user_hash, e))?;
		tracing::debug!(%user_hash, "created local cluster client");
		return Ok(client);
	}

	let discovery = match (mode, factory.privileged_client()) {
		(CredentialMode::Privileged, Some(client)) => client,
		_ => factory
			.local_client(&identity)
			.await
			.map_err(|e| construction_error("", &user_hash, e))?,
	};

	let namespace = find_cluster_namespace(discovery.as_ref(), &cluster, &user_hash).await?;
	let kubeconfig = read_kubeconfig(discovery.as_ref(), &cluster, &namespace, &user_hash).await?;

	let client = factory
		.workload_client(&cluster, &kubeconfig, &identity)
		.await
		.map_err(|e| construction_error(&cluster, &user_hash, e))?;
	tracing::debug!(%cluster, %namespace, %user_hash, "created workload cluster client");
	Ok(Arc::new(FederatedClient::new(cluster, client)))
}

async fn find_cluster_namespace(
	client: &dyn ClusterClient,
	cluster: &str,
	user_hash: &str,
) -> FederationResult<String> {
	let opts = ListOptions {
		all_namespaces: true,
		..ListOptions::default().with_field_selector(format!("metadata.name={cluster}"))
	};
	let page = client
		.list(&ResourceType::capi_cluster(), None, &opts)
		.await
		.map_err(|err| match err {
			K8sError::ResourceNotInstalled { .. } => FederationError::CapiNotInstalled,
			other => {
				tracing::debug!(%cluster, %user_hash, error = %other, "failed to list CAPI clusters");
				FederationError::ClusterNotFound {
					cluster: cluster.to_string(),
					reason: format!("failed to query CAPI clusters: {other}"),
				}
			}
		})?;

	page.items
		.iter()
		.find(|obj| obj.metadata.name.as_deref() == Some(cluster))
		.map(|obj| obj.metadata.namespace.clone().unwrap_or_default())
		.ok_or_else(|| FederationError::ClusterNotFound {
			cluster: cluster.to_string(),
			reason: "no CAPI Cluster resource found with this name".to_string(),
		})
}

async fn read_kubeconfig(
	client: &dyn ClusterClient,
	cluster: &str,
	namespace: &str,
	user_hash: &str,
) -> FederationResult<KubeconfigData> {
	let secret_name = format!("{cluster}{KUBECONFIG_SECRET_SUFFIX}");
	let data = client
		.get_secret_data(namespace, &secret_name)
		.await
		.map_err(|err| {
			tracing::debug!(%cluster, %namespace, %user_hash, error = %err, "failed to fetch kubeconfig secret");
			match err {
				K8sError::Forbidden { message } => FederationError::Impersonation {
					cluster: cluster.to_string(),
					user_hash: user_hash.to_string(),
					message,
				},
				other => FederationError::Kubeconfig {
					cluster: cluster.to_string(),
					message: format!("failed to fetch secret {secret_name}: {other}"),
				},
			}
		})?;

	let bytes = KUBECONFIG_SECRET_KEYS
		.iter()
		.find_map(|key| data.get(*key).filter(|v| !v.is_empty()))
		.ok_or_else(|| FederationError::Kubeconfig {
			cluster: cluster.to_string(),
			message: format!("secret {secret_name} has no kubeconfig data"),
		})?;

	KubeconfigData::from_bytes(bytes).ok_or_else(|| FederationError::Kubeconfig {
		cluster: cluster.to_string(),
		message: format!("secret {secret_name} holds non-UTF-8 kubeconfig data"),
	})
}
