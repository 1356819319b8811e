// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health verdicts derived from a cluster's status snapshot.

use serde::Serialize;

use crate::discovery::{ClusterPhase, ClusterSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
	Healthy,
	Unhealthy,
	Degraded,
	Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
	Healthy,
	Unhealthy,
	Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
	Pass,
	Warn,
	Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
	pub status: ComponentStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ready: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl ComponentHealth {
	fn new(status: ComponentStatus, message: impl Into<String>) -> Self {
		Self {
			status,
			ready: None,
			total: None,
			message: Some(message.into()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthComponents {
	pub control_plane: ComponentHealth,
	pub infrastructure: ComponentHealth,
	pub nodes: ComponentHealth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
	pub name: &'static str,
	pub status: CheckStatus,
	pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterHealth {
	pub name: String,
	pub status: HealthStatus,
	pub message: String,
	pub components: HealthComponents,
	pub checks: Vec<HealthCheck>,
}

/// Assess a cluster.
///
/// The overall verdict is decided in order: a deleting cluster is `UNKNOWN`,
/// a provisioning one `DEGRADED`, a ready one `HEALTHY`. Otherwise the verdict
/// counts unhealthy components among control plane and infrastructure.
///
/// A cluster that is not ready while both components report ready is
/// `UNKNOWN`. That can hide node-level problems.
pub fn assess(cluster: &ClusterSummary) -> ClusterHealth {
	let components = HealthComponents {
		control_plane: readiness(cluster.control_plane_ready, "Control plane"),
		infrastructure: readiness(cluster.infrastructure_ready, "Infrastructure"),
		nodes: nodes(cluster.node_count),
	};
	let (status, message) = overall(cluster, &components);

	ClusterHealth {
		name: cluster.name.clone(),
		status,
		message: message.to_string(),
		components,
		checks: checks(cluster),
	}
}

fn readiness(ready: bool, component: &str) -> ComponentHealth {
	if ready {
		ComponentHealth::new(ComponentStatus::Healthy, format!("{component} is ready"))
	} else {
		ComponentHealth::new(ComponentStatus::Unhealthy, format!("{component} is not ready"))
	}
}

fn nodes(count: i64) -> ComponentHealth {
	if count > 0 {
		ComponentHealth {
			status: ComponentStatus::Healthy,
			ready: Some(count),
			total: Some(count),
			message: Some(format!("{count} node(s) ready")),
		}
	} else {
		ComponentHealth::new(ComponentStatus::Unknown, "Node count unavailable")
	}
}

fn overall(cluster: &ClusterSummary, components: &HealthComponents) -> (HealthStatus, &'static str) {
	match cluster.phase() {
		Some(ClusterPhase::Deleting) => {
			return (HealthStatus::Unknown, "Cluster is being deleted");
		}
		Some(ClusterPhase::Provisioning) => {
			return (HealthStatus::Degraded, "Cluster is still provisioning");
		}
		_ => {}
	}
	if cluster.ready {
		return (HealthStatus::Healthy, "Cluster is healthy and ready");
	}

	let unhealthy = [&components.control_plane, &components.infrastructure]
		.iter()
		.filter(|c| c.status == ComponentStatus::Unhealthy)
		.count();
	match unhealthy {
		2 => (HealthStatus::Unhealthy, "Multiple components are unhealthy"),
		1 => (HealthStatus::Degraded, "One or more components are not ready"),
		_ => (HealthStatus::Unknown, "Unable to determine cluster health"),
	}
}

fn readiness_check(name: &'static str, ready: bool, component: &str) -> HealthCheck {
	if ready {
		HealthCheck {
			name,
			status: CheckStatus::Pass,
			message: format!("{component} is ready"),
		}
	} else {
		HealthCheck {
			name,
			status: CheckStatus::Fail,
			message: format!("{component} is not ready"),
		}
	}
}

fn checks(cluster: &ClusterSummary) -> Vec<HealthCheck> {
	let (phase_status, phase_message) = match cluster.phase() {
		Some(ClusterPhase::Provisioned) => (CheckStatus::Pass, "Cluster is provisioned".to_string()),
		Some(ClusterPhase::Provisioning) => {
			(CheckStatus::Warn, "Cluster is still provisioning".to_string())
		}
		Some(ClusterPhase::Deleting) => (CheckStatus::Warn, "Cluster is being deleted".to_string()),
		Some(ClusterPhase::Failed) => (CheckStatus::Fail, "Cluster is in failed state".to_string()),
		_ => (CheckStatus::Warn, format!("Cluster phase: {}", cluster.status)),
	};

	let node_check = if cluster.node_count > 0 {
		HealthCheck {
			name: "nodes",
			status: CheckStatus::Pass,
			message: format!("{} worker node(s) detected", cluster.node_count),
		}
	} else {
		HealthCheck {
			name: "nodes",
			status: CheckStatus::Warn,
			message: "No worker node information available".to_string(),
		}
	};

	vec![
		readiness_check(
			"control-plane-ready",
			cluster.control_plane_ready,
			"Control plane",
		),
		readiness_check(
			"infrastructure-ready",
			cluster.infrastructure_ready,
			"Infrastructure",
		),
		HealthCheck {
			name: "cluster-phase",
			status: phase_status,
			message: phase_message,
		},
		node_check,
	]
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::BTreeMap;

	fn summary(status: &str, ready: bool, cp: bool, infra: bool, nodes: i64) -> ClusterSummary {
		ClusterSummary {
			name: "wc".to_string(),
			namespace: "org-acme".to_string(),
			provider: "aws".to_string(),
			release: String::new(),
			kubernetes_version: String::new(),
			status: status.to_string(),
			ready,
			control_plane_ready: cp,
			infrastructure_ready: infra,
			node_count: nodes,
			created_at: None,
			labels: BTreeMap::new(),
			annotations: BTreeMap::new(),
		}
	}

	#[test]
	fn deleting_is_unknown_even_when_ready() {
		let h = assess(&summary("Deleting", true, true, true, 3));
		assert_eq!(h.status, HealthStatus::Unknown);
		assert_eq!(h.message, "Cluster is being deleted");
	}

	#[test]
	fn provisioning_is_degraded() {
		let h = assess(&summary("Provisioning", false, false, false, 0));
		assert_eq!(h.status, HealthStatus::Degraded);
	}

	#[test]
	fn ready_is_healthy() {
		let h = assess(&summary("Provisioned", true, true, true, 3));
		assert_eq!(h.status, HealthStatus::Healthy);
		assert!(h.checks.iter().all(|c| c.status == CheckStatus::Pass));
	}

	#[test]
	fn both_components_down_is_unhealthy() {
		let h = assess(&summary("Provisioned", false, false, false, 3));
		assert_eq!(h.status, HealthStatus::Unhealthy);
		assert_eq!(h.message, "Multiple components are unhealthy");
	}

	#[test]
	fn one_component_down_is_degraded() {
		let h = assess(&summary("Provisioned", false, true, false, 3));
		assert_eq!(h.status, HealthStatus::Degraded);
	}

	#[test]
	fn not_ready_with_healthy_components_stays_unknown() {
		let h = assess(&summary("Failed", false, true, true, 3));
		assert_eq!(h.status, HealthStatus::Unknown);
		assert_eq!(h.message, "Unable to determine cluster health");

		let phase = h.checks.iter().find(|c| c.name == "cluster-phase").unwrap();
		assert_eq!(phase.status, CheckStatus::Fail);
	}

	#[test]
	fn node_component_reports_counts() {
		let h = assess(&summary("Provisioned", true, true, true, 4));
		assert_eq!(h.components.nodes.ready, Some(4));
		assert_eq!(h.components.nodes.total, Some(4));

		let h = assess(&summary("Provisioned", true, true, true, 0));
		assert_eq!(h.components.nodes.status, ComponentStatus::Unknown);
		let nodes = h.checks.iter().find(|c| c.name == "nodes").unwrap();
		assert_eq!(nodes.status, CheckStatus::Warn);
	}

	#[test]
	fn unrecognized_phase_is_reported_verbatim() {
		let h = assess(&summary("Upgrading", false, true, false, 1));
		let phase = h.checks.iter().find(|c| c.name == "cluster-phase").unwrap();
		assert_eq!(phase.status, CheckStatus::Warn);
		assert_eq!(phase.message, "Cluster phase: Upgrading");
	}

	#[test]
	fn serializes_in_wire_shape() {
		let h = assess(&summary("Provisioned", true, true, true, 0));
		let json = serde_json::to_value(&h).unwrap();
		assert_eq!(json["status"], "HEALTHY");
		assert_eq!(json["components"]["controlPlane"]["status"], "healthy");
		assert!(json["components"]["nodes"].get("ready").is_none());
		assert_eq!(json["checks"][0]["name"], "control-plane-ready");
		assert_eq!(json["checks"][0]["status"], "pass");
	}
}
