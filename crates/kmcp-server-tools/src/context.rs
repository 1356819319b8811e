// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use kmcp_common_identity::RawIdentity;
use kmcp_server_federation::FederationManager;
use kmcp_server_output::{OutputConfig, Processor};
use tokio_util::sync::CancellationToken;

/// Per-call state handed over by the transport.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
	identity: Option<RawIdentity>,
	cancel: CancellationToken,
}

impl RequestContext {
	pub fn new(identity: Option<RawIdentity>) -> Self {
		Self {
			identity,
			cancel: CancellationToken::new(),
		}
	}

	pub fn anonymous() -> Self {
		Self::new(None)
	}

	pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;
		self
	}

	pub fn identity(&self) -> Option<&RawIdentity> {
		self.identity.as_ref()
	}

	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancel
	}
}

/// Process-wide state shared by every tool call.
#[derive(Debug, Clone)]
pub struct ServerContext {
	federation: Option<Arc<FederationManager>>,
	processor: Processor,
}

impl ServerContext {
	pub fn new(federation: Option<Arc<FederationManager>>, output: OutputConfig) -> Self {
		Self {
			federation,
			processor: Processor::new(output),
		}
	}

	/// `None` when the server runs without multi-cluster support.
	pub fn federation(&self) -> Option<&FederationManager> {
		self.federation.as_deref()
	}

	pub fn output(&self) -> &OutputConfig {
		self.processor.config()
	}

	pub fn processor(&self) -> &Processor {
		&self.processor
	}
}
