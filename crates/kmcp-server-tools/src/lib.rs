// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tools exposed to agents: a permission check and read-only views of the
//! CAPI cluster fleet.
//!
//! Tools never return internal error text. Each failure is reduced to a
//! fixed, caller-safe message before it leaves [`ToolRegistry::dispatch`].

mod can_i;
pub mod capi;
mod context;
mod error;
mod registry;

pub use can_i::CanITool;
pub use context::{RequestContext, ServerContext};
pub use error::ToolError;
pub use registry::{Tool, ToolDefinition, ToolRegistry, ToolResult};
