// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod federation;
mod logging;
mod output;

pub use federation::{FederationConfig, FederationConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use output::OutputConfigLayer;
