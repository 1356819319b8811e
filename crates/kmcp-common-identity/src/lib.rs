// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity normalization for impersonated cluster access.
//!
//! Every impersonation-bearing call in the server starts here. A
//! [`RawIdentity`] arrives from the transport layer, and [`normalize`] turns
//! it into an [`Identity`] whose email, groups and extra claims are safe to
//! place in `Impersonate-*` headers and to use as cache keys.

mod anonymize;
mod error;
mod identity;
mod validation;

pub use anonymize::anonymize_email;
pub use error::{IdentityError, ValidationError};
pub use identity::{normalize, Identity, RawIdentity, SUBJECT_EXTRA_KEY};
pub use validation::{
	validate_cluster_name, validate_email, validate_extra, validate_groups, MAX_CLUSTER_NAME_LENGTH,
	MAX_EMAIL_LENGTH, MAX_EXTRA_COUNT, MAX_EXTRA_KEY_LENGTH, MAX_EXTRA_VALUE_LENGTH,
	MAX_GROUP_COUNT, MAX_GROUP_NAME_LENGTH,
};
