// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use attrs_core::CoreError;
use attrs_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
	#[error(
		"no policy found for {record_type}: register one with `PolicyRegistry::register::<{record_type}>`"
	)]
	PolicyNotFound { record_type: String },

	#[error("policy for {record_type} was registered for a different Rust type")]
	PolicyTypeMismatch { record_type: String },

	#[error("policy for {record_type} defines no permission named {permission:?}")]
	UnknownPermission {
		record_type: String,
		permission: String,
	},

	#[error("not authorized to {permission} {record_type}")]
	Unauthorized {
		permission: String,
		record_type: String,
	},

	#[error(transparent)]
	Core(#[from] CoreError),

	#[error(transparent)]
	Store(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, AuthzError>;
