// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
	#[error("Invalid input: {0}")]
	InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
