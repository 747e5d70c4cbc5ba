// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod database;
mod retry;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use retry::{RetryConfig, RetryConfigLayer};
