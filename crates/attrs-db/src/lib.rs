// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite storage for authorization attributes.
//!
//! Each authorizable record owns a set of rows in `authorization_attrs`, one
//! per serialized clause. This crate keeps those rows in sync with a record's
//! live attributes and answers membership queries against them:
//!
//! - [`AuthorizationAttrRepository`]: reconcile, match and search operations
//! - [`AttributeStore`]: the trait the authorization engine is built against
//! - [`retry`]: bounded retry for write conflicts on the uniqueness constraint

pub mod attrs;
pub mod error;
pub mod pool;
pub mod retry;
pub mod schema;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use attrs::{AttributeStore, AuthorizationAttrRepository, ReconcileOutcome};
pub use error::{DbError, Result};
pub use pool::{create_pool, create_pool_with};
pub use retry::{retry, RetryConfig, RetryableError};
pub use schema::migrate;
pub use sqlx::sqlite::SqlitePool;
