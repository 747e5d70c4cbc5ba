// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for attribute-based authorization.
//!
//! A record's authorization attributes are a set of [`Clause`]s, each one a
//! conjunction of `name = value` facts. Clauses are canonicalized into strings
//! by [`serialize_clauses`] so that authorization checks reduce to set
//! membership:
//!
//! - [`Clause`] / [`ClauseValue`]: a single conjunction and its scalar values
//! - [`Grant`]: what a user holds for a permission (everything, a clause set, or nothing)
//! - [`AttrScope`]: a grant after serialization, as handed to storage
//! - [`RecordId`] / [`Authorizable`]: how host records identify themselves

pub mod clause;
pub mod error;
pub mod grant;
pub mod record;

pub use clause::{clauses_from_json, serialize_clauses, Clause, ClauseValue};
pub use error::{CoreError, Result};
pub use grant::{AttrScope, Grant};
pub use record::{normalize_ids, Authorizable, IdSource, RecordId, RecordTable};
