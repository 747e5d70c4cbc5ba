// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute-based authorization.
//!
//! Each record stores a precomputed set of serialized attribute clauses.
//! Checking a permission compares the user's grant against that set, so a
//! decision never needs to join through the host's own data.
//!
//! ```ignore
//! let registry = PolicyRegistry::new().with(
//!     Policy::new(|doc: &Document| vec![Clause::new().with("group_id", doc.group_id)])
//!         .permission("read", |user: &User| {
//!             Grant::attrs(user.group_ids.iter().map(|g| Clause::new().with("group_id", *g)))
//!         }),
//! );
//! let engine = AuthorizationEngine::new(AuthorizationAttrRepository::new(pool), registry);
//!
//! engine.reconcile_for(&doc).await?;
//! let allowed = engine.authorized::<Document>("read", &doc, &user).await?;
//! ```

pub mod engine;
pub mod error;
pub mod policy;

pub use engine::AuthorizationEngine;
pub use error::{AuthzError, Result};
pub use policy::{Policy, PolicyRegistry, RecordAttrsFn, UserGrantFn};

pub use attrs_core::{
	AttrScope, Authorizable, Clause, ClauseValue, Grant, IdSource, RecordId, RecordTable,
};
pub use attrs_db::{AttributeStore, AuthorizationAttrRepository, ReconcileOutcome};
