// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization decisions over stored record attributes.
//!
//! Every check follows the same shape:
//!
//! 1. Resolve the user's grant for the permission from the policy registry
//! 2. Short-circuit unconditional and empty grants without touching storage
//! 3. Otherwise serialize the grant and match it against stored attributes
//!
//! Within one grant any clause suffices. Across several requested records
//! every record must match.

use std::collections::BTreeSet;

use attrs_core::{normalize_ids, AttrScope, Authorizable, Clause, Grant, IdSource, RecordId};
use attrs_db::{AttributeStore, DbError, ReconcileOutcome};
use tracing::{debug, instrument};

use crate::error::{AuthzError, Result};
use crate::policy::PolicyRegistry;

/// Answers authorization questions for users of type `U` against an
/// injected attribute store.
///
/// Holds no mutable state; share it behind an `Arc` across tasks.
pub struct AuthorizationEngine<S, U> {
	store: S,
	policies: PolicyRegistry<U>,
}

impl<S, U> AuthorizationEngine<S, U>
where
	S: AttributeStore,
	U: 'static,
{
	pub fn new(store: S, policies: PolicyRegistry<U>) -> Self {
		Self { store, policies }
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	pub fn policies(&self) -> &PolicyRegistry<U> {
		&self.policies
	}

	/// Whether `user` holds `permission` on every record named by `targets`.
	///
	/// `targets` may be an id, a record, or a sequence of either; duplicates
	/// collapse.
	///
	/// # Errors
	/// - `AuthzError::Core` if `targets` names no record
	/// - `AuthzError::PolicyNotFound` / `UnknownPermission` from policy lookup
	/// - `AuthzError::Store` for storage failures
	#[instrument(
		level = "debug",
		skip(self, targets, user),
		fields(record_type = R::RECORD_TYPE, permission = %permission)
	)]
	pub async fn authorized<R: Authorizable + 'static>(
		&self,
		permission: &str,
		targets: impl IdSource,
		user: &U,
	) -> Result<bool> {
		let ids = normalize_ids(targets)?;
		let grant = self.policies.grant(R::RECORD_TYPE, permission, user)?;

		let authorized = match grant.to_scope()? {
			None => false,
			Some(AttrScope::All) => true,
			Some(AttrScope::Attrs(user_attrs)) => self.matches(R::RECORD_TYPE, &ids, &user_attrs).await?,
		};

		debug!(authorized, records = ids.len(), "authorization decided");
		Ok(authorized)
	}

	async fn matches(
		&self,
		record_type: &str,
		ids: &BTreeSet<RecordId>,
		user_attrs: &BTreeSet<String>,
	) -> Result<bool> {
		let matched = match ids.first() {
			Some(id) if ids.len() == 1 => self.store.matches_any(record_type, id, user_attrs).await?,
			_ => self.store.matches_all(record_type, ids, user_attrs).await?,
		};
		Ok(matched)
	}

	/// Like [`authorized`](Self::authorized), failing with
	/// `AuthzError::Unauthorized` instead of returning `false`.
	pub async fn authorize<R: Authorizable + 'static>(
		&self,
		permission: &str,
		targets: impl IdSource,
		user: &U,
	) -> Result<()> {
		if self.authorized::<R>(permission, targets, user).await? {
			Ok(())
		} else {
			Err(AuthzError::Unauthorized {
				permission: permission.to_string(),
				record_type: R::RECORD_TYPE.to_string(),
			})
		}
	}

	/// Ids of the records of type `R` that `user` holds `permission` on,
	/// ordered by primary key.
	///
	/// # Errors
	/// - `AuthzError::Store(DbError::MissingAssociation)` if `R` has no
	///   [`record_table`](Authorizable::record_table)
	#[instrument(
		level = "debug",
		skip(self, user),
		fields(record_type = R::RECORD_TYPE, permission = %permission)
	)]
	pub async fn find_by_permission<R: Authorizable + 'static>(
		&self,
		permission: &str,
		user: &U,
	) -> Result<Vec<RecordId>> {
		let Some(table) = R::record_table() else {
			return Err(DbError::MissingAssociation {
				record_type: R::RECORD_TYPE.to_string(),
			}
			.into());
		};

		let grant = self.policies.grant(R::RECORD_TYPE, permission, user)?;
		let Some(scope) = grant.to_scope()? else {
			debug!("empty grant, nothing visible");
			return Ok(Vec::new());
		};

		Ok(self
			.store
			.find_by_permission(R::RECORD_TYPE, Some(table), &scope)
			.await?)
	}

	/// Brings the stored attributes of `record` in line with its policy.
	///
	/// Call whenever a field the policy reads changes; nothing detects such
	/// changes automatically.
	#[instrument(
		level = "debug",
		skip(self, record),
		fields(record_type = R::RECORD_TYPE, record_id = %record.record_id())
	)]
	pub async fn reconcile_for<R: Authorizable + 'static>(
		&self,
		record: &R,
	) -> Result<ReconcileOutcome> {
		let clauses = self.policies.record_attrs(record)?;
		let outcome = self
			.store
			.reconcile(R::RECORD_TYPE, &record.record_id(), &clauses)
			.await?;
		Ok(outcome)
	}

	/// Removes every stored attribute of `record`. The host calls this when it
	/// deletes the record.
	pub async fn clear_attrs_for<R: Authorizable + 'static>(&self, record: &R) -> Result<u64> {
		Ok(self.store.clear(R::RECORD_TYPE, &record.record_id()).await?)
	}

	/// The serialized clauses currently stored for `record`.
	pub async fn stored_attrs_for<R: Authorizable + 'static>(
		&self,
		record: &R,
	) -> Result<BTreeSet<String>> {
		Ok(self
			.store
			.stored_attrs(R::RECORD_TYPE, &record.record_id())
			.await?)
	}

	/// The grant `user` holds for `permission` on `R`, without touching storage.
	pub fn user_attrs<R: Authorizable + 'static>(&self, permission: &str, user: &U) -> Result<Grant> {
		self.policies.grant(R::RECORD_TYPE, permission, user)
	}

	/// The clauses the policy derives for `record`, without touching storage.
	pub fn record_attrs<R: Authorizable + 'static>(&self, record: &R) -> Result<Vec<Clause>> {
		self.policies.record_attrs(record)
	}
}
