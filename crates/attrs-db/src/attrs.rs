// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization attribute repository.
//!
//! Rows in `authorization_attrs` hold one serialized clause each, keyed by the
//! owning record's `(authorizable_type, authorizable_id)`. A record's stored
//! set only changes through [`AuthorizationAttrRepository::reconcile`]; the
//! read paths never lock and only see committed state.

use async_trait::async_trait;
use attrs_core::{serialize_clauses, AttrScope, Clause, RecordId, RecordTable};
use sqlx::sqlite::SqlitePool;
use std::collections::BTreeSet;

use crate::error::DbError;
use crate::retry::{retry, RetryConfig};

/// Rows written by one reconcile call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
	pub added: usize,
	pub removed: usize,
}

impl ReconcileOutcome {
	pub fn is_unchanged(&self) -> bool {
		self.added == 0 && self.removed == 0
	}
}

#[async_trait]
pub trait AttributeStore: Send + Sync {
	async fn reconcile(
		&self,
		record_type: &str,
		record_id: &RecordId,
		clauses: &[Clause],
	) -> Result<ReconcileOutcome, DbError>;
	async fn stored_attrs(
		&self,
		record_type: &str,
		record_id: &RecordId,
	) -> Result<BTreeSet<String>, DbError>;
	async fn matches_any(
		&self,
		record_type: &str,
		record_id: &RecordId,
		user_attrs: &BTreeSet<String>,
	) -> Result<bool, DbError>;
	async fn matches_all(
		&self,
		record_type: &str,
		record_ids: &BTreeSet<RecordId>,
		user_attrs: &BTreeSet<String>,
	) -> Result<bool, DbError>;
	async fn find_by_permission(
		&self,
		record_type: &str,
		table: Option<RecordTable>,
		scope: &AttrScope,
	) -> Result<Vec<RecordId>, DbError>;
	async fn clear(&self, record_type: &str, record_id: &RecordId) -> Result<u64, DbError>;
}

#[async_trait]
impl AttributeStore for AuthorizationAttrRepository {
	async fn reconcile(
		&self,
		record_type: &str,
		record_id: &RecordId,
		clauses: &[Clause],
	) -> Result<ReconcileOutcome, DbError> {
		self.reconcile(record_type, record_id, clauses).await
	}

	async fn stored_attrs(
		&self,
		record_type: &str,
		record_id: &RecordId,
	) -> Result<BTreeSet<String>, DbError> {
		self.stored_attrs(record_type, record_id).await
	}

	async fn matches_any(
		&self,
		record_type: &str,
		record_id: &RecordId,
		user_attrs: &BTreeSet<String>,
	) -> Result<bool, DbError> {
		self.matches_any(record_type, record_id, user_attrs).await
	}

	async fn matches_all(
		&self,
		record_type: &str,
		record_ids: &BTreeSet<RecordId>,
		user_attrs: &BTreeSet<String>,
	) -> Result<bool, DbError> {
		self.matches_all(record_type, record_ids, user_attrs).await
	}

	async fn find_by_permission(
		&self,
		record_type: &str,
		table: Option<RecordTable>,
		scope: &AttrScope,
	) -> Result<Vec<RecordId>, DbError> {
		self.find_by_permission(record_type, table, scope).await
	}

	async fn clear(&self, record_type: &str, record_id: &RecordId) -> Result<u64, DbError> {
		self.clear(record_type, record_id).await
	}
}

/// Repository for the `authorization_attrs` table.
#[derive(Clone)]
pub struct AuthorizationAttrRepository {
	pool: SqlitePool,
	retry: RetryConfig,
}

impl AuthorizationAttrRepository {
	/// Create a new repository with the given pool and the default retry policy.
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			retry: RetryConfig::default(),
		}
	}

	pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
		self.retry = retry;
		self
	}

	/// Current serialized clauses stored for a record.
	#[tracing::instrument(skip(self), fields(record_type = %record_type, record_id = %record_id))]
	pub async fn stored_attrs(
		&self,
		record_type: &str,
		record_id: &RecordId,
	) -> Result<BTreeSet<String>, DbError> {
		let names: Vec<String> = sqlx::query_scalar(
			r#"
			SELECT name
			FROM authorization_attrs
			WHERE authorizable_type = ? AND authorizable_id = ?
			"#,
		)
		.bind(record_type)
		.bind(record_id.as_str())
		.fetch_all(&self.pool)
		.await?;

		Ok(names.into_iter().collect())
	}

	/// Brings a record's stored clauses in line with `clauses`.
	///
	/// Only the difference is written: stale clauses are deleted and missing
	/// ones inserted, in one transaction. When nothing differs no write is
	/// issued. A conflicting concurrent reconcile of the same record is
	/// retried as a whole, re-reading the committed state each time.
	///
	/// # Errors
	/// - `DbError::Core` if a clause is empty
	/// - `DbError::Conflict` if conflicts persist past the retry budget
	#[tracing::instrument(skip(self, clauses), fields(record_type = %record_type, record_id = %record_id))]
	pub async fn reconcile(
		&self,
		record_type: &str,
		record_id: &RecordId,
		clauses: &[Clause],
	) -> Result<ReconcileOutcome, DbError> {
		let new_attrs: BTreeSet<String> = serialize_clauses(clauses)?.into_iter().collect();

		let outcome = retry(&self.retry, || {
			self.reconcile_once(record_type, record_id, &new_attrs)
		})
		.await?;

		if outcome.is_unchanged() {
			tracing::debug!("authorization attrs unchanged");
		} else {
			tracing::debug!(
				added = outcome.added,
				removed = outcome.removed,
				"authorization attrs reconciled"
			);
		}
		Ok(outcome)
	}

	async fn reconcile_once(
		&self,
		record_type: &str,
		record_id: &RecordId,
		new_attrs: &BTreeSet<String>,
	) -> Result<ReconcileOutcome, DbError> {
		let mut tx = self.pool.begin().await.map_err(DbError::from_write)?;

		let current: BTreeSet<String> = sqlx::query_scalar::<_, String>(
			r#"
			SELECT name
			FROM authorization_attrs
			WHERE authorizable_type = ? AND authorizable_id = ?
			"#,
		)
		.bind(record_type)
		.bind(record_id.as_str())
		.fetch_all(&mut *tx)
		.await
		.map_err(DbError::from_write)?
		.into_iter()
		.collect();

		let to_remove: Vec<&String> = current.difference(new_attrs).collect();
		let to_add: Vec<&String> = new_attrs.difference(&current).collect();

		if to_remove.is_empty() && to_add.is_empty() {
			return Ok(ReconcileOutcome::default());
		}

		if !to_remove.is_empty() {
			let sql = format!(
				"DELETE FROM authorization_attrs \
				 WHERE authorizable_type = ? AND authorizable_id = ? AND name IN ({})",
				placeholders(to_remove.len())
			);
			let mut query = sqlx::query(&sql)
				.bind(record_type)
				.bind(record_id.as_str());
			for name in &to_remove {
				query = query.bind(name.as_str());
			}

			query
				.execute(&mut *tx)
				.await
				.map_err(DbError::from_write)?;
		}

		for name in &to_add {
			sqlx::query(
				r#"
				INSERT INTO authorization_attrs (name, authorizable_type, authorizable_id)
				VALUES (?, ?, ?)
				"#,
			)
			.bind(name.as_str())
			.bind(record_type)
			.bind(record_id.as_str())
			.execute(&mut *tx)
			.await
			.map_err(DbError::from_write)?;
		}

		tx.commit().await.map_err(DbError::from_write)?;

		Ok(ReconcileOutcome {
			added: to_add.len(),
			removed: to_remove.len(),
		})
	}

	/// True iff the record has at least one stored clause in `user_attrs`.
	#[tracing::instrument(skip(self, user_attrs), fields(record_type = %record_type, record_id = %record_id, user_attrs = user_attrs.len()))]
	pub async fn matches_any(
		&self,
		record_type: &str,
		record_id: &RecordId,
		user_attrs: &BTreeSet<String>,
	) -> Result<bool, DbError> {
		if user_attrs.is_empty() {
			return Ok(false);
		}

		let sql = format!(
			"SELECT EXISTS (SELECT 1 FROM authorization_attrs \
			 WHERE authorizable_type = ? AND authorizable_id = ? AND name IN ({}))",
			placeholders(user_attrs.len())
		);
		let mut query = sqlx::query_scalar::<_, i64>(&sql)
			.bind(record_type)
			.bind(record_id.as_str());
		for attr in user_attrs {
			query = query.bind(attr.as_str());
		}

		let matched = query.fetch_one(&self.pool).await?;

		Ok(matched != 0)
	}

	/// True iff every id in `record_ids` has at least one stored clause in
	/// `user_attrs`.
	///
	/// Counts the distinct matching ids in one query; a record with no stored
	/// attributes, or none in `user_attrs`, leaves the count short.
	#[tracing::instrument(skip(self, record_ids, user_attrs), fields(record_type = %record_type, records = record_ids.len(), user_attrs = user_attrs.len()))]
	pub async fn matches_all(
		&self,
		record_type: &str,
		record_ids: &BTreeSet<RecordId>,
		user_attrs: &BTreeSet<String>,
	) -> Result<bool, DbError> {
		if record_ids.is_empty() {
			return Err(DbError::InvalidInput(
				"at least one record id is required".to_string(),
			));
		}
		if user_attrs.is_empty() {
			return Ok(false);
		}

		let sql = format!(
			"SELECT COUNT(DISTINCT authorizable_id) FROM authorization_attrs \
			 WHERE authorizable_type = ? AND authorizable_id IN ({}) AND name IN ({})",
			placeholders(record_ids.len()),
			placeholders(user_attrs.len())
		);
		let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(record_type);
		for id in record_ids {
			query = query.bind(id.as_str());
		}
		for attr in user_attrs {
			query = query.bind(attr.as_str());
		}

		let matched = query.fetch_one(&self.pool).await?;

		Ok(usize::try_from(matched).map_or(false, |n| n == record_ids.len()))
	}

	/// Ids of the records of `record_type` visible under `scope`, ordered by
	/// primary key.
	///
	/// [`AttrScope::All`] lists every row of the host table. Otherwise the
	/// host table is joined to `authorization_attrs` and filtered on
	/// `user_attrs`, yielding each matching record once.
	///
	/// # Errors
	/// - `DbError::MissingAssociation` if `table` is `None`
	/// - `DbError::InvalidInput` if the table or key is not a plain identifier
	#[tracing::instrument(skip(self, table, scope), fields(record_type = %record_type))]
	pub async fn find_by_permission(
		&self,
		record_type: &str,
		table: Option<RecordTable>,
		scope: &AttrScope,
	) -> Result<Vec<RecordId>, DbError> {
		let Some(table) = table else {
			return Err(DbError::MissingAssociation {
				record_type: record_type.to_string(),
			});
		};
		let table_name = quote_ident(table.table)?;
		let primary_key = quote_ident(table.primary_key)?;

		let ids: Vec<String> = match scope {
			AttrScope::All => {
				let sql = format!(
					"SELECT CAST(r.{primary_key} AS TEXT) FROM {table_name} AS r ORDER BY r.{primary_key}"
				);
				sqlx::query_scalar(&sql).fetch_all(&self.pool).await?
			}
			AttrScope::Attrs(user_attrs) if user_attrs.is_empty() => Vec::new(),
			AttrScope::Attrs(user_attrs) => {
				let sql = format!(
					"SELECT CAST(r.{primary_key} AS TEXT) FROM {table_name} AS r \
					 INNER JOIN authorization_attrs AS a \
					 ON a.authorizable_id = CAST(r.{primary_key} AS TEXT) \
					 WHERE a.authorizable_type = ? AND a.name IN ({}) \
					 GROUP BY r.{primary_key} ORDER BY r.{primary_key}",
					placeholders(user_attrs.len())
				);
				let mut query = sqlx::query_scalar::<_, String>(&sql).bind(record_type);
				for attr in user_attrs {
					query = query.bind(attr.as_str());
				}

				query.fetch_all(&self.pool).await?
			}
		};

		tracing::debug!(found = ids.len(), "records found by permission");
		Ok(ids.into_iter().map(RecordId::from).collect())
	}

	/// Deletes every stored clause of a record. Used when the record itself
	/// is deleted.
	#[tracing::instrument(skip(self), fields(record_type = %record_type, record_id = %record_id))]
	pub async fn clear(&self, record_type: &str, record_id: &RecordId) -> Result<u64, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM authorization_attrs
			WHERE authorizable_type = ? AND authorizable_id = ?
			"#,
		)
		.bind(record_type)
		.bind(record_id.as_str())
		.execute(&self.pool)
		.await?;

		tracing::debug!(removed = result.rows_affected(), "authorization attrs cleared");
		Ok(result.rows_affected())
	}
}

/// `?, ?, ?` for an `IN` list of `n` bound values.
fn placeholders(n: usize) -> String {
	vec!["?"; n].join(", ")
}

fn quote_ident(ident: &str) -> Result<String, DbError> {
	let mut chars = ident.chars();
	let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

	if !valid {
		return Err(DbError::InvalidInput(format!(
			"not a valid SQL identifier: {ident:?}"
		)));
	}
	Ok(format!("\"{ident}\""))
}
