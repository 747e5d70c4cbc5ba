// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use attrs_core::CoreError;

use crate::retry::RetryableError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Invalid input: {0}")]
	InvalidInput(String),

	#[error(
		"{record_type} cannot be searched by permission: implement `Authorizable::record_table` for it so its table can be joined to authorization_attrs"
	)]
	MissingAssociation { record_type: String },

	#[error("Internal: {0}")]
	Internal(String),

	#[error(transparent)]
	Core(#[from] CoreError),
}

impl DbError {
	/// Maps a failure inside a write transaction, separating transient
	/// conflicts from everything else.
	///
	/// A duplicate `(authorizable_type, authorizable_id, name)` row means a
	/// concurrent reconcile got there first. SQLite reports lost write races
	/// as busy or locked.
	pub(crate) fn from_write(err: sqlx::Error) -> Self {
		match err {
			sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
				DbError::Conflict(format!("authorization attribute already exists: {db_err}"))
			}
			sqlx::Error::Database(ref db_err) if is_sqlite_busy(db_err.code().as_deref()) => {
				DbError::Conflict(format!("concurrent write: {db_err}"))
			}
			_ => DbError::Sqlx(err),
		}
	}
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes such as
/// SQLITE_BUSY_SNAPSHOT (517).
fn is_sqlite_busy(code: Option<&str>) -> bool {
	code
		.and_then(|c| c.parse::<i32>().ok())
		.map(|c| matches!(c & 0xff, 5 | 6))
		.unwrap_or(false)
}

impl RetryableError for DbError {
	fn is_retryable(&self) -> bool {
		matches!(self, DbError::Conflict(_))
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
