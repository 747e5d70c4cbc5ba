// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `authorization_attrs` table.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

/// Creates the `authorization_attrs` table and its uniqueness index.
///
/// Safe to run repeatedly.
#[tracing::instrument(skip(pool))]
pub async fn migrate(pool: &SqlitePool) -> Result<(), DbError> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS authorization_attrs (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			name TEXT NOT NULL,
			authorizable_type TEXT NOT NULL,
			authorizable_id TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE UNIQUE INDEX IF NOT EXISTS index_on_authorizable_and_name
		ON authorization_attrs (authorizable_type, authorizable_id, name)
		"#,
	)
	.execute(pool)
	.await?;

	tracing::debug!("authorization_attrs schema ready");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn migrate_is_idempotent() {
		let pool = create_test_pool().await;
		migrate(&pool).await.unwrap();
		migrate(&pool).await.unwrap();
	}

	#[tokio::test]
	async fn duplicate_clause_rows_are_rejected() {
		let pool = create_test_pool().await;
		migrate(&pool).await.unwrap();

		let insert = "INSERT INTO authorization_attrs (name, authorizable_type, authorizable_id) VALUES ('group_id=1', 'Document', '1')";
		sqlx::query(insert).execute(&pool).await.unwrap();
		let err = sqlx::query(insert).execute(&pool).await.unwrap_err();

		assert!(matches!(DbError::from_write(err), DbError::Conflict(_)));
	}
}
