// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::schema::migrate;

pub async fn create_test_pool() -> SqlitePool {
	SqlitePool::connect(":memory:").await.unwrap()
}

/// In-memory pool with the `authorization_attrs` table.
pub async fn create_attrs_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	migrate(&pool).await.unwrap();
	pool
}

/// A host table standing in for application records.
pub async fn create_documents_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS documents (
			id INTEGER PRIMARY KEY,
			title TEXT NOT NULL,
			group_id INTEGER,
			owner_id INTEGER
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn insert_document(
	pool: &SqlitePool,
	title: &str,
	group_id: Option<i64>,
	owner_id: Option<i64>,
) -> i64 {
	sqlx::query("INSERT INTO documents (title, group_id, owner_id) VALUES (?, ?, ?)")
		.bind(title)
		.bind(group_id)
		.bind(owner_id)
		.execute(pool)
		.await
		.unwrap()
		.last_insert_rowid()
}

/// Pool with both the attribute table and the `documents` host table.
pub async fn create_documents_test_pool() -> SqlitePool {
	let pool = create_attrs_test_pool().await;
	create_documents_table(&pool).await;
	pool
}

/// Raw `(id, name)` rows stored for a record, ordered by name.
pub async fn stored_rows(pool: &SqlitePool, record_type: &str, record_id: &str) -> Vec<(i64, String)> {
	sqlx::query_as(
		"SELECT id, name FROM authorization_attrs WHERE authorizable_type = ? AND authorizable_id = ? ORDER BY name",
	)
	.bind(record_type)
	.bind(record_id)
	.fetch_all(pool)
	.await
	.unwrap()
}
