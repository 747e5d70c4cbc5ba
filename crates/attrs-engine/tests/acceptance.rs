// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end authorization against a real SQLite database.

use std::time::Duration;

use attrs_config::{DatabaseConfig, RetryConfigLayer};
use attrs_db::testing::{create_documents_table, create_documents_test_pool, insert_document, stored_rows};
use attrs_db::{migrate, DbError, SqlitePool};
use attrs_engine::{
	AuthorizationAttrRepository, AuthorizationEngine, Authorizable, AuthzError, Clause, Grant, Policy,
	PolicyRegistry, RecordId, RecordTable,
};

#[derive(Debug, Clone)]
struct Document {
	id: i64,
	group_id: Option<i64>,
	owner_id: Option<i64>,
}

impl Authorizable for Document {
	const RECORD_TYPE: &'static str = "Document";

	fn record_id(&self) -> RecordId {
		self.id.into()
	}

	fn record_table() -> Option<RecordTable> {
		Some(RecordTable::new("documents"))
	}
}

/// Joined to nothing, so it cannot be searched.
struct Comment {
	id: i64,
}

impl Authorizable for Comment {
	const RECORD_TYPE: &'static str = "Comment";

	fn record_id(&self) -> RecordId {
		self.id.into()
	}
}

struct User {
	id: i64,
	group_ids: Vec<i64>,
	admin: bool,
}

impl User {
	fn in_groups(id: i64, group_ids: &[i64]) -> Self {
		Self {
			id,
			group_ids: group_ids.to_vec(),
			admin: false,
		}
	}
}

fn policies() -> PolicyRegistry<User> {
	PolicyRegistry::new()
		.with(
			Policy::new(|doc: &Document| {
				vec![
					Clause::new().with("group_id", doc.group_id),
					Clause::new().with("owner_id", doc.owner_id),
				]
			})
			.permission("read", |user: &User| {
				if user.admin {
					return Grant::All;
				}
				let mut clauses: Vec<Clause> = user
					.group_ids
					.iter()
					.map(|id| Clause::new().with("group_id", *id))
					.collect();
				clauses.push(Clause::new().with("owner_id", user.id));
				Grant::attrs(clauses)
			})
			.permission("delete", |user: &User| {
				Grant::attrs([Clause::new().with("owner_id", user.id)])
			})
			.permission("archive", |_: &User| Grant::None),
		)
		.with(
			Policy::new(|comment: &Comment| vec![Clause::new().with("comment_id", comment.id)])
				.permission("read", |_: &User| Grant::All),
		)
}

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

async fn create_document(pool: &SqlitePool, group_id: Option<i64>, owner_id: Option<i64>) -> Document {
	let id = insert_document(pool, "doc", group_id, owner_id).await;
	Document {
		id,
		group_id,
		owner_id,
	}
}

type Engine = AuthorizationEngine<AuthorizationAttrRepository, User>;

async fn setup() -> (Engine, SqlitePool) {
	init_tracing();
	let pool = create_documents_test_pool().await;
	let engine = AuthorizationEngine::new(AuthorizationAttrRepository::new(pool.clone()), policies());
	(engine, pool)
}

#[tokio::test]
async fn group_member_sees_only_group_documents() {
	let (engine, pool) = setup().await;
	let r1 = create_document(&pool, Some(1), None).await;
	let r2 = create_document(&pool, Some(2), None).await;
	engine.reconcile_for(&r1).await.unwrap();
	engine.reconcile_for(&r2).await.unwrap();

	let user = User::in_groups(100, &[1]);

	assert!(engine.authorized::<Document>("read", &r1, &user).await.unwrap());
	assert!(!engine.authorized::<Document>("read", &r2, &user).await.unwrap());
	assert!(!engine
		.authorized::<Document>("read", [&r1, &r2], &user)
		.await
		.unwrap());
	assert_eq!(
		engine.find_by_permission::<Document>("read", &user).await.unwrap(),
		vec![RecordId::of(&r1)]
	);
}

#[tokio::test]
async fn bulk_check_requires_every_record() {
	let (engine, pool) = setup().await;
	let mut docs = Vec::new();
	for group in [1, 2, 1] {
		let doc = create_document(&pool, Some(group), None).await;
		engine.reconcile_for(&doc).await.unwrap();
		docs.push(doc);
	}

	let both_groups = User::in_groups(100, &[1, 2]);
	let group_one = User::in_groups(100, &[1]);

	assert!(engine
		.authorized::<Document>("read", docs.as_slice(), &both_groups)
		.await
		.unwrap());
	assert!(!engine
		.authorized::<Document>("read", docs.as_slice(), &group_one)
		.await
		.unwrap());
	assert!(engine
		.authorized::<Document>("read", vec![RecordId::of(&docs[0]), RecordId::of(&docs[2])], &group_one)
		.await
		.unwrap());
}

#[tokio::test]
async fn ids_and_records_are_interchangeable() {
	let (engine, pool) = setup().await;
	let doc = create_document(&pool, Some(3), None).await;
	engine.reconcile_for(&doc).await.unwrap();
	let user = User::in_groups(100, &[3]);

	assert!(engine.authorized::<Document>("read", doc.id, &user).await.unwrap());
	assert!(engine
		.authorized::<Document>("read", vec![doc.id, doc.id], &user)
		.await
		.unwrap());
	assert!(engine
		.authorized::<Document>("read", doc.id.to_string(), &user)
		.await
		.unwrap());
}

#[tokio::test]
async fn unreconciled_record_is_never_matched() {
	let (engine, pool) = setup().await;
	let doc = create_document(&pool, Some(1), None).await;
	let user = User::in_groups(100, &[1]);

	assert!(!engine.authorized::<Document>("read", &doc, &user).await.unwrap());
	assert!(engine.find_by_permission::<Document>("read", &user).await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_sees_everything_without_stored_attrs() {
	let (engine, pool) = setup().await;
	let first = create_document(&pool, Some(1), None).await;
	let second = create_document(&pool, None, None).await;
	let admin = User {
		id: 1,
		group_ids: Vec::new(),
		admin: true,
	};

	assert!(engine
		.authorized::<Document>("read", [&first, &second], &admin)
		.await
		.unwrap());
	assert_eq!(
		engine.find_by_permission::<Document>("read", &admin).await.unwrap(),
		vec![RecordId::of(&first), RecordId::of(&second)]
	);
}

#[tokio::test]
async fn empty_grant_denies_everything() {
	let (engine, pool) = setup().await;
	let doc = create_document(&pool, Some(1), Some(100)).await;
	engine.reconcile_for(&doc).await.unwrap();
	let owner = User::in_groups(100, &[1]);

	assert!(!engine.authorized::<Document>("archive", &doc, &owner).await.unwrap());
	assert!(engine
		.find_by_permission::<Document>("archive", &owner)
		.await
		.unwrap()
		.is_empty());
}

#[tokio::test]
async fn ownership_is_matched_independently_of_group() {
	let (engine, pool) = setup().await;
	let mine = create_document(&pool, Some(9), Some(100)).await;
	let theirs = create_document(&pool, Some(9), Some(200)).await;
	engine.reconcile_for(&mine).await.unwrap();
	engine.reconcile_for(&theirs).await.unwrap();
	let user = User::in_groups(100, &[]);

	engine.authorize::<Document>("delete", &mine, &user).await.unwrap();
	let err = engine
		.authorize::<Document>("delete", &theirs, &user)
		.await
		.unwrap_err();
	assert!(matches!(err, AuthzError::Unauthorized { .. }));
	assert_eq!(
		engine.find_by_permission::<Document>("read", &user).await.unwrap(),
		vec![RecordId::of(&mine)]
	);
}

#[tokio::test]
async fn reconcile_tracks_changed_fields() {
	let (engine, pool) = setup().await;
	let mut doc = create_document(&pool, Some(1), None).await;
	let outcome = engine.reconcile_for(&doc).await.unwrap();
	assert_eq!(outcome.added, 2);

	let again = engine.reconcile_for(&doc).await.unwrap();
	assert!(again.is_unchanged());

	doc.group_id = Some(2);
	let moved = engine.reconcile_for(&doc).await.unwrap();
	assert_eq!((moved.added, moved.removed), (1, 1));

	let stored = engine.stored_attrs_for(&doc).await.unwrap();
	assert!(stored.contains("group_id=2"));
	assert!(stored.contains("owner_id="));
	assert!(!stored.contains("group_id=1"));

	let old_group = User::in_groups(100, &[1]);
	let new_group = User::in_groups(100, &[2]);
	assert!(!engine.authorized::<Document>("read", &doc, &old_group).await.unwrap());
	assert!(engine.authorized::<Document>("read", &doc, &new_group).await.unwrap());
}

#[tokio::test]
async fn clearing_revokes_access() {
	let (engine, pool) = setup().await;
	let doc = create_document(&pool, Some(1), None).await;
	engine.reconcile_for(&doc).await.unwrap();
	let user = User::in_groups(100, &[1]);

	assert_eq!(engine.clear_attrs_for(&doc).await.unwrap(), 2);

	assert!(!engine.authorized::<Document>("read", &doc, &user).await.unwrap());
	assert!(engine.stored_attrs_for(&doc).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_requires_joinable_table() {
	let (engine, _pool) = setup().await;
	let user = User::in_groups(1, &[]);

	let err = engine
		.find_by_permission::<Comment>("read", &user)
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		AuthzError::Store(DbError::MissingAssociation { ref record_type }) if record_type == "Comment"
	));
	assert!(err.to_string().contains("record_table"));
}

#[tokio::test]
async fn unregistered_permission_is_an_error() {
	let (engine, pool) = setup().await;
	let doc = create_document(&pool, Some(1), None).await;
	let user = User::in_groups(1, &[1]);

	let err = engine
		.authorized::<Document>("publish", &doc, &user)
		.await
		.unwrap_err();
	assert!(matches!(err, AuthzError::UnknownPermission { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reconciles_of_one_record_both_succeed() {
	init_tracing();
	let dir = tempfile::tempdir().unwrap();
	let database = DatabaseConfig {
		url: format!("sqlite:{}", dir.path().join("attrs.db").display()),
		max_connections: 4,
		busy_timeout: Duration::from_millis(200),
	};
	let retry = RetryConfigLayer {
		max_attempts: Some(10),
		base_delay_ms: Some(5),
		max_delay_ms: Some(50),
		..Default::default()
	}
	.finalize();

	let pool = database.connect().await.unwrap();
	migrate(&pool).await.unwrap();
	create_documents_table(&pool).await;
	let repo = AuthorizationAttrRepository::new(pool.clone()).with_retry_config(retry.into());
	let engine = AuthorizationEngine::new(repo, policies());

	let doc = create_document(&pool, Some(1), Some(100)).await;

	let (first, second) = tokio::join!(engine.reconcile_for(&doc), engine.reconcile_for(&doc));
	let first = first.unwrap();
	let second = second.unwrap();

	assert_eq!(first.added + second.added, 2);
	let rows = stored_rows(&pool, "Document", &doc.id.to_string()).await;
	let names: Vec<&str> = rows.iter().map(|(_, name)| name.as_str()).collect();
	assert_eq!(names, vec!["group_id=1", "owner_id=100"]);

	let user = User::in_groups(100, &[]);
	assert!(engine.authorized::<Document>("read", &doc, &user).await.unwrap());
}
