// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Record identity as seen by the authorization layer.
//!
//! The host's records are opaque here: the core only needs a type tag and an
//! identifier, plus (for permission-scoped search) the name of the table the
//! records live in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Identifier of a host record, stored as text in `authorizable_id`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The id of a record.
	pub fn of<R: Authorizable>(record: &R) -> Self {
		record.record_id()
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_inner(self) -> String {
		self.0
	}
}

impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<i64> for RecordId {
	fn from(id: i64) -> Self {
		Self(id.to_string())
	}
}

impl From<i32> for RecordId {
	fn from(id: i32) -> Self {
		Self(id.to_string())
	}
}

impl From<Uuid> for RecordId {
	fn from(id: Uuid) -> Self {
		Self(id.to_string())
	}
}

impl From<&str> for RecordId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

impl From<String> for RecordId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

/// The host table holding records of one type.
///
/// Needed to join records against their stored attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTable {
	pub table: &'static str,
	pub primary_key: &'static str,
}

impl RecordTable {
	pub const fn new(table: &'static str) -> Self {
		Self {
			table,
			primary_key: "id",
		}
	}

	pub const fn with_primary_key(mut self, primary_key: &'static str) -> Self {
		self.primary_key = primary_key;
		self
	}
}

/// A host record that carries authorization attributes.
pub trait Authorizable {
	/// Type tag stored in `authorizable_type`.
	const RECORD_TYPE: &'static str;

	fn record_id(&self) -> RecordId;

	/// The table records of this type live in, if it can be joined against.
	fn record_table() -> Option<RecordTable> {
		None
	}
}

/// Anything that names one or more records: an id, a record, or a sequence
/// of either.
pub trait IdSource {
	fn push_ids(self, out: &mut Vec<RecordId>);
}

impl IdSource for RecordId {
	fn push_ids(self, out: &mut Vec<RecordId>) {
		out.push(self);
	}
}

impl IdSource for i64 {
	fn push_ids(self, out: &mut Vec<RecordId>) {
		out.push(self.into());
	}
}

impl IdSource for Uuid {
	fn push_ids(self, out: &mut Vec<RecordId>) {
		out.push(self.into());
	}
}

impl IdSource for &str {
	fn push_ids(self, out: &mut Vec<RecordId>) {
		out.push(self.into());
	}
}

impl IdSource for String {
	fn push_ids(self, out: &mut Vec<RecordId>) {
		out.push(self.into());
	}
}

impl<R: Authorizable> IdSource for &R {
	fn push_ids(self, out: &mut Vec<RecordId>) {
		out.push(self.record_id());
	}
}

impl<R: Authorizable> IdSource for &[R] {
	fn push_ids(self, out: &mut Vec<RecordId>) {
		out.extend(self.iter().map(Authorizable::record_id));
	}
}

impl<T: IdSource> IdSource for Vec<T> {
	fn push_ids(self, out: &mut Vec<RecordId>) {
		for item in self {
			item.push_ids(out);
		}
	}
}

impl<T: IdSource, const N: usize> IdSource for [T; N] {
	fn push_ids(self, out: &mut Vec<RecordId>) {
		for item in self {
			item.push_ids(out);
		}
	}
}

/// Collapses an id source into a non-empty set of distinct ids.
pub fn normalize_ids(source: impl IdSource) -> Result<BTreeSet<RecordId>> {
	let mut ids = Vec::new();
	source.push_ids(&mut ids);

	if ids.is_empty() {
		return Err(CoreError::InvalidInput(
			"at least one record or record id is required".to_string(),
		));
	}

	Ok(ids.into_iter().collect())
}
