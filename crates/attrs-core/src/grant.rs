// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission grants.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::clause::{clauses_from_json, serialize_clauses, Clause};
use crate::error::Result;

/// What a user holds for one permission on one record type.
///
/// Grants are computed on every check and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
	/// Authorized for every record, without consulting stored attributes.
	All,
	/// Authorized for any record whose own attributes share a clause with these.
	Attrs(Vec<Clause>),
	/// Never authorized.
	None,
}

impl Grant {
	/// Builds a grant from a list of clauses. An empty list is [`Grant::None`].
	pub fn attrs(clauses: impl IntoIterator<Item = Clause>) -> Self {
		let clauses: Vec<Clause> = clauses.into_iter().collect();
		if clauses.is_empty() {
			Grant::None
		} else {
			Grant::Attrs(clauses)
		}
	}

	/// Reads a grant from JSON: `"all"` is [`Grant::All`], anything else is a
	/// clause sequence.
	pub fn from_json(value: &Value) -> Result<Self> {
		match value {
			Value::String(s) if s == "all" => Ok(Grant::All),
			other => Ok(Grant::attrs(clauses_from_json(other)?)),
		}
	}

	/// Serializes the grant for storage queries.
	///
	/// Returns `None` when the grant can never match anything.
	pub fn to_scope(&self) -> Result<Option<AttrScope>> {
		match self {
			Grant::All => Ok(Some(AttrScope::All)),
			Grant::None => Ok(None),
			Grant::Attrs(clauses) => {
				let attrs: BTreeSet<String> = serialize_clauses(clauses)?.into_iter().collect();
				if attrs.is_empty() {
					Ok(None)
				} else {
					Ok(Some(AttrScope::Attrs(attrs)))
				}
			}
		}
	}
}

impl From<Vec<Clause>> for Grant {
	fn from(clauses: Vec<Clause>) -> Self {
		Grant::attrs(clauses)
	}
}

impl From<Option<Vec<Clause>>> for Grant {
	fn from(clauses: Option<Vec<Clause>>) -> Self {
		clauses.map(Grant::attrs).unwrap_or(Grant::None)
	}
}

/// A serialized grant, as matched against stored attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrScope {
	All,
	Attrs(BTreeSet<String>),
}
