// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attribute clauses and their canonical string form.
//!
//! A [`Clause`] is a conjunction: every `name = value` pair in it holds at the
//! same time. A list of clauses is a disjunction. The canonical form of a
//! clause sorts its names ascending and joins `name=value` pairs with `&`, so
//! `{foo: 2, bar: false}` and `{bar: false, foo: 2}` both become
//! `bar=false&foo=2`.

use serde_json::{Map, Value};
use std::fmt;

use crate::error::{CoreError, Result};

/// Scalar value of a single clause attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClauseValue {
	Str(String),
	Int(i64),
	Bool(bool),
	Null,
}

impl fmt::Display for ClauseValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ClauseValue::Str(s) => f.write_str(s),
			ClauseValue::Int(i) => write!(f, "{i}"),
			ClauseValue::Bool(b) => write!(f, "{b}"),
			ClauseValue::Null => Ok(()),
		}
	}
}

impl From<&str> for ClauseValue {
	fn from(value: &str) -> Self {
		ClauseValue::Str(value.to_string())
	}
}

impl From<String> for ClauseValue {
	fn from(value: String) -> Self {
		ClauseValue::Str(value)
	}
}

impl From<i64> for ClauseValue {
	fn from(value: i64) -> Self {
		ClauseValue::Int(value)
	}
}

impl From<i32> for ClauseValue {
	fn from(value: i32) -> Self {
		ClauseValue::Int(value.into())
	}
}

impl From<u32> for ClauseValue {
	fn from(value: u32) -> Self {
		ClauseValue::Int(value.into())
	}
}

impl From<bool> for ClauseValue {
	fn from(value: bool) -> Self {
		ClauseValue::Bool(value)
	}
}

impl From<uuid::Uuid> for ClauseValue {
	fn from(value: uuid::Uuid) -> Self {
		ClauseValue::Str(value.to_string())
	}
}

impl<T: Into<ClauseValue>> From<Option<T>> for ClauseValue {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(ClauseValue::Null)
	}
}

impl TryFrom<&Value> for ClauseValue {
	type Error = CoreError;

	fn try_from(value: &Value) -> Result<Self> {
		match value {
			Value::Null => Ok(ClauseValue::Null),
			Value::Bool(b) => Ok(ClauseValue::Bool(*b)),
			Value::String(s) => Ok(ClauseValue::Str(s.clone())),
			Value::Number(n) => n.as_i64().map(ClauseValue::Int).ok_or_else(|| {
				CoreError::InvalidInput(format!("clause values must be integers, got {n}"))
			}),
			Value::Array(_) | Value::Object(_) => Err(CoreError::InvalidInput(
				"clause values must be scalars".to_string(),
			)),
		}
	}
}

/// A conjunction of attribute equalities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
	attrs: Vec<(String, ClauseValue)>,
}

impl Clause {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder: set `name` to `value`, replacing any previous value for `name`.
	pub fn with(mut self, name: impl Into<String>, value: impl Into<ClauseValue>) -> Self {
		self.set(name, value);
		self
	}

	pub fn set(&mut self, name: impl Into<String>, value: impl Into<ClauseValue>) {
		let name = name.into();
		let value = value.into();
		match self.attrs.iter_mut().find(|(n, _)| *n == name) {
			Some(slot) => slot.1 = value,
			None => self.attrs.push((name, value)),
		}
	}

	pub fn get(&self, name: &str) -> Option<&ClauseValue> {
		self
			.attrs
			.iter()
			.find(|(n, _)| n == name)
			.map(|(_, v)| v)
	}

	pub fn len(&self) -> usize {
		self.attrs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.attrs.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &ClauseValue)> {
		self.attrs.iter().map(|(n, v)| (n.as_str(), v))
	}

	/// Renders the canonical `a=1&b=2` form with names sorted ascending.
	pub fn canonical(&self) -> Result<String> {
		if self.attrs.is_empty() {
			return Err(CoreError::InvalidInput(
				"a clause must contain at least one attribute".to_string(),
			));
		}

		let mut pairs: Vec<&(String, ClauseValue)> = self.attrs.iter().collect();
		pairs.sort_by(|a, b| a.0.cmp(&b.0));

		Ok(pairs
			.iter()
			.map(|(name, value)| format!("{name}={value}"))
			.collect::<Vec<_>>()
			.join("&"))
	}

	fn from_json_object(map: &Map<String, Value>) -> Result<Self> {
		let mut clause = Clause::new();
		for (name, value) in map {
			clause.set(name.as_str(), ClauseValue::try_from(value)?);
		}
		Ok(clause)
	}
}

impl<K, V> FromIterator<(K, V)> for Clause
where
	K: Into<String>,
	V: Into<ClauseValue>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut clause = Clause::new();
		for (name, value) in iter {
			clause.set(name, value);
		}
		clause
	}
}

/// Serializes a sequence of clauses into their canonical strings.
///
/// Absent (`None`) elements are skipped. The output keeps input order and is
/// not deduplicated; storage treats it as a set.
pub fn serialize_clauses<'a, I>(clauses: I) -> Result<Vec<String>>
where
	I: IntoIterator,
	I::Item: Into<Option<&'a Clause>>,
{
	clauses
		.into_iter()
		.filter_map(|clause| -> Option<&'a Clause> { clause.into() })
		.map(Clause::canonical)
		.collect()
}

/// Reads a clause sequence from JSON.
///
/// `null` is an empty sequence and `null` elements are dropped. A bare object
/// is rejected: callers must wrap a single conjunction in an array.
pub fn clauses_from_json(value: &Value) -> Result<Vec<Clause>> {
	match value {
		Value::Null => Ok(Vec::new()),
		Value::Object(_) => Err(CoreError::InvalidInput(
			"Please supply an array of objects representing authorization attributes".to_string(),
		)),
		Value::Array(items) => items
			.iter()
			.filter(|item| !item.is_null())
			.map(|item| match item {
				Value::Object(map) => Clause::from_json_object(map),
				other => Err(CoreError::InvalidInput(format!(
					"expected an object of authorization attributes, got {other}"
				))),
			})
			.collect(),
		other => Err(CoreError::InvalidInput(format!(
			"expected an array of authorization attributes, got {other}"
		))),
	}
}
