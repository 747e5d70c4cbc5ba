// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policies and the registry that resolves them by record type.
//!
//! A policy describes one record type from two sides: the clauses a record
//! carries about itself, and for each permission the grant a user holds.
//! Both are plain functions. Record attributes must only describe facts
//! about the record; any authorization logic belongs in the grants.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use attrs_core::{Authorizable, Clause, Grant};

use crate::error::{AuthzError, Result};

pub type RecordAttrsFn<R> = Arc<dyn Fn(&R) -> Vec<Clause> + Send + Sync>;
pub type UserGrantFn<U> = Arc<dyn Fn(&U) -> Grant + Send + Sync>;

/// The policy for records of type `R` checked against users of type `U`.
pub struct Policy<R, U> {
	record_attrs: RecordAttrsFn<R>,
	permissions: HashMap<String, UserGrantFn<U>>,
}

impl<R, U> Policy<R, U>
where
	R: Authorizable + 'static,
	U: 'static,
{
	pub fn new(record_attrs: impl Fn(&R) -> Vec<Clause> + Send + Sync + 'static) -> Self {
		Self {
			record_attrs: Arc::new(record_attrs),
			permissions: HashMap::new(),
		}
	}

	/// Defines `name`. Redefining a permission replaces it.
	pub fn permission(
		mut self,
		name: impl Into<String>,
		grant: impl Fn(&U) -> Grant + Send + Sync + 'static,
	) -> Self {
		self.permissions.insert(name.into(), Arc::new(grant));
		self
	}
}

struct RegisteredPolicy<U> {
	record_attrs: Box<dyn Any + Send + Sync>,
	permissions: HashMap<String, UserGrantFn<U>>,
}

/// Record type tag to policy, populated at startup.
pub struct PolicyRegistry<U> {
	policies: HashMap<&'static str, RegisteredPolicy<U>>,
}

impl<U> Default for PolicyRegistry<U> {
	fn default() -> Self {
		Self {
			policies: HashMap::new(),
		}
	}
}

impl<U: 'static> PolicyRegistry<U> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers the policy for `R`, replacing any earlier one for the same
	/// record type.
	pub fn register<R: Authorizable + 'static>(&mut self, policy: Policy<R, U>) -> &mut Self {
		let previous = self.policies.insert(
			R::RECORD_TYPE,
			RegisteredPolicy {
				record_attrs: Box::new(policy.record_attrs),
				permissions: policy.permissions,
			},
		);
		if previous.is_some() {
			tracing::warn!(record_type = R::RECORD_TYPE, "replacing registered policy");
		}
		self
	}

	pub fn with<R: Authorizable + 'static>(mut self, policy: Policy<R, U>) -> Self {
		self.register(policy);
		self
	}

	pub fn contains(&self, record_type: &str) -> bool {
		self.policies.contains_key(record_type)
	}

	/// Permission names defined for `record_type`, sorted.
	pub fn permissions(&self, record_type: &str) -> Result<Vec<&str>> {
		let mut names: Vec<&str> = self
			.lookup(record_type)?
			.permissions
			.keys()
			.map(String::as_str)
			.collect();
		names.sort_unstable();
		Ok(names)
	}

	/// The clauses `record` carries about itself.
	pub fn record_attrs<R: Authorizable + 'static>(&self, record: &R) -> Result<Vec<Clause>> {
		let record_attrs = self
			.lookup(R::RECORD_TYPE)?
			.record_attrs
			.downcast_ref::<RecordAttrsFn<R>>()
			.ok_or_else(|| AuthzError::PolicyTypeMismatch {
				record_type: R::RECORD_TYPE.to_string(),
			})?;
		Ok(record_attrs(record))
	}

	/// The grant `user` holds for `permission` on `record_type`.
	pub fn grant(&self, record_type: &str, permission: &str, user: &U) -> Result<Grant> {
		let grant = self
			.lookup(record_type)?
			.permissions
			.get(permission)
			.ok_or_else(|| AuthzError::UnknownPermission {
				record_type: record_type.to_string(),
				permission: permission.to_string(),
			})?;
		Ok(grant(user))
	}

	fn lookup(&self, record_type: &str) -> Result<&RegisteredPolicy<U>> {
		self
			.policies
			.get(record_type)
			.ok_or_else(|| AuthzError::PolicyNotFound {
				record_type: record_type.to_string(),
			})
	}
}
