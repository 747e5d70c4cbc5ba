// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{DatabaseConfigLayer, RetryConfigLayer};

/// Partial configuration as read from one source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttrsConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub retry: Option<RetryConfigLayer>,
}

impl AttrsConfigLayer {
	/// Overlays `other` on top of `self`; values set in `other` win.
	pub fn merge(&mut self, other: AttrsConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.retry, other.retry, RetryConfigLayer::merge);
	}
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(existing), Some(overlay)) => merge(existing, overlay),
		(None, Some(overlay)) => *base = Some(overlay),
		(_, None) => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base = AttrsConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite:./base.db".to_string()),
				max_connections: Some(2),
				..Default::default()
			}),
			retry: None,
		};
		let overlay = AttrsConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite:./overlay.db".to_string()),
				..Default::default()
			}),
			retry: Some(RetryConfigLayer {
				max_attempts: Some(5),
				..Default::default()
			}),
		};

		base.merge(overlay);

		let database = base.database.unwrap();
		assert_eq!(database.url.as_deref(), Some("sqlite:./overlay.db"));
		assert_eq!(database.max_connections, Some(2));
		assert_eq!(base.retry.unwrap().max_attempts, Some(5));
	}

	#[test]
	fn test_merge_with_empty_is_noop() {
		let mut base = AttrsConfigLayer {
			database: Some(DatabaseConfigLayer {
				busy_timeout_ms: Some(100),
				..Default::default()
			}),
			retry: None,
		};
		base.merge(AttrsConfigLayer::default());
		assert_eq!(base.database.unwrap().busy_timeout_ms, Some(100));
		assert!(base.retry.is_none());
	}

	#[test]
	fn test_deserialize_sections() {
		let layer: AttrsConfigLayer = toml::from_str(
			r#"
[database]
url = "sqlite:/var/lib/attrs/attrs.db"

[retry]
max_attempts = 4
jitter = false
"#,
		)
		.unwrap();

		assert_eq!(
			layer.database.unwrap().url.as_deref(),
			Some("sqlite:/var/lib/attrs/attrs.db")
		);
		let retry = layer.retry.unwrap();
		assert_eq!(retry.max_attempts, Some(4));
		assert_eq!(retry.jitter, Some(false));
		assert!(retry.base_delay_ms.is_none());
	}
}
