// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for authorization attribute storage.
//!
//! Sources are applied lowest precedence first: built-in defaults, then a
//! TOML file, then `ATTRS_*` environment variables.
//!
//! ```ignore
//! use attrs_config::load_config;
//!
//! let config = load_config()?;
//! let pool = config.database.connect().await?;
//! let repo = AuthorizationAttrRepository::new(pool).with_retry_config(config.retry.into());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::AttrsConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrsConfig {
	pub database: DatabaseConfig,
	pub retry: RetryConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`ATTRS_*`)
/// 2. Config file (`/etc/attrs/attrs.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<AttrsConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_from(sources)
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<AttrsConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(EnvSource)];
	load_from(sources)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<AttrsConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_from(sources)
}

/// Merge `sources` in precedence order and resolve the result.
pub fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<AttrsConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AttrsConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

fn finalize(layer: AttrsConfigLayer) -> Result<AttrsConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let retry = layer.retry.unwrap_or_default().finalize();

	retry.validate()?;

	info!(
		database = %database.url,
		max_connections = database.max_connections,
		retry_max_attempts = retry.max_attempts,
		"authorization attrs configuration loaded"
	);

	Ok(AttrsConfig { database, retry })
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FixedSource {
		precedence: Precedence,
		layer: AttrsConfigLayer,
	}

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.precedence
		}

		fn load(&self) -> Result<AttrsConfigLayer, ConfigError> {
			Ok(self.layer.clone())
		}
	}

	fn retry_layer(max_attempts: u32) -> AttrsConfigLayer {
		AttrsConfigLayer {
			retry: Some(RetryConfigLayer {
				max_attempts: Some(max_attempts),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[test]
	fn test_defaults_only() {
		let sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource)];
		let config = load_from(sources).unwrap();
		assert_eq!(config, AttrsConfig::default());
		assert_eq!(config.database.url, "sqlite:./authorization_attrs.db");
		assert_eq!(config.retry.max_attempts, 3);
	}

	#[test]
	fn test_higher_precedence_wins_regardless_of_order() {
		let sources: Vec<Box<dyn ConfigSource>> = vec![
			Box::new(FixedSource {
				precedence: Precedence::Environment,
				layer: retry_layer(8),
			}),
			Box::new(FixedSource {
				precedence: Precedence::ConfigFile,
				layer: retry_layer(4),
			}),
		];
		let config = load_from(sources).unwrap();

		assert_eq!(config.retry.max_attempts, 8);
	}

	#[test]
	fn test_file_overrides_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("attrs.toml");
		std::fs::write(
			&path,
			"[database]\nurl = \"sqlite:/srv/attrs.db\"\nbusy_timeout_ms = 750\n",
		)
		.unwrap();

		let sources: Vec<Box<dyn ConfigSource>> =
			vec![Box::new(DefaultsSource), Box::new(TomlSource::new(&path))];
		let config = load_from(sources).unwrap();

		assert_eq!(config.database.url, "sqlite:/srv/attrs.db");
		assert_eq!(config.database.busy_timeout, std::time::Duration::from_millis(750));
		assert_eq!(config.database.max_connections, 5);
	}

	#[test]
	fn test_invalid_retry_is_rejected() {
		let sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(FixedSource {
			precedence: Precedence::ConfigFile,
			layer: retry_layer(0),
		})];
		let result = load_from(sources);
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}
}
