// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::AttrsConfigLayer;
use crate::sections::{DatabaseConfigLayer, RetryConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<AttrsConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<AttrsConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(AttrsConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/attrs/attrs.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<AttrsConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(AttrsConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Io {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: AttrsConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::Toml {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: ATTRS_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<AttrsConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from_lookup(|name| std::env::var(name).ok())
	}
}

/// Builds a layer from an environment-style lookup. Empty values count as unset.
fn layer_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<AttrsConfigLayer, ConfigError> {
	let env = Env { lookup };

	Ok(AttrsConfigLayer {
		database: Some(DatabaseConfigLayer {
			url: env.var("ATTRS_DATABASE_URL"),
			max_connections: env.parse("ATTRS_DATABASE_MAX_CONNECTIONS")?,
			busy_timeout_ms: env.parse("ATTRS_DATABASE_BUSY_TIMEOUT_MS")?,
		}),
		retry: Some(RetryConfigLayer {
			max_attempts: env.parse("ATTRS_RETRY_MAX_ATTEMPTS")?,
			base_delay_ms: env.parse("ATTRS_RETRY_BASE_DELAY_MS")?,
			max_delay_ms: env.parse("ATTRS_RETRY_MAX_DELAY_MS")?,
			backoff_factor: env.parse("ATTRS_RETRY_BACKOFF_FACTOR")?,
			jitter: env.bool("ATTRS_RETRY_JITTER")?,
		}),
	})
}

struct Env<F> {
	lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				value: v,
			}),
			None => Ok(None),
		}
	}

	fn bool(&self, name: &str) -> Result<Option<bool>, ConfigError> {
		match self.var(name) {
			Some(v) => match v.to_ascii_lowercase().as_str() {
				"1" | "true" | "yes" => Ok(Some(true)),
				"0" | "false" | "no" => Ok(Some(false)),
				_ => Err(ConfigError::InvalidValue {
					key: name.to_string(),
					value: v,
				}),
			},
			None => Ok(None),
		}
	}
}
