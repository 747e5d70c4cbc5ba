// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Write-conflict retry configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		RetryConfigLayer::default().finalize()
	}
}

impl RetryConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"retry.max_attempts must be at least 1".to_string(),
			));
		}
		if self.backoff_factor.is_nan() || self.backoff_factor < 1.0 {
			return Err(ConfigError::Validation(format!(
				"retry.backoff_factor must be >= 1.0, got {}",
				self.backoff_factor
			)));
		}
		if self.base_delay > self.max_delay {
			return Err(ConfigError::Validation(
				"retry.base_delay_ms must not exceed retry.max_delay_ms".to_string(),
			));
		}
		Ok(())
	}
}

impl From<&RetryConfig> for attrs_db::RetryConfig {
	fn from(config: &RetryConfig) -> Self {
		attrs_db::RetryConfig {
			max_attempts: config.max_attempts,
			base_delay: config.base_delay,
			max_delay: config.max_delay,
			backoff_factor: config.backoff_factor,
			jitter: config.jitter,
		}
	}
}

impl From<RetryConfig> for attrs_db::RetryConfig {
	fn from(config: RetryConfig) -> Self {
		(&config).into()
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RetryConfigLayer {
	#[serde(default)]
	pub max_attempts: Option<u32>,
	#[serde(default)]
	pub base_delay_ms: Option<u64>,
	#[serde(default)]
	pub max_delay_ms: Option<u64>,
	#[serde(default)]
	pub backoff_factor: Option<f64>,
	#[serde(default)]
	pub jitter: Option<bool>,
}

impl RetryConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.max_attempts.is_some() {
			self.max_attempts = other.max_attempts;
		}
		if other.base_delay_ms.is_some() {
			self.base_delay_ms = other.base_delay_ms;
		}
		if other.max_delay_ms.is_some() {
			self.max_delay_ms = other.max_delay_ms;
		}
		if other.backoff_factor.is_some() {
			self.backoff_factor = other.backoff_factor;
		}
		if other.jitter.is_some() {
			self.jitter = other.jitter;
		}
	}

	pub fn finalize(self) -> RetryConfig {
		RetryConfig {
			max_attempts: self.max_attempts.unwrap_or(3),
			base_delay: Duration::from_millis(self.base_delay_ms.unwrap_or(25)),
			max_delay: Duration::from_millis(self.max_delay_ms.unwrap_or(500)),
			backoff_factor: self.backoff_factor.unwrap_or(2.0),
			jitter: self.jitter.unwrap_or(true),
		}
	}
}
