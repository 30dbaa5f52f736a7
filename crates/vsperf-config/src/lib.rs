//! Configuration module for vsperf.
//!
//! Settings are loaded from TOML files. Environment variables written as
//! `${VAR}` or `${VAR:-default}` are resolved before parsing, and a file may
//! pull in others with `include = ["traffic.toml"]` as long as every
//! top-level section is defined exactly once.

#[cfg(feature = "testing")]
pub mod builders {
	pub mod config;
}
mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use vsperf_types::{TrafficParams, TunnelOperation};

#[cfg(feature = "testing")]
pub use builders::config::ConfigBuilder;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only, the full error embeds the whole input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level vsperf configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Switch discovery and selection.
	pub vswitch: VSwitchSettings,
	/// Deployment scenario to drive the switch through.
	#[serde(default)]
	pub deployment: DeploymentConfig,
	/// Traffic settings passed through to the controller.
	#[serde(default)]
	pub traffic: TrafficParams,
}

/// Where switch implementations are discovered and which one is active.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VSwitchSettings {
	/// Directory holding switch descriptor files.
	pub dir: PathBuf,
	/// Name of the switch to use, matched case-insensitively.
	pub active: String,
	/// Suffix removed from descriptor file stems to form the switch name.
	#[serde(default = "default_strip_suffix")]
	pub strip_suffix: String,
}

fn default_strip_suffix() -> String {
	"_vswitch".to_string()
}

/// Deployment scenario selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeploymentConfig {
	/// Scenario name such as "p2p", "pvp" or "op2p".
	#[serde(default = "default_scenario")]
	pub scenario: String,
	/// Tunnel operation for overlay scenarios.
	#[serde(default)]
	pub tunnel_operation: Option<TunnelOperation>,
}

impl Default for DeploymentConfig {
	fn default() -> Self {
		Self {
			scenario: default_scenario(),
			tunnel_operation: None,
		}
	}
}

fn default_scenario() -> String {
	"p2p".to_string()
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)));
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following include directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = match path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path.file_name().ok_or_else(|| {
			ConfigError::Validation(format!("Invalid path: {}", path.display()))
		})?;
		loader.load_config(file_name).await
	}

	/// Parses and validates TOML whose environment variables are already
	/// resolved. Values are taken literally, even if they contain `${...}`.
	pub(crate) fn from_resolved(content: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	/// Checks that the values needed for switch selection are present.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.vswitch.dir.as_os_str().is_empty() {
			return Err(ConfigError::Validation(
				"vswitch.dir cannot be empty".into(),
			));
		}
		if self.vswitch.active.trim().is_empty() {
			return Err(ConfigError::Validation(
				"vswitch.active cannot be empty".into(),
			));
		}
		if self.deployment.scenario.trim().is_empty() {
			return Err(ConfigError::Validation(
				"deployment.scenario cannot be empty".into(),
			));
		}
		Ok(())
	}
}

/// Parses a configuration from a TOML string.
///
/// Environment variables are resolved and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Config::from_resolved(&resolve_env_vars(s)?)
	}
}
