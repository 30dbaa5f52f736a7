//! Configuration builder for tests.
//!
//! Creates `Config` values in code, pointing discovery at a temporary
//! directory without writing a configuration file first.

use crate::{Config, DeploymentConfig, VSwitchSettings};
use std::path::PathBuf;
use vsperf_types::{TrafficParams, TunnelOperation};

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	vswitch_dir: PathBuf,
	vswitch_active: String,
	strip_suffix: String,
	scenario: String,
	tunnel_operation: Option<TunnelOperation>,
	traffic: TrafficParams,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` selecting the `Dummy` switch for "p2p".
	pub fn new() -> Self {
		Self {
			vswitch_dir: PathBuf::from("vswitches"),
			vswitch_active: "Dummy".to_string(),
			strip_suffix: "_vswitch".to_string(),
			scenario: "p2p".to_string(),
			tunnel_operation: None,
			traffic: TrafficParams::default(),
		}
	}

	/// Sets the discovery directory.
	pub fn vswitch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.vswitch_dir = dir.into();
		self
	}

	/// Sets the active switch name.
	pub fn vswitch_active(mut self, active: impl Into<String>) -> Self {
		self.vswitch_active = active.into();
		self
	}

	/// Sets the suffix stripped from descriptor file stems.
	pub fn strip_suffix(mut self, suffix: impl Into<String>) -> Self {
		self.strip_suffix = suffix.into();
		self
	}

	/// Sets the deployment scenario.
	pub fn scenario(mut self, scenario: impl Into<String>) -> Self {
		self.scenario = scenario.into();
		self
	}

	/// Sets the tunnel operation.
	pub fn tunnel_operation(mut self, operation: Option<TunnelOperation>) -> Self {
		self.tunnel_operation = operation;
		self
	}

	/// Sets the traffic parameters.
	pub fn traffic(mut self, traffic: TrafficParams) -> Self {
		self.traffic = traffic;
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		Config {
			vswitch: VSwitchSettings {
				dir: self.vswitch_dir,
				active: self.vswitch_active,
				strip_suffix: self.strip_suffix,
			},
			deployment: DeploymentConfig {
				scenario: self.scenario,
				tunnel_operation: self.tunnel_operation,
			},
			traffic: self.traffic,
		}
	}
}
