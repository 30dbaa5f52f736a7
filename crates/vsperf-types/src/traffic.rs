//! Traffic parameters and tunnel operations handed to deployment controllers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque traffic settings.
///
/// The selection layer never interprets these; they are passed unchanged to
/// the controller, which may read well-known keys such as `bidir` or
/// `tunnel_type`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TrafficParams(toml::Table);

impl TrafficParams {
	/// Creates traffic parameters from a TOML table.
	pub fn new(table: toml::Table) -> Self {
		Self(table)
	}

	/// Returns the raw value of a setting.
	pub fn get(&self, key: &str) -> Option<&toml::Value> {
		self.0.get(key)
	}

	/// Returns a boolean setting. Strings "true"/"false" are accepted as well.
	pub fn get_bool(&self, key: &str) -> Option<bool> {
		match self.0.get(key)? {
			toml::Value::Boolean(b) => Some(*b),
			toml::Value::String(s) => s.to_ascii_lowercase().parse().ok(),
			_ => None,
		}
	}

	/// Returns a string setting.
	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.0.get(key).and_then(|v| v.as_str())
	}

	/// Sets a value, replacing any previous one.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) {
		self.0.insert(key.into(), value.into());
	}

	/// Returns the underlying table.
	pub fn as_table(&self) -> &toml::Table {
		&self.0
	}
}

impl From<toml::Table> for TrafficParams {
	fn from(table: toml::Table) -> Self {
		Self(table)
	}
}

/// Error returned when parsing an unknown tunnel operation.
#[derive(Debug, Error)]
#[error("Unknown tunnel operation '{0}', expected 'encapsulation' or 'decapsulation'")]
pub struct ParseTunnelOperationError(String);

/// Operation performed by overlay deployments on the tunnel endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelOperation {
	/// Traffic enters on the physical port and leaves encapsulated.
	Encapsulation,
	/// Encapsulated traffic is received and leaves on the physical port.
	Decapsulation,
}

impl TunnelOperation {
	pub fn as_str(&self) -> &'static str {
		match self {
			TunnelOperation::Encapsulation => "encapsulation",
			TunnelOperation::Decapsulation => "decapsulation",
		}
	}
}

impl fmt::Display for TunnelOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for TunnelOperation {
	type Err = ParseTunnelOperationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"encapsulation" => Ok(TunnelOperation::Encapsulation),
			"decapsulation" => Ok(TunnelOperation::Decapsulation),
			_ => Err(ParseTunnelOperationError(s.to_string())),
		}
	}
}
