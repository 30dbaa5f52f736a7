//! Virtual switch module for vsperf.
//!
//! Defines the capability contract every switch implementation provides to the
//! deployment controllers, together with the list of implementations compiled
//! into this crate. Which of them is used, and under which name, is decided by
//! the descriptor files found during discovery.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use vsperf_types::{CapabilityContract, ImplementationRegistry, Registration, ValidationError};

/// Re-export implementations
pub mod implementations {
	pub mod dummy;
}

/// Errors that can occur while controlling a switch.
#[derive(Debug, Error)]
pub enum VSwitchError {
	/// The switch settings were rejected by the implementation.
	#[error("Invalid settings: {0}")]
	InvalidSettings(#[from] ValidationError),
	/// An operation was issued before `start` or after `stop`.
	#[error("Switch is not running")]
	NotRunning,
	/// A referenced bridge does not exist.
	#[error("Unknown switch '{0}'")]
	UnknownSwitch(String),
	/// A bridge with this name already exists.
	#[error("Switch '{0}' already exists")]
	SwitchExists(String),
	/// A referenced port does not exist.
	#[error("Unknown port '{port}' on switch '{switch}'")]
	UnknownPort { switch: String, port: String },
	/// The implementation ran out of a finite resource.
	#[error("Resource exhausted: {0}")]
	Exhausted(String),
	/// Any other failure reported by the switch backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Kind of a switch port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
	/// Port bound to a physical NIC.
	Physical,
	/// Port connected to a virtual machine.
	Virtual,
	/// Tunnel endpoint port.
	Tunnel,
}

/// A port attached to a bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
	/// Port name, unique within the switch.
	pub name: String,
	/// OpenFlow port number.
	pub number: u32,
	pub kind: PortKind,
}

/// A forwarding rule between two ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSpec {
	pub in_port: u32,
	pub out_port: u32,
	/// Optional priority, higher wins.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub priority: Option<u16>,
}

impl FlowSpec {
	/// Creates a flow forwarding everything from `in_port` to `out_port`.
	pub fn forward(in_port: u32, out_port: u32) -> Self {
		Self {
			in_port,
			out_port,
			priority: None,
		}
	}
}

impl fmt::Display for FlowSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if let Some(priority) = self.priority {
			write!(f, "priority={},", priority)?;
		}
		write!(f, "in_port={},actions=output:{}", self.in_port, self.out_port)
	}
}

/// Capability contract every switch implementation provides.
///
/// Controllers drive the switch exclusively through this trait: they start it,
/// build bridges and ports for their topology, install flows and tear it all
/// down again.
pub trait VSwitchInterface: Send {
	/// Starts the switch processes.
	fn start(&mut self) -> Result<(), VSwitchError>;

	/// Stops the switch, discarding all bridges.
	fn stop(&mut self) -> Result<(), VSwitchError>;

	/// Creates a bridge.
	fn add_switch(&mut self, switch_name: &str) -> Result<(), VSwitchError>;

	/// Deletes a bridge with all its ports and flows.
	fn del_switch(&mut self, switch_name: &str) -> Result<(), VSwitchError>;

	/// Adds a port bound to the next free physical NIC.
	fn add_phy_port(&mut self, switch_name: &str) -> Result<PortInfo, VSwitchError>;

	/// Adds a port for a virtual machine interface.
	fn add_vport(&mut self, switch_name: &str) -> Result<PortInfo, VSwitchError>;

	/// Adds a tunnel endpoint of the given type (e.g. "vxlan") to `remote_ip`.
	fn add_tunnel_port(
		&mut self,
		switch_name: &str,
		remote_ip: &str,
		tunnel_type: &str,
	) -> Result<PortInfo, VSwitchError>;

	/// Removes a port.
	fn del_port(&mut self, switch_name: &str, port_name: &str) -> Result<(), VSwitchError>;

	/// Lists the ports of a bridge in creation order.
	fn get_ports(&self, switch_name: &str) -> Result<Vec<PortInfo>, VSwitchError>;

	/// Installs a flow.
	fn add_flow(&mut self, switch_name: &str, flow: &FlowSpec) -> Result<(), VSwitchError>;

	/// Removes a flow, or every flow of the bridge when `flow` is `None`.
	fn del_flow(&mut self, switch_name: &str, flow: Option<&FlowSpec>)
		-> Result<(), VSwitchError>;

	/// Lists installed flows.
	fn dump_flows(&self, switch_name: &str) -> Result<Vec<FlowSpec>, VSwitchError>;
}

/// Type alias for switch factory functions.
///
/// The argument is the `[settings]` table of the descriptor that selected the
/// implementation.
pub type VSwitchFactory = fn(&toml::Value) -> Result<Box<dyn VSwitchInterface>, VSwitchError>;

/// Registry trait for switch implementations.
pub trait VSwitchRegistry: ImplementationRegistry<Factory = VSwitchFactory> {}

/// Get all registered switch implementations.
pub fn get_all_implementations() -> Vec<Registration<VSwitchFactory>> {
	use implementations::dummy;

	vec![Registration::of::<dummy::Registry>()]
}

/// Marker type for the switch capability contract.
///
/// Descriptors select it with `contract = "vswitch"`.
pub struct VSwitchContract;

impl CapabilityContract for VSwitchContract {
	const NAME: &'static str = "vswitch";
	type Factory = VSwitchFactory;

	fn implementations() -> Vec<Registration<Self::Factory>> {
		get_all_implementations()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_contract_lists_dummy() {
		let registration = VSwitchContract::implementation("dummy").unwrap();
		assert_eq!(registration.name, implementations::dummy::Registry::NAME);
		assert!(!registration.description.is_empty());

		let switch = (registration.factory)(&toml::Value::Table(toml::Table::new()));
		assert!(switch.is_ok());
	}

	#[test]
	fn test_flow_display() {
		let mut flow = FlowSpec::forward(1, 2);
		assert_eq!(flow.to_string(), "in_port=1,actions=output:2");
		flow.priority = Some(10);
		assert_eq!(flow.to_string(), "priority=10,in_port=1,actions=output:2");
	}
}
