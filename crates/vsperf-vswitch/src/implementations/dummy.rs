//! In-memory switch implementation.
//!
//! Records bridges, ports and flows without touching the host. Used for dry
//! runs of a deployment and as the switch behind controller tests.

use crate::{FlowSpec, PortInfo, PortKind, VSwitchError, VSwitchInterface};
use std::collections::BTreeMap;
use vsperf_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};

const DEFAULT_PHY_NICS: [&str; 2] = ["phy0", "phy1"];
const DEFAULT_MAX_PORTS: usize = 64;

#[derive(Debug, Default)]
struct Bridge {
	ports: Vec<PortInfo>,
	flows: Vec<FlowSpec>,
	next_port: u32,
}

impl Bridge {
	fn attach(&mut self, name: String, kind: PortKind) -> PortInfo {
		self.next_port += 1;
		let port = PortInfo {
			name,
			number: self.next_port,
			kind,
		};
		self.ports.push(port.clone());
		port
	}
}

/// Switch keeping its whole state in memory.
pub struct DummySwitch {
	phy_nics: Vec<String>,
	max_ports: usize,
	running: bool,
	bridges: BTreeMap<String, Bridge>,
	/// Physical NICs are shared by all bridges of the switch
	phy_in_use: usize,
	vport_count: usize,
}

impl DummySwitch {
	/// Creates a stopped switch using the given physical NICs.
	pub fn new(phy_nics: Vec<String>, max_ports: usize) -> Self {
		Self {
			phy_nics,
			max_ports,
			running: false,
			bridges: BTreeMap::new(),
			phy_in_use: 0,
			vport_count: 0,
		}
	}

	/// Returns true between `start` and `stop`.
	pub fn is_running(&self) -> bool {
		self.running
	}

	fn bridge_mut(&mut self, switch_name: &str) -> Result<&mut Bridge, VSwitchError> {
		if !self.running {
			return Err(VSwitchError::NotRunning);
		}
		let max_ports = self.max_ports;
		let bridge = self
			.bridges
			.get_mut(switch_name)
			.ok_or_else(|| VSwitchError::UnknownSwitch(switch_name.to_string()))?;
		if bridge.ports.len() >= max_ports {
			return Err(VSwitchError::Exhausted(format!(
				"switch '{}' already has {} ports",
				switch_name, max_ports
			)));
		}
		Ok(bridge)
	}

	fn bridge(&self, switch_name: &str) -> Result<&Bridge, VSwitchError> {
		if !self.running {
			return Err(VSwitchError::NotRunning);
		}
		self.bridges
			.get(switch_name)
			.ok_or_else(|| VSwitchError::UnknownSwitch(switch_name.to_string()))
	}
}

impl Default for DummySwitch {
	fn default() -> Self {
		Self::new(
			DEFAULT_PHY_NICS.iter().map(|nic| nic.to_string()).collect(),
			DEFAULT_MAX_PORTS,
		)
	}
}

impl VSwitchInterface for DummySwitch {
	fn start(&mut self) -> Result<(), VSwitchError> {
		tracing::debug!(implementation = "dummy", "Starting switch");
		self.running = true;
		Ok(())
	}

	fn stop(&mut self) -> Result<(), VSwitchError> {
		tracing::debug!(implementation = "dummy", "Stopping switch");
		self.running = false;
		self.bridges.clear();
		self.phy_in_use = 0;
		self.vport_count = 0;
		Ok(())
	}

	fn add_switch(&mut self, switch_name: &str) -> Result<(), VSwitchError> {
		if !self.running {
			return Err(VSwitchError::NotRunning);
		}
		if self.bridges.contains_key(switch_name) {
			return Err(VSwitchError::SwitchExists(switch_name.to_string()));
		}
		self.bridges
			.insert(switch_name.to_string(), Bridge::default());
		Ok(())
	}

	fn del_switch(&mut self, switch_name: &str) -> Result<(), VSwitchError> {
		if !self.running {
			return Err(VSwitchError::NotRunning);
		}
		let bridge = self
			.bridges
			.remove(switch_name)
			.ok_or_else(|| VSwitchError::UnknownSwitch(switch_name.to_string()))?;
		let released = bridge
			.ports
			.iter()
			.filter(|port| port.kind == PortKind::Physical)
			.count();
		self.phy_in_use -= released;
		Ok(())
	}

	fn add_phy_port(&mut self, switch_name: &str) -> Result<PortInfo, VSwitchError> {
		let nic = self
			.phy_nics
			.get(self.phy_in_use)
			.cloned()
			.ok_or_else(|| {
				VSwitchError::Exhausted(format!(
					"all {} physical NICs are in use",
					self.phy_nics.len()
				))
			})?;
		let port = self
			.bridge_mut(switch_name)?
			.attach(nic, PortKind::Physical);
		self.phy_in_use += 1;
		Ok(port)
	}

	fn add_vport(&mut self, switch_name: &str) -> Result<PortInfo, VSwitchError> {
		let name = format!("dpdkvhostuser{}", self.vport_count);
		let port = self
			.bridge_mut(switch_name)?
			.attach(name, PortKind::Virtual);
		self.vport_count += 1;
		Ok(port)
	}

	fn add_tunnel_port(
		&mut self,
		switch_name: &str,
		remote_ip: &str,
		tunnel_type: &str,
	) -> Result<PortInfo, VSwitchError> {
		if remote_ip.is_empty() {
			return Err(VSwitchError::Backend(
				"tunnel port needs a remote address".into(),
			));
		}
		let bridge = self.bridge_mut(switch_name)?;
		let name = format!("{}{}", tunnel_type, bridge.next_port + 1);
		Ok(bridge.attach(name, PortKind::Tunnel))
	}

	fn del_port(&mut self, switch_name: &str, port_name: &str) -> Result<(), VSwitchError> {
		if !self.running {
			return Err(VSwitchError::NotRunning);
		}
		let bridge = self
			.bridges
			.get_mut(switch_name)
			.ok_or_else(|| VSwitchError::UnknownSwitch(switch_name.to_string()))?;
		let index = bridge
			.ports
			.iter()
			.position(|port| port.name == port_name)
			.ok_or_else(|| VSwitchError::UnknownPort {
				switch: switch_name.to_string(),
				port: port_name.to_string(),
			})?;
		let port = bridge.ports.remove(index);
		bridge
			.flows
			.retain(|flow| flow.in_port != port.number && flow.out_port != port.number);
		if port.kind == PortKind::Physical {
			self.phy_in_use -= 1;
		}
		Ok(())
	}

	fn get_ports(&self, switch_name: &str) -> Result<Vec<PortInfo>, VSwitchError> {
		Ok(self.bridge(switch_name)?.ports.clone())
	}

	fn add_flow(&mut self, switch_name: &str, flow: &FlowSpec) -> Result<(), VSwitchError> {
		let bridge = self.bridge(switch_name)?;
		for number in [flow.in_port, flow.out_port] {
			if !bridge.ports.iter().any(|port| port.number == number) {
				return Err(VSwitchError::UnknownPort {
					switch: switch_name.to_string(),
					port: number.to_string(),
				});
			}
		}
		if let Some(bridge) = self.bridges.get_mut(switch_name) {
			bridge.flows.push(flow.clone());
		}
		Ok(())
	}

	fn del_flow(
		&mut self,
		switch_name: &str,
		flow: Option<&FlowSpec>,
	) -> Result<(), VSwitchError> {
		self.bridge(switch_name)?;
		if let Some(bridge) = self.bridges.get_mut(switch_name) {
			match flow {
				Some(flow) => bridge.flows.retain(|installed| installed != flow),
				None => bridge.flows.clear(),
			}
		}
		Ok(())
	}

	fn dump_flows(&self, switch_name: &str) -> Result<Vec<FlowSpec>, VSwitchError> {
		Ok(self.bridge(switch_name)?.flows.clone())
	}
}

/// Settings schema for DummySwitch.
pub struct DummySwitchSchema;

impl ConfigSchema for DummySwitchSchema {
	fn validate(&self, settings: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("phy_nics", FieldType::Array(Box::new(FieldType::String)))
					.with_validator(|value| match value.as_array() {
						Some(nics) if nics.is_empty() => {
							Err("at least one NIC is required".to_string())
						},
						_ => Ok(()),
					}),
				Field::new(
					"max_ports",
					FieldType::Integer {
						min: Some(1),
						max: Some(65279),
					},
				),
			],
		);
		schema.validate(settings)
	}
}

/// Factory function to create a dummy switch from descriptor settings.
///
/// Optional settings:
/// - `phy_nics`: names of the physical NICs (default `["phy0", "phy1"]`)
/// - `max_ports`: ports allowed per bridge (default 64)
pub fn create_vswitch(settings: &toml::Value) -> Result<Box<dyn VSwitchInterface>, VSwitchError> {
	DummySwitchSchema.validate(settings)?;

	let phy_nics = settings
		.get("phy_nics")
		.and_then(|v| v.as_array())
		.map(|nics| {
			nics.iter()
				.filter_map(|nic| nic.as_str().map(str::to_string))
				.collect()
		})
		.unwrap_or_else(|| DEFAULT_PHY_NICS.iter().map(|nic| nic.to_string()).collect());

	let max_ports = settings
		.get("max_ports")
		.and_then(|v| v.as_integer())
		.map(|v| v as usize)
		.unwrap_or(DEFAULT_MAX_PORTS);

	Ok(Box::new(DummySwitch::new(phy_nics, max_ports)))
}

/// Registry for the dummy switch implementation.
pub struct Registry;

impl vsperf_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "dummy";
	const DESCRIPTION: &'static str = "In-memory switch recording bridges, ports and flows";
	type Factory = crate::VSwitchFactory;

	fn factory() -> Self::Factory {
		create_vswitch
	}
}

impl crate::VSwitchRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	fn started() -> DummySwitch {
		let mut switch = DummySwitch::default();
		switch.start().unwrap();
		switch.add_switch("br0").unwrap();
		switch
	}

	#[test]
	fn test_requires_start() {
		let mut switch = DummySwitch::default();
		assert!(matches!(
			switch.add_switch("br0"),
			Err(VSwitchError::NotRunning)
		));
		switch.start().unwrap();
		assert!(switch.is_running());
		switch.add_switch("br0").unwrap();
		assert!(matches!(
			switch.add_switch("br0"),
			Err(VSwitchError::SwitchExists(_))
		));
	}

	#[test]
	fn test_ports_and_flows() {
		let mut switch = started();
		let phy0 = switch.add_phy_port("br0").unwrap();
		let phy1 = switch.add_phy_port("br0").unwrap();
		assert_eq!(phy0.name, "phy0");
		assert_eq!((phy0.number, phy1.number), (1, 2));

		let flow = FlowSpec::forward(phy0.number, phy1.number);
		switch.add_flow("br0", &flow).unwrap();
		assert_eq!(switch.dump_flows("br0").unwrap(), vec![flow.clone()]);

		// Removing a port drops the flows using it
		switch.del_port("br0", "phy1").unwrap();
		assert!(switch.dump_flows("br0").unwrap().is_empty());
		assert_eq!(switch.get_ports("br0").unwrap().len(), 1);
	}

	#[test]
	fn test_flow_on_unknown_port() {
		let mut switch = started();
		let phy0 = switch.add_phy_port("br0").unwrap();
		let result = switch.add_flow("br0", &FlowSpec::forward(phy0.number, 9));
		assert!(matches!(result, Err(VSwitchError::UnknownPort { .. })));
	}

	#[test]
	fn test_physical_nics_exhausted() {
		let mut switch = started();
		switch.add_phy_port("br0").unwrap();
		switch.add_phy_port("br0").unwrap();
		assert!(matches!(
			switch.add_phy_port("br0"),
			Err(VSwitchError::Exhausted(_))
		));

		// Deleting the bridge releases its NICs
		switch.del_switch("br0").unwrap();
		switch.add_switch("br1").unwrap();
		assert_eq!(switch.add_phy_port("br1").unwrap().name, "phy0");
	}

	#[test]
	fn test_vports_and_tunnels() {
		let mut switch = started();
		assert_eq!(switch.add_vport("br0").unwrap().name, "dpdkvhostuser0");
		assert_eq!(switch.add_vport("br0").unwrap().name, "dpdkvhostuser1");
		let tunnel = switch
			.add_tunnel_port("br0", "192.168.240.1", "vxlan")
			.unwrap();
		assert_eq!(tunnel.kind, PortKind::Tunnel);
		assert_eq!(tunnel.name, "vxlan3");
		assert!(switch.add_tunnel_port("br0", "", "vxlan").is_err());
	}

	#[test]
	fn test_del_flow() {
		let mut switch = started();
		let a = switch.add_phy_port("br0").unwrap().number;
		let b = switch.add_vport("br0").unwrap().number;
		switch.add_flow("br0", &FlowSpec::forward(a, b)).unwrap();
		switch.add_flow("br0", &FlowSpec::forward(b, a)).unwrap();

		switch
			.del_flow("br0", Some(&FlowSpec::forward(a, b)))
			.unwrap();
		assert_eq!(
			switch.dump_flows("br0").unwrap(),
			vec![FlowSpec::forward(b, a)]
		);
		switch.del_flow("br0", None).unwrap();
		assert!(switch.dump_flows("br0").unwrap().is_empty());
	}

	#[test]
	fn test_stop_discards_state() {
		let mut switch = started();
		switch.add_phy_port("br0").unwrap();
		switch.stop().unwrap();
		switch.start().unwrap();
		assert!(matches!(
			switch.get_ports("br0"),
			Err(VSwitchError::UnknownSwitch(_))
		));
	}

	#[test]
	fn test_factory_settings() {
		let settings: toml::Value = toml::from_str(
			r#"
phy_nics = ["eth0"]
max_ports = 2
"#,
		)
		.unwrap();
		let mut switch = create_vswitch(&settings).unwrap();
		switch.start().unwrap();
		switch.add_switch("br0").unwrap();
		assert_eq!(switch.add_phy_port("br0").unwrap().name, "eth0");
		switch.add_vport("br0").unwrap();
		assert!(matches!(
			switch.add_vport("br0"),
			Err(VSwitchError::Exhausted(_))
		));
	}

	#[test]
	fn test_factory_rejects_bad_settings() {
		let settings: toml::Value = toml::from_str("max_ports = 0").unwrap();
		assert!(matches!(
			create_vswitch(&settings),
			Err(VSwitchError::InvalidSettings(_))
		));

		let settings: toml::Value = toml::from_str("phy_nics = []").unwrap();
		assert!(create_vswitch(&settings).is_err());

		let settings: toml::Value = toml::from_str("bridge = \"br0\"").unwrap();
		assert!(matches!(
			create_vswitch(&settings),
			Err(VSwitchError::InvalidSettings(ValidationError::UnknownField(_)))
		));
	}
}
