//! Controller for overlay physical-to-physical deployments.
//!
//! One physical port faces the traffic generator, a tunnel port faces the
//! remote endpoint. The tunnel operation decides which way traffic flows.

use super::{connect, ControllerBase, ControllerKind, VswitchController, BRIDGE};
use crate::loader::VSwitchClass;
use vsperf_types::{TrafficParams, TunnelOperation};
use vsperf_vswitch::{FlowSpec, PortInfo, VSwitchError, VSwitchInterface};

/// Physical port connected to a tunnel endpoint.
pub struct VswitchControllerOP2P {
	base: ControllerBase,
	tunnel_operation: Option<TunnelOperation>,
}

impl VswitchControllerOP2P {
	pub fn new(
		deployment: String,
		vswitch_class: VSwitchClass,
		traffic: TrafficParams,
		tunnel_operation: Option<TunnelOperation>,
	) -> Self {
		Self {
			base: ControllerBase::new(deployment, vswitch_class, traffic),
			tunnel_operation,
		}
	}
}

impl VswitchController for VswitchControllerOP2P {
	fn kind(&self) -> ControllerKind {
		ControllerKind::OP2P
	}

	fn deployment(&self) -> &str {
		self.base.deployment()
	}

	fn vswitch_class(&self) -> &VSwitchClass {
		self.base.vswitch_class()
	}

	fn traffic(&self) -> &TrafficParams {
		self.base.traffic()
	}

	fn tunnel_operation(&self) -> Option<TunnelOperation> {
		self.tunnel_operation
	}

	fn setup(&mut self) -> Result<(), VSwitchError> {
		let tunnel_type = self.base.tunnel_type().to_string();
		let remote_ip = self.base.tunnel_remote_ip().to_string();
		let operation = self.tunnel_operation;
		let vswitch = self.base.start()?;

		let phy = vswitch.add_phy_port(BRIDGE)?;
		let tunnel = vswitch.add_tunnel_port(BRIDGE, &remote_ip, &tunnel_type)?;
		tracing::debug!(
			component = "controller",
			tunnel = %tunnel.name,
			operation = ?operation,
			"Tunnel port added"
		);

		match operation {
			Some(TunnelOperation::Encapsulation) => {
				vswitch.add_flow(BRIDGE, &FlowSpec::forward(phy.number, tunnel.number))
			},
			Some(TunnelOperation::Decapsulation) => {
				vswitch.add_flow(BRIDGE, &FlowSpec::forward(tunnel.number, phy.number))
			},
			None => connect(vswitch, &phy, &tunnel, true),
		}
	}

	fn stop(&mut self) -> Result<(), VSwitchError> {
		self.base.stop()
	}

	fn vswitch(&self) -> Option<&dyn VSwitchInterface> {
		self.base.vswitch()
	}

	fn ports_info(&self) -> Result<Vec<PortInfo>, VSwitchError> {
		self.base.ports_info()
	}
}
