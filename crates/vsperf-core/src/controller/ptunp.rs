//! Controller for physical-tunnel-physical deployments.

use super::{ControllerBase, ControllerKind, VswitchController, BRIDGE};
use crate::loader::VSwitchClass;
use vsperf_types::TrafficParams;
use vsperf_vswitch::{FlowSpec, PortInfo, VSwitchError, VSwitchInterface};

/// Traffic enters a physical port, crosses a tunnel endpoint and leaves on
/// the second physical port.
pub struct VswitchControllerPtunP {
	base: ControllerBase,
}

impl VswitchControllerPtunP {
	pub fn new(deployment: String, vswitch_class: VSwitchClass, traffic: TrafficParams) -> Self {
		Self {
			base: ControllerBase::new(deployment, vswitch_class, traffic),
		}
	}
}

impl VswitchController for VswitchControllerPtunP {
	fn kind(&self) -> ControllerKind {
		ControllerKind::PtunP
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

	fn setup(&mut self) -> Result<(), VSwitchError> {
		let tunnel_type = self.base.tunnel_type().to_string();
		let remote_ip = self.base.tunnel_remote_ip().to_string();
		let vswitch = self.base.start()?;

		let phy1 = vswitch.add_phy_port(BRIDGE)?;
		let phy2 = vswitch.add_phy_port(BRIDGE)?;
		let tunnel = vswitch.add_tunnel_port(BRIDGE, &remote_ip, &tunnel_type)?;

		vswitch.add_flow(BRIDGE, &FlowSpec::forward(phy1.number, tunnel.number))?;
		vswitch.add_flow(BRIDGE, &FlowSpec::forward(tunnel.number, phy2.number))
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
