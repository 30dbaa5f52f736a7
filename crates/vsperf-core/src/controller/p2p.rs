//! Controller for physical-to-physical deployments.

use super::{connect, ControllerBase, ControllerKind, VswitchController};
use crate::loader::VSwitchClass;
use vsperf_types::TrafficParams;
use vsperf_vswitch::{PortInfo, VSwitchError, VSwitchInterface};

/// Forwards traffic between two physical ports of a single bridge.
pub struct VswitchControllerP2P {
	base: ControllerBase,
}

impl VswitchControllerP2P {
	pub fn new(deployment: String, vswitch_class: VSwitchClass, traffic: TrafficParams) -> Self {
		Self {
			base: ControllerBase::new(deployment, vswitch_class, traffic),
		}
	}
}

impl VswitchController for VswitchControllerP2P {
	fn kind(&self) -> ControllerKind {
		ControllerKind::P2P
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
		let bidir = self.base.bidir();
		let vswitch = self.base.start()?;

		let phy1 = vswitch.add_phy_port(super::BRIDGE)?;
		let phy2 = vswitch.add_phy_port(super::BRIDGE)?;
		connect(vswitch, &phy1, &phy2, bidir)
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
