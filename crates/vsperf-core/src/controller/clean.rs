//! Controller for the "clean" deployment.
//!
//! Used to bring the host back to a known state: it never instantiates the
//! switch, so there is nothing to set up or stop.

use super::{ControllerKind, VswitchController};
use crate::loader::VSwitchClass;
use vsperf_types::TrafficParams;
use vsperf_vswitch::{PortInfo, VSwitchError, VSwitchInterface};

/// Controller without a topology.
pub struct VswitchControllerClean {
	deployment: String,
	vswitch_class: VSwitchClass,
	traffic: TrafficParams,
}

impl VswitchControllerClean {
	pub fn new(deployment: String, vswitch_class: VSwitchClass, traffic: TrafficParams) -> Self {
		Self {
			deployment,
			vswitch_class,
			traffic,
		}
	}
}

impl VswitchController for VswitchControllerClean {
	fn kind(&self) -> ControllerKind {
		ControllerKind::Clean
	}

	fn deployment(&self) -> &str {
		&self.deployment
	}

	fn vswitch_class(&self) -> &VSwitchClass {
		&self.vswitch_class
	}

	fn traffic(&self) -> &TrafficParams {
		&self.traffic
	}

	fn setup(&mut self) -> Result<(), VSwitchError> {
		tracing::debug!(component = "controller", deployment = %self.deployment, "Nothing to set up");
		Ok(())
	}

	fn stop(&mut self) -> Result<(), VSwitchError> {
		Ok(())
	}

	fn vswitch(&self) -> Option<&dyn VSwitchInterface> {
		None
	}

	fn ports_info(&self) -> Result<Vec<PortInfo>, VSwitchError> {
		Ok(Vec::new())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::controller::test_support::dummy_class;

	#[test]
	fn test_clean_never_starts_switch() {
		let mut controller =
			VswitchControllerClean::new("clean".into(), dummy_class(), TrafficParams::default());

		controller.setup().unwrap();
		assert!(controller.vswitch().is_none());
		assert!(controller.ports_info().unwrap().is_empty());
		controller.stop().unwrap();
	}
}
