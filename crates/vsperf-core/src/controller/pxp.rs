//! Controller for deployments with virtual machines between two physical
//! ports: "pvp", "pvvp" and "pvpv".
//!
//! The number of VMs follows the scenario prefix and may be overridden by a
//! numeric suffix: "pvvp4" chains four VMs, "pvpv3" runs three side by side.

use super::{connect, ControllerBase, ControllerKind, VswitchController, BRIDGE};
use crate::loader::VSwitchClass;
use vsperf_types::TrafficParams;
use vsperf_vswitch::{PortInfo, VSwitchError, VSwitchInterface};

/// Most VMs a single deployment may request.
pub const MAX_VM_COUNT: usize = 1024;

/// How VMs are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmTopology {
	/// Traffic passes every VM in turn.
	Serial,
	/// Every VM receives its own share of the traffic.
	Parallel,
}

/// Derives the VM topology and count from a scenario name.
///
/// A numeric suffix too large for `usize` saturates, so it is reported as too
/// many VMs instead of silently falling back to the default.
pub fn parse_topology(deployment: &str) -> (VmTopology, usize) {
	let (topology, rest, default) = if let Some(rest) = deployment.strip_prefix("pvvp") {
		(VmTopology::Serial, rest, 2)
	} else if let Some(rest) = deployment.strip_prefix("pvpv") {
		(VmTopology::Parallel, rest, 2)
	} else {
		let rest = deployment.strip_prefix("pvp").unwrap_or_default();
		(VmTopology::Serial, rest, 1)
	};

	let count = if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
		rest.parse::<usize>().unwrap_or(usize::MAX)
	} else {
		0
	};
	let count = if count == 0 { default } else { count };
	(topology, count)
}

/// Physical ports connected through one or more VMs.
pub struct VswitchControllerPXP {
	base: ControllerBase,
	topology: VmTopology,
	vm_count: usize,
}

impl VswitchControllerPXP {
	pub fn new(deployment: String, vswitch_class: VSwitchClass, traffic: TrafficParams) -> Self {
		let (topology, vm_count) = parse_topology(&deployment);
		Self {
			base: ControllerBase::new(deployment, vswitch_class, traffic),
			topology,
			vm_count,
		}
	}

	pub fn topology(&self) -> VmTopology {
		self.topology
	}

	pub fn vm_count(&self) -> usize {
		self.vm_count
	}
}

impl VswitchController for VswitchControllerPXP {
	fn kind(&self) -> ControllerKind {
		ControllerKind::PXP
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
		let (topology, vm_count) = (self.topology, self.vm_count);
		if vm_count > MAX_VM_COUNT {
			return Err(VSwitchError::Exhausted(format!(
				"deployment '{}' requests {} VMs, at most {} are supported",
				self.base.deployment(),
				vm_count,
				MAX_VM_COUNT
			)));
		}
		let vswitch = self.base.start()?;

		let phy1 = vswitch.add_phy_port(BRIDGE)?;
		let phy2 = vswitch.add_phy_port(BRIDGE)?;
		let mut vms = Vec::new();
		for _ in 0..vm_count {
			let vm_in = vswitch.add_vport(BRIDGE)?;
			let vm_out = vswitch.add_vport(BRIDGE)?;
			vms.push((vm_in, vm_out));
		}

		match topology {
			VmTopology::Serial => {
				let mut previous = &phy1;
				for (vm_in, vm_out) in &vms {
					connect(vswitch, previous, vm_in, bidir)?;
					previous = vm_out;
				}
				connect(vswitch, previous, &phy2, bidir)
			},
			VmTopology::Parallel => {
				for (vm_in, vm_out) in &vms {
					connect(vswitch, &phy1, vm_in, bidir)?;
					connect(vswitch, vm_out, &phy2, bidir)?;
				}
				Ok(())
			},
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

#[cfg(test)]
mod tests {
	use super::*;
	use crate::controller::test_support::dummy_class;
	use vsperf_vswitch::{FlowSpec, PortKind};

	#[test]
	fn test_parse_topology() {
		assert_eq!(parse_topology("pvp"), (VmTopology::Serial, 1));
		assert_eq!(parse_topology("pvp3"), (VmTopology::Serial, 3));
		assert_eq!(parse_topology("pvvp"), (VmTopology::Serial, 2));
		assert_eq!(parse_topology("pvvp4"), (VmTopology::Serial, 4));
		assert_eq!(parse_topology("pvpv"), (VmTopology::Parallel, 2));
		assert_eq!(parse_topology("pvpv12"), (VmTopology::Parallel, 12));
		// Unparsable or zero suffixes fall back to the prefix default
		assert_eq!(parse_topology("pvp_tput"), (VmTopology::Serial, 1));
		assert_eq!(parse_topology("pvvp0"), (VmTopology::Serial, 2));
		assert_eq!(
			parse_topology("pvp200000000000000000"),
			(VmTopology::Serial, usize::MAX)
		);
	}

	#[test]
	fn test_too_many_vms_rejected() {
		for deployment in ["pvp200000000000000000", "pvvp1025", "pvpv99999999"] {
			let mut controller = VswitchControllerPXP::new(
				deployment.into(),
				dummy_class(),
				TrafficParams::default(),
			);
			assert!(matches!(
				controller.setup(),
				Err(VSwitchError::Exhausted(_))
			));
			// Nothing was instantiated
			assert!(controller.vswitch().is_none());
		}
	}

	#[test]
	fn test_serial_chain() {
		let mut controller =
			VswitchControllerPXP::new("pvvp".into(), dummy_class(), TrafficParams::default());
		controller.setup().unwrap();

		let ports = controller.ports_info().unwrap();
		assert_eq!(ports.len(), 6);
		assert_eq!(
			ports.iter().filter(|p| p.kind == PortKind::Virtual).count(),
			4
		);

		// phy1=1 phy2=2, vm1=(3,4), vm2=(5,6)
		let flows = controller.vswitch().unwrap().dump_flows(BRIDGE).unwrap();
		assert_eq!(
			flows,
			vec![
				FlowSpec::forward(1, 3),
				FlowSpec::forward(4, 5),
				FlowSpec::forward(6, 2),
			]
		);
	}

	#[test]
	fn test_parallel_fan_out() {
		let mut controller =
			VswitchControllerPXP::new("pvpv2".into(), dummy_class(), TrafficParams::default());
		assert_eq!(controller.topology(), VmTopology::Parallel);
		assert_eq!(controller.vm_count(), 2);
		controller.setup().unwrap();

		let flows = controller.vswitch().unwrap().dump_flows(BRIDGE).unwrap();
		assert_eq!(
			flows,
			vec![
				FlowSpec::forward(1, 3),
				FlowSpec::forward(4, 2),
				FlowSpec::forward(1, 5),
				FlowSpec::forward(6, 2),
			]
		);
		controller.stop().unwrap();
	}
}
