//! Deployment controllers.
//!
//! A controller owns the switch for the duration of one deployment: `setup`
//! instantiates the switch from its class and builds the topology, `stop`
//! tears it down again. Controllers are created by
//! [`crate::factory::create_controller`].

use crate::loader::VSwitchClass;
use std::fmt;
use vsperf_types::{TrafficParams, TunnelOperation};
use vsperf_vswitch::{FlowSpec, PortInfo, VSwitchError, VSwitchInterface};

pub mod clean;
pub mod op2p;
pub mod p2p;
pub mod ptunp;
pub mod pxp;

pub use clean::VswitchControllerClean;
pub use op2p::VswitchControllerOP2P;
pub use p2p::VswitchControllerP2P;
pub use ptunp::VswitchControllerPtunP;
pub use pxp::VswitchControllerPXP;

/// Name of the bridge every controller builds its topology on.
pub const BRIDGE: &str = "br0";

/// Remote tunnel endpoint used when traffic does not name one.
const DEFAULT_TUNNEL_REMOTE_IP: &str = "192.168.240.1";

/// The controller variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
	Clean,
	P2P,
	PXP,
	OP2P,
	PtunP,
}

impl fmt::Display for ControllerKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ControllerKind::Clean => "Clean",
			ControllerKind::P2P => "P2P",
			ControllerKind::PXP => "PXP",
			ControllerKind::OP2P => "OP2P",
			ControllerKind::PtunP => "PtunP",
		};
		f.write_str(name)
	}
}

/// Interface shared by all deployment controllers.
pub trait VswitchController: Send {
	/// Variant of this controller.
	fn kind(&self) -> ControllerKind;

	/// Lower-cased deployment scenario name.
	fn deployment(&self) -> &str;

	/// Class of the switch the controller drives.
	fn vswitch_class(&self) -> &VSwitchClass;

	/// Traffic parameters given at creation.
	fn traffic(&self) -> &TrafficParams;

	/// Tunnel operation of overlay deployments.
	fn tunnel_operation(&self) -> Option<TunnelOperation> {
		None
	}

	/// Instantiates the switch and builds the deployment topology.
	fn setup(&mut self) -> Result<(), VSwitchError>;

	/// Tears the topology down and stops the switch.
	fn stop(&mut self) -> Result<(), VSwitchError>;

	/// The running switch, if `setup` has been called.
	fn vswitch(&self) -> Option<&dyn VSwitchInterface>;

	/// Ports of the deployment bridge.
	fn ports_info(&self) -> Result<Vec<PortInfo>, VSwitchError>;
}

/// State common to the controllers that drive a switch.
pub(crate) struct ControllerBase {
	deployment: String,
	vswitch_class: VSwitchClass,
	traffic: TrafficParams,
	vswitch: Option<Box<dyn VSwitchInterface>>,
}

impl ControllerBase {
	pub(crate) fn new(
		deployment: String,
		vswitch_class: VSwitchClass,
		traffic: TrafficParams,
	) -> Self {
		Self {
			deployment,
			vswitch_class,
			traffic,
			vswitch: None,
		}
	}

	pub(crate) fn deployment(&self) -> &str {
		&self.deployment
	}

	pub(crate) fn vswitch_class(&self) -> &VSwitchClass {
		&self.vswitch_class
	}

	pub(crate) fn traffic(&self) -> &TrafficParams {
		&self.traffic
	}

	pub(crate) fn bidir(&self) -> bool {
		self.traffic.get_bool("bidir").unwrap_or(false)
	}

	pub(crate) fn tunnel_type(&self) -> &str {
		self.traffic.get_str("tunnel_type").unwrap_or("vxlan")
	}

	pub(crate) fn tunnel_remote_ip(&self) -> &str {
		self.traffic
			.get_str("tunnel_remote_ip")
			.unwrap_or(DEFAULT_TUNNEL_REMOTE_IP)
	}

	/// Instantiates and starts the switch, then creates the bridge.
	///
	/// Calling it again while the switch is running is an error.
	pub(crate) fn start(&mut self) -> Result<&mut dyn VSwitchInterface, VSwitchError> {
		if self.vswitch.is_some() {
			return Err(VSwitchError::Backend(format!(
				"deployment '{}' is already set up",
				self.deployment
			)));
		}
		tracing::info!(
			component = "controller",
			deployment = %self.deployment,
			vswitch = %self.vswitch_class.name(),
			"Setting up deployment"
		);
		let mut vswitch = self
			.vswitch_class
			.instantiate::<Box<dyn VSwitchInterface>, VSwitchError>()?;
		vswitch.start()?;
		vswitch.add_switch(BRIDGE)?;
		Ok(&mut **self.vswitch.insert(vswitch))
	}

	/// Removes flows and bridge and stops the switch. No-op when not set up.
	pub(crate) fn stop(&mut self) -> Result<(), VSwitchError> {
		let Some(mut vswitch) = self.vswitch.take() else {
			return Ok(());
		};
		tracing::info!(
			component = "controller",
			deployment = %self.deployment,
			"Tearing down deployment"
		);
		vswitch.del_flow(BRIDGE, None)?;
		vswitch.del_switch(BRIDGE)?;
		vswitch.stop()
	}

	pub(crate) fn vswitch(&self) -> Option<&dyn VSwitchInterface> {
		self.vswitch.as_deref()
	}

	pub(crate) fn ports_info(&self) -> Result<Vec<PortInfo>, VSwitchError> {
		self.vswitch
			.as_deref()
			.ok_or(VSwitchError::NotRunning)?
			.get_ports(BRIDGE)
	}
}

/// Installs `in -> out`, plus `out -> in` when `bidir` is set.
pub(crate) fn connect(
	vswitch: &mut dyn VSwitchInterface,
	in_port: &PortInfo,
	out_port: &PortInfo,
	bidir: bool,
) -> Result<(), VSwitchError> {
	vswitch.add_flow(BRIDGE, &FlowSpec::forward(in_port.number, out_port.number))?;
	if bidir {
		vswitch.add_flow(BRIDGE, &FlowSpec::forward(out_port.number, in_port.number))?;
	}
	Ok(())
}
