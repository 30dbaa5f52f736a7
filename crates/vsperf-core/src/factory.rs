//! Creation of deployment controllers from scenario names.
//!
//! Scenario names are free-form and matched by prefix, so "pvp_cont" or
//! "p2p_tput" reach the same controllers as "pvp" and "p2p".

use crate::controller::{
	VswitchController, VswitchControllerClean, VswitchControllerOP2P, VswitchControllerP2P,
	VswitchControllerPXP, VswitchControllerPtunP,
};
use crate::loader::VSwitchClass;
use thiserror::Error;
use vsperf_types::{TrafficParams, TunnelOperation};

/// Errors returned when selecting a controller.
#[derive(Debug, Error)]
pub enum DispatchError {
	/// No controller handles the scenario.
	#[error("Unknown deployment scenario '{0}'.")]
	UnknownScenario(String),
}

/// Returns a new controller for `deployment_scenario`, driving switches of
/// `vswitch_class`.
///
/// Prefixes are checked in a fixed order and the first match wins. "pvvp" and
/// "pvpv" come after "pvp" and therefore never match on their own; all three
/// families end up in the PXP controller, which tells them apart itself.
///
/// Nothing is instantiated or touched on the host until the controller's
/// `setup` is called.
pub fn create_controller(
	deployment_scenario: &str,
	vswitch_class: VSwitchClass,
	traffic: TrafficParams,
	tunnel_operation: Option<TunnelOperation>,
) -> Result<Box<dyn VswitchController>, DispatchError> {
	let deployment = deployment_scenario.to_lowercase();
	tracing::debug!(
		component = "factory",
		deployment = %deployment,
		vswitch = %vswitch_class.name(),
		"Creating controller"
	);

	if deployment.starts_with("p2p") {
		Ok(Box::new(VswitchControllerP2P::new(deployment, vswitch_class, traffic)))
	} else if deployment.starts_with("pvp") {
		Ok(Box::new(VswitchControllerPXP::new(deployment, vswitch_class, traffic)))
	} else if deployment.starts_with("pvvp") {
		Ok(Box::new(VswitchControllerPXP::new(deployment, vswitch_class, traffic)))
	} else if deployment.starts_with("pvpv") {
		Ok(Box::new(VswitchControllerPXP::new(deployment, vswitch_class, traffic)))
	} else if deployment.starts_with("op2p") {
		Ok(Box::new(VswitchControllerOP2P::new(
			deployment,
			vswitch_class,
			traffic,
			tunnel_operation,
		)))
	} else if deployment.starts_with("ptunp") {
		Ok(Box::new(VswitchControllerPtunP::new(deployment, vswitch_class, traffic)))
	} else if deployment.starts_with("clean") {
		Ok(Box::new(VswitchControllerClean::new(deployment, vswitch_class, traffic)))
	} else {
		Err(DispatchError::UnknownScenario(deployment))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::controller::test_support::{dummy_class, traffic};
	use crate::controller::ControllerKind;

	fn kind_of(scenario: &str) -> ControllerKind {
		create_controller(scenario, dummy_class(), TrafficParams::default(), None)
			.unwrap()
			.kind()
	}

	#[test]
	fn test_prefix_dispatch() {
		assert_eq!(kind_of("p2p"), ControllerKind::P2P);
		assert_eq!(kind_of("pvp"), ControllerKind::PXP);
		assert_eq!(kind_of("pvvp"), ControllerKind::PXP);
		assert_eq!(kind_of("pvpv12"), ControllerKind::PXP);
		assert_eq!(kind_of("op2p"), ControllerKind::OP2P);
		assert_eq!(kind_of("ptunp"), ControllerKind::PtunP);
		assert_eq!(kind_of("clean"), ControllerKind::Clean);
	}

	#[test]
	fn test_pvp_shadows_longer_prefixes() {
		assert_eq!(kind_of("pvvp12"), kind_of("pvp12"));
		assert_eq!(kind_of("pvpv4"), ControllerKind::PXP);
	}

	#[test]
	fn test_case_insensitive() {
		assert_eq!(kind_of("P2P"), kind_of("p2p"));

		let controller =
			create_controller("PvVp4", dummy_class(), TrafficParams::default(), None).unwrap();
		assert_eq!(controller.deployment(), "pvvp4");
	}

	#[test]
	fn test_longer_names_match_prefix() {
		assert_eq!(kind_of("clean-vswitch"), ControllerKind::Clean);
		assert_eq!(kind_of("p2p_cont"), ControllerKind::P2P);
	}

	#[test]
	fn test_unknown_scenario() {
		let err = create_controller("XYZ", dummy_class(), TrafficParams::default(), None)
			.err()
			.unwrap();
		assert!(matches!(err, DispatchError::UnknownScenario(ref name) if name == "xyz"));
		assert_eq!(err.to_string(), "Unknown deployment scenario 'xyz'.");

		// Prefix matching is anchored at the start
		assert!(create_controller("vp2p", dummy_class(), TrafficParams::default(), None).is_err());
		assert!(create_controller("", dummy_class(), TrafficParams::default(), None).is_err());
	}

	#[test]
	fn test_oversized_vm_suffix_fails_setup() {
		let mut controller = create_controller(
			"pvp200000000000000000",
			dummy_class(),
			TrafficParams::default(),
			None,
		)
		.unwrap();
		assert_eq!(controller.kind(), ControllerKind::PXP);
		assert!(controller.setup().is_err());
	}

	#[test]
	fn test_independent_instances() {
		let class = dummy_class();
		let mut first =
			create_controller("p2p", class.clone(), TrafficParams::default(), None).unwrap();
		let second = create_controller("p2p", class, TrafficParams::default(), None).unwrap();
		assert_eq!(first.kind(), ControllerKind::P2P);
		assert_eq!(second.kind(), ControllerKind::P2P);

		first.setup().unwrap();
		assert!(first.vswitch().is_some());
		assert!(second.vswitch().is_none());
	}

	#[test]
	fn test_tunnel_operation_threading() {
		let controller = create_controller(
			"op2p",
			dummy_class(),
			TrafficParams::default(),
			Some(TunnelOperation::Encapsulation),
		)
		.unwrap();
		assert_eq!(
			controller.tunnel_operation(),
			Some(TunnelOperation::Encapsulation)
		);

		let controller =
			create_controller("op2p", dummy_class(), TrafficParams::default(), None).unwrap();
		assert_eq!(controller.tunnel_operation(), None);

		// Only the overlay controller receives it
		let controller = create_controller(
			"ptunp",
			dummy_class(),
			TrafficParams::default(),
			Some(TunnelOperation::Decapsulation),
		)
		.unwrap();
		assert_eq!(controller.tunnel_operation(), None);
	}

	#[test]
	fn test_arguments_passed_through() {
		let params = traffic("bidir = true\nframe_rate = 50");
		let class = dummy_class();
		let controller = create_controller("PVP", class.clone(), params.clone(), None).unwrap();

		assert_eq!(controller.deployment(), "pvp");
		assert_eq!(controller.traffic(), &params);
		assert_eq!(controller.vswitch_class().name(), class.name());
		// The switch is not instantiated at dispatch time
		assert!(controller.vswitch().is_none());
	}
}
