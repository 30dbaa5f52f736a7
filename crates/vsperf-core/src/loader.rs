//! Loader holding the switch implementations of one configuration.
//!
//! Every `Loader` runs discovery again, so configuration changes between runs
//! are always picked up. Callers that want to reuse the discovered classes
//! keep the loader around themselves.

use crate::discovery::{ClassRegistry, DiscoveryOptions, ImplementationClass, RegistryError};
use std::collections::BTreeMap;
use thiserror::Error;
use vsperf_config::VSwitchSettings;
use vsperf_vswitch::{VSwitchContract, VSwitchError, VSwitchFactory, VSwitchInterface};

/// A discovered switch implementation.
pub type VSwitchClass = ImplementationClass<VSwitchFactory>;

/// Errors returned by the loader.
#[derive(Debug, Error)]
pub enum LoaderError {
	/// Discovery or lookup failed.
	#[error(transparent)]
	Registry(#[from] RegistryError),
	/// The switch implementation failed to construct itself.
	#[error(transparent)]
	Construction(#[from] VSwitchError),
}

/// Context object giving access to the configured switch implementations.
pub struct Loader {
	vswitches: ClassRegistry<VSwitchContract>,
}

impl Loader {
	/// Discovers switch implementations using the given settings.
	pub fn new(settings: &VSwitchSettings) -> Result<Self, LoaderError> {
		let options = DiscoveryOptions::default().with_strip_suffix(settings.strip_suffix.clone());
		let vswitches = ClassRegistry::new(&settings.dir, settings.active.clone(), &options)?;
		tracing::info!(
			component = "loader",
			active = %settings.active,
			available = vswitches.get_classes().len(),
			"Loaded switch implementations"
		);
		Ok(Self { vswitches })
	}

	/// Creates an instance of the configured switch.
	pub fn get_active_instance(&self) -> Result<Box<dyn VSwitchInterface>, LoaderError> {
		let class = self.vswitches.get_target_class()?;
		tracing::debug!(component = "loader", vswitch = %class.name(), "Instantiating switch");
		let vswitch = class.instantiate::<Box<dyn VSwitchInterface>, VSwitchError>()?;
		Ok(vswitch)
	}

	/// Returns the class of the configured switch without instantiating it.
	pub fn get_active_class(&self) -> Result<VSwitchClass, LoaderError> {
		Ok(self.vswitches.get_target_class()?.clone())
	}

	/// Returns all discovered switches keyed by name.
	pub fn get_all(&self) -> &BTreeMap<String, VSwitchClass> {
		self.vswitches.get_classes()
	}

	/// Returns all discovered switches in printable form.
	pub fn get_all_printable(&self) -> String {
		self.vswitches.get_classes_printable()
	}

	/// Name of the configured switch as written in the configuration.
	pub fn active_vswitch(&self) -> &str {
		self.vswitches.target()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;
	use crate::factory::create_controller;
	use vsperf_config::ConfigBuilder;
	use vsperf_types::{TrafficParams, TunnelOperation};
	use vsperf_vswitch::FlowSpec;

	fn vswitch_dir() -> TempDir {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("dummy_vswitch.toml"),
			"contract = \"vswitch\"\nimplementation = \"dummy\"\n",
		)
		.unwrap();
		fs::write(
			dir.path().join("small.toml"),
			r#"
contract = "vswitch"
implementation = "dummy"
name = "Small"
description = "Dummy switch with a single NIC"

[settings]
phy_nics = ["eth0"]
"#,
		)
		.unwrap();
		fs::write(
			dir.path().join("broken_vswitch.toml"),
			"contract = \"vswitch\"\nimplementation = \"dummy\"\n[settings]\nmax_ports = 0\n",
		)
		.unwrap();
		dir
	}

	#[test]
	fn test_active_switch() {
		let dir = vswitch_dir();
		let config = ConfigBuilder::new()
			.vswitch_dir(dir.path())
			.vswitch_active("DUMMY")
			.build();
		let loader = Loader::new(&config.vswitch).unwrap();

		assert_eq!(loader.active_vswitch(), "DUMMY");
		let class = loader.get_active_class().unwrap();
		assert_eq!(class.name(), "dummy");
		assert_eq!(class.implementation(), "dummy");

		let mut vswitch = loader.get_active_instance().unwrap();
		vswitch.start().unwrap();
		vswitch.add_switch("br0").unwrap();
		assert_eq!(vswitch.add_phy_port("br0").unwrap().name, "phy0");
	}

	#[test]
	fn test_settings_reach_factory() {
		let dir = vswitch_dir();
		let config = ConfigBuilder::new()
			.vswitch_dir(dir.path())
			.vswitch_active("small")
			.build();
		let loader = Loader::new(&config.vswitch).unwrap();

		let mut vswitch = loader.get_active_instance().unwrap();
		vswitch.start().unwrap();
		vswitch.add_switch("br0").unwrap();
		assert_eq!(vswitch.add_phy_port("br0").unwrap().name, "eth0");
		assert!(vswitch.add_phy_port("br0").is_err());
	}

	#[test]
	fn test_listing() {
		let dir = vswitch_dir();
		let config = ConfigBuilder::new().vswitch_dir(dir.path()).build();
		let loader = Loader::new(&config.vswitch).unwrap();

		let names: Vec<_> = loader.get_all().keys().cloned().collect();
		assert_eq!(names, vec!["Small", "broken", "dummy"]);

		let listing = loader.get_all_printable();
		assert!(listing.contains("Small:"));
		assert!(listing.contains("Dummy switch with a single NIC"));
		assert!(listing.contains("In-memory switch recording bridges, ports and flows"));
	}

	#[test]
	fn test_unknown_active_switch() {
		let dir = vswitch_dir();
		let config = ConfigBuilder::new()
			.vswitch_dir(dir.path())
			.vswitch_active("OvsDpdkVhost")
			.build();

		// Construction succeeds, lookups fail
		let loader = Loader::new(&config.vswitch).unwrap();
		assert!(matches!(
			loader.get_active_class(),
			Err(LoaderError::Registry(RegistryError::NotFound { .. }))
		));
		assert!(matches!(
			loader.get_active_instance(),
			Err(LoaderError::Registry(RegistryError::NotFound { .. }))
		));
	}

	#[test]
	fn test_construction_error_is_not_wrapped() {
		let dir = vswitch_dir();
		let config = ConfigBuilder::new()
			.vswitch_dir(dir.path())
			.vswitch_active("broken")
			.build();
		let loader = Loader::new(&config.vswitch).unwrap();

		let err = match loader.get_active_instance() {
			Err(err) => err,
			Ok(_) => panic!("broken switch must not construct"),
		};
		assert!(matches!(
			err,
			LoaderError::Construction(VSwitchError::InvalidSettings(_))
		));
		assert_eq!(
			err.to_string(),
			"Invalid settings: Invalid value for field 'max_ports': Value 0 is less than minimum 1"
		);
	}

	#[test]
	fn test_custom_suffix_drives_deployment() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("lab_switch.toml"),
			"contract = \"vswitch\"\nimplementation = \"dummy\"\n",
		)
		.unwrap();
		let mut traffic = TrafficParams::default();
		traffic.insert("tunnel_type", "geneve");

		let config = ConfigBuilder::new()
			.vswitch_dir(dir.path())
			.vswitch_active("lab")
			.strip_suffix("_switch")
			.scenario("OP2P")
			.tunnel_operation(Some(TunnelOperation::Decapsulation))
			.traffic(traffic)
			.build();
		let loader = Loader::new(&config.vswitch).unwrap();
		assert!(loader.get_all().contains_key("lab"));

		let mut controller = create_controller(
			&config.deployment.scenario,
			loader.get_active_class().unwrap(),
			config.traffic.clone(),
			config.deployment.tunnel_operation,
		)
		.unwrap();
		assert_eq!(
			controller.tunnel_operation(),
			Some(TunnelOperation::Decapsulation)
		);
		controller.setup().unwrap();

		let ports = controller.ports_info().unwrap();
		assert_eq!(ports[1].name, "geneve2");
		// Decapsulation forwards from the tunnel to the physical port only
		let flows = controller.vswitch().unwrap().dump_flows("br0").unwrap();
		assert_eq!(flows, vec![FlowSpec::forward(ports[1].number, ports[0].number)]);
	}

	#[test]
	fn test_missing_directory() {
		let dir = TempDir::new().unwrap();
		let config = ConfigBuilder::new()
			.vswitch_dir(dir.path().join("vswitches"))
			.build();

		assert!(matches!(
			Loader::new(&config.vswitch),
			Err(LoaderError::Registry(RegistryError::Discovery { .. }))
		));
	}

	#[test]
	fn test_rediscovers_on_each_construction() {
		let dir = vswitch_dir();
		let config = ConfigBuilder::new().vswitch_dir(dir.path()).build();

		let before = Loader::new(&config.vswitch).unwrap();
		fs::write(
			dir.path().join("late_vswitch.toml"),
			"contract = \"vswitch\"\nimplementation = \"dummy\"\n",
		)
		.unwrap();
		let after = Loader::new(&config.vswitch).unwrap();

		assert!(!before.get_all().contains_key("late"));
		assert!(after.get_all().contains_key("late"));
	}
}
