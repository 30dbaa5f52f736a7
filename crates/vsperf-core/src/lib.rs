//! Core of vsperf switch selection.
//!
//! Discovers the switch implementations available for a configuration and
//! creates the deployment controller that drives the selected switch through
//! a scenario. The two halves are independent: callers obtain a switch class
//! from the [`Loader`] and pass it to [`create_controller`].

pub mod controller;
pub mod discovery;
pub mod factory;
pub mod loader;

pub use controller::{ControllerKind, VswitchController};
pub use discovery::{ClassRegistry, DiscoveryOptions, ImplementationClass, RegistryError};
pub use factory::{create_controller, DispatchError};
pub use loader::{Loader, LoaderError, VSwitchClass};
