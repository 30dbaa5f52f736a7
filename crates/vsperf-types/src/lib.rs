//! Common types module for vsperf.
//!
//! Shared by the configuration, switch and core crates: the registration
//! traits implementations use to make themselves discoverable, settings
//! validation, and the values passed to deployment controllers.

/// Registration traits for compiled-in implementations.
pub mod registry;
/// Traffic parameters and tunnel operations.
pub mod traffic;
/// Settings validation for implementation descriptors.
pub mod validation;

pub use registry::{CapabilityContract, ImplementationRegistry, Registration};
pub use traffic::{ParseTunnelOperationError, TrafficParams, TunnelOperation};
pub use validation::*;
