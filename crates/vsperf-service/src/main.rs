//! Main entry point for the vsperf switch selection tool.
//!
//! Lists the switch implementations found in the configured directory, or
//! selects the controller for a deployment scenario and reports it. With
//! `--setup` the deployment is built on the selected switch and torn down
//! again, which checks that the switch can actually host the topology.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use vsperf_config::Config;
use vsperf_core::{create_controller, Loader, VswitchController};
use vsperf_types::TunnelOperation;
use vsperf_vswitch::PortInfo;

/// Command-line arguments for vsperf.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "vsperf.toml", env = "VSPERF_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// List available switch implementations and exit
	#[arg(long)]
	list_vswitches: bool,

	/// Switch to use instead of the configured one
	#[arg(long)]
	vswitch: Option<String>,

	/// Deployment scenario to use instead of the configured one
	#[arg(long)]
	deployment: Option<String>,

	/// Tunnel operation for overlay deployments
	#[arg(long)]
	tunnel_operation: Option<TunnelOperation>,

	/// Build the deployment on the switch and tear it down again
	#[arg(long)]
	setup: bool,
}

/// Summary of the selected deployment, printed as JSON.
#[derive(Debug, Serialize)]
struct DeploymentReport {
	deployment: String,
	controller: String,
	vswitch: String,
	implementation: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	tunnel_operation: Option<TunnelOperation>,
	#[serde(skip_serializing_if = "Option::is_none")]
	ports: Option<Vec<PortInfo>>,
}

/// Applies command-line overrides to the loaded configuration.
fn apply_overrides(config: &mut Config, args: &Args) {
	if let Some(vswitch) = &args.vswitch {
		config.vswitch.active = vswitch.clone();
	}
	if let Some(deployment) = &args.deployment {
		config.deployment.scenario = deployment.clone();
	}
	if args.tunnel_operation.is_some() {
		config.deployment.tunnel_operation = args.tunnel_operation;
	}
}

/// Selects the controller for the configured deployment and describes it.
fn select_deployment(
	config: &Config,
	loader: &Loader,
	setup: bool,
) -> Result<DeploymentReport, Box<dyn std::error::Error>> {
	let vswitch_class = loader.get_active_class()?;
	let mut controller = create_controller(
		&config.deployment.scenario,
		vswitch_class.clone(),
		config.traffic.clone(),
		config.deployment.tunnel_operation,
	)?;
	tracing::info!(
		deployment = %controller.deployment(),
		controller = %controller.kind(),
		vswitch = %vswitch_class.name(),
		"Selected controller"
	);

	let ports = if setup {
		Some(setup_and_stop(controller.as_mut())?)
	} else {
		None
	};

	Ok(DeploymentReport {
		deployment: controller.deployment().to_string(),
		controller: controller.kind().to_string(),
		vswitch: vswitch_class.name().to_string(),
		implementation: vswitch_class.implementation().to_string(),
		tunnel_operation: controller.tunnel_operation(),
		ports,
	})
}

/// Builds the deployment, records its ports and tears it down.
///
/// The switch is stopped even when building the topology fails; the setup
/// error is the one reported.
fn setup_and_stop(
	controller: &mut dyn VswitchController,
) -> Result<Vec<PortInfo>, Box<dyn std::error::Error>> {
	let result = controller.setup().and_then(|_| controller.ports_info());
	if let Err(e) = controller.stop() {
		tracing::warn!(error = %e, "Failed to stop deployment");
	}
	Ok(result?)
}

/// Main entry point for vsperf.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let mut config = Config::from_file(&args.config).await?;
	apply_overrides(&mut config, &args);
	tracing::info!(config = %args.config.display(), "Loaded configuration");

	let loader = Loader::new(&config.vswitch)?;

	if args.list_vswitches {
		print!("{}", loader.get_all_printable());
		return Ok(());
	}

	let report = select_deployment(&config, &loader, args.setup)?;
	println!("{}", serde_json::to_string_pretty(&report)?);
	Ok(())
}
