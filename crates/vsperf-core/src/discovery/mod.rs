//! Discovery of implementations satisfying a capability contract.
//!
//! Implementations are compiled in and register under a name (see
//! [`CapabilityContract`]). A discovery directory holds one TOML descriptor
//! per available implementation:
//!
//! ```toml
//! contract = "vswitch"
//! implementation = "dummy"
//! name = "Dummy"
//! description = "In-memory switch for dry runs"
//!
//! [settings]
//! phy_nics = ["eth0", "eth1"]
//! ```
//!
//! Scanning is not recursive. Directories, files with another extension and
//! files whose name starts with an excluded prefix are ignored. Descriptors for
//! another contract are skipped. Anything else that cannot be turned into a
//! class aborts the whole pass, so a broken descriptor is reported immediately
//! instead of silently disappearing from the listing.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vsperf_types::CapabilityContract;

/// Errors that can occur while discovering or looking up implementations.
#[derive(Debug, Error)]
pub enum RegistryError {
	/// The directory or one of its descriptors could not be processed.
	#[error("Discovery failed for {}: {reason}", path.display())]
	Discovery { path: PathBuf, reason: String },
	/// No discovered implementation has the requested name.
	#[error("Unknown {contract} implementation '{name}'. Available: [{available}]")]
	NotFound {
		name: String,
		contract: &'static str,
		available: String,
	},
}

impl RegistryError {
	fn discovery(path: &Path, reason: impl Into<String>) -> Self {
		RegistryError::Discovery {
			path: path.to_path_buf(),
			reason: reason.into(),
		}
	}
}

/// Controls how descriptor files are recognized and named.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
	/// Extension of descriptor files, without the dot.
	pub extension: String,
	/// File names starting with one of these are ignored.
	pub exclude_prefixes: Vec<String>,
	/// Suffix removed from the file stem when a descriptor has no `name`.
	pub strip_suffix: String,
}

impl Default for DiscoveryOptions {
	fn default() -> Self {
		Self {
			extension: "toml".to_string(),
			exclude_prefixes: vec!["_".to_string(), ".".to_string()],
			strip_suffix: String::new(),
		}
	}
}

impl DiscoveryOptions {
	/// Sets the suffix stripped from file stems.
	pub fn with_strip_suffix(mut self, suffix: impl Into<String>) -> Self {
		self.strip_suffix = suffix.into();
		self
	}

	fn is_excluded(&self, file_name: &str) -> bool {
		self.exclude_prefixes
			.iter()
			.any(|prefix| !prefix.is_empty() && file_name.starts_with(prefix.as_str()))
	}

	fn canonical_name(&self, stem: &str) -> String {
		match stem.strip_suffix(self.strip_suffix.as_str()) {
			Some(stripped) if !self.strip_suffix.is_empty() && !stripped.is_empty() => {
				stripped.to_string()
			},
			_ => stem.to_string(),
		}
	}
}

/// On-disk descriptor of an implementation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Descriptor {
	contract: String,
	implementation: String,
	name: Option<String>,
	description: Option<String>,
	#[serde(default)]
	settings: toml::Table,
}

/// A discovered implementation, ready to be instantiated.
///
/// The class is a value: cloning it does not share any state, and nothing is
/// created until [`ImplementationClass::instantiate`] is called.
#[derive(Clone)]
pub struct ImplementationClass<F> {
	name: String,
	implementation: &'static str,
	description: String,
	settings: toml::Value,
	source: PathBuf,
	factory: F,
}

impl<F> ImplementationClass<F> {
	/// Canonical name of the class.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Name of the compiled-in implementation behind this class.
	pub fn implementation(&self) -> &'static str {
		self.implementation
	}

	pub fn description(&self) -> &str {
		&self.description
	}

	/// Settings handed to the factory.
	pub fn settings(&self) -> &toml::Value {
		&self.settings
	}

	/// Descriptor file the class was discovered from.
	pub fn source(&self) -> &Path {
		&self.source
	}

	/// Creates a new instance by calling the implementation factory.
	///
	/// Failures of the factory are returned as they are.
	pub fn instantiate<T, E>(&self) -> Result<T, E>
	where
		F: Fn(&toml::Value) -> Result<T, E>,
	{
		(self.factory)(&self.settings)
	}
}

impl<F> fmt::Debug for ImplementationClass<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ImplementationClass")
			.field("name", &self.name)
			.field("implementation", &self.implementation)
			.field("description", &self.description)
			.field("source", &self.source)
			.finish()
	}
}

/// Scans `directory` for descriptors of contract `C`.
///
/// Returns the discovered classes keyed by canonical name.
pub fn discover<C: CapabilityContract>(
	directory: &Path,
	options: &DiscoveryOptions,
) -> Result<BTreeMap<String, ImplementationClass<C::Factory>>, RegistryError> {
	let entries = std::fs::read_dir(directory)
		.map_err(|e| RegistryError::discovery(directory, e.to_string()))?;

	let mut paths = Vec::new();
	for entry in entries {
		let entry = entry.map_err(|e| RegistryError::discovery(directory, e.to_string()))?;
		paths.push(entry.path());
	}
	paths.sort();

	let mut classes: BTreeMap<String, ImplementationClass<C::Factory>> = BTreeMap::new();
	for path in paths {
		let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
			tracing::debug!(component = "discovery", path = %path.display(), "Skipping non UTF-8 entry");
			continue;
		};
		if options.is_excluded(file_name)
			|| !path.is_file()
			|| path.extension().and_then(|e| e.to_str()) != Some(options.extension.as_str())
		{
			tracing::trace!(component = "discovery", entry = %file_name, "Ignored");
			continue;
		}

		let Some(class) = load_descriptor::<C>(&path, options)? else {
			continue;
		};

		if let Some(existing) = classes
			.values()
			.find(|other| other.name.eq_ignore_ascii_case(&class.name))
		{
			return Err(RegistryError::discovery(
				&path,
				format!(
					"name '{}' is already provided by {}",
					class.name,
					existing.source.display()
				),
			));
		}

		tracing::debug!(
			component = "discovery",
			contract = C::NAME,
			name = %class.name,
			implementation = class.implementation,
			"Registered"
		);
		classes.insert(class.name.clone(), class);
	}

	tracing::info!(
		component = "discovery",
		contract = C::NAME,
		dir = %directory.display(),
		count = classes.len(),
		"Discovery finished"
	);
	Ok(classes)
}

/// Parses one descriptor. Returns `None` when it belongs to another contract.
fn load_descriptor<C: CapabilityContract>(
	path: &Path,
	options: &DiscoveryOptions,
) -> Result<Option<ImplementationClass<C::Factory>>, RegistryError> {
	let content =
		std::fs::read_to_string(path).map_err(|e| RegistryError::discovery(path, e.to_string()))?;
	let descriptor: Descriptor =
		toml::from_str(&content).map_err(|e| RegistryError::discovery(path, e.message()))?;

	if descriptor.contract != C::NAME {
		tracing::debug!(
			component = "discovery",
			path = %path.display(),
			contract = %descriptor.contract,
			"Skipping descriptor for another contract"
		);
		return Ok(None);
	}

	let registration = C::implementation(&descriptor.implementation).ok_or_else(|| {
		let registered: Vec<_> = C::implementations().iter().map(|r| r.name).collect();
		RegistryError::discovery(
			path,
			format!(
				"implementation '{}' does not satisfy contract '{}' (registered: [{}])",
				descriptor.implementation,
				C::NAME,
				registered.join(", ")
			),
		)
	})?;

	let name = match descriptor.name {
		Some(name) => name.trim().to_string(),
		None => {
			let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
			options.canonical_name(stem)
		},
	};
	if name.is_empty() {
		return Err(RegistryError::discovery(path, "implementation name is empty"));
	}

	let description = descriptor
		.description
		.unwrap_or_else(|| registration.description.to_string());

	Ok(Some(ImplementationClass {
		name,
		implementation: registration.name,
		description,
		settings: toml::Value::Table(descriptor.settings),
		source: path.to_path_buf(),
		factory: registration.factory,
	}))
}

/// Minimum width of the name column in listings, colon included.
const LISTING_NAME_WIDTH: usize = 18;

/// Discovered implementations of one contract, scoped to a target name.
///
/// The registry is built once and never changes afterwards. Build a new one to
/// pick up changes on disk.
pub struct ClassRegistry<C: CapabilityContract> {
	target: String,
	classes: BTreeMap<String, ImplementationClass<C::Factory>>,
	_contract: PhantomData<fn() -> C>,
}

impl<C: CapabilityContract> ClassRegistry<C> {
	/// Discovers all implementations in `directory` and scopes the registry
	/// to `target`.
	pub fn new(
		directory: &Path,
		target: impl Into<String>,
		options: &DiscoveryOptions,
	) -> Result<Self, RegistryError> {
		Ok(Self {
			target: target.into(),
			classes: discover::<C>(directory, options)?,
			_contract: PhantomData,
		})
	}

	/// Name of the implementation the registry was scoped to.
	pub fn target(&self) -> &str {
		&self.target
	}

	/// Looks up a class by name, ignoring case.
	pub fn get_class(&self, name: &str) -> Result<&ImplementationClass<C::Factory>, RegistryError> {
		self.classes
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, class)| class)
			.ok_or_else(|| RegistryError::NotFound {
				name: name.to_string(),
				contract: C::NAME,
				available: self.classes.keys().cloned().collect::<Vec<_>>().join(", "),
			})
	}

	/// Looks up the target class.
	pub fn get_target_class(&self) -> Result<&ImplementationClass<C::Factory>, RegistryError> {
		self.get_class(&self.target)
	}

	/// All discovered classes keyed by name.
	pub fn get_classes(&self) -> &BTreeMap<String, ImplementationClass<C::Factory>> {
		&self.classes
	}

	/// Renders the discovered classes for help output, one line per class in
	/// name order.
	///
	/// Descriptions start in column 22, or one space after the longest name
	/// when a name does not fit.
	pub fn get_classes_printable(&self) -> String {
		let width = self
			.classes
			.keys()
			.map(|name| name.chars().count() + 2)
			.max()
			.unwrap_or_default()
			.max(LISTING_NAME_WIDTH);

		let mut out = format!("Classes derived from: {}\n======\n\n", C::NAME);
		for (name, class) in &self.classes {
			let summary = class.description.lines().next().unwrap_or_default().trim();
			out.push_str(&format!(
				"  * {:<width$}{}\n",
				format!("{}:", name),
				summary,
				width = width
			));
		}
		out
	}
}
