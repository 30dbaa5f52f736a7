//! Registry traits for self-registering implementations.
//!
//! Switch implementations are compiled into the binary and register themselves
//! under a name. A capability contract collects those registrations so that
//! discovery can decide whether a descriptor found on disk refers to something
//! that actually implements the contract.

/// Base trait for implementation registries.
///
/// Each implementation module must provide a Registry struct that implements
/// this trait. This ensures that every implementation declares the name used
/// in descriptor files and provides a factory function.
pub trait ImplementationRegistry {
	/// The name used in descriptor files to reference this implementation,
	/// for example `implementation = "dummy"`.
	const NAME: &'static str;

	/// One-line description shown when a descriptor does not provide its own.
	const DESCRIPTION: &'static str = "";

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}

/// A registered implementation as seen by discovery.
#[derive(Debug, Clone, Copy)]
pub struct Registration<F> {
	/// Name the implementation registered under.
	pub name: &'static str,
	/// Default description of the implementation.
	pub description: &'static str,
	/// Factory creating instances of the implementation.
	pub factory: F,
}

impl<F> Registration<F> {
	/// Builds the registration of an [`ImplementationRegistry`] type.
	pub fn of<R>() -> Self
	where
		R: ImplementationRegistry<Factory = F>,
	{
		Self {
			name: R::NAME,
			description: R::DESCRIPTION,
			factory: R::factory(),
		}
	}
}

/// A capability contract that discovered implementations must satisfy.
///
/// The contract is identified by name in descriptor files
/// (`contract = "vswitch"`). An implementation satisfies the contract when it
/// is part of [`CapabilityContract::implementations`].
pub trait CapabilityContract {
	/// Contract name as written in descriptor files.
	const NAME: &'static str;

	/// Factory type shared by every implementation of the contract.
	type Factory: Copy;

	/// All implementations compiled in for this contract.
	fn implementations() -> Vec<Registration<Self::Factory>>;

	/// Looks up a registered implementation by name.
	fn implementation(name: &str) -> Option<Registration<Self::Factory>> {
		Self::implementations()
			.into_iter()
			.find(|registration| registration.name == name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	type TestFactory = fn() -> u32;

	struct One;

	impl ImplementationRegistry for One {
		const NAME: &'static str = "one";
		const DESCRIPTION: &'static str = "Returns one";
		type Factory = TestFactory;

		fn factory() -> Self::Factory {
			|| 1
		}
	}

	struct Two;

	impl ImplementationRegistry for Two {
		const NAME: &'static str = "two";
		type Factory = TestFactory;

		fn factory() -> Self::Factory {
			|| 2
		}
	}

	struct Numbers;

	impl CapabilityContract for Numbers {
		const NAME: &'static str = "numbers";
		type Factory = TestFactory;

		fn implementations() -> Vec<Registration<Self::Factory>> {
			vec![Registration::of::<One>(), Registration::of::<Two>()]
		}
	}

	#[test]
	fn test_implementation_lookup() {
		let one = Numbers::implementation("one").unwrap();
		assert_eq!(one.description, "Returns one");
		assert_eq!((one.factory)(), 1);

		let two = Numbers::implementation("two").unwrap();
		assert_eq!(two.description, "");
		assert_eq!((two.factory)(), 2);

		assert!(Numbers::implementation("three").is_none());
		// Registration names are matched exactly
		assert!(Numbers::implementation("One").is_none());
	}
}
