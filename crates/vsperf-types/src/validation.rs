//! Settings validation for switch implementations.
//!
//! Descriptor files carry a free-form `[settings]` table that is handed to the
//! implementation factory. Factories describe what they accept with a
//! [`Schema`] and reject anything else before touching the dataplane.

use thiserror::Error;

/// Errors that can occur while validating implementation settings.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required setting is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A setting has an unacceptable value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A setting has the wrong TOML type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	/// A setting is not known to the implementation.
	#[error("Unknown field: {0}")]
	UnknownField(String),
}

/// Type of a setting.
#[derive(Debug)]
pub enum FieldType {
	/// A string value.
	String,
	/// An integer value with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	/// A boolean value.
	Boolean,
	/// An array whose elements all have the given type.
	Array(Box<FieldType>),
}

impl FieldType {
	fn name(&self) -> &'static str {
		match self {
			FieldType::String => "string",
			FieldType::Integer { .. } => "integer",
			FieldType::Boolean => "boolean",
			FieldType::Array(_) => "array",
		}
	}
}

/// Custom validator run after the type check succeeded.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named setting with its type and optional custom validator.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	/// Creates a new field with the given name and type.
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Settings schema: required and optional fields.
///
/// Keys that are neither required nor optional are rejected so that typos in
/// descriptor files do not go unnoticed.
#[derive(Debug, Default)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	/// Creates a new schema with required and optional fields.
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a settings table against this schema.
	pub fn validate(&self, settings: &toml::Value) -> Result<(), ValidationError> {
		let table = settings
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "settings".to_string(),
				expected: "table".to_string(),
				actual: settings.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		let known = |key: &str| {
			self.required
				.iter()
				.chain(self.optional.iter())
				.any(|field| field.name == key)
		};
		if let Some(key) = table.keys().find(|key| !known(key)) {
			return Err(ValidationError::UnknownField(key.clone()));
		}

		Ok(())
	}
}

fn check_type(
	field_name: &str,
	value: &toml::Value,
	expected: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = || ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.name().to_string(),
		actual: value.type_str().to_string(),
	};

	match expected {
		FieldType::String if value.is_str() => Ok(()),
		FieldType::Boolean if value.is_bool() => Ok(()),
		FieldType::Integer { min, max } => {
			let int_val = value.as_integer().ok_or_else(mismatch)?;
			if let Some(min_val) = min.filter(|min_val| int_val < *min_val) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is less than minimum {}", int_val, min_val),
				});
			}
			if let Some(max_val) = max.filter(|max_val| int_val > *max_val) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is greater than maximum {}", int_val, max_val),
				});
			}
			Ok(())
		},
		FieldType::Array(inner) => {
			let array = value.as_array().ok_or_else(mismatch)?;
			for (i, item) in array.iter().enumerate() {
				check_type(&format!("{}[{}]", field_name, i), item, inner)?;
			}
			Ok(())
		},
		_ => Err(mismatch()),
	}
}

/// A settings schema that implementations expose for validation.
pub trait ConfigSchema: Send + Sync {
	/// Validates a settings table.
	fn validate(&self, settings: &toml::Value) -> Result<(), ValidationError>;
}
