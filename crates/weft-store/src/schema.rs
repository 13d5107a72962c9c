//! Value kinds registered per key.
//!
//! Every key gets a [`ValueKind`] when the store is built, either inferred
//! from its initial value or declared explicitly. Updates must keep the
//! kind.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Runtime type of a store value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
	/// `null`.
	Null,
	/// `true` / `false`.
	Bool,
	/// Numbers without a fractional part that fit `i64` or `u64`.
	Integer,
	/// Other numbers.
	Float,
	/// Strings.
	String,
	/// Arrays.
	Array,
	/// Objects.
	Object,
	/// Accepts any value.
	Any,
}

impl ValueKind {
	/// Infers the kind of `value`.
	pub fn of(value: &Value) -> Self {
		match value {
			Value::Null => Self::Null,
			Value::Bool(_) => Self::Bool,
			Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
			Value::Number(_) => Self::Float,
			Value::String(_) => Self::String,
			Value::Array(_) => Self::Array,
			Value::Object(_) => Self::Object,
		}
	}

	/// Whether `value` fits this kind.
	pub fn accepts(self, value: &Value) -> bool {
		self == Self::Any || self == Self::of(value)
	}
}

impl fmt::Display for ValueKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Null => "null",
			Self::Bool => "bool",
			Self::Integer => "integer",
			Self::Float => "float",
			Self::String => "string",
			Self::Array => "array",
			Self::Object => "object",
			Self::Any => "any",
		};
		f.write_str(name)
	}
}

/// Kinds by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
	kinds: HashMap<String, ValueKind>,
}

impl Schema {
	/// Creates an empty schema.
	pub fn new() -> Self {
		Self::default()
	}

	/// Infers a schema from initial data.
	pub fn infer(data: &Map<String, Value>) -> Self {
		Self {
			kinds: data
				.iter()
				.map(|(key, value)| (key.clone(), ValueKind::of(value)))
				.collect(),
		}
	}

	/// Registers `key`, replacing an earlier kind.
	pub fn insert(&mut self, key: impl Into<String>, kind: ValueKind) {
		self.kinds.insert(key.into(), kind);
	}

	/// Kind registered for `key`.
	pub fn kind(&self, key: &str) -> Option<ValueKind> {
		self.kinds.get(key).copied()
	}

	/// Whether `key` is registered.
	pub fn contains(&self, key: &str) -> bool {
		self.kinds.contains_key(key)
	}

	/// Number of keys.
	pub fn len(&self) -> usize {
		self.kinds.len()
	}

	/// Whether no key is registered.
	pub fn is_empty(&self) -> bool {
		self.kinds.is_empty()
	}

	/// Checks that `value` may be stored under `key`.
	///
	/// # Errors
	///
	/// [`StoreError::UnknownKey`] or [`StoreError::TypeMismatch`].
	pub fn check(&self, key: &str, value: &Value) -> StoreResult<()> {
		let expected = self
			.kind(key)
			.ok_or_else(|| StoreError::UnknownKey(key.to_string()))?;
		if !expected.accepts(value) {
			return Err(StoreError::TypeMismatch {
				key: key.to_string(),
				expected,
				found: ValueKind::of(value),
			});
		}
		Ok(())
	}
}
