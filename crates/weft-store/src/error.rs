//! Store error types.

use crate::schema::ValueKind;
use thiserror::Error;
use weft_core::{HostError, PlatformError};

/// Boxed error carried out of user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
	/// No handler is registered for the event.
	#[error("undefined event name: {0}")]
	UnknownEvent(String),

	/// An update names a key the store was not created with.
	#[error("undefined field in data: {0}")]
	UnknownKey(String),

	/// An update changes the type of a value.
	#[error("type mismatch for '{key}': expected {expected}, found {found}")]
	TypeMismatch {
		/// Updated key.
		key: String,
		/// Kind registered for the key.
		expected: ValueKind,
		/// Kind of the rejected value.
		found: ValueKind,
	},

	/// A lookup found no value, or a null one.
	#[error("undefined value: {0}")]
	Undefined(String),

	/// A value did not deserialize into the requested type.
	#[error("cannot decode '{key}': {source}")]
	Decode {
		/// Key that was read.
		key: String,
		/// Deserialization error.
		#[source]
		source: serde_json::Error,
	},

	/// The store was built without any data.
	#[error("store data is empty")]
	EmptyData,

	/// An on-create hook failed.
	#[error("on-create hook failed: {0}")]
	OnCreate(#[source] BoxError),

	/// A prefix middleware rejected the event.
	#[error("middleware with prefix '{prefix}' failed: {source}")]
	Middleware {
		/// Middleware prefix.
		prefix: String,
		/// Error returned by the middleware.
		#[source]
		source: BoxError,
	},

	/// The event handler failed.
	#[error("handler for '{event}' failed: {source}")]
	Handler {
		/// Emitted event.
		event: String,
		/// Error returned by the handler.
		#[source]
		source: BoxError,
	},

	/// `emit` was called while another emit was running.
	#[error("cannot emit '{event}' while another event is being processed")]
	ReentrantEmit {
		/// Event that was rejected.
		event: String,
	},

	/// Subscribing needs a component host.
	#[error("no component host configured")]
	NoHost,

	/// Some root subscribers failed to re-render.
	#[error("failed to update {} subscriber(s)", .0.len())]
	Propagation(Vec<HostError>),

	/// Persistent storage failed.
	#[error("persistence failed: {0}")]
	Persistence(#[from] PlatformError),

	/// Store data could not be serialized.
	#[error("cannot serialize store data: {0}")]
	Serialize(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use weft_core::ComponentId;

	#[rstest]
	fn test_type_mismatch_display() {
		let err = StoreError::TypeMismatch {
			key: "count".to_string(),
			expected: ValueKind::Integer,
			found: ValueKind::String,
		};
		assert_eq!(
			err.to_string(),
			"type mismatch for 'count': expected integer, found string"
		);
	}

	#[rstest]
	fn test_propagation_display() {
		let err = StoreError::Propagation(vec![HostError::NotMounted(ComponentId(3))]);
		assert_eq!(err.to_string(), "failed to update 1 subscriber(s)");
	}
}
