//! Platform error types.

use thiserror::Error;

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors reported by a [`Platform`](crate::Platform) or
/// [`KeyValueStorage`](crate::KeyValueStorage) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PlatformError {
	/// A browser object (window, history, storage, ...) is not available.
	#[error("{0} is not available")]
	Unavailable(&'static str),

	/// The key-value storage rejected a read or a write.
	#[error("storage error: {0}")]
	Storage(String),

	/// A call into the host environment threw.
	#[error("host call failed: {0}")]
	Host(String),
}
