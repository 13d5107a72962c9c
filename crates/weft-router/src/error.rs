//! Error types for client-side routing.

use thiserror::Error;
use weft_core::PlatformError;

/// Boxed error carried out of user middleware.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

/// Error type for router operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RouterError {
	/// The route table is malformed.
	#[error("invalid route configuration: {0}")]
	Config(String),

	/// No route is registered under this name.
	#[error("undefined route: {0}")]
	UnknownRoute(String),

	/// A route's before-middleware returned an error.
	#[error("middleware of route '{route}' failed: {source}")]
	Middleware {
		/// Name of the matched route.
		route: String,
		/// Error returned by the middleware.
		#[source]
		source: BoxError,
	},

	/// Redirects kept chaining past the configured bound.
	#[error("redirect loop detected at '{path}' after {limit} redirects")]
	RedirectLoop {
		/// Path that would have been resolved next.
		path: String,
		/// Configured bound.
		limit: usize,
	},

	/// The host refused a history or event operation.
	#[error("navigation failed: {0}")]
	Platform(#[from] PlatformError),
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::error::Error as _;

	#[rstest]
	fn test_middleware_error_keeps_source() {
		let err = RouterError::Middleware {
			route: "admin".to_string(),
			source: anyhow::anyhow!("not logged in").into(),
		};

		assert_eq!(
			err.to_string(),
			"middleware of route 'admin' failed: not logged in"
		);
		assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("not logged in"));
	}

	#[rstest]
	fn test_redirect_loop_display() {
		let err = RouterError::RedirectLoop {
			path: "/a".to_string(),
			limit: 2,
		};
		assert_eq!(err.to_string(), "redirect loop detected at '/a' after 2 redirects");
	}
}
