//! Logging setup.
//!
//! Library code only emits `tracing` events. Applications that want them on
//! stderr call [`init`] once at startup; the `WEFT_LOG` environment variable
//! overrides the configured filter.

use crate::config::ConfigResult;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides [`LoggingSettings::filter`].
pub const LOG_ENV: &str = "WEFT_LOG";

/// Logging settings (`[logging]` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
	/// `EnvFilter` directive, e.g. `"info"` or `"weft_router=debug,info"`.
	pub filter: String,
	/// Colored output.
	pub ansi: bool,
	/// Print event targets.
	pub with_target: bool,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			filter: "info".to_string(),
			ansi: true,
			with_target: false,
		}
	}
}

/// Installs a global fmt subscriber.
///
/// Returns `Ok(false)` when a global subscriber was already installed.
///
/// # Errors
///
/// [`ConfigError::Invalid`](crate::ConfigError::Invalid) when the filter
/// directive does not parse.
#[cfg(not(target_arch = "wasm32"))]
pub fn init(settings: &LoggingSettings) -> ConfigResult<bool> {
	use crate::config::ConfigError;
	use tracing_subscriber::EnvFilter;

	let directive = std::env::var(LOG_ENV).unwrap_or_else(|_| settings.filter.clone());
	let filter = EnvFilter::try_new(&directive).map_err(|e| ConfigError::Invalid {
		field: "logging.filter",
		message: e.to_string(),
	})?;

	let installed = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_ansi(settings.ansi)
		.with_target(settings.with_target)
		.try_init()
		.is_ok();
	Ok(installed)
}

/// No-op on wasm; the host page decides how console output is collected.
#[cfg(target_arch = "wasm32")]
pub fn init(_settings: &LoggingSettings) -> ConfigResult<bool> {
	Ok(false)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;

	#[rstest]
	fn test_default_settings() {
		let settings = LoggingSettings::default();
		assert_eq!(settings.filter, "info");
		assert!(settings.ansi);
	}

	#[rstest]
	#[serial(weft_log_env)]
	fn test_init_is_idempotent() {
		let settings = LoggingSettings {
			ansi: false,
			..LoggingSettings::default()
		};
		let first = init(&settings).unwrap();
		let second = init(&settings).unwrap();
		// Another test may have installed the subscriber first.
		assert!(!second);
		let _ = first;
	}

	#[rstest]
	#[serial(weft_log_env)]
	#[cfg(not(target_arch = "wasm32"))]
	fn test_env_overrides_filter() {
		// SAFETY: serialized with every other test touching WEFT_LOG.
		unsafe {
			std::env::set_var(LOG_ENV, "weft=loud");
		}

		let result = init(&LoggingSettings::default());

		// SAFETY: as above.
		unsafe {
			std::env::remove_var(LOG_ENV);
		}
		assert!(matches!(
			result,
			Err(crate::ConfigError::Invalid { field: "logging.filter", .. })
		));
	}
}
