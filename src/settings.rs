//! Application settings.
//!
//! One TOML document configures every part of the toolkit:
//!
//! ```toml
//! [router]
//! base_name = "/shop"
//! hash_mode = false
//!
//! [store]
//! persist = true
//! persist_key = "cart"
//!
//! [logging]
//! filter = "weft_router=debug,info"
//! ```
//!
//! Missing tables and fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use weft_core::config::{self, ConfigError, ConfigResult};
use weft_core::LoggingSettings;

/// Settings for the whole application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
	/// `[router]` table.
	#[cfg(feature = "router")]
	pub router: weft_router::RouterSettings,
	/// `[store]` table.
	#[cfg(feature = "store")]
	pub store: weft_store::StoreSettings,
	/// `[logging]` table.
	pub logging: LoggingSettings,
}

impl AppSettings {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
		let settings: Self = config::from_toml_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Reads, parses and validates a TOML file.
	pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
		let settings: Self = config::from_toml_file(path)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Checks values that parse but cannot work.
	///
	/// # Errors
	///
	/// [`ConfigError::Invalid`] naming the offending field.
	pub fn validate(&self) -> ConfigResult<()> {
		#[cfg(feature = "router")]
		{
			if self.router.max_redirects == Some(0) {
				return Err(ConfigError::Invalid {
					field: "router.max_redirects",
					message: "must allow at least one redirect".to_string(),
				});
			}
			if !self.router.base_name.is_empty() && !self.router.base_name.starts_with('/') {
				return Err(ConfigError::Invalid {
					field: "router.base_name",
					message: format!("'{}' must start with '/'", self.router.base_name),
				});
			}
		}
		#[cfg(feature = "store")]
		{
			if self.store.persist && self.store.persist_key.is_empty() {
				return Err(ConfigError::Invalid {
					field: "store.persist_key",
					message: "must not be empty when persistence is enabled".to_string(),
				});
			}
		}
		Ok(())
	}

	/// Installs the global log subscriber from the `[logging]` table.
	///
	/// See [`weft_core::logging::init`].
	pub fn init_logging(&self) -> ConfigResult<bool> {
		weft_core::logging::init(&self.logging)
	}
}

#[cfg(all(test, feature = "router", feature = "store"))]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	#[rstest]
	fn test_empty_document_uses_defaults() {
		let settings = AppSettings::from_toml_str("").unwrap();
		assert_eq!(settings, AppSettings::default());
	}

	#[rstest]
	fn test_full_document() {
		// Arrange
		let source = r#"
			[router]
			base_name = "/shop"
			hash_mode = true
			hash_suffix = "!"
			max_redirects = 4

			[store]
			persist = true
			persist_key = "cart"

			[logging]
			filter = "debug"
			ansi = false
		"#;

		// Act
		let settings = AppSettings::from_toml_str(source).unwrap();

		// Assert
		assert_eq!(settings.router.base_name, "/shop");
		assert!(settings.router.hash_mode);
		assert_eq!(settings.router.effective_base_name(), "#!/shop");
		assert_eq!(settings.router.max_redirects, Some(4));
		assert!(settings.store.persist);
		assert_eq!(settings.store.persist_key, "cart");
		assert_eq!(settings.logging.filter, "debug");
		assert!(!settings.logging.ansi);
	}

	#[rstest]
	#[case("[router]\nmax_redirects = 0", "router.max_redirects")]
	#[case("[router]\nbase_name = \"shop\"", "router.base_name")]
	#[case("[store]\npersist = true\npersist_key = \"\"", "store.persist_key")]
	fn test_invalid_values(#[case] source: &str, #[case] expected: &str) {
		let result = AppSettings::from_toml_str(source);
		assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == expected));
	}

	#[rstest]
	fn test_wrong_type_is_parse_error() {
		let result = AppSettings::from_toml_str("[router]\nhash_mode = \"yes\"");
		assert!(matches!(result, Err(ConfigError::Parse(_))));
	}

	#[rstest]
	fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[store]\npersist = true").unwrap();

		let settings = AppSettings::from_toml_file(file.path()).unwrap();

		assert!(settings.store.persist);
		assert_eq!(settings.store.persist_key, "data");
	}

	#[rstest]
	fn test_missing_file() {
		let result = AppSettings::from_toml_file("/nonexistent/weft.toml");
		assert!(matches!(result, Err(ConfigError::Io { .. })));
	}
}
