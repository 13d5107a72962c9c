//! Settings loading.
//!
//! Every settings struct in the workspace (`RouterSettings`, `StoreSettings`,
//! [`LoggingSettings`](crate::LoggingSettings)) is a plain serde type with
//! `#[serde(default)]`; this module only turns TOML text or files into them.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
	/// The settings file could not be read.
	#[error("failed to read settings file {path}: {source}")]
	Io {
		/// File that was read.
		path: PathBuf,
		/// Underlying I/O error.
		#[source]
		source: std::io::Error,
	},

	/// The TOML document is malformed or does not fit the settings type.
	#[error("invalid settings: {0}")]
	Parse(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid value for '{field}': {message}")]
	Invalid {
		/// Offending field.
		field: &'static str,
		/// What is wrong with it.
		message: String,
	},
}

/// Parses settings from a TOML document.
pub fn from_toml_str<T: DeserializeOwned>(source: &str) -> ConfigResult<T> {
	Ok(toml::from_str(source)?)
}

/// Reads and parses a TOML settings file.
pub fn from_toml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> ConfigResult<T> {
	let path = path.as_ref();
	let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	tracing::debug!(path = %path.display(), "loading settings");
	from_toml_str(&source)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde::Deserialize;
	use std::io::Write;

	#[derive(Debug, Deserialize, PartialEq)]
	#[serde(default)]
	struct Sample {
		name: String,
		retries: u32,
	}

	impl Default for Sample {
		fn default() -> Self {
			Self {
				name: "default".to_string(),
				retries: 3,
			}
		}
	}

	#[rstest]
	fn test_from_toml_str_fills_defaults() {
		let sample: Sample = from_toml_str("retries = 5").unwrap();
		assert_eq!(
			sample,
			Sample {
				name: "default".to_string(),
				retries: 5
			}
		);
	}

	#[rstest]
	fn test_from_toml_str_rejects_wrong_type() {
		let result: ConfigResult<Sample> = from_toml_str("retries = \"many\"");
		assert!(matches!(result, Err(ConfigError::Parse(_))));
	}

	#[rstest]
	fn test_from_toml_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "name = \"from-file\"").unwrap();

		let sample: Sample = from_toml_file(file.path()).unwrap();

		assert_eq!(sample.name, "from-file");
	}

	#[rstest]
	fn test_from_toml_file_missing() {
		let result: ConfigResult<Sample> = from_toml_file("/definitely/not/here.toml");
		assert!(matches!(result, Err(ConfigError::Io { .. })));
	}
}
