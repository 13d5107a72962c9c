//! Router settings (`[router]` table).

use crate::pattern::DEFAULT_MAX_ROUTE_PARAMS;
use serde::{Deserialize, Serialize};

/// Router settings.
///
/// ```toml
/// [router]
/// base_name = "/app"
/// hash_mode = false
/// force_refresh = false
/// max_route_params = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
	/// Prefix every URL is served under.
	pub base_name: String,
	/// Keep the route in `location.hash`.
	pub hash_mode: bool,
	/// Text between `#` and the base name in hash mode, e.g. `"!"`.
	pub hash_suffix: String,
	/// Navigate with full page loads instead of the history API.
	pub force_refresh: bool,
	/// Placeholders allowed per template; `0` means the default.
	pub max_route_params: usize,
	/// Chained redirects allowed per navigation; defaults to the number of
	/// routes.
	pub max_redirects: Option<usize>,
}

impl Default for RouterSettings {
	fn default() -> Self {
		Self {
			base_name: String::new(),
			hash_mode: false,
			hash_suffix: String::new(),
			force_refresh: false,
			max_route_params: DEFAULT_MAX_ROUTE_PARAMS,
			max_redirects: None,
		}
	}
}

impl RouterSettings {
	/// Creates hash-mode settings with the given suffix.
	pub fn hash(suffix: impl Into<String>) -> Self {
		Self {
			hash_mode: true,
			hash_suffix: suffix.into(),
			..Self::default()
		}
	}

	/// Sets the base name.
	pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
		self.base_name = base_name.into();
		self
	}

	/// The prefix actually written to the URL.
	///
	/// In hash mode this is `#` + suffix + base name.
	pub fn effective_base_name(&self) -> String {
		if self.hash_mode {
			format!("#{}{}", self.hash_suffix, self.base_name)
		} else {
			self.base_name.clone()
		}
	}

	/// The parameter bound with `0` normalized to the default.
	pub fn max_route_params(&self) -> usize {
		if self.max_route_params == 0 {
			DEFAULT_MAX_ROUTE_PARAMS
		} else {
			self.max_route_params
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(RouterSettings::default(), "")]
	#[case(RouterSettings::default().with_base_name("/app"), "/app")]
	#[case(RouterSettings::hash(""), "#")]
	#[case(RouterSettings::hash("!").with_base_name("/app"), "#!/app")]
	fn test_effective_base_name(#[case] settings: RouterSettings, #[case] expected: &str) {
		assert_eq!(settings.effective_base_name(), expected);
	}

	#[rstest]
	fn test_zero_params_means_default() {
		let settings = RouterSettings {
			max_route_params: 0,
			..RouterSettings::default()
		};
		assert_eq!(settings.max_route_params(), DEFAULT_MAX_ROUTE_PARAMS);
	}
}
