//! Store settings (`[store]` table).

use serde::{Deserialize, Serialize};

/// Default storage key the store data is persisted under.
pub const DEFAULT_PERSIST_KEY: &str = "data";

/// Store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
	/// Hydrate from and flush to persistent storage.
	pub persist: bool,
	/// Storage key holding the JSON document.
	pub persist_key: String,
}

impl Default for StoreSettings {
	fn default() -> Self {
		Self {
			persist: false,
			persist_key: DEFAULT_PERSIST_KEY.to_string(),
		}
	}
}

impl StoreSettings {
	/// Settings with persistence enabled under the default key.
	pub fn persistent() -> Self {
		Self {
			persist: true,
			..Self::default()
		}
	}
}
