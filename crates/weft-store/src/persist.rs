//! Persistent storage sync.
//!
//! The whole data map is stored as one JSON object under a single key. It
//! is read once when the store is built and written after every emit that
//! changed the data.

use crate::error::{StoreError, StoreResult};
use crate::schema::Schema;
use serde_json::{Map, Value};
use std::rc::Rc;
use weft_core::KeyValueStorage;

/// Syncs store data with a [`KeyValueStorage`].
#[derive(Clone)]
pub struct StorageSync {
	storage: Rc<dyn KeyValueStorage>,
	key: String,
}

impl std::fmt::Debug for StorageSync {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StorageSync").field("key", &self.key).finish()
	}
}

impl StorageSync {
	/// Syncs under `key`.
	pub fn new(storage: Rc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
		Self {
			storage,
			key: key.into(),
		}
	}

	/// The storage key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Overlays stored values onto `data` and returns how many were applied.
	///
	/// Stored keys the schema does not know, or whose kind changed, are
	/// dropped with a warning; keys missing from storage keep their initial
	/// values. A document that is not a JSON object is ignored.
	///
	/// # Errors
	///
	/// [`StoreError::Persistence`] when the storage read fails.
	pub fn hydrate(&self, data: &mut Map<String, Value>, schema: &Schema) -> StoreResult<usize> {
		let Some(text) = self.storage.get(&self.key)? else {
			tracing::debug!(key = %self.key, "nothing persisted yet");
			return Ok(0);
		};

		let stored = match serde_json::from_str::<Value>(&text) {
			Ok(Value::Object(stored)) => stored,
			Ok(_) => {
				tracing::warn!(key = %self.key, "persisted store data is not an object, ignored");
				return Ok(0);
			}
			Err(err) => {
				tracing::warn!(key = %self.key, error = %err, "persisted store data is not valid JSON, ignored");
				return Ok(0);
			}
		};

		let mut applied = 0;
		for (key, value) in stored {
			if let Err(err) = schema.check(&key, &value) {
				tracing::warn!(key = %key, error = %err, "dropping persisted value");
				continue;
			}
			data.insert(key, value);
			applied += 1;
		}
		tracing::debug!(key = %self.key, applied, "store hydrated");
		Ok(applied)
	}

	/// Writes `data` as JSON.
	pub fn flush(&self, data: &Map<String, Value>) -> StoreResult<()> {
		let text = serde_json::to_string(data).map_err(StoreError::Serialize)?;
		self.storage.set(&self.key, &text)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;
	use weft_core::MemoryStorage;

	fn object(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => Map::new(),
		}
	}

	#[fixture]
	fn storage() -> Rc<MemoryStorage> {
		Rc::new(MemoryStorage::new())
	}

	#[rstest]
	fn test_flush_then_hydrate(storage: Rc<MemoryStorage>) {
		// Arrange
		let sync = StorageSync::new(storage.clone(), "data");
		let saved = object(json!({"count": 5, "name": "kept"}));
		sync.flush(&saved).unwrap();
		let mut data = object(json!({"count": 0, "name": "", "other": true}));
		let schema = Schema::infer(&data);

		// Act
		let applied = sync.hydrate(&mut data, &schema).unwrap();

		// Assert
		assert_eq!(applied, 2);
		assert_eq!(data, object(json!({"count": 5, "name": "kept", "other": true})));
	}

	#[rstest]
	fn test_hydrate_drops_unknown_and_mismatched(storage: Rc<MemoryStorage>) {
		storage.set("data", r#"{"count": "five", "ghost": 1, "ok": false}"#).unwrap();
		let sync = StorageSync::new(storage.clone(), "data");
		let mut data = object(json!({"count": 0, "ok": true}));
		let schema = Schema::infer(&data);

		let applied = sync.hydrate(&mut data, &schema).unwrap();

		assert_eq!(applied, 1);
		assert_eq!(data, object(json!({"count": 0, "ok": false})));
	}

	#[rstest]
	#[case("not json")]
	#[case("[1, 2]")]
	fn test_hydrate_ignores_garbage(storage: Rc<MemoryStorage>, #[case] stored: &str) {
		storage.set("data", stored).unwrap();
		let sync = StorageSync::new(storage.clone(), "data");
		let mut data = object(json!({"count": 0}));
		let schema = Schema::infer(&data);

		assert_eq!(sync.hydrate(&mut data, &schema).unwrap(), 0);
		assert_eq!(data, object(json!({"count": 0})));
	}

	#[rstest]
	fn test_flush_failure(storage: Rc<MemoryStorage>) {
		storage.fail_writes(true);
		let sync = StorageSync::new(storage.clone(), "data");

		let result = sync.flush(&object(json!({"a": 1})));

		assert!(matches!(result, Err(StoreError::Persistence(_))));
	}
}
