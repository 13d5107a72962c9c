//! Keyed reactive store for weft.
//!
//! A [`Store`] holds a JSON object whose keys and value kinds are fixed
//! at build time. State changes only through named events: each event has
//! one handler returning the keys to update, wrapped by before-emit hooks,
//! prefix middleware and after-emit hooks.
//!
//! Components subscribe through a [`ComponentHost`](weft_core::ComponentHost).
//! After an update only root subscribers, those without a subscribed
//! ancestor, are re-rendered.
//!
//! ```
//! use serde_json::json;
//! use weft_store::{EmitOutcome, Store};
//!
//! let store = Store::builder()
//!     .value("count", 0)
//!     .handler("increment", |store, _| {
//!         let count: i64 = store.get_as("count")?;
//!         let mut updates = serde_json::Map::new();
//!         updates.insert("count".into(), json!(count + 1));
//!         Ok(Some(updates))
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(store.emit("increment", &[]).unwrap(), EmitOutcome::Updated);
//! assert_eq!(store.get("count"), Some(json!(1)));
//! ```

pub mod error;
pub mod persist;
pub mod schema;
pub mod settings;
pub mod store;
pub mod subscribers;

pub use error::{BoxError, StoreError, StoreResult};
pub use persist::StorageSync;
pub use schema::{Schema, ValueKind};
pub use settings::{DEFAULT_PERSIST_KEY, StoreSettings};
pub use store::{
	AfterEmitHook, BeforeEmitHook, EmitOutcome, Handler, MiddlewareHook, OnCreateHook, Store,
	StoreBuilder, Subscription, Updates,
};
pub use subscribers::{SubscriberTree, SubscriptionKey, Updater};
