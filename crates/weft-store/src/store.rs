//! The keyed store.
//!
//! State lives in a JSON object whose keys are fixed when the store is
//! built. Events are handled in a fixed order:
//!
//! 1. the handler is looked up; an unknown event is an error
//! 2. before-emit hooks run; a failing one vetoes the event silently
//! 3. middleware whose prefix starts the event name runs; a failure is an
//!    error
//! 4. the handler computes a sparse update map
//! 5. every update is validated, then all of them are applied
//! 6. the data is persisted, root subscribers re-render and after-emit
//!    hooks run
//!
//! Emitting from inside any of these steps is rejected with
//! [`StoreError::ReentrantEmit`].

use crate::error::{StoreError, StoreResult};
use crate::persist::StorageSync;
use crate::schema::{Schema, ValueKind};
use crate::settings::StoreSettings;
use crate::subscribers::{SubscriberTree, SubscriptionKey, Updater};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use weft_core::{ComponentHost, ComponentId, KeyValueStorage};

/// A sparse update: key to new value.
pub type Updates = Map<String, Value>;

/// Handles one event and returns the updates to apply, `None` for none.
pub type Handler = Rc<dyn Fn(&Store, &[Value]) -> anyhow::Result<Option<Updates>>>;

/// Runs before every event; an error vetoes it.
pub type BeforeEmitHook = Rc<dyn Fn(&Store, &str, &[Value]) -> anyhow::Result<()>>;

/// Runs after every event that changed the data.
pub type AfterEmitHook = Rc<dyn Fn(&Store, &str, &Updates, &[Value]) -> anyhow::Result<()>>;

/// Runs for every event whose name starts with the prefix.
pub type MiddlewareHook = Rc<dyn Fn(&Store, &str, &[Value]) -> anyhow::Result<()>>;

/// Prepares the initial data while the store is built.
pub type OnCreateHook = Box<dyn FnOnce(&mut Map<String, Value>) -> anyhow::Result<()>>;

/// What an emit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
	/// The data changed.
	Updated,
	/// The handler returned no updates.
	Unchanged,
	/// A before-emit hook vetoed the event.
	Vetoed,
}

#[derive(Clone)]
struct Middleware {
	prefix: String,
	hook: MiddlewareHook,
}

struct StoreInner {
	data: RefCell<Map<String, Value>>,
	schema: Schema,
	handlers: HashMap<String, Handler>,
	middlewares: Vec<Middleware>,
	before_emit: Vec<BeforeEmitHook>,
	after_emit: Vec<AfterEmitHook>,
	subscribers: RefCell<SubscriberTree>,
	host: Option<Rc<dyn ComponentHost>>,
	sync: Option<StorageSync>,
	emitting: Cell<bool>,
}

/// Clears the emitting flag when an emit returns, whichever way.
struct EmitGuard<'a>(&'a Cell<bool>);

impl Drop for EmitGuard<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

/// A shared handle to a store.
///
/// Cloning is cheap and every clone sees the same state.
#[derive(Clone)]
pub struct Store {
	inner: Rc<StoreInner>,
}

impl std::fmt::Debug for Store {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut events: Vec<_> = self.inner.handlers.keys().collect();
		events.sort();
		f.debug_struct("Store")
			.field("data", &self.inner.data.borrow())
			.field("events", &events)
			.field("subscribers", &self.inner.subscribers.borrow().len())
			.finish()
	}
}

impl Store {
	/// Starts building a store.
	pub fn builder() -> StoreBuilder {
		StoreBuilder::new()
	}

	/// Returns a copy of the value under `key`.
	pub fn get(&self, key: &str) -> Option<Value> {
		self.inner.data.borrow().get(key).cloned()
	}

	/// Returns the value under `key`.
	///
	/// # Errors
	///
	/// [`StoreError::Undefined`] when the key is missing or its value is
	/// null.
	pub fn get_safely(&self, key: &str) -> StoreResult<Value> {
		match self.get(key) {
			Some(Value::Null) | None => Err(StoreError::Undefined(key.to_string())),
			Some(value) => Ok(value),
		}
	}

	/// Deserializes the value under `key`.
	pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> StoreResult<T> {
		let value = self.get_safely(key)?;
		serde_json::from_value(value).map_err(|source| StoreError::Decode {
			key: key.to_string(),
			source,
		})
	}

	/// A copy of all data.
	pub fn snapshot(&self) -> Map<String, Value> {
		self.inner.data.borrow().clone()
	}

	/// The keys, sorted.
	pub fn keys(&self) -> Vec<String> {
		self.inner.data.borrow().keys().cloned().collect()
	}

	/// Kind registered for `key`.
	pub fn kind(&self, key: &str) -> Option<ValueKind> {
		self.inner.schema.kind(key)
	}

	/// Whether an emit is in progress.
	pub fn is_emitting(&self) -> bool {
		self.inner.emitting.get()
	}

	/// Emits `event` with `values`.
	///
	/// # Errors
	///
	/// - [`StoreError::ReentrantEmit`] from inside another emit
	/// - [`StoreError::UnknownEvent`] when no handler is registered
	/// - [`StoreError::Middleware`] / [`StoreError::Handler`] for callback failures
	/// - [`StoreError::UnknownKey`] / [`StoreError::TypeMismatch`] for invalid
	///   updates, in which case nothing is applied
	/// - [`StoreError::Propagation`] when root subscribers fail to re-render;
	///   the data has changed and after-emit hooks have run by then
	pub fn emit(&self, event: &str, values: &[Value]) -> StoreResult<EmitOutcome> {
		let inner = &self.inner;
		if inner.emitting.replace(true) {
			tracing::warn!(event = %event, "re-entrant emit rejected");
			return Err(StoreError::ReentrantEmit {
				event: event.to_string(),
			});
		}
		let _guard = EmitGuard(&inner.emitting);

		let handler = inner
			.handlers
			.get(event)
			.cloned()
			.ok_or_else(|| StoreError::UnknownEvent(event.to_string()))?;

		for hook in &inner.before_emit {
			if let Err(err) = hook(self, event, values) {
				tracing::debug!(event = %event, error = %err, "event vetoed by before-emit hook");
				return Ok(EmitOutcome::Vetoed);
			}
		}

		for middleware in inner.middlewares.iter().filter(|m| event.starts_with(&m.prefix)) {
			(middleware.hook)(self, event, values).map_err(|err| StoreError::Middleware {
				prefix: middleware.prefix.clone(),
				source: err.into(),
			})?;
		}

		let updates = handler(self, values).map_err(|err| StoreError::Handler {
			event: event.to_string(),
			source: err.into(),
		})?;
		let Some(updates) = updates else {
			tracing::trace!(event = %event, "handler returned no updates");
			return Ok(EmitOutcome::Unchanged);
		};

		self.merge(&updates)?;
		tracing::debug!(event = %event, keys = updates.len(), "store updated");

		if let Some(sync) = &inner.sync {
			if let Err(err) = sync.flush(&inner.data.borrow()) {
				tracing::warn!(event = %event, error = %err, "failed to persist store data");
			}
		}

		let propagated = self.propagate();

		for hook in &inner.after_emit {
			if let Err(err) = hook(self, event, &updates, values) {
				tracing::warn!(event = %event, error = %err, "after-emit hook failed");
			}
		}

		propagated.map(|_| EmitOutcome::Updated)
	}

	/// Validates every update, then applies them all.
	fn merge(&self, updates: &Updates) -> StoreResult<()> {
		for (key, value) in updates {
			self.inner.schema.check(key, value)?;
		}
		let mut data = self.inner.data.borrow_mut();
		for (key, value) in updates {
			data.insert(key.clone(), value.clone());
		}
		Ok(())
	}

	/// Re-renders the root subscribers and returns how many were updated.
	///
	/// Unmounted subscribers are dropped first. A subscriber whose updater
	/// returns `false` is skipped. Every root is attempted even when some
	/// fail.
	///
	/// # Errors
	///
	/// [`StoreError::Propagation`] listing the failures.
	pub fn propagate(&self) -> StoreResult<usize> {
		let Some(host) = &self.inner.host else {
			return Ok(0);
		};

		let roots = {
			let mut subscribers = self.inner.subscribers.borrow_mut();
			subscribers.prune(host.as_ref());
			subscribers.roots()
		};

		let mut updated = 0;
		let mut failures = Vec::new();
		for (component, updater) in roots {
			if updater.is_some_and(|updater| !updater()) {
				tracing::trace!(component = %component, "update skipped by custom updater");
				continue;
			}
			match host.force_update(component) {
				Ok(()) => updated += 1,
				Err(err) => {
					tracing::warn!(component = %component, error = %err, "subscriber update failed");
					failures.push(err);
				}
			}
		}

		if failures.is_empty() {
			Ok(updated)
		} else {
			Err(StoreError::Propagation(failures))
		}
	}

	/// Subscribes `component` to updates.
	///
	/// The subscription ends when the returned guard is dropped.
	///
	/// # Errors
	///
	/// [`StoreError::NoHost`] when the store has no component host.
	pub fn subscribe(&self, component: ComponentId) -> StoreResult<Subscription> {
		self.subscribe_inner(component, None)
	}

	/// Subscribes `component` with a custom updater run before each
	/// re-render; returning `false` skips it.
	pub fn subscribe_with(
		&self,
		component: ComponentId,
		updater: impl Fn() -> bool + 'static,
	) -> StoreResult<Subscription> {
		self.subscribe_inner(component, Some(Rc::new(updater)))
	}

	fn subscribe_inner(&self, component: ComponentId, updater: Option<Updater>) -> StoreResult<Subscription> {
		let host = self.inner.host.as_ref().ok_or(StoreError::NoHost)?;
		let key = self
			.inner
			.subscribers
			.borrow_mut()
			.subscribe(host.as_ref(), component, updater);
		Ok(Subscription {
			store: Rc::downgrade(&self.inner),
			key,
			component,
		})
	}

	/// Whether `component` has no subscribed ancestor.
	pub fn is_root(&self, component: ComponentId) -> bool {
		match &self.inner.host {
			Some(host) => self.inner.subscribers.borrow().is_root(host.as_ref(), component),
			None => true,
		}
	}

	/// The current root subscribers.
	pub fn root_subscribers(&self) -> Vec<ComponentId> {
		self.inner
			.subscribers
			.borrow()
			.roots()
			.into_iter()
			.map(|(component, _)| component)
			.collect()
	}

	/// Number of live subscriptions.
	pub fn subscriber_count(&self) -> usize {
		self.inner.subscribers.borrow().len()
	}
}

/// A store subscription, removed when dropped.
#[must_use = "the subscription ends as soon as the guard is dropped"]
pub struct Subscription {
	store: Weak<StoreInner>,
	key: SubscriptionKey,
	component: ComponentId,
}

impl Subscription {
	/// The subscribed component.
	pub fn component(&self) -> ComponentId {
		self.component
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("component", &self.component)
			.finish()
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		let Some(inner) = self.store.upgrade() else {
			return;
		};
		let Some(host) = &inner.host else {
			return;
		};
		// A guard dropped during propagation finds the tree borrowed.
		match inner.subscribers.try_borrow_mut() {
			Ok(mut subscribers) => {
				subscribers.unsubscribe(host.as_ref(), self.key);
			}
			Err(_) => {
				tracing::warn!(component = %self.component, "subscriber tree busy, stale subscription left for pruning");
			}
		}
	}
}

/// Builder for [`Store`].
pub struct StoreBuilder {
	data: Map<String, Value>,
	schema: Schema,
	handlers: HashMap<String, Handler>,
	middlewares: Vec<Middleware>,
	on_create: Vec<OnCreateHook>,
	before_emit: Vec<BeforeEmitHook>,
	after_emit: Vec<AfterEmitHook>,
	host: Option<Rc<dyn ComponentHost>>,
	storage: Option<Rc<dyn KeyValueStorage>>,
	settings: StoreSettings,
}

impl Default for StoreBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl StoreBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self {
			data: Map::new(),
			schema: Schema::new(),
			handlers: HashMap::new(),
			middlewares: Vec::new(),
			on_create: Vec::new(),
			before_emit: Vec::new(),
			after_emit: Vec::new(),
			host: None,
			storage: None,
			settings: StoreSettings::default(),
		}
	}

	/// Adds a key; its kind is inferred from `initial`.
	pub fn value(mut self, key: impl Into<String>, initial: impl Into<Value>) -> Self {
		self.data.insert(key.into(), initial.into());
		self
	}

	/// Adds a key with an explicit kind.
	pub fn typed(mut self, key: impl Into<String>, kind: ValueKind, initial: impl Into<Value>) -> Self {
		let key = key.into();
		self.schema.insert(key.clone(), kind);
		self.data.insert(key, initial.into());
		self
	}

	/// Adds every entry of `data`; kinds are inferred.
	pub fn data(mut self, data: Map<String, Value>) -> Self {
		self.data.extend(data);
		self
	}

	/// Registers the handler for `event`, replacing an earlier one.
	pub fn handler<F>(mut self, event: impl Into<String>, handler: F) -> Self
	where
		F: Fn(&Store, &[Value]) -> anyhow::Result<Option<Updates>> + 'static,
	{
		self.handlers.insert(event.into(), Rc::new(handler));
		self
	}

	/// Adds middleware for events starting with `prefix`.
	pub fn middleware<F>(mut self, prefix: impl Into<String>, hook: F) -> Self
	where
		F: Fn(&Store, &str, &[Value]) -> anyhow::Result<()> + 'static,
	{
		self.middlewares.push(Middleware {
			prefix: prefix.into(),
			hook: Rc::new(hook),
		});
		self
	}

	/// Adds a hook run on the initial data during [`build`](Self::build).
	pub fn on_create<F>(mut self, hook: F) -> Self
	where
		F: FnOnce(&mut Map<String, Value>) -> anyhow::Result<()> + 'static,
	{
		self.on_create.push(Box::new(hook));
		self
	}

	/// Adds a before-emit hook.
	pub fn before_emit<F>(mut self, hook: F) -> Self
	where
		F: Fn(&Store, &str, &[Value]) -> anyhow::Result<()> + 'static,
	{
		self.before_emit.push(Rc::new(hook));
		self
	}

	/// Adds an after-emit hook.
	pub fn after_emit<F>(mut self, hook: F) -> Self
	where
		F: Fn(&Store, &str, &Updates, &[Value]) -> anyhow::Result<()> + 'static,
	{
		self.after_emit.push(Rc::new(hook));
		self
	}

	/// Sets the rendering runtime subscribers live in.
	pub fn host(mut self, host: Rc<dyn ComponentHost>) -> Self {
		self.host = Some(host);
		self
	}

	/// Sets the persistent storage used when persistence is enabled.
	pub fn storage(mut self, storage: Rc<dyn KeyValueStorage>) -> Self {
		self.storage = Some(storage);
		self
	}

	/// Enables persistence to `storage` under `settings.persist_key`.
	pub fn persist(self, storage: Rc<dyn KeyValueStorage>, settings: StoreSettings) -> Self {
		self.storage(storage).settings(StoreSettings {
			persist: true,
			..settings
		})
	}

	/// Replaces the settings.
	pub fn settings(mut self, settings: StoreSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Runs the on-create hooks, checks the data and hydrates it.
	///
	/// # Errors
	///
	/// - [`StoreError::OnCreate`] when a hook fails
	/// - [`StoreError::EmptyData`] when no key exists afterwards
	/// - [`StoreError::TypeMismatch`] when an initial value contradicts its
	///   declared kind
	/// - [`StoreError::Persistence`] when stored data cannot be read
	pub fn build(self) -> StoreResult<Store> {
		let mut data = self.data;
		for hook in self.on_create {
			hook(&mut data).map_err(|err| StoreError::OnCreate(err.into()))?;
		}
		if data.is_empty() {
			return Err(StoreError::EmptyData);
		}

		let mut schema = self.schema;
		for (key, value) in &data {
			if !schema.contains(key) {
				schema.insert(key.clone(), ValueKind::of(value));
			}
			schema.check(key, value)?;
		}

		let sync = match (self.settings.persist, self.storage) {
			(true, Some(storage)) => Some(StorageSync::new(storage, self.settings.persist_key.clone())),
			(true, None) => {
				tracing::warn!("store persistence enabled without a storage, disabled");
				None
			}
			(false, _) => None,
		};
		if let Some(sync) = &sync {
			sync.hydrate(&mut data, &schema)?;
		}

		tracing::debug!(
			keys = data.len(),
			events = self.handlers.len(),
			persist = sync.is_some(),
			"store created"
		);
		Ok(Store {
			inner: Rc::new(StoreInner {
				data: RefCell::new(data),
				schema,
				handlers: self.handlers,
				middlewares: self.middlewares,
				before_emit: self.before_emit,
				after_emit: self.after_emit,
				subscribers: RefCell::new(SubscriberTree::new()),
				host: self.host,
				sync,
				emitting: Cell::new(false),
			}),
		})
	}
}
