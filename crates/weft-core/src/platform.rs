//! Host platform adapter.
//!
//! [`Platform`] is the narrow slice of browser APIs the router and the store
//! consume: location reads, history writes, window events, animation frames
//! and `document.cookie`. It is object safe so that a router can hold an
//! `Rc<dyn Platform>` and be driven by [`MemoryPlatform`](crate::MemoryPlatform)
//! in tests and by [`WebPlatform`](crate::web) in the browser.
//!
//! All methods take `&self`: the host is single threaded and implementations
//! use interior mutability.

use crate::error::PlatformResult;
use std::rc::{Rc, Weak};

/// Browser event fired on back/forward navigation.
pub const POPSTATE: &str = "popstate";

/// Synthetic event dispatched after a programmatic push.
pub const CHANGE_ROUTE: &str = "changeroute";

/// Callback invoked with the name of the event that fired.
pub type EventCallback = Rc<dyn Fn(&str)>;

/// Identifier of a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// The host environment as seen by the router and the store.
pub trait Platform {
	/// `location.pathname`.
	fn pathname(&self) -> String;

	/// `location.search`, including the leading `?` when non-empty.
	fn search(&self) -> String;

	/// `location.hash`, including the leading `#` when non-empty.
	fn hash(&self) -> String;

	/// `location.href`.
	fn href(&self) -> String;

	/// `location.origin`.
	fn origin(&self) -> String;

	/// `history.pushState(null, "", url)`.
	fn push_state(&self, url: &str) -> PlatformResult<()>;

	/// `history.replaceState(null, "", url)`.
	fn replace_state(&self, url: &str) -> PlatformResult<()>;

	/// Full page navigation (`window.location = url`).
	fn assign(&self, url: &str) -> PlatformResult<()>;

	/// Whether the HTML5 history API and custom events are usable.
	fn supports_history(&self) -> bool;

	/// Registers a window event listener.
	fn add_event_listener(&self, event: &str, callback: EventCallback) -> ListenerId;

	/// Removes a listener previously returned by [`Platform::add_event_listener`].
	///
	/// Unknown ids are ignored.
	fn remove_event_listener(&self, id: ListenerId);

	/// Dispatches a window event by name.
	fn dispatch_event(&self, event: &str) -> PlatformResult<()>;

	/// Schedules `callback` for the next animation frame.
	fn request_animation_frame(&self, callback: Box<dyn FnOnce()>) -> PlatformResult<()>;

	/// Raw `document.cookie` string.
	fn cookie(&self) -> String;

	/// Assigns `document.cookie`.
	fn set_cookie(&self, cookie: &str) -> PlatformResult<()>;
}

/// Persistent string key-value storage (browser `localStorage`).
pub trait KeyValueStorage {
	/// Reads a value, `Ok(None)` when the key is absent.
	fn get(&self, key: &str) -> PlatformResult<Option<String>>;

	/// Writes a value.
	fn set(&self, key: &str, value: &str) -> PlatformResult<()>;
}

/// A registered event listener that is removed when dropped.
///
/// The guard only holds a weak reference to the platform, so it never keeps
/// the platform alive on its own.
#[must_use = "the listener is removed as soon as the guard is dropped"]
pub struct ListenerGuard {
	platform: Weak<dyn Platform>,
	id: ListenerId,
	event: String,
}

impl ListenerGuard {
	/// Returns the listener id.
	pub fn id(&self) -> ListenerId {
		self.id
	}

	/// Returns the event this listener is registered for.
	pub fn event(&self) -> &str {
		&self.event
	}
}

impl std::fmt::Debug for ListenerGuard {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ListenerGuard")
			.field("id", &self.id)
			.field("event", &self.event)
			.finish()
	}
}

impl Drop for ListenerGuard {
	fn drop(&mut self) {
		if let Some(platform) = self.platform.upgrade() {
			platform.remove_event_listener(self.id);
			tracing::trace!(event = %self.event, id = self.id.0, "listener removed");
		}
	}
}

/// Registers `callback` for `event` and returns a guard that unregisters it.
pub fn listen(
	platform: &Rc<dyn Platform>,
	event: &str,
	callback: impl Fn(&str) + 'static,
) -> ListenerGuard {
	let id = platform.add_event_listener(event, Rc::new(callback));
	tracing::trace!(event = %event, id = id.0, "listener added");
	ListenerGuard {
		platform: Rc::downgrade(platform),
		id,
		event: event.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryPlatform;
	use rstest::rstest;
	use std::cell::Cell;

	#[rstest]
	fn test_listener_guard_unregisters_on_drop() {
		// Arrange
		let platform: Rc<dyn Platform> = Rc::new(MemoryPlatform::new("https://example.com/"));
		let hits = Rc::new(Cell::new(0));
		let hits_clone = hits.clone();
		let guard = listen(&platform, POPSTATE, move |_| hits_clone.set(hits_clone.get() + 1));

		// Act
		platform.dispatch_event(POPSTATE).unwrap();
		drop(guard);
		platform.dispatch_event(POPSTATE).unwrap();

		// Assert
		assert_eq!(hits.get(), 1);
	}

	#[rstest]
	fn test_listener_guard_outliving_platform() {
		let platform: Rc<dyn Platform> = Rc::new(MemoryPlatform::new("https://example.com/"));
		let guard = listen(&platform, CHANGE_ROUTE, |_| {});
		assert_eq!(guard.event(), CHANGE_ROUTE);

		drop(platform);
		// Dropping after the platform is gone must not panic.
		drop(guard);
	}
}
