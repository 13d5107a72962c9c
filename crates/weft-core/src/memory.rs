//! In-memory platform.
//!
//! [`MemoryPlatform`] behaves like a browser tab without a DOM: it keeps a
//! history stack, resolves relative URLs against the current entry, fires
//! `popstate` on [`back`](MemoryPlatform::back)/[`forward`](MemoryPlatform::forward)
//! and queues animation frames until [`run_frames`](MemoryPlatform::run_frames)
//! is called. It is what non-browser hosts and every test in the workspace
//! drive the router with.

use crate::error::{PlatformError, PlatformResult};
use crate::platform::{EventCallback, KeyValueStorage, ListenerId, POPSTATE, Platform};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

/// One history entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Entry {
	pathname: String,
	search: String,
	hash: String,
}

impl Entry {
	/// Resolves `url` relative to `self`, the way `history.pushState` does.
	fn resolve(&self, origin: &str, url: &str) -> Entry {
		let url = url.strip_prefix(origin).unwrap_or(url);

		if url.starts_with('#') {
			return Entry {
				pathname: self.pathname.clone(),
				search: self.search.clone(),
				hash: url.to_string(),
			};
		}

		let (rest, hash) = match url.find('#') {
			Some(index) => (&url[..index], url[index..].to_string()),
			None => (url, String::new()),
		};
		let (pathname, search) = match rest.find('?') {
			Some(index) => (&rest[..index], rest[index..].to_string()),
			None => (rest, String::new()),
		};

		let pathname = if pathname.is_empty() {
			self.pathname.clone()
		} else if pathname.starts_with('/') {
			pathname.to_string()
		} else {
			// Relative to the current directory.
			let dir = match self.pathname.rfind('/') {
				Some(index) => &self.pathname[..=index],
				None => "/",
			};
			format!("{}{}", dir, pathname)
		};

		Entry {
			pathname,
			search,
			hash,
		}
	}

	fn href(&self, origin: &str) -> String {
		format!("{}{}{}{}", origin, self.pathname, self.search, self.hash)
	}
}

/// Splits an absolute URL into its origin and the rest.
fn split_origin(href: &str) -> (String, String) {
	let Some(scheme_end) = href.find("://") else {
		return (String::new(), href.to_string());
	};
	let after_scheme = scheme_end + 3;
	match href[after_scheme..].find(['/', '?', '#']) {
		Some(index) => (
			href[..after_scheme + index].to_string(),
			href[after_scheme + index..].to_string(),
		),
		None => (href.to_string(), "/".to_string()),
	}
}

/// Deterministic browser stand-in.
pub struct MemoryPlatform {
	origin: String,
	entries: RefCell<Vec<Entry>>,
	cursor: Cell<usize>,
	listeners: RefCell<Vec<(ListenerId, String, EventCallback)>>,
	next_listener: Cell<u64>,
	dispatched: RefCell<Vec<String>>,
	assigned: RefCell<Vec<String>>,
	frames: RefCell<VecDeque<Box<dyn FnOnce()>>>,
	cookie: RefCell<String>,
	supports_history: Cell<bool>,
}

impl std::fmt::Debug for MemoryPlatform {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryPlatform")
			.field("href", &self.href())
			.field("history_len", &self.entries.borrow().len())
			.field("cursor", &self.cursor.get())
			.field("listeners", &self.listeners.borrow().len())
			.finish()
	}
}

impl MemoryPlatform {
	/// Creates a platform whose single history entry is `href`.
	///
	/// `href` is usually absolute (`https://example.com/users/`); a bare
	/// path is accepted and yields an empty origin.
	pub fn new(href: &str) -> Self {
		let (origin, rest) = split_origin(href);
		let root = Entry {
			pathname: "/".to_string(),
			..Entry::default()
		};
		let first = root.resolve(&origin, &rest);

		Self {
			origin,
			entries: RefCell::new(vec![first]),
			cursor: Cell::new(0),
			listeners: RefCell::new(Vec::new()),
			next_listener: Cell::new(1),
			dispatched: RefCell::new(Vec::new()),
			assigned: RefCell::new(Vec::new()),
			frames: RefCell::new(VecDeque::new()),
			cookie: RefCell::new(String::new()),
			supports_history: Cell::new(true),
		}
	}

	fn current(&self) -> Entry {
		self.entries.borrow()[self.cursor.get()].clone()
	}

	/// Number of entries in the history stack.
	pub fn history_len(&self) -> usize {
		self.entries.borrow().len()
	}

	/// `href` of every history entry, oldest first.
	pub fn history(&self) -> Vec<String> {
		self.entries
			.borrow()
			.iter()
			.map(|entry| entry.href(&self.origin))
			.collect()
	}

	/// Goes one entry back and fires `popstate`. Returns `false` at the start.
	pub fn back(&self) -> bool {
		let cursor = self.cursor.get();
		if cursor == 0 {
			return false;
		}
		self.cursor.set(cursor - 1);
		self.fire(POPSTATE);
		true
	}

	/// Goes one entry forward and fires `popstate`. Returns `false` at the end.
	pub fn forward(&self) -> bool {
		let cursor = self.cursor.get();
		if cursor + 1 >= self.entries.borrow().len() {
			return false;
		}
		self.cursor.set(cursor + 1);
		self.fire(POPSTATE);
		true
	}

	/// Names of every event dispatched through [`Platform::dispatch_event`]
	/// or fired by back/forward navigation, in order.
	pub fn dispatched_events(&self) -> Vec<String> {
		self.dispatched.borrow().clone()
	}

	/// URLs passed to [`Platform::assign`], in order.
	pub fn assigned(&self) -> Vec<String> {
		self.assigned.borrow().clone()
	}

	/// Number of registered listeners.
	pub fn listener_count(&self) -> usize {
		self.listeners.borrow().len()
	}

	/// Number of queued animation frames.
	pub fn pending_frames(&self) -> usize {
		self.frames.borrow().len()
	}

	/// Runs the frames queued so far. Frames requested while running wait
	/// for the next call. Returns how many frames ran.
	pub fn run_frames(&self) -> usize {
		let frames: Vec<_> = self.frames.borrow_mut().drain(..).collect();
		let count = frames.len();
		for frame in frames {
			frame();
		}
		count
	}

	/// Toggles what [`Platform::supports_history`] reports.
	pub fn set_supports_history(&self, supported: bool) {
		self.supports_history.set(supported);
	}

	fn fire(&self, event: &str) {
		self.dispatched.borrow_mut().push(event.to_string());

		// Callbacks may add or remove listeners, so call them on a snapshot.
		let callbacks: Vec<EventCallback> = self
			.listeners
			.borrow()
			.iter()
			.filter(|(_, name, _)| name == event)
			.map(|(_, _, callback)| callback.clone())
			.collect();
		for callback in callbacks {
			callback(event);
		}
	}
}

impl Platform for MemoryPlatform {
	fn pathname(&self) -> String {
		self.current().pathname
	}

	fn search(&self) -> String {
		self.current().search
	}

	fn hash(&self) -> String {
		self.current().hash
	}

	fn href(&self) -> String {
		self.current().href(&self.origin)
	}

	fn origin(&self) -> String {
		self.origin.clone()
	}

	fn push_state(&self, url: &str) -> PlatformResult<()> {
		if !self.supports_history.get() {
			return Err(PlatformError::Unavailable("history"));
		}
		let next = self.current().resolve(&self.origin, url);
		let cursor = self.cursor.get();
		let mut entries = self.entries.borrow_mut();
		entries.truncate(cursor + 1);
		entries.push(next);
		self.cursor.set(cursor + 1);
		Ok(())
	}

	fn replace_state(&self, url: &str) -> PlatformResult<()> {
		if !self.supports_history.get() {
			return Err(PlatformError::Unavailable("history"));
		}
		let next = self.current().resolve(&self.origin, url);
		self.entries.borrow_mut()[self.cursor.get()] = next;
		Ok(())
	}

	fn assign(&self, url: &str) -> PlatformResult<()> {
		self.assigned.borrow_mut().push(url.to_string());
		let next = self.current().resolve(&self.origin, url);
		let cursor = self.cursor.get();
		let mut entries = self.entries.borrow_mut();
		entries.truncate(cursor + 1);
		entries.push(next);
		self.cursor.set(cursor + 1);
		Ok(())
	}

	fn supports_history(&self) -> bool {
		self.supports_history.get()
	}

	fn add_event_listener(&self, event: &str, callback: EventCallback) -> ListenerId {
		let id = ListenerId(self.next_listener.get());
		self.next_listener.set(id.0 + 1);
		self.listeners
			.borrow_mut()
			.push((id, event.to_string(), callback));
		id
	}

	fn remove_event_listener(&self, id: ListenerId) {
		self.listeners
			.borrow_mut()
			.retain(|(listener, _, _)| *listener != id);
	}

	fn dispatch_event(&self, event: &str) -> PlatformResult<()> {
		self.fire(event);
		Ok(())
	}

	fn request_animation_frame(&self, callback: Box<dyn FnOnce()>) -> PlatformResult<()> {
		self.frames.borrow_mut().push_back(callback);
		Ok(())
	}

	fn cookie(&self) -> String {
		self.cookie.borrow().clone()
	}

	/// Adds or replaces one pair, like assigning `document.cookie`.
	/// Attributes after the first `;` are dropped.
	fn set_cookie(&self, cookie: &str) -> PlatformResult<()> {
		let pair = cookie.split(';').next().unwrap_or_default().trim();
		if pair.is_empty() {
			return Ok(());
		}
		let name = pair.split('=').next().unwrap_or_default();

		let mut jar = self.cookie.borrow_mut();
		let mut pairs: Vec<&str> = jar
			.split("; ")
			.filter(|existing| !existing.is_empty())
			.collect();
		match pairs
			.iter()
			.position(|existing| existing.split('=').next() == Some(name))
		{
			Some(index) => pairs[index] = pair,
			None => pairs.push(pair),
		}
		let updated = pairs.join("; ");
		*jar = updated;
		Ok(())
	}
}

/// In-memory [`KeyValueStorage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
	items: RefCell<HashMap<String, String>>,
	fail_writes: Cell<bool>,
}

impl MemoryStorage {
	/// Creates an empty storage.
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every subsequent [`KeyValueStorage::set`] fail.
	pub fn fail_writes(&self, fail: bool) {
		self.fail_writes.set(fail);
	}

	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.items.borrow().len()
	}

	/// Whether nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.items.borrow().is_empty()
	}
}

impl KeyValueStorage for MemoryStorage {
	fn get(&self, key: &str) -> PlatformResult<Option<String>> {
		Ok(self.items.borrow().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> PlatformResult<()> {
		if self.fail_writes.get() {
			return Err(PlatformError::Storage(format!(
				"write to '{}' rejected",
				key
			)));
		}
		self.items
			.borrow_mut()
			.insert(key.to_string(), value.to_string());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::rc::Rc;

	#[rstest]
	#[case("https://example.com/users/?tab=1#top", "https://example.com", "/users/", "?tab=1", "#top")]
	#[case("https://example.com", "https://example.com", "/", "", "")]
	#[case("/plain", "", "/plain", "", "")]
	fn test_new_splits_href(
		#[case] href: &str,
		#[case] origin: &str,
		#[case] pathname: &str,
		#[case] search: &str,
		#[case] hash: &str,
	) {
		let platform = MemoryPlatform::new(href);
		assert_eq!(platform.origin(), origin);
		assert_eq!(platform.pathname(), pathname);
		assert_eq!(platform.search(), search);
		assert_eq!(platform.hash(), hash);
	}

	#[rstest]
	fn test_push_and_back_forward() {
		// Arrange
		let platform = MemoryPlatform::new("https://example.com/");

		// Act
		platform.push_state("/a").unwrap();
		platform.push_state("/b?x=1").unwrap();

		// Assert
		assert_eq!(platform.href(), "https://example.com/b?x=1");
		assert!(platform.back());
		assert_eq!(platform.pathname(), "/a");
		assert!(platform.forward());
		assert_eq!(platform.search(), "?x=1");
		assert!(!platform.forward());
		assert_eq!(platform.dispatched_events(), vec![POPSTATE, POPSTATE]);
	}

	#[rstest]
	fn test_push_truncates_forward_entries() {
		let platform = MemoryPlatform::new("https://example.com/");
		platform.push_state("/a").unwrap();
		platform.push_state("/b").unwrap();
		platform.back();

		platform.push_state("/c").unwrap();

		assert_eq!(
			platform.history(),
			vec![
				"https://example.com/",
				"https://example.com/a",
				"https://example.com/c"
			]
		);
	}

	#[rstest]
	fn test_replace_keeps_length() {
		let platform = MemoryPlatform::new("https://example.com/a");
		platform.replace_state("/b").unwrap();
		assert_eq!(platform.history_len(), 1);
		assert_eq!(platform.pathname(), "/b");
	}

	#[rstest]
	fn test_hash_only_url_keeps_path() {
		let platform = MemoryPlatform::new("https://example.com/app");
		platform.push_state("#!/users/1").unwrap();
		assert_eq!(platform.pathname(), "/app");
		assert_eq!(platform.hash(), "#!/users/1");
	}

	#[rstest]
	fn test_history_unsupported() {
		let platform = MemoryPlatform::new("https://example.com/");
		platform.set_supports_history(false);
		assert!(!platform.supports_history());
		assert_eq!(
			platform.push_state("/a"),
			Err(PlatformError::Unavailable("history"))
		);
	}

	#[rstest]
	fn test_frames_requested_during_run_wait() {
		let platform = Rc::new(MemoryPlatform::new("https://example.com/"));
		let inner = platform.clone();
		platform
			.request_animation_frame(Box::new(move || {
				inner.request_animation_frame(Box::new(|| {})).unwrap();
			}))
			.unwrap();

		assert_eq!(platform.run_frames(), 1);
		assert_eq!(platform.pending_frames(), 1);
		assert_eq!(platform.run_frames(), 1);
		assert_eq!(platform.pending_frames(), 0);
	}

	#[rstest]
	fn test_memory_storage_failure_injection() {
		let storage = MemoryStorage::new();
		storage.set("a", "1").unwrap();
		storage.fail_writes(true);

		assert!(storage.set("b", "2").is_err());
		assert_eq!(storage.get("a").unwrap(), Some("1".to_string()));
		assert_eq!(storage.get("b").unwrap(), None);
		assert_eq!(storage.len(), 1);
	}
}
