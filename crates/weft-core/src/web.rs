//! Browser platform backed by `web-sys`.
//!
//! Only compiled for `wasm32`. Listener closures are owned by the platform
//! and dropped when the listener is removed, so no closure is leaked with
//! `forget()` except animation-frame callbacks, which free themselves after
//! running once.

use crate::error::{PlatformError, PlatformResult};
use crate::platform::{EventCallback, KeyValueStorage, ListenerId, Platform};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, HtmlDocument, Window};

type JsListener = Closure<dyn FnMut(Event)>;

fn window() -> PlatformResult<Window> {
	web_sys::window().ok_or(PlatformError::Unavailable("window"))
}

fn host_error(value: JsValue) -> PlatformError {
	PlatformError::Host(
		value
			.as_string()
			.unwrap_or_else(|| format!("{:?}", value)),
	)
}

/// [`Platform`] over the real browser window.
#[derive(Default)]
pub struct WebPlatform {
	listeners: RefCell<HashMap<ListenerId, (String, JsListener)>>,
	next_listener: Cell<u64>,
}

impl WebPlatform {
	/// Creates a platform bound to the global `window`.
	pub fn new() -> Self {
		Self {
			listeners: RefCell::new(HashMap::new()),
			next_listener: Cell::new(1),
		}
	}

	fn location_part(&self, read: impl Fn(&web_sys::Location) -> Result<String, JsValue>) -> String {
		window()
			.ok()
			.and_then(|w| read(&w.location()).ok())
			.unwrap_or_default()
	}
}

impl Platform for WebPlatform {
	fn pathname(&self) -> String {
		self.location_part(|l| l.pathname())
	}

	fn search(&self) -> String {
		self.location_part(|l| l.search())
	}

	fn hash(&self) -> String {
		self.location_part(|l| l.hash())
	}

	fn href(&self) -> String {
		self.location_part(|l| l.href())
	}

	fn origin(&self) -> String {
		self.location_part(|l| l.origin())
	}

	fn push_state(&self, url: &str) -> PlatformResult<()> {
		window()?
			.history()
			.map_err(host_error)?
			.push_state_with_url(&JsValue::NULL, "", Some(url))
			.map_err(host_error)
	}

	fn replace_state(&self, url: &str) -> PlatformResult<()> {
		window()?
			.history()
			.map_err(host_error)?
			.replace_state_with_url(&JsValue::NULL, "", Some(url))
			.map_err(host_error)
	}

	fn assign(&self, url: &str) -> PlatformResult<()> {
		window()?.location().set_href(url).map_err(host_error)
	}

	fn supports_history(&self) -> bool {
		let Ok(window) = window() else {
			return false;
		};
		let has_push_state = window
			.history()
			.ok()
			.and_then(|h| js_sys::Reflect::get(&h, &JsValue::from_str("pushState")).ok())
			.is_some_and(|f| f.is_function());
		let has_custom_event = js_sys::Reflect::get(&window, &JsValue::from_str("CustomEvent"))
			.is_ok_and(|f| f.is_function());
		has_push_state && has_custom_event
	}

	fn add_event_listener(&self, event: &str, callback: EventCallback) -> ListenerId {
		let id = ListenerId(self.next_listener.get());
		self.next_listener.set(id.0 + 1);

		let name = event.to_string();
		let closure = Closure::wrap(Box::new(move |e: Event| {
			callback(&e.type_());
		}) as Box<dyn FnMut(Event)>);

		match window() {
			Ok(w) => {
				if let Err(err) =
					w.add_event_listener_with_callback(&name, closure.as_ref().unchecked_ref())
				{
					tracing::error!(event = %name, error = ?err, "addEventListener failed");
				}
			}
			Err(err) => tracing::error!(event = %name, error = %err, "addEventListener failed"),
		}

		self.listeners.borrow_mut().insert(id, (name, closure));
		id
	}

	fn remove_event_listener(&self, id: ListenerId) {
		let Some((name, closure)) = self.listeners.borrow_mut().remove(&id) else {
			return;
		};
		match window() {
			Ok(w) => {
				if let Err(err) =
					w.remove_event_listener_with_callback(&name, closure.as_ref().unchecked_ref())
				{
					tracing::warn!(event = %name, error = ?err, "removeEventListener failed");
				}
			}
			Err(err) => tracing::warn!(event = %name, error = %err, "removeEventListener failed"),
		}
	}

	fn dispatch_event(&self, event: &str) -> PlatformResult<()> {
		let event = Event::new(event).map_err(host_error)?;
		window()?.dispatch_event(&event).map_err(host_error)?;
		Ok(())
	}

	fn request_animation_frame(&self, callback: Box<dyn FnOnce()>) -> PlatformResult<()> {
		let closure = Closure::once_into_js(move || callback());
		window()?
			.request_animation_frame(closure.unchecked_ref())
			.map_err(host_error)?;
		Ok(())
	}

	fn cookie(&self) -> String {
		window()
			.ok()
			.and_then(|w| w.document())
			.and_then(|d| d.dyn_into::<HtmlDocument>().ok())
			.and_then(|d| d.cookie().ok())
			.unwrap_or_default()
	}

	fn set_cookie(&self, cookie: &str) -> PlatformResult<()> {
		let document = window()?
			.document()
			.ok_or(PlatformError::Unavailable("document"))?
			.dyn_into::<HtmlDocument>()
			.map_err(|_| PlatformError::Unavailable("html document"))?;
		document.set_cookie(cookie).map_err(host_error)
	}
}

/// [`KeyValueStorage`] over `window.localStorage`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebStorage;

impl WebStorage {
	fn storage(&self) -> PlatformResult<web_sys::Storage> {
		window()?
			.local_storage()
			.map_err(host_error)?
			.ok_or(PlatformError::Unavailable("localStorage"))
	}
}

impl KeyValueStorage for WebStorage {
	fn get(&self, key: &str) -> PlatformResult<Option<String>> {
		self.storage()?
			.get_item(key)
			.map_err(|e| PlatformError::Storage(format!("{:?}", e)))
	}

	fn set(&self, key: &str, value: &str) -> PlatformResult<()> {
		self.storage()?
			.set_item(key, value)
			.map_err(|e| PlatformError::Storage(format!("{:?}", e)))
	}
}
