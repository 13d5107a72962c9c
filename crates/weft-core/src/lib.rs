//! # weft-core
//!
//! Shared building blocks for the weft toolkit.
//!
//! The router and the store never talk to the browser directly. Everything
//! they need from the host (location, history, events, storage, cookies and
//! animation frames) goes through the [`Platform`] and [`KeyValueStorage`]
//! traits, and everything they need from the rendering runtime goes through
//! [`ComponentHost`].
//!
//! ## Modules
//!
//! - [`platform`]: host adapter traits and scoped event listeners
//! - [`memory`]: deterministic in-memory platform for native hosts and tests
//! - [`component`]: rendering-runtime contract and an index-arena implementation
//! - [`frame`]: animation-frame coalescing
//! - [`cookie`]: `document.cookie` helpers
//! - [`config`]: TOML settings loading
//! - [`logging`]: `tracing` subscriber installation
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use weft_core::{MemoryPlatform, Platform};
//!
//! let platform = Rc::new(MemoryPlatform::new("https://example.com/users/"));
//! platform.push_state("/users/42").unwrap();
//! assert_eq!(platform.pathname(), "/users/42");
//! ```

pub mod component;
pub mod config;
pub mod cookie;
pub mod error;
pub mod frame;
pub mod logging;
pub mod memory;
pub mod platform;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use component::{ComponentArena, ComponentHost, ComponentId, HostError};
pub use config::{ConfigError, ConfigResult};
pub use error::{PlatformError, PlatformResult};
pub use frame::FrameScheduler;
pub use logging::LoggingSettings;
pub use memory::{MemoryPlatform, MemoryStorage};
pub use platform::{
	CHANGE_ROUTE, EventCallback, KeyValueStorage, ListenerGuard, ListenerId, POPSTATE, Platform,
	listen,
};

#[cfg(target_arch = "wasm32")]
pub use web::{WebPlatform, WebStorage};
