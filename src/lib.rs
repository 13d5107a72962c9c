//! # weft
//!
//! Client-side routing and reactive state for browser UIs.
//!
//! This crate re-exports the workspace members behind feature flags and
//! adds [`AppSettings`], the single settings document an application loads
//! at startup.
//!
//! ## Feature Flags
//!
//! - `router` (default) - [`weft_router`]: route tables, history
//!   navigation, links
//! - `store` (default) - [`weft_store`]: keyed store with event handlers
//!   and root-subscriber propagation
//!
//! ## Quick Example
//!
//! ```
//! use std::rc::Rc;
//! use weft::prelude::*;
//!
//! let settings = AppSettings::from_toml_str(
//!     r#"
//!     [router]
//!     base_name = "/app"
//!
//!     [store]
//!     persist = false
//!     "#,
//! )
//! .unwrap();
//!
//! let platform = Rc::new(MemoryPlatform::new("https://example.com/app/"));
//! let mut router = Router::builder(platform)
//!     .settings(settings.router.clone())
//!     .route(Route::new("home", "/").exact().view(|_| "home"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(router.render().unwrap().route_name(), Some("home"));
//! ```

pub mod settings;

pub use settings::AppSettings;

pub use weft_core;
#[cfg(feature = "router")]
pub use weft_router;
#[cfg(feature = "store")]
pub use weft_store;

/// Commonly used types.
pub mod prelude {
	pub use crate::AppSettings;
	pub use weft_core::{
		ComponentArena, ComponentHost, ComponentId, FrameScheduler, KeyValueStorage, LoggingSettings,
		MemoryPlatform, MemoryStorage, Platform,
	};
	#[cfg(target_arch = "wasm32")]
	pub use weft_core::{WebPlatform, WebStorage};

	#[cfg(feature = "router")]
	pub use weft_router::{
		Flow, Link, LinkTrigger, NavigationControl, ResolveStatus, Route, RouteInfo, Router,
		RouterError, RouterSettings, Transition,
	};

	#[cfg(feature = "store")]
	pub use weft_store::{EmitOutcome, Store, StoreError, StoreSettings, Subscription, Updates, ValueKind};
}
