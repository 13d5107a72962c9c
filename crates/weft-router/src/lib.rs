//! Client-side routing for weft.
//!
//! Routes are declared as a tree, flattened into an ordered table and
//! matched first-come against the current location:
//!
//! - [`Route`] - a path template with optional view, redirect, children and
//!   before/after [`Middleware`]
//! - [`Router`] - resolves locations to views, follows redirects and keeps
//!   the last rendered view cached
//! - [`Navigator`] - writes pushes and replaces to the host history, with a
//!   base name, hash mode and an optional confirmation callback
//! - [`Link`] - anchors that navigate through the router
//!
//! ```
//! use std::rc::Rc;
//! use weft_core::{MemoryPlatform, Platform};
//! use weft_router::{Flow, Route, Router};
//!
//! let platform: Rc<dyn Platform> = Rc::new(MemoryPlatform::new("https://example.com/"));
//! let mut router = Router::builder(platform)
//!     .route(
//!         Route::new("admin", "/admin")
//!             .view(|_| "admin")
//!             .before(|_, control| {
//!                 control.change("/login", true);
//!                 Ok(Flow::Stop)
//!             }),
//!     )
//!     .route(Route::new("login", "/login").exact().view(|_| "login"))
//!     .build()
//!     .unwrap();
//!
//! let resolved = router.resolve("/admin/users").unwrap();
//! assert_eq!(resolved.route_name(), Some("login"));
//! ```

pub mod error;
pub mod info;
pub mod navigator;
pub mod pattern;
pub mod resolver;
pub mod route;
pub mod settings;
pub mod table;

pub use error::{BoxError, RouterError, RouterResult};
pub use info::{RouteInfo, RouteMeta};
pub use navigator::{ConfirmFn, KEY_ENTER, KEY_SPACE, Link, LinkTrigger, NavigationOutcome, Navigator};
pub use pattern::{
	DEFAULT_MAX_ROUTE_PARAMS, Params, PathPattern, PatternCache, PatternError, fill_template,
	match_template, parse_query, query_string, split_url,
};
pub use resolver::{NavigationState, Phase, ResolveStatus, Resolved, Router, RouterBuilder};
pub use route::{
	Flow, Middleware, NavigationControl, PendingNavigation, RedirectTarget, Route, Transition,
	ViewFactory, compose, middleware,
};
pub use settings::RouterSettings;
pub use table::{RouteTable, flatten};
