//! Programmatic navigation and links.

use crate::error::{RouterError, RouterResult};
use crate::pattern::{Params, fill_template};
use crate::route::PendingNavigation;
use crate::settings::RouterSettings;
use std::collections::HashMap;
use std::rc::Rc;
use weft_core::{CHANGE_ROUTE, Platform};

/// Reports whether the user still has to confirm leaving the page; `true`
/// vetoes the navigation.
pub type ConfirmFn = Rc<dyn Fn() -> bool>;

/// What a push did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
	/// The history entry changed.
	Navigated,
	/// A full page load was started.
	Reloaded,
	/// The user-confirmation callback asked to stay.
	Vetoed,
}

/// Writes navigations to the host's history and location.
///
/// Paths handed to the navigator never include the base name; it is
/// prepended here.
pub struct Navigator {
	platform: Rc<dyn Platform>,
	base_name: String,
	hash_mode: bool,
	force_refresh: bool,
	max_route_params: usize,
	templates: HashMap<String, String>,
	confirm: Option<ConfirmFn>,
}

impl std::fmt::Debug for Navigator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Navigator")
			.field("base_name", &self.base_name)
			.field("hash_mode", &self.hash_mode)
			.field("force_refresh", &self.force_refresh)
			.field("routes", &self.templates.len())
			.field("has_confirm", &self.confirm.is_some())
			.finish()
	}
}

impl Navigator {
	/// Creates a navigator over `templates` (route name to path template).
	pub fn new(
		platform: Rc<dyn Platform>,
		settings: &RouterSettings,
		templates: HashMap<String, String>,
	) -> Self {
		Self {
			platform,
			base_name: settings.effective_base_name(),
			hash_mode: settings.hash_mode,
			force_refresh: settings.force_refresh,
			max_route_params: settings.max_route_params(),
			templates,
			confirm: None,
		}
	}

	/// Sets the callback consulted before every push; returning `true`
	/// cancels the navigation.
	pub fn with_user_confirmation(mut self, confirm: ConfirmFn) -> Self {
		self.confirm = Some(confirm);
		self
	}

	/// The prefix written in front of every path.
	pub fn base_name(&self) -> &str {
		&self.base_name
	}

	/// Whether pushes reload the page.
	pub fn force_refresh(&self) -> bool {
		self.force_refresh
	}

	/// The host platform.
	pub fn platform(&self) -> &Rc<dyn Platform> {
		&self.platform
	}

	/// Whether the host supports the history API.
	pub fn supports_history(&self) -> bool {
		self.platform.supports_history()
	}

	/// Prepends the base name.
	pub fn full_path(&self, path: &str) -> String {
		format!("{}{}", self.base_name, path)
	}

	/// The current location as the router sees it, base name included.
	///
	/// The hash in hash mode, otherwise pathname plus search.
	pub fn current_location(&self) -> String {
		if self.hash_mode {
			self.platform.hash()
		} else {
			format!("{}{}", self.platform.pathname(), self.platform.search())
		}
	}

	/// Writes `path` to history without confirmation or events.
	pub fn change_route(&self, path: &str, replace: bool) -> RouterResult<()> {
		let full = self.full_path(path);
		if self.force_refresh {
			let url = format!("{}{}", self.platform.origin(), full);
			tracing::debug!(url = %url, "reloading page");
			self.platform.assign(&url)?;
		} else if replace {
			self.platform.replace_state(&full)?;
		} else {
			self.platform.push_state(&full)?;
		}
		tracing::trace!(path = %path, replace, "route changed");
		Ok(())
	}

	/// Navigates to `path` unless the user-confirmation callback returns
	/// `true`.
	///
	/// Non-replacing pushes dispatch `changeroute` so that listeners
	/// re-render; replacing ones are silent.
	pub fn push(&self, path: &str, replace: bool) -> RouterResult<NavigationOutcome> {
		if self.confirm.as_ref().is_some_and(|confirm| confirm()) {
			tracing::debug!(path = %path, "navigation vetoed");
			return Ok(NavigationOutcome::Vetoed);
		}

		self.change_route(path, replace)?;
		if self.force_refresh {
			return Ok(NavigationOutcome::Reloaded);
		}
		if !replace {
			self.platform.dispatch_event(CHANGE_ROUTE)?;
		}
		Ok(NavigationOutcome::Navigated)
	}

	/// Builds the path of a named route.
	///
	/// # Errors
	///
	/// [`RouterError::UnknownRoute`] when no route has that name.
	pub fn fill_path(&self, name: &str, params: &Params, queries: &Params) -> RouterResult<String> {
		let template = self
			.templates
			.get(name)
			.ok_or_else(|| RouterError::UnknownRoute(name.to_string()))?;
		Ok(fill_template(template, params, queries, self.max_route_params))
	}

	/// [`change_route`](Self::change_route) to a named route.
	pub fn change_route_dynamic(
		&self,
		name: &str,
		params: &Params,
		queries: &Params,
		replace: bool,
	) -> RouterResult<()> {
		let path = self.fill_path(name, params, queries)?;
		self.change_route(&path, replace)
	}

	/// [`push`](Self::push) to a named route.
	pub fn push_dynamic(
		&self,
		name: &str,
		params: &Params,
		queries: &Params,
		replace: bool,
	) -> RouterResult<NavigationOutcome> {
		let path = self.fill_path(name, params, queries)?;
		self.push(&path, replace)
	}

	/// Writes a middleware request to history and returns the target path.
	pub(crate) fn apply(&self, pending: &PendingNavigation) -> RouterResult<String> {
		let (path, replace) = match pending {
			PendingNavigation::Path { path, replace } => (path.clone(), *replace),
			PendingNavigation::Named {
				name,
				params,
				queries,
				replace,
			} => (self.fill_path(name, params, queries)?, *replace),
		};
		self.change_route(&path, replace)?;
		Ok(path)
	}

	/// A link to `to`.
	pub fn link(&self, to: impl Into<String>, replace: bool) -> Link {
		let path = to.into();
		Link {
			href: self.full_path(&path),
			path,
			replace,
		}
	}

	/// A link to a named route.
	pub fn link_dynamic(
		&self,
		name: &str,
		params: &Params,
		queries: &Params,
		replace: bool,
	) -> RouterResult<Link> {
		Ok(self.link(self.fill_path(name, params, queries)?, replace))
	}
}

/// Key code of Enter.
pub const KEY_ENTER: u32 = 13;

/// Key code of Space.
pub const KEY_SPACE: u32 = 32;

/// An input event delivered to a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTrigger {
	/// Mouse click.
	Click,
	/// Key release with its key code.
	KeyUp(u32),
}

/// An anchor that navigates through the router instead of loading a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
	href: String,
	path: String,
	replace: bool,
}

impl Link {
	/// Value for the anchor's `href` attribute (base name included).
	pub fn href(&self) -> &str {
		&self.href
	}

	/// Target path without the base name.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Whether following replaces the history entry.
	pub fn replace(&self) -> bool {
		self.replace
	}

	/// Whether `trigger` follows the link: clicks, Enter and Space.
	pub fn activates_on(&self, trigger: LinkTrigger) -> bool {
		matches!(
			trigger,
			LinkTrigger::Click | LinkTrigger::KeyUp(KEY_ENTER) | LinkTrigger::KeyUp(KEY_SPACE)
		)
	}

	/// Follows the link if `trigger` activates it.
	///
	/// Returns `Ok(None)` for inputs that do not activate the link.
	pub fn handle(&self, navigator: &Navigator, trigger: LinkTrigger) -> RouterResult<Option<NavigationOutcome>> {
		if !self.activates_on(trigger) {
			return Ok(None);
		}
		self.follow(navigator).map(Some)
	}

	/// Pushes the link's path.
	pub fn follow(&self, navigator: &Navigator) -> RouterResult<NavigationOutcome> {
		navigator.push(&self.path, self.replace)
	}
}
