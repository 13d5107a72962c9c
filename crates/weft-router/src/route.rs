//! Route definitions and navigation middleware.

use crate::info::{RouteInfo, RouteMeta};
use crate::pattern::Params;
use std::rc::Rc;

/// Builds the view for a matched route.
pub type ViewFactory<V> = Rc<dyn Fn(&RouteInfo) -> V>;

/// Navigation middleware.
///
/// Receives the transition and a control handle through which it may
/// request a different navigation. Returning [`Flow::Stop`] halts the
/// navigation; an error aborts it.
pub type Middleware = Rc<dyn Fn(&Transition<'_>, &mut NavigationControl) -> anyhow::Result<Flow>>;

/// Whether navigation proceeds after a middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	/// Keep going.
	Continue,
	/// Halt; a navigation requested on the control handle is followed.
	Stop,
}

/// The navigation a middleware is looking at.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
	/// Where navigation is heading.
	pub to: &'a RouteInfo,
	/// The last successfully rendered route, if any.
	pub from: Option<&'a RouteInfo>,
}

/// A navigation requested from inside middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingNavigation {
	/// Go to a literal path.
	Path {
		/// Target path, without the base name.
		path: String,
		/// Replace the current history entry.
		replace: bool,
	},
	/// Go to a named route.
	Named {
		/// Route name.
		name: String,
		/// Path parameters.
		params: Params,
		/// Query parameters.
		queries: Params,
		/// Replace the current history entry.
		replace: bool,
	},
}

/// Handle through which middleware requests a navigation.
///
/// The router applies the request once the middleware has returned, so a
/// middleware never re-enters the resolver directly. The last request wins.
#[derive(Debug, Default)]
pub struct NavigationControl {
	pending: Option<PendingNavigation>,
}

impl NavigationControl {
	/// Requests navigation to `path`.
	pub fn change(&mut self, path: impl Into<String>, replace: bool) {
		self.pending = Some(PendingNavigation::Path {
			path: path.into(),
			replace,
		});
	}

	/// Requests navigation to the route named `name`.
	pub fn change_dynamic(
		&mut self,
		name: impl Into<String>,
		params: Params,
		queries: Params,
		replace: bool,
	) {
		self.pending = Some(PendingNavigation::Named {
			name: name.into(),
			params,
			queries,
			replace,
		});
	}

	/// The pending request, if any.
	pub fn pending(&self) -> Option<&PendingNavigation> {
		self.pending.as_ref()
	}

	pub(crate) fn take(&mut self) -> Option<PendingNavigation> {
		self.pending.take()
	}
}

/// Wraps a closure as [`Middleware`].
pub fn middleware<F>(f: F) -> Middleware
where
	F: Fn(&Transition<'_>, &mut NavigationControl) -> anyhow::Result<Flow> + 'static,
{
	Rc::new(f)
}

/// Runs `first`, then `second` only if `first` continued.
pub fn compose(first: Middleware, second: Middleware) -> Middleware {
	middleware(move |transition, control| match first(transition, control)? {
		Flow::Continue => second(transition, control),
		Flow::Stop => Ok(Flow::Stop),
	})
}

/// Target of a static redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
	/// A literal path.
	Path(String),
	/// A named route.
	Named {
		/// Route name.
		name: String,
		/// Path parameters.
		params: Params,
		/// Query parameters.
		queries: Params,
	},
}

/// A route definition.
///
/// Child paths are appended verbatim to their parent's path when the table
/// is built, and child middleware runs after the parent's.
///
/// ```
/// use weft_router::{Flow, Route};
///
/// let route: Route<String> = Route::new("user", "/user/:id")
///     .exact()
///     .view(|info| format!("user {}", info.param("id").unwrap_or_default()))
///     .before(|_transition, _control| Ok(Flow::Continue));
/// assert_eq!(route.name(), "user");
/// ```
pub struct Route<V> {
	pub(crate) name: String,
	pub(crate) path: String,
	pub(crate) exact: bool,
	pub(crate) sensitive: bool,
	pub(crate) redirect: Option<RedirectTarget>,
	pub(crate) before: Option<Middleware>,
	pub(crate) after: Option<Middleware>,
	pub(crate) view: Option<ViewFactory<V>>,
	pub(crate) children: Vec<Route<V>>,
}

impl<V> Clone for Route<V> {
	fn clone(&self) -> Self {
		Self {
			name: self.name.clone(),
			path: self.path.clone(),
			exact: self.exact,
			sensitive: self.sensitive,
			redirect: self.redirect.clone(),
			before: self.before.clone(),
			after: self.after.clone(),
			view: self.view.clone(),
			children: self.children.clone(),
		}
	}
}

impl<V> std::fmt::Debug for Route<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Route")
			.field("name", &self.name)
			.field("path", &self.path)
			.field("exact", &self.exact)
			.field("sensitive", &self.sensitive)
			.field("redirect", &self.redirect)
			.field("has_before", &self.before.is_some())
			.field("has_after", &self.after.is_some())
			.field("has_view", &self.view.is_some())
			.field("children", &self.children)
			.finish()
	}
}

impl<V> Route<V> {
	/// Creates a prefix-matching, case-sensitive route.
	pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			path: path.into(),
			exact: false,
			sensitive: true,
			redirect: None,
			before: None,
			after: None,
			view: None,
			children: Vec::new(),
		}
	}

	/// Requires the template to match the whole path.
	pub fn exact(mut self) -> Self {
		self.exact = true;
		self
	}

	/// Ignores ASCII case when matching.
	pub fn insensitive(mut self) -> Self {
		self.sensitive = false;
		self
	}

	/// Sets the view factory.
	pub fn view<F>(mut self, factory: F) -> Self
	where
		F: Fn(&RouteInfo) -> V + 'static,
	{
		self.view = Some(Rc::new(factory));
		self
	}

	/// Sets the before-middleware.
	pub fn before<F>(mut self, f: F) -> Self
	where
		F: Fn(&Transition<'_>, &mut NavigationControl) -> anyhow::Result<Flow> + 'static,
	{
		self.before = Some(Rc::new(f));
		self
	}

	/// Sets the after-middleware.
	pub fn after<F>(mut self, f: F) -> Self
	where
		F: Fn(&Transition<'_>, &mut NavigationControl) -> anyhow::Result<Flow> + 'static,
	{
		self.after = Some(Rc::new(f));
		self
	}

	/// Redirects to a literal path whenever this route matches.
	pub fn redirect(mut self, path: impl Into<String>) -> Self {
		self.redirect = Some(RedirectTarget::Path(path.into()));
		self
	}

	/// Redirects to a named route whenever this route matches.
	pub fn redirect_named(mut self, name: impl Into<String>, params: Params, queries: Params) -> Self {
		self.redirect = Some(RedirectTarget::Named {
			name: name.into(),
			params,
			queries,
		});
		self
	}

	/// Appends a child route.
	pub fn child(mut self, child: Route<V>) -> Self {
		self.children.push(child);
		self
	}

	/// Appends child routes.
	pub fn children(mut self, children: impl IntoIterator<Item = Route<V>>) -> Self {
		self.children.extend(children);
		self
	}

	/// Returns the route name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the path template.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Whether the route must match the whole path.
	pub fn is_exact(&self) -> bool {
		self.exact
	}

	/// Whether matching is case-sensitive.
	pub fn is_sensitive(&self) -> bool {
		self.sensitive
	}

	/// Returns the static redirect.
	pub fn redirect_target(&self) -> Option<&RedirectTarget> {
		self.redirect.as_ref()
	}

	/// Returns the direct children.
	pub fn child_routes(&self) -> &[Route<V>] {
		&self.children
	}

	pub(crate) fn meta(&self) -> RouteMeta {
		RouteMeta {
			name: self.name.clone(),
			path: self.path.clone(),
			exact: self.exact,
			sensitive: self.sensitive,
			redirect: self.redirect.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::RefCell;

	fn info() -> RouteInfo {
		RouteInfo {
			name: "home".to_string(),
			url: "/".to_string(),
			params: Params::new(),
			query_params: Params::new(),
			route: Route::<()>::new("home", "/").meta(),
		}
	}

	fn recording(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str, flow: Flow) -> Middleware {
		let log = log.clone();
		middleware(move |_, _| {
			log.borrow_mut().push(label);
			Ok(flow)
		})
	}

	#[rstest]
	fn test_compose_runs_in_order() {
		// Arrange
		let log = Rc::new(RefCell::new(Vec::new()));
		let chain = compose(
			recording(&log, "parent", Flow::Continue),
			recording(&log, "child", Flow::Continue),
		);
		let to = info();

		// Act
		let flow = chain(&Transition { to: &to, from: None }, &mut NavigationControl::default()).unwrap();

		// Assert
		assert_eq!(flow, Flow::Continue);
		assert_eq!(*log.borrow(), vec!["parent", "child"]);
	}

	#[rstest]
	fn test_compose_short_circuits_on_stop() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let chain = compose(
			recording(&log, "parent", Flow::Stop),
			recording(&log, "child", Flow::Continue),
		);
		let to = info();

		let flow = chain(&Transition { to: &to, from: None }, &mut NavigationControl::default()).unwrap();

		assert_eq!(flow, Flow::Stop);
		assert_eq!(*log.borrow(), vec!["parent"]);
	}

	#[rstest]
	fn test_compose_short_circuits_on_error() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let chain = compose(
			middleware(|_, _| anyhow::bail!("denied")),
			recording(&log, "child", Flow::Continue),
		);
		let to = info();

		let result = chain(&Transition { to: &to, from: None }, &mut NavigationControl::default());

		assert!(result.is_err());
		assert!(log.borrow().is_empty());
	}

	#[rstest]
	fn test_control_last_request_wins() {
		let mut control = NavigationControl::default();
		control.change("/login", false);
		control.change_dynamic("home", Params::new(), Params::new(), true);

		assert!(matches!(
			control.take(),
			Some(PendingNavigation::Named { ref name, replace: true, .. }) if name == "home"
		));
		assert!(control.pending().is_none());
	}
}
