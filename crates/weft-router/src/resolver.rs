//! Resolution of the current location to a view.
//!
//! A resolution goes idle → resolving → one of rendered, cached, not found,
//! redirecting or aborted. Middleware and static redirects re-enter the
//! resolver with the new path; the number of chained redirects per
//! navigation is bounded.

use crate::error::{RouterError, RouterResult};
use crate::info::RouteInfo;
use crate::navigator::{ConfirmFn, NavigationOutcome, Navigator};
use crate::pattern::{Params, PatternCache, match_template, parse_query, split_url};
use crate::route::{Flow, Middleware, NavigationControl, RedirectTarget, Route, Transition};
use crate::settings::RouterSettings;
use crate::table::RouteTable;
use std::rc::Rc;
use weft_core::{CHANGE_ROUTE, EventCallback, ListenerGuard, POPSTATE, Platform};

/// How a resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
	/// A route matched and its view was built.
	Rendered,
	/// The path equals the last rendered one; the previous view is reused.
	Cached,
	/// No route matched.
	NotFound,
	/// A redirect was vetoed or handed to a full page load.
	Redirecting,
	/// Middleware halted the navigation.
	Aborted,
}

impl ResolveStatus {
	/// The resolver phase this status settles in.
	pub fn phase(self) -> Phase {
		match self {
			Self::Rendered | Self::Cached => Phase::Resolved,
			Self::NotFound => Phase::NotFound,
			Self::Redirecting => Phase::Redirecting,
			Self::Aborted => Phase::Idle,
		}
	}
}

/// Resolver state machine.
///
/// `Idle` → `Resolving` → `Resolved` | `Redirecting` | `NotFound`. A halted
/// navigation falls back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
	/// Waiting for a navigation.
	#[default]
	Idle,
	/// Matching routes and running middleware.
	Resolving,
	/// A route view is being served.
	Resolved,
	/// A redirect is pending outside the resolver.
	Redirecting,
	/// No route matched.
	NotFound,
}

/// The outcome of a resolution.
pub struct Resolved<V> {
	/// How the resolution ended.
	pub status: ResolveStatus,
	/// The view to display; `None` when no fallback view is configured.
	pub view: Option<Rc<V>>,
	/// The navigation that produced `view`.
	pub info: Option<Rc<RouteInfo>>,
}

impl<V> Resolved<V> {
	fn new(status: ResolveStatus, view: Option<Rc<V>>, info: Option<Rc<RouteInfo>>) -> Self {
		Self { status, view, info }
	}

	/// Whether a route view was built or reused.
	pub fn is_route_view(&self) -> bool {
		matches!(self.status, ResolveStatus::Rendered | ResolveStatus::Cached)
	}

	/// Name of the route behind the view.
	pub fn route_name(&self) -> Option<&str> {
		self.info.as_deref().map(|info| info.name.as_str())
	}
}

impl<V> Clone for Resolved<V> {
	fn clone(&self) -> Self {
		Self::new(self.status, self.view.clone(), self.info.clone())
	}
}

impl<V> std::fmt::Debug for Resolved<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Resolved")
			.field("status", &self.status)
			.field("has_view", &self.view.is_some())
			.field("info", &self.info)
			.finish()
	}
}

/// What the router remembers between navigations.
pub struct NavigationState<V> {
	current_path: Option<String>,
	rendered_path: Option<String>,
	route_index: Option<usize>,
	route_info: Option<Rc<RouteInfo>>,
	view: Option<Rc<V>>,
	status: Option<ResolveStatus>,
	phase: Phase,
}

impl<V> Default for NavigationState<V> {
	fn default() -> Self {
		Self {
			current_path: None,
			rendered_path: None,
			route_index: None,
			route_info: None,
			view: None,
			status: None,
			phase: Phase::Idle,
		}
	}
}

impl<V> NavigationState<V> {
	/// The path most recently resolved.
	pub fn current_path(&self) -> Option<&str> {
		self.current_path.as_deref()
	}

	/// The path of the last rendered view.
	pub fn rendered_path(&self) -> Option<&str> {
		self.rendered_path.as_deref()
	}

	/// Name of the last rendered route.
	pub fn last_route_name(&self) -> Option<&str> {
		self.route_info.as_deref().map(|info| info.name.as_str())
	}

	/// The last rendered navigation.
	pub fn last_route_info(&self) -> Option<&Rc<RouteInfo>> {
		self.route_info.as_ref()
	}

	/// The last rendered view.
	pub fn last_view(&self) -> Option<&Rc<V>> {
		self.view.as_ref()
	}

	/// How the last resolution ended.
	pub fn last_status(&self) -> Option<ResolveStatus> {
		self.status
	}

	/// Current resolver phase.
	pub fn phase(&self) -> Phase {
		self.phase
	}
}

impl<V> std::fmt::Debug for NavigationState<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NavigationState")
			.field("current_path", &self.current_path)
			.field("rendered_path", &self.rendered_path)
			.field("last_route", &self.last_route_name())
			.field("status", &self.status)
			.field("phase", &self.phase)
			.finish()
	}
}

/// The client-side router.
///
/// ```
/// use std::rc::Rc;
/// use weft_core::{MemoryPlatform, Platform};
/// use weft_router::{ResolveStatus, Route, Router};
///
/// let platform: Rc<dyn Platform> = Rc::new(MemoryPlatform::new("https://example.com/user/42"));
/// let mut router = Router::builder(platform)
///     .route(Route::new("home", "/").exact().view(|_| "home".to_string()))
///     .route(Route::new("user", "/user/:id").exact().view(|info| {
///         format!("user {}", info.param("id").unwrap_or_default())
///     }))
///     .build()
///     .unwrap();
///
/// let resolved = router.render().unwrap();
/// assert_eq!(resolved.status, ResolveStatus::Rendered);
/// assert_eq!(resolved.view.as_deref().map(String::as_str), Some("user 42"));
/// ```
pub struct Router<V> {
	table: RouteTable<V>,
	patterns: PatternCache,
	navigator: Navigator,
	before: Option<Middleware>,
	after: Option<Middleware>,
	not_found: Option<Rc<V>>,
	redirecting: Option<Rc<V>>,
	max_redirects: usize,
	state: NavigationState<V>,
}

impl<V> std::fmt::Debug for Router<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Router")
			.field("table", &self.table)
			.field("navigator", &self.navigator)
			.field("max_redirects", &self.max_redirects)
			.field("state", &self.state)
			.finish()
	}
}

impl<V> Router<V> {
	/// Starts building a router on `platform`.
	pub fn builder(platform: Rc<dyn Platform>) -> RouterBuilder<V> {
		RouterBuilder::new(platform)
	}

	/// The navigator writing to the host.
	pub fn navigator(&self) -> &Navigator {
		&self.navigator
	}

	/// The flattened route table.
	pub fn table(&self) -> &RouteTable<V> {
		&self.table
	}

	/// Navigation state.
	pub fn state(&self) -> &NavigationState<V> {
		&self.state
	}

	/// Current resolver phase.
	pub fn phase(&self) -> Phase {
		self.state.phase
	}

	/// Whether the host supports the history API.
	pub fn supports_history(&self) -> bool {
		self.navigator.supports_history()
	}

	/// Pushes `path`; see [`Navigator::push`].
	pub fn push(&self, path: &str, replace: bool) -> RouterResult<NavigationOutcome> {
		self.navigator.push(path, replace)
	}

	/// Pushes a named route; see [`Navigator::push_dynamic`].
	pub fn push_dynamic(
		&self,
		name: &str,
		params: &Params,
		queries: &Params,
		replace: bool,
	) -> RouterResult<NavigationOutcome> {
		self.navigator.push_dynamic(name, params, queries, replace)
	}

	/// Calls `callback` on `popstate` and `changeroute`.
	///
	/// The listeners stay registered for as long as the returned guards live.
	/// The callback typically schedules [`handle_navigation`](Self::handle_navigation)
	/// rather than calling it directly.
	pub fn listen(&self, callback: impl Fn(&str) + 'static) -> Vec<ListenerGuard> {
		let callback: EventCallback = Rc::new(callback);
		[POPSTATE, CHANGE_ROUTE]
			.into_iter()
			.map(|event| {
				let callback = callback.clone();
				weft_core::listen(self.navigator.platform(), event, move |name| callback(name))
			})
			.collect()
	}

	/// Resolves the current location.
	///
	/// A location outside the base name is first replaced by the root
	/// path. The base name is stripped and an empty remainder becomes `/`.
	pub fn render(&mut self) -> RouterResult<Resolved<V>> {
		let base = self.navigator.base_name().to_string();
		let mut location = self.navigator.current_location();
		if !location.starts_with(&base) {
			tracing::debug!(location = %location, base = %base, "location outside base name, resetting to root");
			if let Err(err) = self.navigator.change_route("/", true) {
				return Err(self.fail(err));
			}
			location = self.navigator.current_location();
		}

		let path = match location.strip_prefix(base.as_str()) {
			Some("") | None => "/",
			Some(path) => path,
		};
		self.resolve(path)
	}

	/// Handles a navigation event: renders, then runs the after-middleware.
	///
	/// After-middleware runs only when a route view was freshly built, global
	/// hook first. Failures are logged and the remaining hooks still run;
	/// [`Flow::Stop`] skips them. A navigation requested by a hook is written
	/// to history and handled in turn.
	pub fn handle_navigation(&mut self) -> RouterResult<Resolved<V>> {
		let mut hops = 0;
		loop {
			let from = self.state.route_info.clone();
			let resolved = self.render()?;
			if resolved.status != ResolveStatus::Rendered {
				return Ok(resolved);
			}
			let Some(to) = resolved.info.clone() else {
				return Ok(resolved);
			};

			let route_after = self
				.state
				.route_index
				.and_then(|index| self.table.routes().get(index))
				.and_then(|route| route.after.clone());
			let mut control = NavigationControl::default();
			for hook in [self.after.clone(), route_after].into_iter().flatten() {
				let transition = Transition {
					to: &to,
					from: from.as_deref(),
				};
				match hook(&transition, &mut control) {
					Ok(Flow::Continue) => {}
					Ok(Flow::Stop) => break,
					Err(err) => {
						tracing::warn!(route = %to.name, error = %err, "after hook failed");
					}
				}
			}

			let Some(pending) = control.take() else {
				return Ok(resolved);
			};
			hops += 1;
			if hops > self.max_redirects {
				return Err(self.redirect_loop(&to.url));
			}
			if let Err(err) = self.navigator.apply(&pending) {
				return Err(self.fail(err));
			}
			if self.navigator.force_refresh() {
				return Ok(resolved);
			}
		}
	}

	/// Resolves `path` (base name excluded, query string allowed).
	///
	/// # Errors
	///
	/// - [`RouterError::Middleware`] when a route's before-middleware fails
	/// - [`RouterError::RedirectLoop`] when redirects chain past the bound
	/// - [`RouterError::UnknownRoute`] for a named redirect to nowhere
	/// - [`RouterError::Platform`] when the host rejects a history write
	pub fn resolve(&mut self, path: &str) -> RouterResult<Resolved<V>> {
		self.resolve_at(path, 0).map_err(|err| self.fail(err))
	}

	fn resolve_at(&mut self, path: &str, depth: usize) -> RouterResult<Resolved<V>> {
		if depth > self.max_redirects {
			return Err(self.redirect_loop(path));
		}
		self.state.current_path = Some(path.to_string());
		self.enter(Phase::Resolving);

		if self.state.rendered_path.as_deref() == Some(path) && self.state.view.is_some() {
			tracing::trace!(path = %path, "serving cached view");
			let view = self.state.view.clone();
			let info = self.state.route_info.clone();
			return Ok(self.settle(Resolved::new(ResolveStatus::Cached, view, info)));
		}

		let (route_path, query) = split_url(path);
		let Some((index, params)) = self.find_route(route_path) else {
			tracing::debug!(path = %path, "no route matched");
			let view = self.not_found.clone();
			return Ok(self.settle(Resolved::new(ResolveStatus::NotFound, view, None)));
		};

		let route = &self.table.routes()[index];
		let info = Rc::new(RouteInfo {
			name: route.name.clone(),
			url: path.to_string(),
			params,
			query_params: query.map(parse_query).unwrap_or_default(),
			route: route.meta(),
		});
		let route_before = route.before.clone();
		let redirect = route.redirect.clone();
		let factory = route.view.clone();
		let from = self.state.route_info.clone();

		if let Some(before) = self.before.clone() {
			let mut control = NavigationControl::default();
			let transition = Transition {
				to: &info,
				from: from.as_deref(),
			};
			match before(&transition, &mut control) {
				Ok(Flow::Continue) => ignore_pending(&control, &info),
				Ok(Flow::Stop) => return self.halt(control, depth),
				Err(err) => {
					tracing::error!(route = %info.name, error = %err, "global before hook failed, navigation aborted");
					return Ok(self.aborted());
				}
			}
		}

		if let Some(before) = route_before {
			let mut control = NavigationControl::default();
			let transition = Transition {
				to: &info,
				from: from.as_deref(),
			};
			match before(&transition, &mut control) {
				Ok(Flow::Continue) => ignore_pending(&control, &info),
				Ok(Flow::Stop) => return self.halt(control, depth),
				Err(err) => {
					return Err(self.fail(RouterError::Middleware {
						route: info.name.clone(),
						source: err.into(),
					}));
				}
			}
		}

		if let Some(target) = redirect {
			let target_path = match target {
				RedirectTarget::Path(path) => path,
				RedirectTarget::Named {
					name,
					params,
					queries,
				} => self.navigator.fill_path(&name, &params, &queries)?,
			};
			tracing::debug!(from = %path, to = %target_path, "redirecting");
			return match self.navigator.push(&target_path, true)? {
				NavigationOutcome::Navigated => self.resolve_at(&target_path, depth + 1),
				NavigationOutcome::Vetoed | NavigationOutcome::Reloaded => {
					let view = self.redirecting.clone();
					Ok(self.settle(Resolved::new(ResolveStatus::Redirecting, view, Some(info))))
				}
			};
		}

		let Some(factory) = factory else {
			let view = self.not_found.clone();
			return Ok(self.settle(Resolved::new(ResolveStatus::NotFound, view, None)));
		};
		let view = Rc::new(factory(&info));
		tracing::debug!(route = %info.name, path = %path, "route rendered");

		self.state.rendered_path = Some(path.to_string());
		self.state.route_index = Some(index);
		self.state.route_info = Some(info.clone());
		self.state.view = Some(view.clone());
		Ok(self.settle(Resolved::new(ResolveStatus::Rendered, Some(view), Some(info))))
	}

	fn find_route(&mut self, path: &str) -> Option<(usize, Params)> {
		let patterns = &mut self.patterns;
		self.table
			.iter()
			.enumerate()
			.find_map(|(index, route)| {
				match_template(patterns, &route.path, route.exact, route.sensitive, path)
					.map(|params| (index, params))
			})
	}

	/// Follows a navigation requested by a halting middleware.
	fn halt(&mut self, mut control: NavigationControl, depth: usize) -> RouterResult<Resolved<V>> {
		let Some(pending) = control.take() else {
			return Ok(self.aborted());
		};
		let target = self.navigator.apply(&pending)?;
		if self.navigator.force_refresh() {
			let view = self.redirecting.clone();
			return Ok(self.settle(Resolved::new(ResolveStatus::Redirecting, view, None)));
		}
		self.resolve_at(&target, depth + 1)
	}

	/// Keeps serving the previous view, or the not-found view if there is
	/// none yet.
	fn aborted(&mut self) -> Resolved<V> {
		let view = self.state.view.clone().or_else(|| self.not_found.clone());
		let info = self.state.route_info.clone();
		self.settle(Resolved::new(ResolveStatus::Aborted, view, info))
	}

	fn settle(&mut self, resolved: Resolved<V>) -> Resolved<V> {
		self.state.status = Some(resolved.status);
		self.enter(resolved.status.phase());
		resolved
	}

	fn enter(&mut self, phase: Phase) {
		tracing::trace!(from = ?self.state.phase, to = ?phase, "resolver phase");
		self.state.phase = phase;
	}

	fn redirect_loop(&mut self, path: &str) -> RouterError {
		tracing::error!(path = %path, limit = self.max_redirects, "redirect loop detected");
		self.fail(RouterError::RedirectLoop {
			path: path.to_string(),
			limit: self.max_redirects,
		})
	}

	/// Marks the navigation as aborted and hands `err` back.
	fn fail(&mut self, err: RouterError) -> RouterError {
		self.state.status = Some(ResolveStatus::Aborted);
		self.enter(Phase::Idle);
		err
	}
}

fn ignore_pending(control: &NavigationControl, info: &RouteInfo) {
	if control.pending().is_some() {
		tracing::warn!(route = %info.name, "navigation requested without stopping, ignored");
	}
}

/// Builder for [`Router`].
pub struct RouterBuilder<V> {
	platform: Rc<dyn Platform>,
	settings: RouterSettings,
	routes: Vec<Route<V>>,
	confirm: Option<ConfirmFn>,
	before: Option<Middleware>,
	after: Option<Middleware>,
	not_found: Option<Rc<V>>,
	redirecting: Option<Rc<V>>,
}

impl<V> RouterBuilder<V> {
	/// Creates a builder with default settings and no routes.
	pub fn new(platform: Rc<dyn Platform>) -> Self {
		Self {
			platform,
			settings: RouterSettings::default(),
			routes: Vec::new(),
			confirm: None,
			before: None,
			after: None,
			not_found: None,
			redirecting: None,
		}
	}

	/// Replaces the settings.
	pub fn settings(mut self, settings: RouterSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Adds a top-level route.
	pub fn route(mut self, route: Route<V>) -> Self {
		self.routes.push(route);
		self
	}

	/// Adds top-level routes.
	pub fn routes(mut self, routes: impl IntoIterator<Item = Route<V>>) -> Self {
		self.routes.extend(routes);
		self
	}

	/// Sets the callback consulted before every push.
	///
	/// Returning `true` means the user still has to confirm leaving the
	/// page, and the navigation is cancelled.
	pub fn user_confirmation(mut self, confirm: impl Fn() -> bool + 'static) -> Self {
		self.confirm = Some(Rc::new(confirm));
		self
	}

	/// Sets the global before hook, run ahead of route middleware.
	pub fn before<F>(mut self, f: F) -> Self
	where
		F: Fn(&Transition<'_>, &mut NavigationControl) -> anyhow::Result<Flow> + 'static,
	{
		self.before = Some(Rc::new(f));
		self
	}

	/// Sets the global after hook, run ahead of route after-middleware.
	pub fn after<F>(mut self, f: F) -> Self
	where
		F: Fn(&Transition<'_>, &mut NavigationControl) -> anyhow::Result<Flow> + 'static,
	{
		self.after = Some(Rc::new(f));
		self
	}

	/// Sets the view shown when nothing matches.
	pub fn not_found(mut self, view: V) -> Self {
		self.not_found = Some(Rc::new(view));
		self
	}

	/// Sets the view shown while a redirect is pending.
	pub fn redirecting(mut self, view: V) -> Self {
		self.redirecting = Some(Rc::new(view));
		self
	}

	/// Flattens the routes and builds the router.
	///
	/// # Errors
	///
	/// [`RouterError::Config`] for an invalid route table.
	pub fn build(self) -> RouterResult<Router<V>> {
		let table = RouteTable::new(self.routes)?;
		let max_redirects = self.settings.max_redirects.unwrap_or(table.len().max(1));
		let mut navigator = Navigator::new(self.platform, &self.settings, table.templates());
		if let Some(confirm) = self.confirm {
			navigator = navigator.with_user_confirmation(confirm);
		}
		if !navigator.supports_history() && !self.settings.force_refresh {
			tracing::warn!("history API unavailable, navigation will fail unless force_refresh is set");
		}

		tracing::debug!(
			routes = table.len(),
			base_name = %navigator.base_name(),
			max_redirects,
			"router built"
		);
		Ok(Router {
			patterns: PatternCache::new(self.settings.max_route_params()),
			table,
			navigator,
			before: self.before,
			after: self.after,
			not_found: self.not_found,
			redirecting: self.redirecting,
			max_redirects,
			state: NavigationState::default(),
		})
	}
}
