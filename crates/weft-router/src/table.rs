//! Flattening of nested routes into the ordered match table.

use crate::error::{RouterError, RouterResult};
use crate::route::{Middleware, RedirectTarget, Route, compose};
use std::collections::HashMap;

fn inherit(parent: &Option<Middleware>, child: Option<Middleware>) -> Option<Middleware> {
	match (parent, child) {
		(Some(parent), Some(child)) => Some(compose(parent.clone(), child)),
		(Some(parent), None) => Some(parent.clone()),
		(None, child) => child,
	}
}

fn flatten_into<V>(mut route: Route<V>, out: &mut Vec<Route<V>>) {
	for mut child in std::mem::take(&mut route.children) {
		child.path = format!("{}{}", route.path, child.path);
		child.before = inherit(&route.before, child.before.take());
		child.after = inherit(&route.after, child.after.take());
		flatten_into(child, out);
	}
	out.push(route);
}

/// Flattens a route tree, depth first with children before their parent.
///
/// Child paths are prefixed with the parent's path, and child middleware is
/// composed after the parent's (or inherited when the child has none). The
/// returned routes have no children.
pub fn flatten<V>(roots: impl IntoIterator<Item = Route<V>>) -> Vec<Route<V>> {
	let mut out = Vec::new();
	for route in roots {
		flatten_into(route, &mut out);
	}
	out
}

/// The flattened routes in match order.
pub struct RouteTable<V> {
	routes: Vec<Route<V>>,
	names: HashMap<String, usize>,
}

impl<V> std::fmt::Debug for RouteTable<V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouteTable")
			.field(
				"routes",
				&self.routes.iter().map(|r| (&r.name, &r.path)).collect::<Vec<_>>(),
			)
			.finish()
	}
}

impl<V> RouteTable<V> {
	/// Flattens and validates `roots`.
	///
	/// # Errors
	///
	/// [`RouterError::Config`] when a route has an empty name, has neither a
	/// view nor a redirect, or redirects to an unknown named route.
	pub fn new(roots: impl IntoIterator<Item = Route<V>>) -> RouterResult<Self> {
		let routes = flatten(roots);
		let mut names = HashMap::new();

		for (index, route) in routes.iter().enumerate() {
			if route.name.is_empty() {
				return Err(RouterError::Config(format!(
					"route '{}' has no name",
					route.path
				)));
			}
			if route.view.is_none() && route.redirect.is_none() {
				return Err(RouterError::Config(format!(
					"route '{}' has neither a view nor a redirect",
					route.name
				)));
			}
			if names.contains_key(&route.name) {
				tracing::warn!(route = %route.name, "duplicate route name, the first definition is used for lookups");
				continue;
			}
			names.insert(route.name.clone(), index);
		}

		for route in &routes {
			let Some(RedirectTarget::Named { name, .. }) = &route.redirect else {
				continue;
			};
			if !names.contains_key(name) {
				return Err(RouterError::Config(format!(
					"route '{}' redirects to undefined route '{}'",
					route.name, name
				)));
			}
		}

		tracing::debug!(routes = routes.len(), "route table built");
		Ok(Self { routes, names })
	}

	/// Routes in match order.
	pub fn routes(&self) -> &[Route<V>] {
		&self.routes
	}

	/// Iterates routes in match order.
	pub fn iter(&self) -> std::slice::Iter<'_, Route<V>> {
		self.routes.iter()
	}

	/// Looks a route up by name.
	pub fn get(&self, name: &str) -> Option<&Route<V>> {
		self.names.get(name).map(|&index| &self.routes[index])
	}

	/// Route templates by name.
	pub fn templates(&self) -> HashMap<String, String> {
		self.names
			.iter()
			.map(|(name, &index)| (name.clone(), self.routes[index].path.clone()))
			.collect()
	}

	/// Number of routes.
	pub fn len(&self) -> usize {
		self.routes.len()
	}

	/// Whether the table is empty.
	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}
