//! The immutable description of a resolved navigation.

use crate::pattern::Params;
use crate::route::RedirectTarget;

/// Configuration of the matched route, without its callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
	/// Route name.
	pub name: String,
	/// Full (flattened) template.
	pub path: String,
	/// Whether the template must match the whole path.
	pub exact: bool,
	/// Whether matching is case-sensitive.
	pub sensitive: bool,
	/// Static redirect, if any.
	pub redirect: Option<RedirectTarget>,
}

/// A resolved navigation.
///
/// Shared through `Rc` with middleware and views; it is never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
	/// Name of the matched route.
	pub name: String,
	/// Requested URL, query string included, base name excluded.
	pub url: String,
	/// Path parameters.
	pub params: Params,
	/// Query parameters.
	pub query_params: Params,
	/// The matched route.
	pub route: RouteMeta,
}

impl RouteInfo {
	/// Returns a path parameter.
	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	/// Returns a query parameter.
	pub fn query(&self, name: &str) -> Option<&str> {
		self.query_params.get(name).map(String::as_str)
	}
}
