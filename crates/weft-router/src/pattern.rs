//! Path pattern matching.
//!
//! Route templates use `:name` placeholders. A placeholder runs from the `:`
//! up to the next `/` (or the end of the template); everything else is
//! literal text:
//!
//! - `/users/` - literal
//! - `/users/:id` - one parameter
//! - `/users/:user_id/posts/:post_id` - several parameters
//!
//! A parameter matches any run of characters other than `/`, `?` and `=`.
//! Exact patterns are anchored at both ends, prefix patterns only at the
//! start.

use regex::RegexBuilder;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// Path or query parameters by name.
pub type Params = HashMap<String, String>;

/// Default bound on the number of parameters in a template.
pub const DEFAULT_MAX_ROUTE_PARAMS: usize = 64;

/// Maximum allowed size for a compiled pattern regex (in bytes).
const MAX_PATTERN_REGEX_SIZE: usize = 1 << 20;

/// Errors raised while compiling a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PatternError {
	/// The template has more placeholders than allowed.
	#[error("invalid path '{template}': more than {max} parameters")]
	TooManyParams {
		/// Offending template.
		template: String,
		/// Configured bound.
		max: usize,
	},

	/// The generated regex failed to build.
	#[error("invalid path '{template}': {message}")]
	Regex {
		/// Offending template.
		template: String,
		/// Regex engine message.
		message: String,
	},
}

/// Splits `template` at its first placeholder.
///
/// Returns the literal prefix and, if there is a placeholder, its name and
/// the remaining template.
fn split_param(template: &str) -> (&str, Option<(&str, &str)>) {
	let Some(colon) = template.find(':') else {
		return (template, None);
	};
	let after = &template[colon + 1..];
	let end = after.find('/').unwrap_or(after.len());
	(&template[..colon], Some((&after[..end], &after[end..])))
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathPattern {
	template: String,
	regex: regex::Regex,
	param_names: Vec<String>,
	exact: bool,
	sensitive: bool,
}

impl PathPattern {
	/// Compiles `template`.
	///
	/// Parameters become positional capture groups, so placeholder names are
	/// not restricted to what the regex engine accepts as group names, and a
	/// name may repeat (the last occurrence wins on extraction).
	///
	/// # Errors
	///
	/// [`PatternError::TooManyParams`] past `max_params` placeholders,
	/// [`PatternError::Regex`] if the regex does not build.
	pub fn compile(
		template: &str,
		exact: bool,
		sensitive: bool,
		max_params: usize,
	) -> Result<Self, PatternError> {
		let mut regex_str = String::new();
		if !sensitive {
			regex_str.push_str("(?i)");
		}
		regex_str.push('^');

		let mut param_names = Vec::new();
		let mut rest = template;
		loop {
			let (literal, param) = split_param(rest);
			regex_str.push_str(&regex::escape(literal));
			let Some((name, tail)) = param else {
				break;
			};
			if param_names.len() == max_params {
				return Err(PatternError::TooManyParams {
					template: template.to_string(),
					max: max_params,
				});
			}
			param_names.push(name.to_string());
			regex_str.push_str("([^/?=]*)");
			rest = tail;
		}

		if exact {
			regex_str.push('$');
		}

		let regex = RegexBuilder::new(&regex_str)
			.size_limit(MAX_PATTERN_REGEX_SIZE)
			.build()
			.map_err(|e| PatternError::Regex {
				template: template.to_string(),
				message: e.to_string(),
			})?;

		Ok(Self {
			template: template.to_string(),
			regex,
			param_names,
			exact,
			sensitive,
		})
	}

	/// Returns the original template.
	pub fn template(&self) -> &str {
		&self.template
	}

	/// Returns the parameter names in template order.
	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	/// Whether the pattern must match the whole path.
	pub fn is_exact(&self) -> bool {
		self.exact
	}

	/// Whether matching is case-sensitive.
	pub fn is_sensitive(&self) -> bool {
		self.sensitive
	}

	/// Extracts parameters from `path`.
	///
	/// A template without placeholders never matches here; literal templates
	/// are handled by the equality and prefix checks in [`match_template`].
	pub fn captures(&self, path: &str) -> Option<Params> {
		if self.param_names.is_empty() {
			return None;
		}
		let caps = self.regex.captures(path)?;
		Some(
			self.param_names
				.iter()
				.enumerate()
				.map(|(index, name)| {
					let value = caps.get(index + 1).map_or("", |m| m.as_str());
					(name.clone(), value.to_string())
				})
				.collect(),
		)
	}
}

impl PartialEq for PathPattern {
	fn eq(&self, other: &Self) -> bool {
		self.template == other.template
			&& self.exact == other.exact
			&& self.sensitive == other.sensitive
	}
}

impl Eq for PathPattern {}

impl std::fmt::Display for PathPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.template)
	}
}

type CacheKey = (String, bool, bool);

/// Compiled patterns by `(template, exact, sensitive)`.
///
/// Each distinct template is compiled at most once, failures included, so
/// the cache is bounded by the number of routes rather than by traffic.
#[derive(Debug)]
pub struct PatternCache {
	patterns: HashMap<CacheKey, Result<Rc<PathPattern>, PatternError>>,
	max_params: usize,
}

impl Default for PatternCache {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_ROUTE_PARAMS)
	}
}

impl PatternCache {
	/// Creates an empty cache compiling with `max_params`.
	pub fn new(max_params: usize) -> Self {
		Self {
			patterns: HashMap::new(),
			max_params,
		}
	}

	/// Returns the compiled pattern, compiling it on first use.
	pub fn get(
		&mut self,
		template: &str,
		exact: bool,
		sensitive: bool,
	) -> Result<Rc<PathPattern>, PatternError> {
		let key = (template.to_string(), exact, sensitive);
		let max_params = self.max_params;
		self.patterns
			.entry(key)
			.or_insert_with(|| {
				let compiled = PathPattern::compile(template, exact, sensitive, max_params);
				if let Err(err) = &compiled {
					tracing::error!(template = %template, error = %err, "route template failed to compile");
				}
				compiled.map(Rc::new)
			})
			.clone()
	}

	/// Number of cached templates.
	pub fn len(&self) -> usize {
		self.patterns.len()
	}

	/// Whether nothing has been compiled yet.
	pub fn is_empty(&self) -> bool {
		self.patterns.is_empty()
	}
}

fn literal_eq(a: &str, b: &str, sensitive: bool) -> bool {
	if sensitive {
		a == b
	} else {
		a.eq_ignore_ascii_case(b)
	}
}

fn literal_prefix(path: &str, prefix: &str, sensitive: bool) -> bool {
	if sensitive {
		path.starts_with(prefix)
	} else {
		path.get(..prefix.len())
			.is_some_and(|head| head.eq_ignore_ascii_case(prefix))
	}
}

/// Matches `path` (without query string) against a route template.
///
/// 1. exact templates match on literal equality, prefix templates on a
///    literal prefix; both yield no parameters;
/// 2. otherwise the compiled pattern decides and yields its parameters.
///
/// A template that fails to compile is logged and treated as non-matching.
pub fn match_template(
	cache: &mut PatternCache,
	template: &str,
	exact: bool,
	sensitive: bool,
	path: &str,
) -> Option<Params> {
	if exact && literal_eq(path, template, sensitive) {
		return Some(Params::new());
	}
	if !exact && literal_prefix(path, template, sensitive) {
		return Some(Params::new());
	}

	match cache.get(template, exact, sensitive) {
		Ok(pattern) => pattern.captures(path),
		Err(err) => {
			tracing::debug!(template = %template, error = %err, "skipping route with invalid template");
			None
		}
	}
}

/// Splits a URL into its path and query string (without the `?`).
pub fn split_url(url: &str) -> (&str, Option<&str>) {
	match url.split_once('?') {
		Some((path, query)) => (path, Some(query)),
		None => (url, None),
	}
}

/// Parses `a=1&b=2` into parameters.
///
/// Empty pieces are ignored. A piece that is not exactly one `key=value`
/// pair is logged and skipped.
pub fn parse_query(query: &str) -> Params {
	let mut params = Params::new();
	for piece in query.split('&').filter(|piece| !piece.is_empty()) {
		let mut parts = piece.split('=');
		match (parts.next(), parts.next(), parts.next()) {
			(Some(key), Some(value), None) => {
				params.insert(key.to_string(), value.to_string());
			}
			_ => tracing::warn!(query = %piece, "invalid query parameter"),
		}
	}
	params
}

/// Builds `?k=v&...` in key order, or an empty string when there are no
/// queries.
pub fn query_string(queries: &Params) -> String {
	if queries.is_empty() {
		return String::new();
	}
	let mut pairs: Vec<_> = queries.iter().collect();
	pairs.sort();
	let joined = pairs
		.into_iter()
		.map(|(key, value)| format!("{}={}", key, value))
		.collect::<Vec<_>>()
		.join("&");
	format!("?{}", joined)
}

/// Substitutes parameters into `template` and appends the query string.
///
/// Missing parameters become empty strings. At most `max_params`
/// placeholders are substituted; past that the rest of the template is
/// kept verbatim, the query string is dropped and a warning is logged.
pub fn fill_template(template: &str, params: &Params, queries: &Params, max_params: usize) -> String {
	let mut path = String::with_capacity(template.len());
	let mut rest = template;
	let mut substituted = 0;

	loop {
		let (literal, param) = split_param(rest);
		path.push_str(literal);
		let Some((name, tail)) = param else {
			path.push_str(&query_string(queries));
			return path;
		};
		if substituted == max_params {
			tracing::warn!(template = %template, max = max_params, "invalid path: too many parameters");
			path.push(':');
			path.push_str(name);
			path.push_str(tail);
			return path;
		}
		path.push_str(params.get(name).map_or("", String::as_str));
		substituted += 1;
		rest = tail;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn params(pairs: &[(&str, &str)]) -> Params {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[rstest]
	#[case("/users/:id", "/users/", Some(("id", "")))]
	#[case("/users/:id/posts", "/users/", Some(("id", "/posts")))]
	#[case("/users/", "/users/", None)]
	#[case(":only", "", Some(("only", "")))]
	fn test_split_param(
		#[case] template: &str,
		#[case] literal: &str,
		#[case] param: Option<(&str, &str)>,
	) {
		assert_eq!(split_param(template), (literal, param));
	}

	#[rstest]
	fn test_single_param() {
		let pattern = PathPattern::compile("/users/:id", true, true, 64).unwrap();
		assert_eq!(pattern.captures("/users/42"), Some(params(&[("id", "42")])));
		assert_eq!(pattern.captures("/users/42/extra"), None);
		assert_eq!(pattern.param_names(), &["id"]);
	}

	#[rstest]
	fn test_multiple_params() {
		let pattern =
			PathPattern::compile("/users/:user_id/posts/:post_id", true, true, 64).unwrap();
		assert_eq!(
			pattern.captures("/users/1/posts/99"),
			Some(params(&[("user_id", "1"), ("post_id", "99")]))
		);
	}

	#[rstest]
	fn test_param_excludes_query_characters() {
		let pattern = PathPattern::compile("/search/:term", true, true, 64).unwrap();
		assert_eq!(pattern.captures("/search/a?b"), None);
		assert_eq!(pattern.captures("/search/a=b"), None);
	}

	#[rstest]
	fn test_prefix_pattern_matches_longer_paths() {
		let pattern = PathPattern::compile("/users/:id", false, true, 64).unwrap();
		assert_eq!(
			pattern.captures("/users/7/settings"),
			Some(params(&[("id", "7")]))
		);
	}

	#[rstest]
	fn test_literal_text_is_escaped() {
		let pattern = PathPattern::compile("/api/v1.0/:id", true, true, 64).unwrap();
		assert!(pattern.captures("/api/v1.0/3").is_some());
		assert!(pattern.captures("/api/v1X0/3").is_none());
	}

	#[rstest]
	fn test_names_need_not_be_identifiers() {
		let pattern = PathPattern::compile("/items/:item-id", true, true, 64).unwrap();
		assert_eq!(
			pattern.captures("/items/5"),
			Some(params(&[("item-id", "5")]))
		);
	}

	#[rstest]
	fn test_case_insensitive_by_default() {
		let pattern = PathPattern::compile("/Users/:id", true, false, 64).unwrap();
		assert!(pattern.captures("/users/1").is_some());

		let sensitive = PathPattern::compile("/Users/:id", true, true, 64).unwrap();
		assert!(sensitive.captures("/users/1").is_none());
	}

	#[rstest]
	fn test_too_many_params() {
		let result = PathPattern::compile("/:a/:b/:c", true, true, 2);
		assert_eq!(
			result.unwrap_err(),
			PatternError::TooManyParams {
				template: "/:a/:b/:c".to_string(),
				max: 2
			}
		);
	}

	#[rstest]
	fn test_cache_compiles_once() {
		let mut cache = PatternCache::default();
		let first = cache.get("/users/:id", true, true).unwrap();
		let second = cache.get("/users/:id", true, true).unwrap();

		assert!(Rc::ptr_eq(&first, &second));
		assert_eq!(cache.len(), 1);

		cache.get("/users/:id", false, true).unwrap();
		assert_eq!(cache.len(), 2);
	}

	#[rstest]
	fn test_cache_keeps_failures() {
		let mut cache = PatternCache::new(0);
		assert!(cache.get("/users/:id", true, true).is_err());
		assert!(cache.get("/users/:id", true, true).is_err());
		assert_eq!(cache.len(), 1);
	}

	#[rstest]
	#[case("/", true, "/", true)]
	#[case("/", true, "/other", false)]
	#[case("/admin", false, "/admin/users", true)]
	#[case("/admin", false, "/ad", false)]
	#[case("/user/:id", true, "/user/42", true)]
	#[case("/user/:id", true, "/user/42/x", false)]
	#[case("/user/:id", false, "/user/42/x", true)]
	#[case("/about", true, "/About", false)]
	#[case("/admin", false, "/ADMIN/users", false)]
	fn test_match_template(
		#[case] template: &str,
		#[case] exact: bool,
		#[case] path: &str,
		#[case] matched: bool,
	) {
		let mut cache = PatternCache::default();
		assert_eq!(
			match_template(&mut cache, template, exact, true, path).is_some(),
			matched
		);
	}

	#[rstest]
	#[case("/about", true, "/About")]
	#[case("/admin", false, "/ADMIN/users")]
	#[case("/user/:id", true, "/USER/42")]
	fn test_insensitive_match_folds_case(#[case] template: &str, #[case] exact: bool, #[case] path: &str) {
		let mut cache = PatternCache::default();
		assert!(match_template(&mut cache, template, exact, false, path).is_some());
	}

	#[rstest]
	fn test_invalid_template_never_matches() {
		let mut cache = PatternCache::new(0);
		assert_eq!(match_template(&mut cache, "/u/:id", true, true, "/u/1"), None);
	}

	#[rstest]
	fn test_split_url() {
		assert_eq!(split_url("/a?b=1"), ("/a", Some("b=1")));
		assert_eq!(split_url("/a"), ("/a", None));
		assert_eq!(split_url("/a?"), ("/a", Some("")));
	}

	#[rstest]
	fn test_parse_query_skips_malformed_pairs() {
		let parsed = parse_query("tab=posts&&broken&a=b=c&page=2");
		assert_eq!(parsed, params(&[("tab", "posts"), ("page", "2")]));
	}

	#[rstest]
	fn test_fill_template() {
		let filled = fill_template(
			"/users/:id/posts/:post",
			&params(&[("id", "42"), ("post", "7")]),
			&params(&[("tab", "x"), ("a", "1")]),
			64,
		);
		assert_eq!(filled, "/users/42/posts/7?a=1&tab=x");
	}

	#[rstest]
	fn test_fill_template_missing_param_is_empty() {
		let filled = fill_template("/users/:id/edit", &Params::new(), &Params::new(), 64);
		assert_eq!(filled, "/users//edit");
	}

	#[rstest]
	fn test_fill_template_does_not_rescan_values() {
		let filled = fill_template("/t/:a", &params(&[("a", ":b")]), &Params::new(), 64);
		assert_eq!(filled, "/t/:b");
	}

	#[rstest]
	fn test_fill_template_bound() {
		let filled = fill_template(
			"/:a/:b",
			&params(&[("a", "1"), ("b", "2")]),
			&params(&[("q", "1")]),
			1,
		);
		assert_eq!(filled, "/1/:b");
	}
}
