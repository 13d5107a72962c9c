//! `document.cookie` helpers.

use crate::error::PlatformResult;
use crate::platform::Platform;
use thiserror::Error;

/// Cookie lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CookieError {
	/// No cookie with the requested name.
	#[error("cookie not found")]
	NotFound,

	/// The cookie string contains a pair that is not `name=value`.
	#[error("invalid cookie: {0}")]
	Invalid(String),
}

/// Sets `key=value` on the document.
pub fn set(platform: &dyn Platform, key: &str, value: &str) -> PlatformResult<()> {
	platform.set_cookie(&format!("{}={}", key, value))
}

/// Reads the cookie named `key`.
///
/// # Errors
///
/// [`CookieError::Invalid`] as soon as a malformed pair is met before the
/// key is found, [`CookieError::NotFound`] when the key is absent.
pub fn get(platform: &dyn Platform, key: &str) -> Result<String, CookieError> {
	parse(&platform.cookie(), key)
}

/// Looks `key` up in a raw `document.cookie` string.
pub fn parse(cookies: &str, key: &str) -> Result<String, CookieError> {
	for pair in cookies.split("; ").filter(|pair| !pair.is_empty()) {
		let mut parts = pair.split('=');
		let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
			return Err(CookieError::Invalid(pair.to_string()));
		};
		if name == key {
			return Ok(value.to_string());
		}
	}
	Err(CookieError::NotFound)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryPlatform;
	use rstest::rstest;

	#[rstest]
	#[case("a=1; b=2", "b", Ok("2".to_string()))]
	#[case("a=1; b=2", "c", Err(CookieError::NotFound))]
	#[case("", "a", Err(CookieError::NotFound))]
	#[case("broken; a=1", "a", Err(CookieError::Invalid("broken".to_string())))]
	#[case("a=1=2", "a", Err(CookieError::Invalid("a=1=2".to_string())))]
	fn test_parse(#[case] cookies: &str, #[case] key: &str, #[case] expected: Result<String, CookieError>) {
		assert_eq!(parse(cookies, key), expected);
	}

	#[rstest]
	fn test_set_then_get() {
		let platform = MemoryPlatform::new("https://example.com/");
		set(&platform, "session", "abc").unwrap();
		assert_eq!(get(&platform, "session"), Ok("abc".to_string()));
	}

	#[rstest]
	fn test_set_keeps_other_cookies() {
		// Arrange
		let platform = MemoryPlatform::new("https://example.com/");
		set(&platform, "session", "abc").unwrap();
		set(&platform, "theme", "dark").unwrap();

		// Act
		set(&platform, "session", "xyz").unwrap();

		// Assert
		assert_eq!(get(&platform, "theme"), Ok("dark".to_string()));
		assert_eq!(get(&platform, "session"), Ok("xyz".to_string()));
		assert_eq!(platform.cookie(), "session=xyz; theme=dark");
	}

	#[rstest]
	fn test_set_cookie_drops_attributes() {
		let platform = MemoryPlatform::new("https://example.com/");

		platform.set_cookie("lang=en; path=/; max-age=60").unwrap();

		assert_eq!(platform.cookie(), "lang=en");
	}
}
