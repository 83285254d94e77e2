/*!
# Validator functions for XML-related strings

This is a supplementary crate for [`xescan`](https://docs.rs/xescan). It
holds the character classes the scanner dispatches on, plus the syntax
checks for encoding names found in declarations.
*/
use std::fmt;

pub mod selectors;

/**
Error condition from validating an encoding name.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// The encoding name was empty.
	EmptyName,
	/// An invalid character was encountered.
	///
	/// This variant contains the character as data.
	InvalidChar(char),
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::EmptyName => f.write_str("encoding name must not be empty"),
			Self::InvalidChar(c) => write!(f, "character U+{:04x} is not allowed", *c as u32),
		}
	}
}

impl std::error::Error for Error {}

/**
Check whether a str is a syntactically valid IANA encoding name

The first char must be an ASCII letter; the rest may be ASCII letters,
digits, `.`, `_` or `-`.

# Example

```rust
use xescan_validation::{validate_iana_encoding_name, Error};

assert!(validate_iana_encoding_name("ISO-8859-1").is_ok());
assert!(matches!(validate_iana_encoding_name("8859"), Err(Error::InvalidChar('8'))));
```
*/
pub fn validate_iana_encoding_name(s: &str) -> Result<(), Error> {
	let mut chars = s.chars();
	match chars.next() {
		None => return Err(Error::EmptyName),
		Some(c) => if !c.is_ascii_alphabetic() {
			return Err(Error::InvalidChar(c))
		}
	}
	for ch in chars {
		if !is_encoding_name_char(ch) {
			return Err(Error::InvalidChar(ch))
		}
	}
	Ok(())
}

/**
Check whether a str is a syntactically valid Java-style encoding name

Unlike IANA names, these may start with a digit or underscore.
*/
pub fn validate_java_encoding_name(s: &str) -> Result<(), Error> {
	if s.is_empty() {
		return Err(Error::EmptyName)
	}
	for ch in s.chars() {
		if !is_encoding_name_char(ch) {
			return Err(Error::InvalidChar(ch))
		}
	}
	Ok(())
}

fn is_encoding_name_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'
}
