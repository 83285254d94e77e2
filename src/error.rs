/*!
# Error types

This module holds the error types returned by the scanner, along with the
machine-readable keys and arguments handed to an
[`ErrorReporter`](crate::ErrorReporter).
*/
use std::error;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::result::Result as StdResult;
use std::sync::Arc;

use crate::limits::{Limit, LimitSource};

pub use crate::errctx::*;

/// Domain under which scanner errors are reported.
pub const XML_DOMAIN: &'static str = "http://www.w3.org/TR/1998/REC-xml-19980210";

/// Violation of a well-formedness constraint detected while scanning.
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum WFError {
	/// Unicode codepoint which is not allowed in XML encountered.
	///
	/// The context string is an implementation detail.
	InvalidChar(&'static str, u32),
}

impl error::Error for WFError {}

impl fmt::Display for WFError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			WFError::InvalidChar(ctx, cp) => write!(f, "invalid codepoint U+{:x} {}", cp, ctx),
		}
	}
}

/// Violation of a namespace-well-formedness constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum NWFError {
	/// The part after the first colon of a qualified name does not start
	/// with an NCName start char.
	///
	/// Contains the raw name as scanned.
	IllegalQName(String),
}

impl error::Error for NWFError {}

impl fmt::Display for NWFError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::IllegalQName(raw) => write!(f, "local part of qualified name {:?} is invalid", raw),
		}
	}
}

/// Problems with a sniffed or declared encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodingError {
	/// The name is not a valid encoding label or no decoder is available
	/// for it.
	DeclInvalid(String),

	/// A UCS encoding was requested without a known byte order.
	ByteOrderUnsupported(String),
}

impl error::Error for EncodingError {}

impl fmt::Display for EncodingError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::DeclInvalid(name) => write!(f, "encoding {:?} is invalid or not supported", name),
			Self::ByteOrderUnsupported(name) => write!(f, "byte order of encoding {:?} is not supported", name),
		}
	}
}

/// A configured resource limit was exceeded.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitViolation {
	/// The limit which was exceeded.
	pub limit: Limit,
	/// Name of the entity the value was accumulated for, if the limit is
	/// tracked per entity.
	pub entity: Option<String>,
	/// Value which exceeded the limit.
	pub value: usize,
	/// Configured maximum.
	pub max: usize,
	/// Where the maximum was configured.
	pub source: LimitSource,
}

impl fmt::Display for LimitViolation {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self.entity.as_ref() {
			Some(entity) => write!(
				f,
				"{} exceeded by entity {:?}: {} > {} (set by {})",
				self.limit,
				entity,
				self.value,
				self.max,
				self.source.literal(),
			),
			None => write!(
				f,
				"{} exceeded: {} > {} (set by {})",
				self.limit,
				self.value,
				self.max,
				self.source.literal(),
			),
		}
	}
}

/// [`std::sync::Arc`]-based around [`std::io::Error`] to allow cloning.
#[derive(Clone)]
pub struct IOErrorWrapper(Arc<io::Error>);

impl IOErrorWrapper {
	fn wrap(e: io::Error) -> IOErrorWrapper {
		IOErrorWrapper(Arc::new(e))
	}
}

impl fmt::Debug for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(&**self, f)
	}
}

impl fmt::Display for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(&**self, f)
	}
}

impl PartialEq for IOErrorWrapper {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl Deref for IOErrorWrapper {
	type Target = io::Error;

	fn deref(&self) -> &io::Error {
		&*self.0
	}
}

/// Error types which may be returned from the scanner.
///
/// With the exception of [`Error::IO`] and [`Error::EndOfDocument`], all
/// errors are fatal: they are reported once and then returned from every
/// further scan call.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// An I/O error was encountered while reading the underlying stream.
	IO(IOErrorWrapper),

	/// The outermost entity has been exhausted.
	///
	/// This is not a failure; it marks the regular end of the input.
	EndOfDocument,

	/// An invalid UTF-8 byte was encountered during decoding.
	InvalidUtf8Byte(u8),
	/// A byte above 0x7f was encountered in US-ASCII input.
	InvalidAsciiByte(u8),
	/// An invalid Unicode scalar value was encountered during decoding.
	InvalidChar(u32),
	/// The codec for the named encoding rejected the input.
	MalformedInput(&'static str),

	/// A well-formedness violation was detected during scanning.
	NotWellFormed(WFError),
	/// A namespace-well-formedness violation was detected during scanning.
	NotNamespaceWellFormed(NWFError),
	/// The encoding could not be set up.
	Encoding(EncodingError),
	/// A security limit was exceeded.
	LimitExceeded(LimitViolation),
}

pub type Result<T> = StdResult<T, Error>;

impl Error {
	pub fn io(e: io::Error) -> Error {
		Error::IO(IOErrorWrapper::wrap(e))
	}

	/// True for the end-of-document sentinel.
	pub fn is_end_of_document(&self) -> bool {
		matches!(self, Error::EndOfDocument)
	}

	/// True if the scanner keeps returning this error once raised.
	pub fn is_fatal(&self) -> bool {
		!matches!(self, Error::IO(_) | Error::EndOfDocument)
	}

	/// Domain the error is reported under.
	///
	/// This is [`XML_DOMAIN`] for every error, including
	/// [`NWFError::IllegalQName`]: the scanner reports the malformed name
	/// as an XML error and leaves namespace processing to the parser.
	pub fn domain(&self) -> &'static str {
		XML_DOMAIN
	}

	/// Message key identifying the kind of error.
	pub fn key(&self) -> &'static str {
		match self {
			Error::IO(_) => "IOError",
			Error::EndOfDocument => "EndOfDocument",
			Error::InvalidUtf8Byte(_) => "InvalidByte",
			Error::InvalidAsciiByte(_) => "InvalidASCII",
			Error::InvalidChar(_) => "InvalidCodepoint",
			Error::MalformedInput(_) => "MalformedInput",
			Error::NotWellFormed(WFError::InvalidChar(..)) => "InvalidChar",
			Error::NotNamespaceWellFormed(NWFError::IllegalQName(_)) => "IllegalQName",
			Error::Encoding(EncodingError::DeclInvalid(_)) => "EncodingDeclInvalid",
			Error::Encoding(EncodingError::ByteOrderUnsupported(_)) => "EncodingByteOrderUnsupported",
			Error::LimitExceeded(v) => v.limit.key(),
		}
	}

	/// Arguments for formatting the message identified by [`Error::key`].
	pub fn args(&self) -> Vec<String> {
		match self {
			Error::IO(e) => vec![e.to_string()],
			Error::EndOfDocument => Vec::new(),
			Error::InvalidUtf8Byte(b) | Error::InvalidAsciiByte(b) => vec![format!("0x{:02x}", b)],
			Error::InvalidChar(cp) => vec![format!("U+{:x}", cp)],
			Error::MalformedInput(enc) => vec![enc.to_string()],
			Error::NotWellFormed(WFError::InvalidChar(ctx, cp)) => vec![format!("U+{:x}", cp), ctx.to_string()],
			Error::NotNamespaceWellFormed(NWFError::IllegalQName(raw)) => vec![raw.clone()],
			Error::Encoding(EncodingError::DeclInvalid(name))
			| Error::Encoding(EncodingError::ByteOrderUnsupported(name)) => vec![name.clone()],
			Error::LimitExceeded(v) => {
				let mut args = Vec::with_capacity(4);
				if let Some(entity) = v.entity.as_ref() {
					args.push(entity.clone());
				}
				args.push(v.value.to_string());
				args.push(v.max.to_string());
				args.push(v.source.literal().to_string());
				args
			}
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::io(e)
	}
}

impl From<WFError> for Error {
	fn from(e: WFError) -> Error {
		Error::NotWellFormed(e)
	}
}

impl From<NWFError> for Error {
	fn from(e: NWFError) -> Error {
		Error::NotNamespaceWellFormed(e)
	}
}

impl From<EncodingError> for Error {
	fn from(e: EncodingError) -> Error {
		Error::Encoding(e)
	}
}

impl From<LimitViolation> for Error {
	fn from(e: LimitViolation) -> Error {
		Error::LimitExceeded(e)
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::IO(e) => write!(f, "I/O error: {}", e),
			Error::EndOfDocument => f.write_str("end of document"),
			Error::InvalidUtf8Byte(b) => write!(f, "invalid utf-8 byte: \\x{:02x}", b),
			Error::InvalidAsciiByte(b) => write!(f, "invalid us-ascii byte: \\x{:02x}", b),
			Error::InvalidChar(ch) => write!(f, "invalid char: U+{:08x}", ch),
			Error::MalformedInput(enc) => write!(f, "malformed {} input", enc),
			Error::NotWellFormed(e) => write!(f, "not-well-formed: {}", e),
			Error::NotNamespaceWellFormed(e) => write!(f, "not namespace-well-formed: {}", e),
			Error::Encoding(e) => write!(f, "encoding error: {}", e),
			Error::LimitExceeded(e) => write!(f, "limit exceeded: {}", e),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Error::IO(e) => Some(&**e),
			Error::NotWellFormed(e) => Some(e),
			Error::NotNamespaceWellFormed(e) => Some(e),
			Error::Encoding(e) => Some(e),
			Error::EndOfDocument
			| Error::InvalidUtf8Byte(_)
			| Error::InvalidAsciiByte(_)
			| Error::InvalidChar(_)
			| Error::MalformedInput(_)
			| Error::LimitExceeded(_) => None,
		}
	}
}
