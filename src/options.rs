/*!
# Scanner configuration
*/

/// XML version whose line end and character rules are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XMLVersion {
	/// XML 1.0
	V1_0,
	/// XML 1.1: NEL and LS are line ends in external entities and the C0/C1
	/// controls are restricted.
	V1_1,
}

impl XMLVersion {
	/// Parse the value of a `version` pseudo-attribute.
	pub fn from_declared(s: &str) -> Option<XMLVersion> {
		match s {
			"1.0" => Some(XMLVersion::V1_0),
			"1.1" => Some(XMLVersion::V1_1),
			_ => None,
		}
	}
}

impl Default for XMLVersion {
	fn default() -> Self {
		XMLVersion::V1_0
	}
}

/**
# Configuration for the entity scanner

Use [`Default::default`] and the builder methods:

```
use xescan::{ScannerOptions, XMLVersion};
let opts = ScannerOptions::default()
	.buffer_size(4096)
	.xml_version(XMLVersion::V1_1);
assert_eq!(opts.buffer_size, 4096);
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerOptions {
	/// Initial buffer capacity for external entities, in chars.
	///
	/// Buffers grow when a single name or lookahead request needs more.
	pub buffer_size: usize,

	/// Initial buffer capacity for internal entities, in chars.
	pub internal_buffer_size: usize,

	/// Maximum number of chars read per load while an entity does not
	/// allow chunked reads yet.
	///
	/// Keeping this small limits what is decoded before an encoding
	/// declaration has been seen.
	pub xmldecl_buffer_size: usize,

	/// Line end and character rules to apply.
	pub xml_version: XMLVersion,

	/// Accept Java-style encoding names such as `ISO8859_1`.
	pub allow_java_encodings: bool,

	/// Continue with ISO-8859-1 after an invalid encoding declaration.
	///
	/// The error is reported either way. If false, it is also returned
	/// and the scanner stops.
	pub encoding_recovery: bool,

	/// Record the positions of whitespace chars while scanning literals.
	pub whitespace_info: bool,
}

impl ScannerOptions {
	/// Set the initial buffer capacity for external entities
	pub fn buffer_size(mut self, size: usize) -> Self {
		self.buffer_size = size;
		self
	}

	/// Set the initial buffer capacity for internal entities
	pub fn internal_buffer_size(mut self, size: usize) -> Self {
		self.internal_buffer_size = size;
		self
	}

	/// Set the load size used before chunked reads are allowed
	pub fn xmldecl_buffer_size(mut self, size: usize) -> Self {
		self.xmldecl_buffer_size = size;
		self
	}

	pub fn xml_version(mut self, version: XMLVersion) -> Self {
		self.xml_version = version;
		self
	}

	pub fn allow_java_encodings(mut self, allow: bool) -> Self {
		self.allow_java_encodings = allow;
		self
	}

	pub fn encoding_recovery(mut self, recover: bool) -> Self {
		self.encoding_recovery = recover;
		self
	}

	pub fn whitespace_info(mut self, enabled: bool) -> Self {
		self.whitespace_info = enabled;
		self
	}
}

impl Default for ScannerOptions {
	fn default() -> Self {
		Self{
			buffer_size: 8192,
			internal_buffer_size: 1024,
			xmldecl_buffer_size: 64,
			xml_version: XMLVersion::V1_0,
			allow_java_encodings: false,
			encoding_recovery: false,
			whitespace_info: true,
		}
	}
}
