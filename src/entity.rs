/*!
# Entity buffers

A [`ScannedEntity`] holds everything the scanner needs to read from one
entity: the character buffer with its cursor, position counters, the
encoding and the flags deciding how line ends and limits are handled.
*/
use std::fmt;
use std::io;

use smartstring::alias::String as SmartString;

use crate::error::Result;
use crate::reader::{ByteStream, CharRead, ReaderKind, StrReader, StreamReader};
use crate::sniff;

/// Where an entity gets its characters from.
pub enum EntitySource {
	/// Bytes which are decoded by the scanner. Encoding declarations
	/// apply.
	Stream(StreamReader),
	/// Characters which are already decoded. Encoding declarations are
	/// ignored.
	Chars(Box<dyn CharRead>),
}

impl EntitySource {
	pub(crate) fn read_chars(&mut self, dst: &mut [char]) -> Result<Option<usize>> {
		match self {
			Self::Stream(r) => r.read_chars(dst),
			Self::Chars(r) => r.read_chars(dst),
		}
	}
}

impl fmt::Debug for EntitySource {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Stream(r) => f.debug_tuple("Stream").field(r).finish(),
			Self::Chars(_) => f.write_str("Chars(..)"),
		}
	}
}

/**
# Live buffering state of one entity

The buffer `ch` has a capacity independent of the amount of valid data:
`0 <= position <= count <= ch.len()` holds at all times. The scanner
rewrites line ends inside `ch[..count]` in place before handing out spans.
*/
#[derive(Debug)]
pub struct ScannedEntity {
	pub(crate) name: SmartString,
	pub(crate) system_id: Option<String>,
	pub(crate) source: EntitySource,
	pub(crate) ch: Vec<char>,
	pub(crate) position: usize,
	pub(crate) count: usize,
	pub(crate) line: usize,
	pub(crate) column: usize,
	/// Absolute offset of `ch[0]` within the entity.
	pub(crate) base_offset: usize,
	pub(crate) encoding: SmartString,
	pub(crate) xml_version: Option<SmartString>,
	pub(crate) is_external: bool,
	pub(crate) is_literal: bool,
	pub(crate) is_ge: bool,
	pub(crate) may_read_chunks: bool,
}

impl ScannedEntity {
	fn with_source(name: &str, source: EntitySource, encoding: &str, buffer_size: usize) -> Self {
		Self{
			name: name.into(),
			system_id: None,
			source,
			ch: vec!['\0'; buffer_size.max(1)],
			position: 0,
			count: 0,
			line: 1,
			column: 1,
			base_offset: 0,
			encoding: encoding.into(),
			xml_version: None,
			is_external: true,
			is_literal: false,
			is_ge: false,
			may_read_chunks: false,
		}
	}

	/// Create an external entity reading bytes from `reader`.
	///
	/// Without an `encoding`, the first bytes are sniffed. A UTF-8 or
	/// UTF-16 byte order mark is skipped either way.
	///
	/// Until [`ScannedEntity::set_may_read_chunks`] is called, loads are
	/// kept small so that an encoding declaration can still switch the
	/// decoder before much was decoded.
	pub fn from_stream<R: io::Read + 'static>(
			name: &str,
			reader: R,
			encoding: Option<&str>,
			allow_java_encodings: bool,
			buffer_size: usize,
			) -> Result<Self>
	{
		let mut stream = ByteStream::new(reader);
		let (sniffed, bom) = {
			let head = stream.peek(4)?;
			let n = head.len().min(4);
			(sniff::sniff(&head[..n]), sniff::bom_len(head))
		};
		let (encoding, big_endian) = match encoding {
			Some(name) => (name, sniffed.big_endian),
			None => (sniffed.encoding, sniffed.big_endian),
		};
		let kind = ReaderKind::for_encoding(encoding, big_endian, allow_java_encodings)?;
		stream.consume(bom);
		log::debug!("opening entity {:?} as {} ({:?}, {} BOM bytes)", name, encoding, kind, bom);
		let source = EntitySource::Stream(StreamReader::new(stream, kind));
		Ok(Self::with_source(name, source, encoding, buffer_size))
	}

	/// Create an external entity reading already decoded characters.
	pub fn from_chars<R: CharRead + 'static>(name: &str, reader: R, encoding: &str, buffer_size: usize) -> Self {
		let mut entity = Self::with_source(name, EntitySource::Chars(Box::new(reader)), encoding, buffer_size);
		entity.may_read_chunks = true;
		entity
	}

	/// Create an internal entity from its replacement text.
	///
	/// Internal entities are general entities unless changed with
	/// [`ScannedEntity::set_general_entity`].
	pub fn internal<T: Into<String>>(name: &str, text: T, buffer_size: usize) -> Self {
		let mut entity = Self::with_source(
			name,
			EntitySource::Chars(Box::new(StrReader::new(text))),
			sniff::UTF_8,
			buffer_size,
		);
		entity.is_external = false;
		entity.is_ge = true;
		entity.may_read_chunks = true;
		entity
	}

	pub fn set_system_id<T: Into<String>>(&mut self, system_id: T) {
		self.system_id = Some(system_id.into());
	}

	pub fn set_external(&mut self, external: bool) {
		self.is_external = external;
	}

	/// Mark the entity as expanded inside an attribute value literal.
	pub fn set_literal(&mut self, literal: bool) {
		self.is_literal = literal;
	}

	/// Mark the entity as a general entity, subjecting it to the size
	/// limits.
	pub fn set_general_entity(&mut self, ge: bool) {
		self.is_ge = ge;
	}

	/// Allow loads to fill the whole buffer.
	pub fn set_may_read_chunks(&mut self, may: bool) {
		self.may_read_chunks = may;
	}

	/// Record the version from the XML or text declaration.
	pub fn set_xml_version(&mut self, version: &str) {
		self.xml_version = Some(version.into());
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn system_id(&self) -> Option<&str> {
		self.system_id.as_ref().map(|s| s.as_str())
	}

	pub fn encoding(&self) -> &str {
		&self.encoding
	}

	pub fn xml_version(&self) -> Option<&str> {
		self.xml_version.as_ref().map(|s| s.as_str())
	}

	pub fn is_external(&self) -> bool {
		self.is_external
	}

	pub fn is_literal(&self) -> bool {
		self.is_literal
	}

	pub fn is_general_entity(&self) -> bool {
		self.is_ge
	}

	pub fn may_read_chunks(&self) -> bool {
		self.may_read_chunks
	}

	pub fn line_number(&self) -> usize {
		self.line
	}

	pub fn column_number(&self) -> usize {
		self.column
	}

	/// Absolute offset of the cursor within the entity, in chars.
	pub fn character_offset(&self) -> usize {
		self.base_offset + self.position
	}

	/// Current buffer capacity.
	pub fn capacity(&self) -> usize {
		self.ch.len()
	}

	/// Decoder in use, if the entity is read from bytes.
	pub fn reader_kind(&self) -> Option<ReaderKind> {
		match self.source {
			EntitySource::Stream(ref r) => Some(r.kind()),
			EntitySource::Chars(_) => None,
		}
	}

	/// Unread buffered chars.
	pub(crate) fn remaining(&self) -> usize {
		self.count - self.position
	}

	/// Move `ch[start..count]` to the front of the buffer.
	pub(crate) fn compact(&mut self, start: usize) {
		if start == 0 {
			return;
		}
		self.ch.copy_within(start..self.count, 0);
		self.count -= start;
		self.position -= start;
		self.base_offset += start;
	}

	/// Grow the buffer by doubling until it holds at least `needed` chars.
	pub(crate) fn grow_to(&mut self, needed: usize) {
		let old = self.ch.len();
		let new = grown_capacity(old, needed);
		if new != old {
			log::trace!("growing buffer of entity {:?} from {} to {} chars", self.name, old, new);
			self.ch.resize(new, '\0');
		}
	}
}

/// Capacity after doubling `capacity` until it reaches `needed`.
pub fn grown_capacity(capacity: usize, needed: usize) -> usize {
	let mut capacity = capacity.max(1);
	while capacity < needed {
		capacity = capacity.saturating_mul(2);
	}
	capacity
}
