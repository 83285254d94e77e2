/*!
# Entity scanner

[`EntityScanner`] reads characters from a stack of entities and offers the
scanning primitives an XML parser is built from. The current entity is the
top of the stack; when it is exhausted, scanning continues in its parent.

All primitives operate on the buffer of the current entity. Line ends are
normalized in place as they are scanned, position counters are kept up to
date and every span consumed from a general entity is accounted against the
configured [`SecurityLimits`].

Fatal errors are sticky: they are reported to the [`ErrorReporter`] once
and then returned from every further call until [`EntityScanner::reset`].
*/
use std::fmt;
use std::io;

use xescan_validation::selectors::{
	is_content, is_xml11_content, is_xml11_internal_content, LS, NEL,
};

use crate::entity::{EntitySource, ScannedEntity};
use crate::error::{EncodingError, Error, Result};
use crate::limits::{LimitAnalyzer, SecurityLimits, SecurityManager};
use crate::options::{ScannerOptions, XMLVersion};
use crate::reader::{CharRead, ReaderKind};
use crate::reporter::{ErrorReporter, LogReporter};
use crate::strings::TextSpan;
use crate::symbols::{Context, Symbol, SymbolTable};

mod accounting;
mod buffer;
mod names;
mod newline;
mod text;

pub use names::QName;

/// What a scanned name or char is going to be used for.
///
/// This decides which limits the scanned span counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameType {
	ElementStart,
	ElementEnd,
	AttributeName,
	AttributeValue,
	Comment,
	ProcessingInstruction,
	/// Names of entity and character references; these do not count
	/// towards the entity size limits.
	Reference,
}

/// Observer of buffer refills.
///
/// `load_pos` is the buffer offset at which new data is going to be
/// placed; anything a listener remembers about the buffer content may be
/// invalid after the call. Closures taking a `usize` implement this trait.
pub trait BufferListener {
	fn refresh(&mut self, load_pos: usize);
}

impl<F: FnMut(usize)> BufferListener for F {
	fn refresh(&mut self, load_pos: usize) {
		self(load_pos)
	}
}

/// Handle for removing a registered [`BufferListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Receives notifications when entities are pushed or popped.
pub trait EntityHandler {
	fn start_entity(&mut self, _entity: &ScannedEntity) {}

	fn end_entity(&mut self, _entity: &ScannedEntity) {}
}

/**
# Streaming scanner over a stack of entities

```
use xescan::{EntityScanner, NameType};
let mut scanner = EntityScanner::new();
scanner.push_stream_entity("doc", &b"<root>hello</root>"[..], None).unwrap();
assert!(scanner.skip_char('<', Some(NameType::ElementStart)).unwrap());
let name = scanner.scan_name(NameType::ElementStart).unwrap().unwrap();
assert_eq!(&*name, "root");
assert!(scanner.skip_char('>', None).unwrap());
assert_eq!(scanner.scan_content().unwrap(), "hello");
```
*/
pub struct EntityScanner {
	opts: ScannerOptions,
	entities: Vec<ScannedEntity>,
	symbols: Box<dyn SymbolTable>,
	reporter: Box<dyn ErrorReporter>,
	security: Box<dyn SecurityLimits>,
	analyzer: LimitAnalyzer,
	handler: Option<Box<dyn EntityHandler>>,
	listeners: Vec<(ListenerId, Box<dyn BufferListener>)>,
	next_listener: u64,
	whitespace: Vec<usize>,
	detecting_version: bool,
	err: Option<Error>,
}

impl EntityScanner {
	/// Create a scanner with default options and collaborators.
	pub fn new() -> Self {
		Self::with_options(ScannerOptions::default())
	}

	/// Create a scanner with the given options and default collaborators.
	pub fn with_options(opts: ScannerOptions) -> Self {
		Self{
			opts,
			entities: Vec::new(),
			symbols: Box::new(Context::new()),
			reporter: Box::new(LogReporter),
			security: Box::new(SecurityManager::new()),
			analyzer: LimitAnalyzer::new(),
			handler: None,
			listeners: Vec::new(),
			next_listener: 0,
			whitespace: Vec::new(),
			detecting_version: false,
			err: None,
		}
	}

	pub fn options(&self) -> &ScannerOptions {
		&self.opts
	}

	/// Replace the symbol table names are interned in.
	pub fn set_symbol_table<T: SymbolTable + 'static>(&mut self, symbols: T) {
		self.symbols = Box::new(symbols);
	}

	pub fn set_error_reporter<T: ErrorReporter + 'static>(&mut self, reporter: T) {
		self.reporter = Box::new(reporter);
	}

	pub fn set_security_limits<T: SecurityLimits + 'static>(&mut self, limits: T) {
		self.security = Box::new(limits);
	}

	pub fn set_entity_handler<T: EntityHandler + 'static>(&mut self, handler: T) {
		self.handler = Some(Box::new(handler));
	}

	/// Select the line end and character rules.
	///
	/// Parsers call this after reading the version from the XML
	/// declaration.
	pub fn set_xml_version(&mut self, version: XMLVersion) {
		self.opts.xml_version = version;
	}

	pub fn xml_version(&self) -> XMLVersion {
		self.opts.xml_version
	}

	/// While set, scanned chars and strings are not accounted against the
	/// limits.
	///
	/// This is used while the XML declaration is read, before it is known
	/// which rules apply.
	pub fn set_detecting_version(&mut self, detecting: bool) {
		self.detecting_version = detecting;
	}

	/// Running values of the limits.
	pub fn limit_analyzer(&self) -> &LimitAnalyzer {
		&self.analyzer
	}

	/// Register a listener for buffer refills.
	pub fn register_listener<T: BufferListener + 'static>(&mut self, listener: T) -> ListenerId {
		let id = ListenerId(self.next_listener);
		self.next_listener += 1;
		self.listeners.push((id, Box::new(listener)));
		id
	}

	/// Remove a listener. Returns false if it was not registered.
	pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
		let before = self.listeners.len();
		self.listeners.retain(|(other, _)| *other != id);
		self.listeners.len() != before
	}

	/// Buffer offsets of the whitespace chars seen by the last
	/// [`EntityScanner::scan_literal`] call.
	///
	/// Only newline and tab positions are recorded; these are the ones an
	/// attribute value normalizer has to replace.
	pub fn whitespace_positions(&self) -> &[usize] {
		&self.whitespace
	}

	/// Push an entity, making it the current one.
	pub fn start_entity(&mut self, entity: ScannedEntity) {
		log::debug!(
			"starting entity {:?} (external: {}, depth: {})",
			entity.name(),
			entity.is_external(),
			self.entities.len() + 1,
		);
		if let Some(handler) = self.handler.as_mut() {
			handler.start_entity(&entity);
		}
		self.entities.push(entity);
	}

	/// Push an external entity read from `reader`, using the configured
	/// buffer size.
	pub fn push_stream_entity<R: io::Read + 'static>(&mut self, name: &str, reader: R, encoding: Option<&str>) -> Result<()> {
		self.check_err()?;
		let result = ScannedEntity::from_stream(
			name,
			reader,
			encoding,
			self.opts.allow_java_encodings,
			self.opts.buffer_size,
		);
		let entity = self.record(result)?;
		self.start_entity(entity);
		Ok(())
	}

	/// Push an external entity read from already decoded chars.
	pub fn push_char_entity<R: CharRead + 'static>(&mut self, name: &str, reader: R) {
		let entity = ScannedEntity::from_chars(name, reader, "UTF-16", self.opts.buffer_size);
		self.start_entity(entity);
	}

	/// Push an internal general entity with the given replacement text.
	pub fn push_internal_entity<T: Into<String>>(&mut self, name: &str, text: T) {
		let mut entity = ScannedEntity::internal(name, text, self.opts.internal_buffer_size);
		if let Some(parent) = self.entities.last() {
			entity.set_literal(parent.is_literal);
		}
		self.start_entity(entity);
	}

	/// Pop the current entity, regardless of whether it was exhausted.
	pub fn end_entity(&mut self) -> Option<ScannedEntity> {
		let entity = self.entities.pop()?;
		log::debug!("ending entity {:?} (depth: {})", entity.name(), self.entities.len());
		if entity.is_ge {
			self.analyzer.end_entity(&entity.name);
		}
		if let Some(handler) = self.handler.as_mut() {
			handler.end_entity(&entity);
		}
		Some(entity)
	}

	fn set_encoding_raw(&mut self, name: &str) -> Result<()> {
		let allow_java = self.opts.allow_java_encodings;
		let (current, current_kind) = {
			let e = self.current()?;
			let kind = match e.source {
				EntitySource::Stream(ref r) => r.kind(),
				EntitySource::Chars(_) => {
					log::debug!("ignoring encoding {:?} for entity {:?} read from chars", name, e.name);
					return Ok(());
				}
			};
			(e.encoding.clone(), kind)
		};
		if current.eq_ignore_ascii_case(name) {
			return Ok(());
		}

		let upper = name.to_ascii_uppercase();
		let kind = if current.to_ascii_uppercase().starts_with("UTF-16") {
			// the byte order was sniffed; only the UCS variants can override
			let big_endian = current_kind == ReaderKind::Codec(encoding_rs::UTF_16BE);
			match upper.as_str() {
				"UTF-16" => Ok(current_kind),
				"ISO-10646-UCS-4" => Ok(ReaderKind::Ucs4{big_endian}),
				"ISO-10646-UCS-2" => Ok(ReaderKind::Ucs2{big_endian}),
				_ => ReaderKind::for_encoding(name, Some(big_endian), allow_java),
			}
		} else {
			let big_endian = match current_kind {
				ReaderKind::Ucs2{big_endian} | ReaderKind::Ucs4{big_endian} => Some(big_endian),
				_ => None,
			};
			ReaderKind::for_encoding(name, big_endian, allow_java)
		};

		let (kind, declared) = match kind {
			Ok(kind) => (kind, name),
			Err(err @ Error::Encoding(EncodingError::DeclInvalid(_))) if self.opts.encoding_recovery => {
				self.report(&err);
				log::warn!("{}; continuing as ISO-8859-1", err);
				(ReaderKind::Latin1, "ISO-8859-1")
			}
			Err(err) => return Err(err),
		};
		let e = self.current_mut()?;
		if let EntitySource::Stream(ref mut r) = e.source {
			if r.kind() != kind {
				r.switch(kind);
			}
		}
		e.encoding = declared.into();
		Ok(())
	}

	/**
	Apply an encoding declaration to the current entity.

	Entities read from chars ignore this. For byte input the decoder is
	replaced and continues with the first byte it has not consumed;
	chars already in the buffer keep their decoding, which is why loads
	are kept small until [`ScannedEntity::set_may_read_chunks`] is
	called. If the entity was sniffed as UTF-16, only the UCS encodings
	change the decoder; the sniffed byte order is kept.

	An unknown encoding is fatal unless
	[`ScannerOptions::encoding_recovery`] is set, in which case it is
	reported and decoding continues as ISO-8859-1.
	*/
	pub fn set_encoding(&mut self, name: &str) -> Result<()> {
		self.check_err()?;
		let r = self.set_encoding_raw(name);
		self.record(r)
	}

	/// Drop all entities, accumulated limit values and the sticky error.
	///
	/// Collaborators and listeners stay registered.
	pub fn reset(&mut self) {
		self.entities.clear();
		self.analyzer.reset();
		self.whitespace.clear();
		self.detecting_version = false;
		self.err = None;
	}

	/// The current entity, if any.
	pub fn current_entity(&self) -> Option<&ScannedEntity> {
		self.entities.last()
	}

	/// Mutable access to the current entity, for setting flags learnt from
	/// declarations.
	pub fn current_entity_mut(&mut self) -> Option<&mut ScannedEntity> {
		self.entities.last_mut()
	}

	/// Number of entities on the stack.
	pub fn entity_depth(&self) -> usize {
		self.entities.len()
	}

	/// Line of the cursor in the current entity, or 0 without entity.
	pub fn line_number(&self) -> usize {
		self.entities.last().map(|e| e.line).unwrap_or(0)
	}

	/// Column of the cursor in the current entity, or 0 without entity.
	pub fn column_number(&self) -> usize {
		self.entities.last().map(|e| e.column).unwrap_or(0)
	}

	/// Offset of the cursor in chars, or 0 without entity.
	pub fn character_offset(&self) -> usize {
		self.entities.last().map(|e| e.character_offset()).unwrap_or(0)
	}

	pub fn encoding(&self) -> Option<&str> {
		self.entities.last().map(|e| e.encoding())
	}

	/// Version declared by the current entity, if any.
	pub fn declared_version(&self) -> Option<&str> {
		self.entities.last().and_then(|e| e.xml_version())
	}

	pub fn is_external(&self) -> bool {
		self.entities.last().map(|e| e.is_external).unwrap_or(false)
	}

	pub fn entity_name(&self) -> Option<&str> {
		self.entities.last().map(|e| e.name())
	}

	/// System identifier of the innermost entity which has one.
	pub fn system_id(&self) -> Option<&str> {
		self.entities.iter().rev().filter_map(|e| e.system_id()).next()
	}

	/// The error which stopped the scanner, if any.
	pub fn error(&self) -> Option<&Error> {
		self.err.as_ref()
	}

	fn check_err(&self) -> Result<()> {
		match self.err {
			Some(ref e) => Err(e.clone()),
			None => Ok(()),
		}
	}

	/// Make fatal errors sticky and report them.
	fn record<T>(&mut self, r: Result<T>) -> Result<T> {
		if let Err(ref e) = r {
			if e.is_fatal() && self.err.is_none() {
				self.report(e);
				self.err = Some(e.clone());
			}
		}
		r
	}

	fn report(&mut self, e: &Error) {
		self.reporter.report_fatal(e.domain(), e.key(), &e.args());
	}

	fn current(&self) -> Result<&ScannedEntity> {
		self.entities.last().ok_or(Error::EndOfDocument)
	}

	fn current_mut(&mut self) -> Result<&mut ScannedEntity> {
		self.entities.last_mut().ok_or(Error::EndOfDocument)
	}

	fn is_v11(&self) -> bool {
		self.opts.xml_version == XMLVersion::V1_1
	}

	fn span(&self, start: usize, end: usize, next: Option<char>) -> TextSpan<'_> {
		match self.entities.last() {
			Some(e) => TextSpan::new(&e.ch[start..end], start, next),
			None => TextSpan::new(&[], 0, None),
		}
	}

	fn intern(&self, start: usize, end: usize) -> Result<Symbol> {
		let e = self.current()?;
		Ok(self.symbols.add_symbol(&e.ch[start..end]))
	}
}

impl Default for EntityScanner {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for EntityScanner {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("EntityScanner")
			.field("opts", &self.opts)
			.field("entities", &self.entities)
			.field("analyzer", &self.analyzer)
			.field("err", &self.err)
			.finish()
	}
}

#[inline]
fn is_line_end(c: char, external: bool, v11: bool) -> bool {
	c == '\n' || (external && (c == '\r' || (v11 && (c == NEL || c == LS))))
}

/// `c` as seen by callers peeking ahead: line ends of external entities
/// read as `\n`.
#[inline]
fn logical_char(c: char, external: bool, v11: bool) -> char {
	if c != '\n' && is_line_end(c, external, v11) {
		'\n'
	} else {
		c
	}
}

#[inline]
fn is_content_char(c: char, external: bool, v11: bool) -> bool {
	match (v11, external) {
		(false, _) => is_content(c),
		(true, true) => is_xml11_content(c),
		(true, false) => is_xml11_internal_content(c),
	}
}

#[inline]
fn is_space_char(c: char, external: bool, v11: bool) -> bool {
	c == ' ' || c == '\t' || c == '\r' || is_line_end(c, external, v11)
}
