/*!
# Character readers

Entities are read through the [`CharRead`] trait. Byte input is wrapped in a
[`StreamReader`], which owns the [`ByteStream`] and a decoder selected by a
[`ReaderKind`]. Switching the encoding in the middle of an entity replaces
the decoder while keeping the byte stream and its unread bytes.
*/
use std::fmt;
use std::io;

use bytes::{Buf, BytesMut};

use encoding_rs::{DecoderResult, Encoding};

use xescan_validation::{validate_iana_encoding_name, validate_java_encoding_name};

use crate::error::{EncodingError, Error, Result};

/// Number of bytes requested from the underlying reader at once.
const READ_CHUNK: usize = 8192;

/**
# Source of decoded characters

A return value of `Ok(None)` signals the end of the stream. `Ok(Some(0))`
means that nothing could be produced right now; the caller retries.
*/
pub trait CharRead {
	fn read_chars(&mut self, dst: &mut [char]) -> Result<Option<usize>>;
}

impl<T: CharRead + ?Sized> CharRead for Box<T> {
	fn read_chars(&mut self, dst: &mut [char]) -> Result<Option<usize>> {
		(**self).read_chars(dst)
	}
}

/// Buffered byte input shared by successive decoders of one entity.
pub struct ByteStream {
	inner: Box<dyn io::Read>,
	buf: BytesMut,
	eof: bool,
}

impl ByteStream {
	pub fn new<R: io::Read + 'static>(inner: R) -> Self {
		Self{
			inner: Box::new(inner),
			buf: BytesMut::new(),
			eof: false,
		}
	}

	/// Read one chunk from the underlying reader.
	///
	/// Returns false if the reader is exhausted.
	pub fn fill_some(&mut self) -> Result<bool> {
		if self.eof {
			return Ok(false);
		}
		let start = self.buf.len();
		self.buf.resize(start + READ_CHUNK, 0);
		let result = loop {
			match self.inner.read(&mut self.buf[start..]) {
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				other => break other,
			}
		};
		match result {
			Ok(0) => {
				self.buf.truncate(start);
				self.eof = true;
				Ok(false)
			}
			Ok(n) => {
				self.buf.truncate(start + n);
				Ok(true)
			}
			Err(e) => {
				self.buf.truncate(start);
				Err(Error::io(e))
			}
		}
	}

	/// Buffer at least `n` bytes, unless the stream ends first, and return
	/// everything buffered.
	pub fn peek(&mut self, n: usize) -> Result<&[u8]> {
		while self.buf.len() < n {
			if !self.fill_some()? {
				break;
			}
		}
		Ok(&self.buf[..])
	}

	/// Bytes buffered and not yet consumed.
	pub fn bytes(&self) -> &[u8] {
		&self.buf[..]
	}

	/// Drop `n` buffered bytes.
	pub fn consume(&mut self, n: usize) {
		self.buf.advance(n);
	}

	/// True once the underlying reader reported the end and all buffered
	/// bytes were consumed.
	pub fn is_exhausted(&self) -> bool {
		self.eof && self.buf.is_empty()
	}
}

impl fmt::Debug for ByteStream {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("ByteStream")
			.field("buffered", &self.buf.len())
			.field("eof", &self.eof)
			.finish()
	}
}

/// Decoders the scanner knows how to construct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReaderKind {
	Utf8,
	UsAscii,
	/// ISO-8859-1, mapping every byte to the codepoint of the same value.
	Latin1,
	Ucs2{big_endian: bool},
	Ucs4{big_endian: bool},
	/// Anything else, decoded by `encoding_rs`.
	Codec(&'static Encoding),
}

const ASCII_LABELS: &'static [&'static str] = &[
	"US-ASCII", "ASCII", "ANSI_X3.4-1968", "ANSI_X3.4-1986", "ISO646-US",
	"US", "IBM367", "CP367", "CSASCII", "ISO-IR-6",
];

const LATIN1_LABELS: &'static [&'static str] = &[
	"ISO-8859-1", "ISO_8859-1", "LATIN1", "L1", "IBM819", "CP819",
	"CSISOLATIN1", "ISO-IR-100",
];

impl ReaderKind {
	/// Pick the decoder for an encoding name.
	///
	/// The UCS encodings require the byte order to be known. Names which
	/// are not fast-pathed must be valid IANA names (or Java names, if
	/// `allow_java` is set) known to `encoding_rs`.
	pub fn for_encoding(name: &str, big_endian: Option<bool>, allow_java: bool) -> Result<ReaderKind> {
		let upper = name.to_ascii_uppercase();
		match upper.as_str() {
			"UTF-8" => return Ok(ReaderKind::Utf8),
			"ISO-10646-UCS-4" => return match big_endian {
				Some(big_endian) => Ok(ReaderKind::Ucs4{big_endian}),
				None => Err(EncodingError::ByteOrderUnsupported(name.to_string()).into()),
			},
			"ISO-10646-UCS-2" => return match big_endian {
				Some(big_endian) => Ok(ReaderKind::Ucs2{big_endian}),
				None => Err(EncodingError::ByteOrderUnsupported(name.to_string()).into()),
			},
			"UTF-16" => return Ok(ReaderKind::Codec(match big_endian {
				Some(false) => encoding_rs::UTF_16LE,
				_ => encoding_rs::UTF_16BE,
			})),
			_ => (),
		}
		if ASCII_LABELS.contains(&upper.as_str()) {
			return Ok(ReaderKind::UsAscii);
		}
		if LATIN1_LABELS.contains(&upper.as_str()) {
			return Ok(ReaderKind::Latin1);
		}

		let java_alias = if allow_java && validate_java_encoding_name(name).is_ok() {
			Self::for_java_name(&upper)
		} else {
			None
		};
		if validate_iana_encoding_name(name).is_err() {
			return java_alias.ok_or_else(|| EncodingError::DeclInvalid(name.to_string()).into());
		}
		match Encoding::for_label_no_replacement(name.as_bytes()) {
			Some(encoding) if encoding == encoding_rs::UTF_8 => Ok(ReaderKind::Utf8),
			Some(encoding) => Ok(ReaderKind::Codec(encoding)),
			None => java_alias.ok_or_else(|| EncodingError::DeclInvalid(name.to_string()).into()),
		}
	}

	fn for_java_name(upper: &str) -> Option<ReaderKind> {
		match upper {
			"UTF8" => Some(ReaderKind::Utf8),
			"ASCII" => Some(ReaderKind::UsAscii),
			"ISO8859_1" => Some(ReaderKind::Latin1),
			"CP1252" => Some(ReaderKind::Codec(encoding_rs::WINDOWS_1252)),
			"UNICODEBIGUNMARKED" => Some(ReaderKind::Codec(encoding_rs::UTF_16BE)),
			"UNICODELITTLEUNMARKED" => Some(ReaderKind::Codec(encoding_rs::UTF_16LE)),
			_ => None,
		}
	}

	fn decoder(self) -> Decoder {
		match self {
			Self::Utf8 => Decoder::Utf8,
			Self::UsAscii => Decoder::UsAscii,
			Self::Latin1 => Decoder::Latin1,
			Self::Ucs2{big_endian} => Decoder::Ucs2(big_endian),
			Self::Ucs4{big_endian} => Decoder::Ucs4(big_endian),
			Self::Codec(encoding) => Decoder::Codec(CodecState::new(encoding)),
		}
	}
}

struct CodecState {
	encoding: &'static Encoding,
	decoder: encoding_rs::Decoder,
	decoded: String,
	cursor: usize,
	finished: bool,
	failed: bool,
}

impl CodecState {
	fn new(encoding: &'static Encoding) -> Self {
		Self{
			encoding,
			decoder: encoding.new_decoder_without_bom_handling(),
			decoded: String::new(),
			cursor: 0,
			finished: false,
			failed: false,
		}
	}

	fn drain(&mut self, dst: &mut [char]) -> usize {
		let mut written = 0;
		for ch in self.decoded[self.cursor..].chars() {
			if written == dst.len() {
				break;
			}
			dst[written] = ch;
			written += 1;
			self.cursor += ch.len_utf8();
		}
		written
	}

	fn read(&mut self, stream: &mut ByteStream, dst: &mut [char]) -> Result<Option<usize>> {
		loop {
			let written = self.drain(dst);
			if written > 0 {
				return Ok(Some(written));
			}
			if self.failed {
				return Err(Error::MalformedInput(self.encoding.name()));
			}
			if self.finished {
				return Ok(None);
			}
			if stream.bytes().is_empty() {
				stream.fill_some()?;
			}
			let last = stream.is_exhausted();
			self.decoded.clear();
			self.cursor = 0;
			let (result, nread) = {
				let src = stream.bytes();
				let needed = self.decoder
					.max_utf8_buffer_length_without_replacement(src.len())
					.unwrap_or(READ_CHUNK);
				self.decoded.reserve(needed.max(4));
				self.decoder.decode_to_string_without_replacement(src, &mut self.decoded, last)
			};
			stream.consume(nread);
			match result {
				DecoderResult::InputEmpty => if last {
					self.finished = true;
				},
				DecoderResult::OutputFull => (),
				DecoderResult::Malformed(_, _) => self.failed = true,
			}
		}
	}
}

enum Decoder {
	Utf8,
	UsAscii,
	Latin1,
	Ucs2(bool),
	Ucs4(bool),
	Codec(CodecState),
}

/// Decode UTF-8 from `stream` into `dst`.
///
/// Good chars before a bad sequence are returned first; the error surfaces
/// on the following call.
fn read_utf8(stream: &mut ByteStream, dst: &mut [char]) -> Result<Option<usize>> {
	loop {
		let bytes = stream.bytes();
		let mut i = 0;
		let mut written = 0;
		let mut err = None;
		while written < dst.len() && i < bytes.len() {
			let b0 = bytes[i];
			let (need, init) = match b0 {
				0x00..=0x7f => {
					dst[written] = b0 as char;
					written += 1;
					i += 1;
					continue;
				}
				0xc2..=0xdf => (2, (b0 & 0x1f) as u32),
				0xe0..=0xef => (3, (b0 & 0x0f) as u32),
				0xf0..=0xf4 => (4, (b0 & 0x07) as u32),
				_ => {
					err = Some(Error::InvalidUtf8Byte(b0));
					break;
				}
			};
			if i + need > bytes.len() {
				// incomplete sequence at the end of the buffer
				break;
			}
			let mut cp = init;
			for b in &bytes[i + 1..i + need] {
				if b & 0xc0 != 0x80 {
					err = Some(Error::InvalidUtf8Byte(*b));
					break;
				}
				cp = (cp << 6) | (b & 0x3f) as u32;
			}
			if err.is_some() {
				break;
			}
			let overlong = (need == 3 && cp < 0x800) || (need == 4 && cp < 0x10000);
			match std::char::from_u32(cp) {
				Some(ch) if !overlong => {
					dst[written] = ch;
					written += 1;
					i += need;
				}
				_ => {
					err = Some(Error::InvalidChar(cp));
					break;
				}
			}
		}
		let pending = bytes.len() - i;
		let first_pending = bytes.get(i).copied();
		stream.consume(i);
		if written > 0 {
			return Ok(Some(written));
		}
		if let Some(err) = err {
			return Err(err);
		}
		if !stream.fill_some()? {
			return match first_pending {
				// truncated sequence at the end of the stream
				Some(b) if pending > 0 => Err(Error::InvalidUtf8Byte(b)),
				_ => Ok(None),
			};
		}
	}
}

/// Decode a fixed-width encoding from `stream` into `dst`.
fn read_fixed<F: Fn(&[u8]) -> Result<char>>(
		stream: &mut ByteStream,
		dst: &mut [char],
		name: &'static str,
		width: usize,
		decode: F,
		) -> Result<Option<usize>>
{
	loop {
		let bytes = stream.bytes();
		let mut written = 0;
		let mut err = None;
		for unit in bytes.chunks_exact(width).take(dst.len()) {
			match decode(unit) {
				Ok(ch) => {
					dst[written] = ch;
					written += 1;
				}
				Err(e) => {
					err = Some(e);
					break;
				}
			}
		}
		let pending = bytes.len() - written * width;
		stream.consume(written * width);
		if written > 0 {
			return Ok(Some(written));
		}
		if let Some(err) = err {
			return Err(err);
		}
		if !stream.fill_some()? {
			return if pending > 0 {
				Err(Error::MalformedInput(name))
			} else {
				Ok(None)
			};
		}
	}
}

fn ucs_char(cp: u32) -> Result<char> {
	std::char::from_u32(cp).ok_or(Error::InvalidChar(cp))
}

/// Character reader on top of a byte stream.
pub struct StreamReader {
	stream: ByteStream,
	kind: ReaderKind,
	decoder: Decoder,
	carry: Vec<char>,
}

impl StreamReader {
	pub fn new(stream: ByteStream, kind: ReaderKind) -> Self {
		Self{
			stream,
			kind,
			decoder: kind.decoder(),
			carry: Vec::new(),
		}
	}

	/// Decoder currently in use.
	pub fn kind(&self) -> ReaderKind {
		self.kind
	}

	/// Replace the decoder.
	///
	/// Decoding continues with the first byte not yet consumed by the
	/// previous decoder.
	pub fn switch(&mut self, kind: ReaderKind) {
		if let Decoder::Codec(ref state) = self.decoder {
			// already decoded, must not be decoded again
			let tail: Vec<char> = state.decoded[state.cursor..].chars().collect();
			self.carry.extend(tail);
		}
		log::debug!("switching decoder from {:?} to {:?}", self.kind, kind);
		self.kind = kind;
		self.decoder = kind.decoder();
	}
}

impl CharRead for StreamReader {
	fn read_chars(&mut self, dst: &mut [char]) -> Result<Option<usize>> {
		if dst.is_empty() {
			return Ok(Some(0));
		}
		if !self.carry.is_empty() {
			let n = self.carry.len().min(dst.len());
			dst[..n].copy_from_slice(&self.carry[..n]);
			self.carry.drain(..n);
			return Ok(Some(n));
		}
		let stream = &mut self.stream;
		match self.decoder {
			Decoder::Utf8 => read_utf8(stream, dst),
			Decoder::UsAscii => read_fixed(stream, dst, "US-ASCII", 1, |b| {
				if b[0] < 0x80 {
					Ok(b[0] as char)
				} else {
					Err(Error::InvalidAsciiByte(b[0]))
				}
			}),
			Decoder::Latin1 => read_fixed(stream, dst, "ISO-8859-1", 1, |b| Ok(b[0] as char)),
			Decoder::Ucs2(true) => read_fixed(stream, dst, "ISO-10646-UCS-2", 2, |b| {
				ucs_char(u16::from_be_bytes([b[0], b[1]]) as u32)
			}),
			Decoder::Ucs2(false) => read_fixed(stream, dst, "ISO-10646-UCS-2", 2, |b| {
				ucs_char(u16::from_le_bytes([b[0], b[1]]) as u32)
			}),
			Decoder::Ucs4(true) => read_fixed(stream, dst, "ISO-10646-UCS-4", 4, |b| {
				ucs_char(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
			}),
			Decoder::Ucs4(false) => read_fixed(stream, dst, "ISO-10646-UCS-4", 4, |b| {
				ucs_char(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
			}),
			Decoder::Codec(ref mut state) => state.read(stream, dst),
		}
	}
}

impl fmt::Debug for StreamReader {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("StreamReader")
			.field("stream", &self.stream)
			.field("kind", &self.kind)
			.finish()
	}
}

/// Character reader over text which is already decoded.
#[derive(Debug, Clone)]
pub struct StrReader {
	text: String,
	offset: usize,
}

impl StrReader {
	pub fn new<T: Into<String>>(text: T) -> Self {
		Self{
			text: text.into(),
			offset: 0,
		}
	}
}

impl CharRead for StrReader {
	fn read_chars(&mut self, dst: &mut [char]) -> Result<Option<usize>> {
		if self.offset >= self.text.len() {
			return Ok(None);
		}
		let mut written = 0;
		for ch in self.text[self.offset..].chars() {
			if written == dst.len() {
				break;
			}
			dst[written] = ch;
			written += 1;
			self.offset += ch.len_utf8();
		}
		Ok(Some(written))
	}
}
