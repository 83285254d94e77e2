/*!
# Scanned text

[`TextSpan`] is a borrowed view into the buffer of the current entity, as
returned by [`EntityScanner::scan_content`](crate::EntityScanner::scan_content)
and [`EntityScanner::scan_literal`](crate::EntityScanner::scan_literal).
[`StringBuffer`] collects text across calls, as done by
[`EntityScanner::scan_data`](crate::EntityScanner::scan_data).
*/
use std::fmt;

use smartstring::alias::String as SmartString;

/// Chars scanned from the entity buffer.
///
/// Line ends inside the span are already normalized to `\n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSpan<'a> {
	chars: &'a [char],
	offset: usize,
	next: Option<char>,
}

impl<'a> TextSpan<'a> {
	pub(crate) fn new(chars: &'a [char], offset: usize, next: Option<char>) -> Self {
		Self{chars, offset, next}
	}

	/// The scanned chars.
	pub fn as_chars(&self) -> &'a [char] {
		self.chars
	}

	/// Buffer offset of the first char.
	///
	/// Whitespace positions recorded during literal scanning are relative
	/// to the same buffer.
	pub fn offset(&self) -> usize {
		self.offset
	}

	/// Char following the span, if it is known without further reading.
	///
	/// In external entities a raw `\r` is reported as `\n`.
	pub fn next_char(&self) -> Option<char> {
		self.next
	}

	pub fn len(&self) -> usize {
		self.chars.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chars.is_empty()
	}
}

impl fmt::Display for TextSpan<'_> {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		for ch in self.chars {
			fmt::Write::write_char(f, *ch)?;
		}
		Ok(())
	}
}

impl PartialEq<str> for TextSpan<'_> {
	fn eq(&self, other: &str) -> bool {
		self.chars.iter().copied().eq(other.chars())
	}
}

impl PartialEq<&str> for TextSpan<'_> {
	fn eq(&self, other: &&str) -> bool {
		*self == **other
	}
}

/// Growable text sink which keeps track of its length in chars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringBuffer {
	text: SmartString,
	nchars: usize,
}

impl StringBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append chars from an entity buffer.
	pub fn append(&mut self, chars: &[char]) {
		self.text.extend(chars.iter().copied());
		self.nchars += chars.len();
	}

	/// Append a span.
	pub fn append_span(&mut self, span: &TextSpan<'_>) {
		self.append(span.as_chars());
	}

	/// Length in chars.
	pub fn len(&self) -> usize {
		self.nchars
	}

	pub fn is_empty(&self) -> bool {
		self.nchars == 0
	}

	pub fn as_str(&self) -> &str {
		self.text.as_str()
	}

	pub fn clear(&mut self) {
		self.text.clear();
		self.nchars = 0;
	}
}

impl fmt::Display for StringBuffer {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.text)
	}
}

impl From<StringBuffer> for String {
	fn from(other: StringBuffer) -> String {
		other.text.into()
	}
}
