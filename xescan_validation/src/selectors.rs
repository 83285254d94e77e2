/*!
# Constants and Utilities for matching ranges of codepoints

The contents of this module are implementation details of `xescan` and
`xescan_validation` and should not be relied upon.
*/
use std::fmt;


/**
# Predicate trait for matching chars
*/
pub trait CharSelector {
	/// Return true if the given char is selected by the selector
	fn select(&self, c: char) -> bool;
}

// start to end (incl., because some of our edge points are not valid chars
// in rust)
/// Selects all chars from a range (including both ends)
pub struct CodepointRange(pub char, pub char);


/// Valid codepoints for character data (XML 1.0 § 2.2)
pub const VALID_XML_CDATA_RANGES: &'static [CodepointRange] = &[
	CodepointRange('\x09', '\x0a'),
	CodepointRange('\x0d', '\x0d'),
	CodepointRange('\u{0020}', '\u{d7ff}'),
	CodepointRange('\u{e000}', '\u{fffd}'),
	CodepointRange('\u{10000}', '\u{10ffff}'),
];


/// Invalid codepoints for character data (XML 1.0 § 2.2)
///
/// Note that values which are not valid Rust characters are not included in
/// these ranges.
pub const INVALID_XML_CDATA_RANGES: &'static [CodepointRange] = &[
	CodepointRange('\x00', '\x08'),
	CodepointRange('\x0b', '\x0c'),
	CodepointRange('\x0e', '\x1f'),
	CodepointRange('\u{fffe}', '\u{ffff}'),
];


/// Invalid codepoints for character data (XML 1.1 § 2.2)
///
/// XML 1.1 admits the C0 controls, so only NUL and the two
/// non-characters at the end of the BMP remain.
pub const INVALID_XML11_CDATA_RANGES: &'static [CodepointRange] = &[
	CodepointRange('\x00', '\x00'),
	CodepointRange('\u{fffe}', '\u{ffff}'),
];


/// Restricted codepoints (XML 1.1 § 2.2 \[2a\])
///
/// These may only appear as character references.
pub const RESTRICTED_XML11_RANGES: &'static [CodepointRange] = &[
	CodepointRange('\x01', '\x08'),
	CodepointRange('\x0b', '\x0c'),
	CodepointRange('\x0e', '\x1f'),
	CodepointRange('\x7f', '\u{84}'),
	CodepointRange('\u{86}', '\u{9f}'),
];


const VALID_XML_NAME_START_RANGES: &'static [CodepointRange] = &[
	CodepointRange(':', ':'),
	CodepointRange('A', 'Z'),
	CodepointRange('_', '_'),
	CodepointRange('a', 'z'),
	CodepointRange('\u{c0}', '\u{d6}'),
	CodepointRange('\u{d8}', '\u{f6}'),
	CodepointRange('\u{f8}', '\u{2ff}'),
	CodepointRange('\u{370}', '\u{37d}'),
	CodepointRange('\u{37f}', '\u{1fff}'),
	CodepointRange('\u{200c}', '\u{200d}'),
	CodepointRange('\u{2070}', '\u{218f}'),
	CodepointRange('\u{2c00}', '\u{2fef}'),
	CodepointRange('\u{3001}', '\u{d7ff}'),
	CodepointRange('\u{f900}', '\u{fdcf}'),
	CodepointRange('\u{fdf0}', '\u{fffd}'),
	CodepointRange('\u{10000}', '\u{effff}'),
];


const VALID_XML_NAME_RANGES: &'static [CodepointRange] = &[
	CodepointRange(':', ':'),
	CodepointRange('-', '-'),
	CodepointRange('.', '.'),
	CodepointRange('A', 'Z'),
	CodepointRange('_', '_'),
	CodepointRange('0', '9'),
	CodepointRange('a', 'z'),
	CodepointRange('\u{b7}', '\u{b7}'),
	CodepointRange('\u{c0}', '\u{d6}'),
	CodepointRange('\u{d8}', '\u{f6}'),
	CodepointRange('\u{f8}', '\u{2ff}'),
	CodepointRange('\u{300}', '\u{36f}'),
	CodepointRange('\u{370}', '\u{37d}'),
	CodepointRange('\u{37f}', '\u{1fff}'),
	CodepointRange('\u{200c}', '\u{200d}'),
	CodepointRange('\u{203f}', '\u{2040}'),
	CodepointRange('\u{2070}', '\u{218f}'),
	CodepointRange('\u{2c00}', '\u{2fef}'),
	CodepointRange('\u{3001}', '\u{d7ff}'),
	CodepointRange('\u{f900}', '\u{fdcf}'),
	CodepointRange('\u{fdf0}', '\u{fffd}'),
	CodepointRange('\u{10000}', '\u{effff}'),
];

impl CodepointRange {
	pub fn contains(&self, c: char) -> bool {
		return (self.0 <= c) && (c <= self.1)
	}
}

/// Selects all chars from any of the contained ranges
#[derive(Copy)]
pub struct CodepointRanges(pub &'static [CodepointRange]);

/// Valid non-first characters for an XML Name (XML 1.0 § 2.3 \[4a\])
pub static CLASS_XML_NAME: CodepointRanges = CodepointRanges(VALID_XML_NAME_RANGES);

/// Valid first characters for an XML Name (XML 1.0 § 2.3 \[4\])
pub static CLASS_XML_NAMESTART: CodepointRanges = CodepointRanges(VALID_XML_NAME_START_RANGES);

/// See [`INVALID_XML_CDATA_RANGES`]
pub static CLASS_XML_NONCHAR: CodepointRanges = CodepointRanges(INVALID_XML_CDATA_RANGES);

/// See [`INVALID_XML11_CDATA_RANGES`]
pub static CLASS_XML11_NONCHAR: CodepointRanges = CodepointRanges(INVALID_XML11_CDATA_RANGES);

/// See [`RESTRICTED_XML11_RANGES`]
pub static CLASS_XML11_RESTRICTED: CodepointRanges = CodepointRanges(RESTRICTED_XML11_RANGES);

impl CharSelector for CodepointRange {
	fn select(&self, c: char) -> bool {
		self.contains(c)
	}
}

impl CharSelector for CodepointRanges {
	fn select(&self, c: char) -> bool {
		contained_in_ranges(c, self.0)
	}
}

pub fn contained_in_ranges(c: char, rs: &[CodepointRange]) -> bool {
	for r in rs.iter() {
		if r.contains(c) {
			return true;
		}
	}
	false
}

impl fmt::Debug for CodepointRanges {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "CodepointRanges(<{} ranges>)", self.0.len())
	}
}

impl Clone for CodepointRanges {
	fn clone(&self) -> Self {
		CodepointRanges(self.0)
	}
}

impl PartialEq for CodepointRanges {
	fn eq(&self, other: &CodepointRanges) -> bool {
		std::ptr::eq(&self.0, &other.0)
	}
}

/// Next line (XML 1.1 line end)
pub const NEL: char = '\u{85}';

/// Line separator (XML 1.1 line end)
pub const LS: char = '\u{2028}';

const ASCII_NAME_START: u8 = 0x01;
const ASCII_NAME: u8 = 0x02;
const ASCII_CONTENT: u8 = 0x04;
const ASCII_SPACE: u8 = 0x08;
const ASCII_INVALID: u8 = 0x10;
const ASCII_RESTRICTED11: u8 = 0x20;

const fn ascii_class(b: u8) -> u8 {
	let mut flags = 0u8;
	let name_start = (b >= b'A' && b <= b'Z') || (b >= b'a' && b <= b'z') || b == b'_' || b == b':';
	if name_start {
		flags |= ASCII_NAME_START | ASCII_NAME;
	}
	if (b >= b'0' && b <= b'9') || b == b'-' || b == b'.' {
		flags |= ASCII_NAME;
	}
	match b {
		b' ' | b'\t' | b'\n' | b'\r' => flags |= ASCII_SPACE,
		_ => (),
	}
	if b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r' {
		flags |= ASCII_INVALID;
		if b != 0 {
			flags |= ASCII_RESTRICTED11;
		}
	} else if b == 0x7f {
		flags |= ASCII_RESTRICTED11 | ASCII_CONTENT;
	} else if b != b'<' && b != b'&' && b != b']' && b != b'\n' && b != b'\r' {
		flags |= ASCII_CONTENT;
	}
	flags
}

const fn build_ascii_table() -> [u8; 128] {
	let mut table = [0u8; 128];
	let mut i = 0;
	while i < 128 {
		table[i] = ascii_class(i as u8);
		i += 1;
	}
	table
}

/// Per-byte classification of the ASCII range.
///
/// Used as a fast path before falling back to the range tables.
static ASCII_CLASSES: [u8; 128] = build_ascii_table();

#[inline(always)]
fn ascii_flag(c: char, flag: u8) -> Option<bool> {
	let cp = c as u32;
	if cp < 0x80 {
		Some(ASCII_CLASSES[cp as usize] & flag != 0)
	} else {
		None
	}
}

/// True if `c` may start an XML Name.
#[inline]
pub fn is_name_start(c: char) -> bool {
	ascii_flag(c, ASCII_NAME_START).unwrap_or_else(|| CLASS_XML_NAMESTART.select(c))
}

/// True if `c` may appear in an XML Name or Nmtoken.
#[inline]
pub fn is_name(c: char) -> bool {
	ascii_flag(c, ASCII_NAME).unwrap_or_else(|| CLASS_XML_NAME.select(c))
}

/// True if `c` may start a colon-free XML Name.
#[inline]
pub fn is_ncname_start(c: char) -> bool {
	c != ':' && is_name_start(c)
}

/// True for the four XML 1.0 whitespace chars.
#[inline]
pub fn is_space(c: char) -> bool {
	ascii_flag(c, ASCII_SPACE).unwrap_or(false)
}

/// True if `c` is not an XML 1.0 Char.
#[inline]
pub fn is_invalid(c: char) -> bool {
	ascii_flag(c, ASCII_INVALID).unwrap_or_else(|| CLASS_XML_NONCHAR.select(c))
}

/// True if `c` is not an XML 1.1 Char.
#[inline]
pub fn is_xml11_invalid(c: char) -> bool {
	c == '\0' || CLASS_XML11_NONCHAR.select(c)
}

/// True if `c` is plain character data in XML 1.0.
///
/// Excludes line ends and the markup-significant `<`, `&` and `]`.
#[inline]
pub fn is_content(c: char) -> bool {
	match ascii_flag(c, ASCII_CONTENT) {
		Some(v) => v,
		None => !CLASS_XML_NONCHAR.select(c),
	}
}

/// True if `c` is plain character data in an XML 1.1 external entity.
///
/// On top of the XML 1.0 exclusions, the restricted chars and the XML 1.1
/// line ends [`NEL`] and [`LS`] are excluded.
#[inline]
pub fn is_xml11_content(c: char) -> bool {
	if c == NEL || c == LS {
		return false;
	}
	is_xml11_internal_content(c)
}

/// True if `c` is plain character data in XML 1.1 replacement text.
///
/// Replacement text was normalized when it was declared, so [`NEL`] and
/// [`LS`] are ordinary content there.
#[inline]
pub fn is_xml11_internal_content(c: char) -> bool {
	let cp = c as u32;
	if cp < 0x80 {
		let flags = ASCII_CLASSES[cp as usize];
		return flags & ASCII_CONTENT != 0 && flags & ASCII_RESTRICTED11 == 0;
	}
	!CLASS_XML11_NONCHAR.select(c) && !CLASS_XML11_RESTRICTED.select(c)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cdata_inclusion_and_exclusion_are_equivalent() {
		let excluder = CodepointRanges(INVALID_XML_CDATA_RANGES);
		let includer = CodepointRanges(VALID_XML_CDATA_RANGES);
		for cp in 0x0..=0x10ffffu32 {
			if let Some(ch) = std::char::from_u32(cp) {
				if !includer.select(ch) != excluder.select(ch) {
					panic!("INVALID_XML_CDATA_RANGES and VALID_XML_CDATA_RANGES have different opinions about U+{:x}", cp)
				}
			}
		}
	}

	#[test]
	fn ascii_fast_path_agrees_with_range_tables() {
		for cp in 0x0..0x80u32 {
			let ch = std::char::from_u32(cp).unwrap();
			assert_eq!(is_name_start(ch), CLASS_XML_NAMESTART.select(ch), "name start U+{:x}", cp);
			assert_eq!(is_name(ch), CLASS_XML_NAME.select(ch), "name U+{:x}", cp);
			assert_eq!(is_invalid(ch), CLASS_XML_NONCHAR.select(ch), "invalid U+{:x}", cp);
		}
	}

	#[test]
	fn content_excludes_markup_and_line_ends() {
		for ch in ['<', '&', ']', '\n', '\r', '\x01'].iter() {
			assert!(!is_content(*ch), "{:?}", ch);
		}
		for ch in ['a', '\t', ' ', '>', '"', '%', '\u{85}', '\u{2028}', '\u{10000}'].iter() {
			assert!(is_content(*ch), "{:?}", ch);
		}
		assert!(!is_content('\u{fffe}'));
	}

	#[test]
	fn xml11_content_excludes_restricted_and_line_ends() {
		assert!(!is_xml11_content(NEL));
		assert!(!is_xml11_content(LS));
		assert!(!is_xml11_content('\x7f'));
		assert!(!is_xml11_content('\u{90}'));
		assert!(!is_xml11_content('\x01'));
		assert!(is_xml11_internal_content(NEL));
		assert!(is_xml11_internal_content(LS));
		assert!(is_xml11_content('a'));
		assert!(is_xml11_content('\t'));
		assert!(!is_xml11_content('<'));
	}

	#[test]
	fn xml11_invalid_only_covers_nul_and_nonchars() {
		assert!(is_xml11_invalid('\0'));
		assert!(!is_xml11_invalid('\x01'));
		assert!(is_xml11_invalid('\u{ffff}'));
		assert!(is_invalid('\x01'));
	}

	#[test]
	fn ncname_start_rejects_colon_and_digits() {
		assert!(!is_ncname_start(':'));
		assert!(!is_ncname_start('1'));
		assert!(is_ncname_start('_'));
		assert!(is_name_start(':'));
		assert!(is_name('1'));
	}
}
