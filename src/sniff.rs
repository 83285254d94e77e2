/*!
# Initial encoding detection

Before anything is known about an entity, its first four bytes decide
which decoder is used to read up to (and including) the XML or text
declaration. The declaration may later switch the encoding through
[`EntityScanner::set_encoding`](crate::EntityScanner::set_encoding).
*/

pub const UTF_8: &'static str = "UTF-8";
pub const UTF_16BE: &'static str = "UTF-16BE";
pub const UTF_16LE: &'static str = "UTF-16LE";
pub const UCS_4: &'static str = "ISO-10646-UCS-4";
pub const EBCDIC_CP037: &'static str = "CP037";

/// Proposed encoding for a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sniffed {
	/// IANA name of the encoding.
	pub encoding: &'static str,
	/// Byte order, where the pattern determines it.
	pub big_endian: Option<bool>,
}

impl Sniffed {
	const fn new(encoding: &'static str, big_endian: Option<bool>) -> Self {
		Self{encoding, big_endian}
	}
}

/// Propose an encoding for a stream starting with `bytes`.
///
/// Only the first four bytes are inspected. With fewer than two bytes the
/// answer is always UTF-8 with unknown byte order.
pub fn sniff(bytes: &[u8]) -> Sniffed {
	match bytes {
		[0xfe, 0xff, ..] => Sniffed::new(UTF_16BE, Some(true)),
		[0xff, 0xfe, ..] => Sniffed::new(UTF_16LE, Some(false)),
		[0xef, 0xbb, 0xbf, ..] => Sniffed::new(UTF_8, None),
		[0x00, 0x00, 0x00, 0x3c, ..] => Sniffed::new(UCS_4, Some(true)),
		[0x3c, 0x00, 0x00, 0x00, ..] => Sniffed::new(UCS_4, Some(false)),
		// unusual octet orders 2143 and 3412
		[0x00, 0x00, 0x3c, 0x00, ..] => Sniffed::new(UCS_4, None),
		[0x00, 0x3c, 0x00, 0x00, ..] => Sniffed::new(UCS_4, None),
		[0x00, 0x3c, 0x00, 0x3f, ..] => Sniffed::new(UTF_16BE, Some(true)),
		[0x3c, 0x00, 0x3f, 0x00, ..] => Sniffed::new(UTF_16LE, Some(false)),
		[0x4c, 0x6f, 0xa7, 0x94, ..] => Sniffed::new(EBCDIC_CP037, None),
		_ => Sniffed::new(UTF_8, None),
	}
}

/// Length of the byte order mark `bytes` starts with, if any.
pub fn bom_len(bytes: &[u8]) -> usize {
	match bytes {
		[0xef, 0xbb, 0xbf, ..] => 3,
		[0xfe, 0xff, ..] | [0xff, 0xfe, ..] => 2,
		_ => 0,
	}
}
