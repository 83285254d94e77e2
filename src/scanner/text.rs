use xescan_validation::selectors::{is_invalid, is_xml11_invalid, NEL};

use crate::error::{for_delimiter, Result, WFError};
use crate::limits::Limit;
use crate::strings::{StringBuffer, TextSpan};

use super::{is_content_char, is_line_end, is_space_char, logical_char, EntityScanner, NameType};

impl EntityScanner {
	fn scan_content_raw(&mut self) -> Result<(usize, usize, Option<char>)> {
		self.ensure_data(true)?;
		let norm = self.normalize_newlines(false, None)?;
		let v11 = self.is_v11();
		let e = self.current_mut()?;
		if norm.boundary {
			return Ok((norm.start, e.position, None));
		}
		let external = e.is_external;
		while e.position < e.count && is_content_char(e.ch[e.position], external, v11) {
			e.position += 1;
		}
		let end = e.position;
		let length = end - norm.start;
		e.column += length - norm.newlines;
		let next = if end < e.count {
			Some(logical_char(e.ch[end], external, v11))
		} else {
			None
		};
		self.check_entity_limit(None, length - norm.accounted)?;
		Ok((norm.start, end, next))
	}

	fn scan_literal_raw(&mut self, quote: char, is_nsuri: bool) -> Result<(usize, usize, Option<char>)> {
		self.ensure_data(true)?;
		self.whitespace.clear();
		let norm = self.normalize_newlines(true, None)?;
		let v11 = self.is_v11();
		let record_ws = self.opts.whitespace_info;
		let Self{entities, whitespace, ..} = self;
		let e = match entities.last_mut() {
			Some(e) => e,
			None => return Ok((norm.start, norm.start, None)),
		};
		if norm.boundary {
			return Ok((norm.start, e.position, None));
		}
		let (external, literal) = (e.is_external, e.is_literal);
		while e.position < e.count {
			let c = e.ch[e.position];
			if (c == quote && (!literal || external))
				|| c == '%'
				|| !is_content_char(c, external, v11)
				|| (c == '\r' && !external)
			{
				break;
			}
			if record_ws && c == '\t' {
				whitespace.push(e.position);
			}
			e.position += 1;
		}
		let end = e.position;
		let length = end - norm.start;
		e.column += length - norm.newlines;
		let next = if end < e.count {
			let c = e.ch[end];
			if c == quote && literal {
				None
			} else {
				Some(logical_char(c, external, v11))
			}
		} else {
			None
		};
		self.check_entity_limit(None, length - norm.accounted)?;
		if is_nsuri {
			self.check_limit(Limit::MaxNameLength, length)?;
		}
		Ok((norm.start, end, next))
	}

	fn scan_data_raw(&mut self, delimiter: &str, buffer: &mut StringBuffer, chunk_limit: usize) -> Result<bool> {
		let delim: Vec<char> = delimiter.chars().collect();
		let dlen = delim.len();
		if dlen == 0 {
			return Ok(false);
		}
		let v11 = self.is_v11();
		let mut done = false;
		loop {
			self.ensure_data(false)?;

			// keep the whole delimiter visible
			let mut ended = false;
			loop {
				let e = self.current()?;
				if ended || e.remaining() >= dlen {
					break;
				}
				let position = e.position;
				if position > 0 {
					self.invoke_listeners(0);
					self.current_mut()?.compact(position);
				}
				let count = self.current()?.count;
				ended = self.load(count, false, position == 0)?;
				self.current_mut()?.position = 0;
			}

			let (position, count) = {
				let e = self.current()?;
				(e.position, e.count)
			};
			if count - position < dlen {
				// the entity ends before the delimiter
				let length = count - position;
				buffer.append(&self.current()?.ch[position..count]);
				{
					let e = self.current_mut()?;
					e.column += length;
					e.position = count;
				}
				self.check_entity_limit(Some(NameType::Comment), length)?;
				self.load(0, true, false)?;
				return Ok(false);
			}

			let norm = self.normalize_newlines(false, Some(NameType::Comment))?;
			if norm.boundary {
				let e = self.current()?;
				buffer.append(&e.ch[norm.start..e.position]);
				return Ok(true);
			}

			let offset = norm.start;
			let already = buffer.len();
			let mut invalid = None;
			{
				let e = self.current_mut()?;
				let external = e.is_external;
				'scan: while e.position < e.count {
					let c = e.ch[e.position];
					e.position += 1;
					if c == delim[0] {
						let delim_offset = e.position - 1;
						for i in 1..dlen {
							if e.position == e.count {
								// partial delimiter, rescan after loading
								e.position -= i;
								break 'scan;
							}
							let c = e.ch[e.position];
							e.position += 1;
							if delim[i] != c {
								e.position -= i;
								break;
							}
						}
						if e.position == delim_offset + dlen {
							done = true;
							break;
						}
					} else if is_line_end(c, external, v11) {
						e.position -= 1;
						break;
					} else if (!v11 && is_invalid(c)) || (v11 && is_xml11_invalid(c)) {
						e.position -= 1;
						invalid = Some(c);
						break;
					}
					if chunk_limit > 0 && already + e.position - offset >= chunk_limit {
						break;
					}
				}
			}

			let (end, newlines) = (self.current()?.position, norm.newlines);
			let mut length = end - offset;
			self.current_mut()?.column += length - newlines;
			self.check_entity_limit(Some(NameType::Comment), length - norm.accounted)?;
			if let Some(c) = invalid {
				return Err(WFError::InvalidChar(for_delimiter(delimiter), c as u32).into());
			}
			if done {
				length -= dlen;
			}
			buffer.append(&self.current()?.ch[offset..offset + length]);
			if done || chunk_limit > 0 {
				break;
			}
		}
		Ok(!done)
	}

	fn peek_char_raw(&mut self) -> Result<char> {
		self.ensure_data(true)?;
		let v11 = self.is_v11();
		let e = self.current()?;
		Ok(logical_char(e.ch[e.position], e.is_external, v11))
	}

	fn scan_char_raw(&mut self, nt: Option<NameType>) -> Result<char> {
		self.ensure_data(true)?;
		let v11 = self.is_v11();
		let (c, external) = {
			let e = self.current_mut()?;
			let c = e.ch[e.position];
			e.position += 1;
			(c, e.is_external)
		};
		let mut consumed = 1;
		let c = if is_line_end(c, external, v11) {
			{
				let e = self.current_mut()?;
				e.line += 1;
				e.column = 1;
			}
			if c == '\r' && self.consume_crlf_tail(v11)? {
				consumed += 1;
			}
			'\n'
		} else {
			self.current_mut()?.column += 1;
			c
		};
		if !self.detecting_version {
			self.check_entity_limit(nt, consumed)?;
		}
		Ok(c)
	}

	/// After a raw `\r` in an external entity, consume the `\n` (or NEL in
	/// XML 1.1) completing the line end, if present.
	fn consume_crlf_tail(&mut self, v11: bool) -> Result<bool> {
		if !self.arrange_capacity(1, false)? {
			return Ok(false);
		}
		let e = self.current_mut()?;
		let c = e.ch[e.position];
		if c == '\n' || (v11 && c == NEL) {
			e.position += 1;
			Ok(true)
		} else {
			Ok(false)
		}
	}

	fn skip_char_raw(&mut self, expected: char, nt: Option<NameType>) -> Result<bool> {
		self.ensure_data(true)?;
		let v11 = self.is_v11();
		let (c, external) = {
			let e = self.current()?;
			(e.ch[e.position], e.is_external)
		};
		if c == expected {
			{
				let e = self.current_mut()?;
				e.position += 1;
				if c == '\n' {
					e.line += 1;
					e.column = 1;
				} else {
					e.column += 1;
				}
			}
			self.check_entity_limit(nt, 1)?;
			return Ok(true);
		}
		if expected == '\n' && external && is_line_end(c, external, v11) {
			{
				let e = self.current_mut()?;
				e.position += 1;
				e.line += 1;
				e.column = 1;
			}
			let mut consumed = 1;
			if c == '\r' && self.consume_crlf_tail(v11)? {
				consumed += 1;
			}
			self.check_entity_limit(nt, consumed)?;
			return Ok(true);
		}
		Ok(false)
	}

	fn skip_spaces_raw(&mut self, decl: bool) -> Result<bool> {
		let notify = !decl;
		self.ensure_data(notify)?;
		// declarations are read before the version is known
		let v11 = !decl && self.is_v11();
		let is_space = |c: char, external: bool| {
			if decl {
				c == ' ' || c == '\t' || c == '\n' || c == '\r'
			} else {
				is_space_char(c, external, v11)
			}
		};
		{
			let e = self.current()?;
			if !is_space(e.ch[e.position], e.is_external) {
				return Ok(false);
			}
		}
		loop {
			let (c, external) = {
				let e = self.current_mut()?;
				let c = e.ch[e.position];
				e.position += 1;
				(c, e.is_external)
			};
			let mut consumed = 1;
			if is_line_end(c, external, v11) {
				{
					let e = self.current_mut()?;
					e.line += 1;
					e.column = 1;
				}
				if c == '\r' && self.consume_crlf_tail(v11)? {
					consumed += 1;
				}
			} else {
				self.current_mut()?.column += 1;
			}
			if !decl {
				self.check_entity_limit(None, consumed)?;
			}
			self.ensure_data(notify)?;
			let e = self.current()?;
			if !is_space(e.ch[e.position], e.is_external) {
				break;
			}
		}
		Ok(true)
	}

	fn skip_string_raw(&mut self, s: &str) -> Result<bool> {
		let n = s.chars().count();
		if n == 0 {
			return Ok(true);
		}
		self.ensure_data(true)?;
		if !self.arrange_capacity(n, false)? {
			return Ok(false);
		}
		{
			let e = self.current_mut()?;
			let matches = e.ch[e.position..e.position + n].iter().copied().eq(s.chars());
			if !matches {
				return Ok(false);
			}
			e.position += n;
			e.column += n;
		}
		if !self.detecting_version {
			self.check_entity_limit(None, n)?;
		}
		Ok(true)
	}

	fn get_char_raw(&mut self, offset: usize) -> Result<Option<char>> {
		self.ensure_data(true)?;
		if !self.arrange_capacity(offset + 1, false)? {
			return Ok(None);
		}
		let e = self.current()?;
		Ok(Some(e.ch[e.position + offset]))
	}

	/**
	Scan character content up to the next markup char, line end or buffer
	end.

	A leading run of line ends is normalized to `\n` and included in the
	span. The span is not guaranteed to be maximal; callers loop until
	[`TextSpan::next_char`] is markup.
	*/
	pub fn scan_content(&mut self) -> Result<TextSpan<'_>> {
		self.check_err()?;
		let r = self.scan_content_raw();
		let (start, end, next) = self.record(r)?;
		Ok(self.span(start, end, next))
	}

	/**
	Scan a chunk of an attribute value delimited by `quote`.

	Stops at the quote, `%`, chars which are not content and (in internal
	entities) raw `\r`. Inside an entity expanded within a literal the
	quote does not end the value and [`TextSpan::next_char`] is `None`.
	Newline and tab positions are recorded for
	[`EntityScanner::whitespace_positions`]. With `is_nsuri`, the value is
	also checked against the name length limit.
	*/
	pub fn scan_literal(&mut self, quote: char, is_nsuri: bool) -> Result<TextSpan<'_>> {
		self.check_err()?;
		let r = self.scan_literal_raw(quote, is_nsuri);
		let (start, end, next) = self.record(r)?;
		Ok(self.span(start, end, next))
	}

	/**
	Append data up to `delimiter` to `buffer`.

	Returns `Ok(true)` if the caller has to call again because the
	delimiter has not been seen yet, and `Ok(false)` if the delimiter was
	consumed (it is not appended) or the entity ended first. With a
	non-zero `chunk_limit`, at most one segment is appended per call.

	Chars which are not allowed in XML are fatal errors.
	*/
	pub fn scan_data(&mut self, delimiter: &str, buffer: &mut StringBuffer, chunk_limit: usize) -> Result<bool> {
		self.check_err()?;
		let r = self.scan_data_raw(delimiter, buffer, chunk_limit);
		self.record(r)
	}

	/// Return the next char without consuming it.
	///
	/// Line ends of external entities are returned as `\n`.
	pub fn peek_char(&mut self) -> Result<char> {
		self.check_err()?;
		let r = self.peek_char_raw();
		self.record(r)
	}

	/// Consume and return the next char, with line ends normalized.
	pub fn scan_char(&mut self, nt: Option<NameType>) -> Result<char> {
		self.check_err()?;
		let r = self.scan_char_raw(nt);
		self.record(r)
	}

	/// Consume the next char if it equals `c`.
	///
	/// `'\n'` also matches every line end of external entities.
	pub fn skip_char(&mut self, c: char, nt: Option<NameType>) -> Result<bool> {
		self.check_err()?;
		let r = self.skip_char_raw(c, nt);
		self.record(r)
	}

	/// Consume whitespace, crossing into parent entities. Returns false if
	/// the cursor was not at whitespace.
	pub fn skip_spaces(&mut self) -> Result<bool> {
		self.check_err()?;
		let r = self.skip_spaces_raw(false);
		self.record(r)
	}

	/// Consume the whitespace allowed inside an XML or text declaration.
	///
	/// Only the four XML 1.0 whitespace chars are accepted and nothing is
	/// accounted against the limits.
	pub fn skip_decl_spaces(&mut self) -> Result<bool> {
		self.check_err()?;
		let r = self.skip_spaces_raw(true);
		self.record(r)
	}

	/// Consume `s` if the input continues with it.
	///
	/// `s` must not contain line ends.
	pub fn skip_string(&mut self, s: &str) -> Result<bool> {
		self.check_err()?;
		let r = self.skip_string_raw(s);
		self.record(r)
	}

	/// Return the char `offset` positions after the cursor without
	/// consuming anything, or `None` if the entity ends first.
	///
	/// Line ends are returned raw.
	pub fn get_char(&mut self, offset: usize) -> Result<Option<char>> {
		self.check_err()?;
		let r = self.get_char_raw(offset);
		self.record(r)
	}
}
