use xescan_validation::selectors::{is_name, is_name_start, is_ncname_start};

use crate::error::{NWFError, Result};
use crate::limits::Limit;
use crate::symbols::Symbol;

use super::{EntityScanner, NameType};

/// Qualified name split at its first colon.
///
/// All parts are interned in the scanner's symbol table.
#[derive(Debug, Clone, PartialEq)]
pub struct QName {
	pub prefix: Option<Symbol>,
	pub localpart: Symbol,
	pub rawname: Symbol,
}

impl EntityScanner {
	/// Consume a run of name chars.
	///
	/// Returns the buffer offset of the run (which ends at the cursor) and
	/// the offset of its colon if `track_colon` is set; the run then ends
	/// before a second colon. The run may
	/// cross buffer refills; it is kept contiguous by moving it to the
	/// front of the buffer.
	fn scan_name_run(&mut self, need_start: bool, track_colon: bool) -> Result<(usize, Option<usize>)> {
		self.ensure_data(true)?;
		let mut start = self.current()?.position;
		let mut colon: Option<usize> = None;
		{
			let e = self.current()?;
			if e.position >= e.count {
				return Ok((start, None));
			}
			let c = e.ch[e.position];
			if need_start && !is_name_start(c) {
				return Ok((start, None));
			}
		}
		loop {
			let position = {
				let e = self.current_mut()?;
				while e.position < e.count {
					let c = e.ch[e.position];
					if !is_name(c) {
						break;
					}
					if track_colon && c == ':' {
						if colon.is_some() {
							break;
						}
						colon = Some(e.position);
					}
					e.position += 1;
				}
				if e.position < e.count {
					break;
				}
				e.position
			};
			// buffer exhausted inside the name
			let partial = match colon {
				Some(colon) => position - colon - 1,
				None => position - start,
			};
			self.check_limit(Limit::MaxNameLength, partial)?;
			let ended = self.reload_keeping(start)?;
			if let Some(colon) = colon.as_mut() {
				*colon -= start;
			}
			start = 0;
			if ended {
				break;
			}
		}
		Ok((start, colon))
	}

	fn scan_name_raw(&mut self, nt: Option<NameType>, need_start: bool) -> Result<Option<Symbol>> {
		let (start, _) = self.scan_name_run(need_start, false)?;
		let end = self.current()?.position;
		let length = end - start;
		if length == 0 {
			return Ok(None);
		}
		self.current_mut()?.column += length;
		self.check_limit(Limit::MaxNameLength, length)?;
		if let Some(nt) = nt {
			self.check_entity_limit(Some(nt), length)?;
		}
		self.intern(start, end).map(Some)
	}

	fn scan_qname_raw(&mut self, nt: NameType) -> Result<Option<QName>> {
		let (start, colon) = self.scan_name_run(true, true)?;
		let end = self.current()?.position;
		let length = end - start;
		if length == 0 {
			return Ok(None);
		}
		self.current_mut()?.column += length;

		let qname = match colon {
			Some(colon) => {
				self.check_limit(Limit::MaxNameLength, colon - start)?;
				self.check_limit(Limit::MaxNameLength, end - colon - 1)?;
				let local_ok = {
					let e = self.current()?;
					colon + 1 < end && is_ncname_start(e.ch[colon + 1])
				};
				if !local_ok {
					let raw: String = self.current()?.ch[start..end].iter().collect();
					return Err(NWFError::IllegalQName(raw).into());
				}
				QName{
					prefix: Some(self.intern(start, colon)?),
					localpart: self.intern(colon + 1, end)?,
					rawname: self.intern(start, end)?,
				}
			}
			None => {
				self.check_limit(Limit::MaxNameLength, length)?;
				let name = self.intern(start, end)?;
				QName{
					prefix: None,
					localpart: name.clone(),
					rawname: name,
				}
			}
		};
		self.check_entity_limit(Some(nt), length)?;
		Ok(Some(qname))
	}

	/// Scan a name at the cursor.
	///
	/// Returns `None`, consuming nothing, if the cursor is not at a name
	/// start char.
	pub fn scan_name(&mut self, nt: NameType) -> Result<Option<Symbol>> {
		self.check_err()?;
		let r = self.scan_name_raw(Some(nt), true);
		self.record(r)
	}

	/// Scan a name token, which may start with any name char.
	pub fn scan_nmtoken(&mut self) -> Result<Option<Symbol>> {
		self.check_err()?;
		let r = self.scan_name_raw(None, false);
		self.record(r)
	}

	/// Scan a qualified name, splitting it at the first colon.
	///
	/// The part after the colon must start with an NCName start char. The
	/// name ends before a second colon, which is left in the input.
	pub fn scan_qname(&mut self, nt: NameType) -> Result<Option<QName>> {
		self.check_err()?;
		let r = self.scan_qname_raw(nt);
		self.record(r)
	}
}
