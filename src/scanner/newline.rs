use xescan_validation::selectors::NEL;

use crate::error::Result;

use super::{is_line_end, EntityScanner, NameType};

/// Outcome of normalizing a run of line ends at the cursor.
#[derive(Debug, Clone, Copy)]
pub(super) struct Normalized {
	/// Buffer offset of the first normalized `\n`.
	pub start: usize,
	/// Number of line ends in the run; the run is `ch[start..position]`.
	pub newlines: usize,
	/// How many of the line ends were already accounted against the
	/// limits.
	pub accounted: usize,
	/// The entity ended while the run was being scanned; the caller must
	/// return the run without scanning further.
	pub boundary: bool,
}

impl EntityScanner {
	/// Consume a run of line ends at the cursor and rewrite it to `\n`.
	///
	/// `\r\n` (and `\r` NEL in XML 1.1) count as one line end. Raw `\r`,
	/// NEL and LS are line ends in external entities only. Whenever the
	/// buffer runs dry inside the run, the line ends scanned so far are
	/// accounted and moved to the front of the buffer before more data is
	/// loaded.
	pub(super) fn normalize_newlines(&mut self, store_ws: bool, nt: Option<NameType>) -> Result<Normalized> {
		let v11 = self.is_v11();
		let (mut start, external) = {
			let e = self.current()?;
			(e.position, e.is_external)
		};
		let mut newlines = 0;
		let mut accounted = 0;
		let mut boundary = false;
		loop {
			let at_end = {
				let e = self.current()?;
				e.position == e.count
			};
			if at_end {
				if newlines == 0 {
					break;
				}
				self.check_entity_limit(nt, newlines - accounted)?;
				accounted = newlines;
				start = 0;
				if self.refill_after_newlines(newlines)? {
					boundary = true;
					break;
				}
				continue;
			}

			let c = {
				let e = self.current_mut()?;
				let c = e.ch[e.position];
				if !is_line_end(c, external, v11) {
					break;
				}
				e.position += 1;
				e.line += 1;
				e.column = 1;
				c
			};
			newlines += 1;
			if c != '\r' {
				continue;
			}

			let at_end = {
				let e = self.current()?;
				e.position == e.count
			};
			if at_end {
				self.check_entity_limit(nt, newlines - accounted)?;
				accounted = newlines;
				start = 0;
				if self.refill_after_newlines(newlines)? {
					boundary = true;
					break;
				}
			}
			let e = self.current_mut()?;
			let c = e.ch[e.position];
			if c == '\n' || (v11 && c == NEL) {
				e.position += 1;
				start += 1;
			}
		}

		let e = self.current_mut()?;
		let end = e.position;
		for c in &mut e.ch[start..end] {
			*c = '\n';
		}
		if store_ws && self.opts.whitespace_info {
			self.whitespace.extend(start..end);
		}
		Ok(Normalized{start, newlines, accounted, boundary})
	}

	/// Move the `newlines` line ends just scanned to the front of the
	/// buffer and load more data behind them.
	///
	/// Returns true if the entity has no more data.
	fn refill_after_newlines(&mut self, newlines: usize) -> Result<bool> {
		self.invoke_listeners(newlines);
		{
			let e = self.current_mut()?;
			// chars before the run are consumed; the run itself is
			// rewritten below
			e.base_offset += e.position - newlines;
			e.position = newlines;
			e.count = newlines;
			if newlines >= e.ch.len() {
				e.grow_to(newlines + 1);
			}
		}
		self.load(newlines, false, false)
	}
}

#[cfg(test)]
mod tests {
	use crate::options::{ScannerOptions, XMLVersion};
	use crate::reader::StrReader;
	use crate::ScannedEntity;

	use super::*;

	fn scanner_over(text: &str, buffer_size: usize, version: XMLVersion) -> EntityScanner {
		let opts = ScannerOptions::default().buffer_size(buffer_size).xml_version(version);
		let mut s = EntityScanner::with_options(opts);
		s.push_char_entity("doc", StrReader::new(text));
		s.load(0, false, false).unwrap();
		s
	}

	#[test]
	fn crlf_and_cr_collapse_into_single_newlines() {
		let mut s = scanner_over("\r\n\r\n\rx", 16, XMLVersion::V1_0);
		let n = s.normalize_newlines(false, None).unwrap();
		assert_eq!(n.newlines, 3);
		assert!(!n.boundary);
		let e = s.current().unwrap();
		assert_eq!(e.position - n.start, 3);
		assert_eq!(&e.ch[n.start..e.position], &['\n', '\n', '\n']);
		assert_eq!(e.ch[e.position], 'x');
		assert_eq!(e.line, 4);
		assert_eq!(e.column, 1);
		assert_eq!(e.character_offset(), 5);
	}

	#[test]
	fn crlf_split_across_refill_counts_once() {
		let mut s = scanner_over("a\r\nb", 2, XMLVersion::V1_0);
		s.current_mut().unwrap().position = 1;
		let n = s.normalize_newlines(false, None).unwrap();
		assert_eq!(n.newlines, 1);
		let e = s.current().unwrap();
		assert_eq!(e.position - n.start, 1);
		assert_eq!(e.ch[e.position], 'b');
		assert_eq!(e.line, 2);
		assert_eq!(e.character_offset(), 3);
	}

	#[test]
	fn nel_and_ls_are_line_ends_in_xml11_only() {
		let mut s = scanner_over("\u{85}\u{2028}\r\u{85}x", 16, XMLVersion::V1_1);
		let n = s.normalize_newlines(false, None).unwrap();
		assert_eq!(n.newlines, 3);

		let mut s = scanner_over("\u{85}x", 16, XMLVersion::V1_0);
		let n = s.normalize_newlines(false, None).unwrap();
		assert_eq!(n.newlines, 0);
	}

	#[test]
	fn internal_entities_keep_raw_carriage_returns() {
		let mut s = EntityScanner::new();
		s.start_entity(ScannedEntity::internal("e", "\r\n", 16));
		s.load(0, false, false).unwrap();
		let n = s.normalize_newlines(false, None).unwrap();
		assert_eq!(n.newlines, 0);
		assert_eq!(s.current().unwrap().position, 0);
	}

	#[test]
	fn run_at_entity_end_sets_boundary() {
		let mut s = scanner_over("\n\n", 2, XMLVersion::V1_0);
		let n = s.normalize_newlines(true, None).unwrap();
		assert!(n.boundary);
		assert_eq!(n.newlines, 2);
		assert_eq!(n.accounted, 2);
		assert_eq!(s.whitespace_positions(), &[0, 1]);
	}
}
