use super::*;

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use proptest::prelude::*;

use crate::error::{EncodingError, WFError};

type Reports = Rc<RefCell<Vec<(&'static str, Vec<String>)>>>;

fn recording_reporter(scanner: &mut EntityScanner) -> Reports {
	let reports: Reports = Rc::new(RefCell::new(Vec::new()));
	let sink = reports.clone();
	scanner.set_error_reporter(move |_domain: &'static str, key: &'static str, args: &[String]| {
		sink.borrow_mut().push((key, args.to_vec()));
	});
	reports
}

fn char_scanner(text: &str, buffer_size: usize) -> EntityScanner {
	let mut s = EntityScanner::with_options(ScannerOptions::default().buffer_size(buffer_size));
	s.push_char_entity("doc", StrReader::new(text));
	s
}

fn normalized(text: &str) -> String {
	text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Drain an entity through scan_content and scan_char, returning the text
/// and the final line, column and offset.
fn drain(s: &mut EntityScanner) -> (String, (usize, usize, usize)) {
	let mut out = String::new();
	let mut last = (1, 1, 0);
	loop {
		match s.scan_content() {
			Ok(span) => out.push_str(&span.to_string()),
			Err(Error::EndOfDocument) => break,
			Err(other) => panic!("unexpected error: {:?}", other),
		}
		last = (s.line_number(), s.column_number(), s.character_offset());
		match s.scan_char(None) {
			Ok(c) => out.push(c),
			Err(Error::EndOfDocument) => break,
			Err(other) => panic!("unexpected error: {:?}", other),
		}
		last = (s.line_number(), s.column_number(), s.character_offset());
	}
	(out, last)
}

fn expected_position(normalized: &str, source_len: usize) -> (usize, usize, usize) {
	let line = 1 + normalized.matches('\n').count();
	let column = 1 + match normalized.rfind('\n') {
		Some(idx) => normalized[idx + 1..].chars().count(),
		None => normalized.chars().count(),
	};
	(line, column, source_len)
}

#[test]
fn utf16be_document_with_bom_is_sniffed_and_scanned() {
	let doc = b"\xfe\xff\x00<\x00r\x00o\x00o\x00t\x00>\x00h\x00\xe4\x00<";
	let mut s = EntityScanner::new();
	s.push_stream_entity("doc", &doc[..], None).unwrap();
	assert_eq!(s.encoding(), Some("UTF-16BE"));
	assert!(s.skip_char('<', Some(NameType::ElementStart)).unwrap());
	let name = s.scan_name(NameType::ElementStart).unwrap().unwrap();
	assert_eq!(&*name, "root");
	assert!(s.skip_char('>', None).unwrap());
	let span = s.scan_content().unwrap();
	assert_eq!(span, "hä");
	assert_eq!(span.next_char(), Some('<'));
	assert_eq!(s.character_offset(), 8);
}

#[test]
fn encoding_declaration_switches_decoder() {
	let mut doc = b"<?xml version='1.0' encoding='ISO-8859-1'?>".to_vec();
	doc.extend_from_slice(&[b'x'; 40]);
	doc.extend_from_slice(b"\xe4<");
	let mut s = EntityScanner::with_options(ScannerOptions::default().xmldecl_buffer_size(16));
	s.push_stream_entity("doc", io::Cursor::new(doc), None).unwrap();
	assert_eq!(s.encoding(), Some("UTF-8"));
	assert!(s.skip_string("<?xml version='1.0' encoding='").unwrap());
	let mut declared = String::new();
	loop {
		let span = s.scan_literal('\'', false).unwrap();
		declared.push_str(&span.to_string());
		if span.next_char() == Some('\'') {
			break;
		}
	}
	assert_eq!(declared, "ISO-8859-1");
	s.set_encoding(&declared).unwrap();
	assert!(s.skip_string("'?>").unwrap());
	s.current_entity_mut().unwrap().set_may_read_chunks(true);
	assert_eq!(s.encoding(), Some("ISO-8859-1"));

	let mut text = String::new();
	loop {
		let span = s.scan_content().unwrap();
		text.push_str(&span.to_string());
		if span.next_char() == Some('<') {
			break;
		}
	}
	assert_eq!(text.chars().last(), Some('ä'));
	assert_eq!(text.chars().count(), 41);
}

#[test]
fn encoding_recovery_falls_back_to_latin1_and_reports() {
	let mut s = EntityScanner::with_options(ScannerOptions::default().encoding_recovery(true));
	let reports = recording_reporter(&mut s);
	s.push_stream_entity("doc", &b"<a>"[..], None).unwrap();
	s.set_encoding("no such encoding").unwrap();
	assert_eq!(s.encoding(), Some("ISO-8859-1"));
	assert_eq!(s.current_entity().unwrap().reader_kind(), Some(ReaderKind::Latin1));
	assert_eq!(&*reports.borrow(), &[("EncodingDeclInvalid", vec!["no such encoding".to_string()])]);
	assert!(s.skip_char('<', None).unwrap());
}

#[test]
fn invalid_encoding_is_fatal_without_recovery() {
	let mut s = EntityScanner::new();
	let reports = recording_reporter(&mut s);
	s.push_stream_entity("doc", &b"<a>"[..], None).unwrap();
	match s.set_encoding("no such encoding") {
		Err(Error::Encoding(EncodingError::DeclInvalid(name))) => assert_eq!(name, "no such encoding"),
		other => panic!("unexpected result: {:?}", other),
	}
	match s.peek_char() {
		Err(Error::Encoding(_)) => (),
		other => panic!("unexpected result: {:?}", other),
	}
	assert_eq!(reports.borrow().len(), 1);

	s.reset();
	assert!(s.error().is_none());
	assert_eq!(s.entity_depth(), 0);
}

#[test]
fn encoding_declaration_is_ignored_for_char_entities() {
	let mut s = char_scanner("<a>", 16);
	s.set_encoding("ISO-8859-1").unwrap();
	assert_eq!(s.encoding(), Some("UTF-16"));
}

#[test]
fn utf16_entity_only_switches_to_ucs_variants() {
	let mut s = EntityScanner::new();
	s.push_stream_entity("doc", &b"\xff\xfe<\x00"[..], None).unwrap();
	s.set_encoding("UTF-16").unwrap();
	assert_eq!(s.current_entity().unwrap().reader_kind(), Some(ReaderKind::Codec(encoding_rs::UTF_16LE)));
	s.set_encoding("ISO-10646-UCS-2").unwrap();
	assert_eq!(s.current_entity().unwrap().reader_kind(), Some(ReaderKind::Ucs2{big_endian: false}));
	assert_eq!(s.peek_char().unwrap(), '<');
}

struct Recorder(Rc<RefCell<Vec<String>>>);

impl EntityHandler for Recorder {
	fn start_entity(&mut self, entity: &ScannedEntity) {
		self.0.borrow_mut().push(format!("start {}", entity.name()));
	}

	fn end_entity(&mut self, entity: &ScannedEntity) {
		self.0.borrow_mut().push(format!("end {}", entity.name()));
	}
}

#[test]
fn scanning_continues_in_parent_after_entity_ends() {
	let events = Rc::new(RefCell::new(Vec::new()));
	let mut s = char_scanner("a&e;b", 64);
	s.set_entity_handler(Recorder(events.clone()));

	let span = s.scan_content().unwrap();
	assert_eq!(span, "a");
	assert_eq!(span.next_char(), Some('&'));
	assert!(s.skip_char('&', Some(NameType::Reference)).unwrap());
	let name = s.scan_name(NameType::Reference).unwrap().unwrap();
	assert!(s.skip_char(';', Some(NameType::Reference)).unwrap());
	s.push_internal_entity(&name, "x<y/>z");

	assert_eq!(s.scan_content().unwrap(), "x");
	assert!(s.skip_char('<', Some(NameType::ElementStart)).unwrap());
	let q = s.scan_qname(NameType::ElementStart).unwrap().unwrap();
	assert_eq!(&*q.rawname, "y");
	assert!(s.skip_string("/>").unwrap());
	assert_eq!(s.scan_content().unwrap(), "z");
	assert_eq!(s.entity_depth(), 2);
	assert_eq!(s.scan_content().unwrap(), "b");
	assert_eq!(s.entity_depth(), 1);
	assert_eq!(&*events.borrow(), &["start e", "end e"]);

	match s.scan_content() {
		Err(Error::EndOfDocument) => (),
		other => panic!("unexpected result: {:?}", other),
	}
	assert_eq!(&*events.borrow(), &["start e", "end e", "end doc"]);
}

#[test]
fn general_entity_limit_is_reported_once_and_sticks() {
	let mut s = char_scanner("", 64);
	s.set_security_limits(SecurityManager::new().with_limit(Limit::GeneralEntitySize, 5));
	let reports = recording_reporter(&mut s);
	s.push_internal_entity("big", "abcdefgh");
	match s.scan_content() {
		Err(Error::LimitExceeded(v)) => {
			assert_eq!(v.limit, Limit::GeneralEntitySize);
			assert_eq!(v.entity.as_ref().map(|s| s.as_str()), Some("big"));
			assert_eq!(v.value, 8);
		}
		other => panic!("unexpected result: {:?}", other),
	}
	for _ in 0..3 {
		match s.scan_content() {
			Err(Error::LimitExceeded(_)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}
	assert_eq!(
		&*reports.borrow(),
		&[("MaxGeneralEntitySizeLimit", vec!["big".to_string(), "8".to_string(), "5".to_string(), "property".to_string()])],
	);
}

#[test]
fn document_content_does_not_count_towards_entity_limits() {
	let text = "x".repeat(100);
	let mut s = char_scanner(&text, 16);
	s.set_security_limits(
		SecurityManager::new()
			.with_limit(Limit::GeneralEntitySize, 5)
			.with_limit(Limit::TotalEntitySize, 5),
	);
	let (out, _) = drain(&mut s);
	assert_eq!(out, text);
	assert_eq!(s.limit_analyzer().value(Limit::TotalEntitySize), 0);
}

#[test]
fn entity_size_limit_applies_per_expansion() {
	let mut s = char_scanner("", 64);
	s.set_security_limits(SecurityManager::new().with_limit(Limit::GeneralEntitySize, 5));
	for _ in 0..3 {
		s.push_internal_entity("e", "abcd");
		assert_eq!(s.scan_content().unwrap(), "abcd");
		s.end_entity();
	}
	assert_eq!(s.limit_analyzer().value(Limit::TotalEntitySize), 12);
}

#[test]
fn name_length_limit_applies_to_document_names() {
	let mut s = char_scanner(&format!("<{}>", "n".repeat(20)), 4);
	s.set_security_limits(SecurityManager::new().with_limit(Limit::MaxNameLength, 10));
	assert!(s.skip_char('<', None).unwrap());
	match s.scan_name(NameType::ElementStart) {
		Err(Error::LimitExceeded(v)) => assert_eq!(v.limit, Limit::MaxNameLength),
		other => panic!("unexpected result: {:?}", other),
	}
}

#[test]
fn general_entity_limit_applies_to_literals() {
	let mut s = char_scanner("", 64);
	s.set_security_limits(SecurityManager::new().with_limit(Limit::GeneralEntitySize, 5));
	let reports = recording_reporter(&mut s);
	s.push_internal_entity("val", "abcdefg");
	match s.scan_literal('"', false) {
		Err(Error::LimitExceeded(v)) => {
			assert_eq!(v.limit, Limit::GeneralEntitySize);
			assert_eq!(v.entity.as_ref().map(|s| s.as_str()), Some("val"));
			assert_eq!(v.value, 7);
		}
		other => panic!("unexpected result: {:?}", other.map(|span| span.to_string())),
	}
	assert_eq!(reports.borrow().len(), 1);
}

#[test]
fn namespace_uri_literals_are_bounded_by_the_name_limit() {
	let doc = "'http://example.com/very/long'";
	let limits = SecurityManager::new().with_limit(Limit::MaxNameLength, 10);

	let mut s = char_scanner(doc, 64);
	s.set_security_limits(limits.clone());
	assert!(s.skip_char('\'', None).unwrap());
	assert_eq!(s.scan_literal('\'', false).unwrap(), "http://example.com/very/long");

	let mut s = char_scanner(doc, 64);
	s.set_security_limits(limits);
	let reports = recording_reporter(&mut s);
	assert!(s.skip_char('\'', None).unwrap());
	match s.scan_literal('\'', true) {
		Err(Error::LimitExceeded(v)) => {
			assert_eq!(v.limit, Limit::MaxNameLength);
			assert_eq!(v.value, 28);
			assert_eq!(v.max, 10);
		}
		other => panic!("unexpected result: {:?}", other.map(|span| span.to_string())),
	}
	assert_eq!(reports.borrow()[0].0, "MaxXMLNameLimit");
}

#[test]
fn nested_expansions_hit_the_total_limit_once() {
	let mut s = char_scanner(&"d".repeat(50), 16);
	s.set_security_limits(SecurityManager::new().with_limit(Limit::TotalEntitySize, 20));
	let reports = recording_reporter(&mut s);

	assert_eq!(s.scan_content().unwrap().len(), 16);
	assert_eq!(s.limit_analyzer().value(Limit::TotalEntitySize), 0);

	s.push_internal_entity("lol2", "<lol/>");
	assert!(s.skip_char('<', None).unwrap());
	let q = s.scan_qname(NameType::ElementStart).unwrap().unwrap();
	assert_eq!(&*q.rawname, "lol");
	assert!(s.skip_string("/>").unwrap());
	assert_eq!(s.limit_analyzer().value(Limit::TotalEntitySize), 6);
	assert_eq!(s.limit_analyzer().value(Limit::EntityReplacement), 1);

	s.push_internal_entity("lol1", "lollollol");
	assert_eq!(s.scan_content().unwrap(), "lollollol");
	s.end_entity();
	assert_eq!(s.limit_analyzer().value(Limit::TotalEntitySize), 15);

	s.push_internal_entity("lol1", "lollollol");
	match s.scan_content() {
		Err(Error::LimitExceeded(v)) => {
			assert_eq!(v.limit, Limit::TotalEntitySize);
			assert_eq!(v.value, 24);
			assert_eq!(v.max, 20);
			assert_eq!(v.entity, None);
		}
		other => panic!("unexpected result: {:?}", other.map(|span| span.to_string())),
	}
	match s.scan_qname(NameType::ElementStart) {
		Err(Error::LimitExceeded(_)) => (),
		other => panic!("unexpected result: {:?}", other),
	}
	assert_eq!(&*reports.borrow(), &[("TotalEntitySizeLimit", vec!["24".to_string(), "20".to_string(), "property".to_string()])]);
}

#[test]
fn element_starts_in_entities_count_as_replacements() {
	let mut s = char_scanner("", 64);
	s.set_security_limits(SecurityManager::new().with_limit(Limit::EntityReplacement, 2));
	s.push_internal_entity("nodes", "<a><b><c>");
	for expected in ["a", "b"].iter() {
		assert!(s.skip_char('<', None).unwrap());
		let q = s.scan_qname(NameType::ElementStart).unwrap().unwrap();
		assert_eq!(&*q.localpart, *expected);
		assert!(s.skip_char('>', None).unwrap());
	}
	assert!(s.skip_char('<', None).unwrap());
	match s.scan_qname(NameType::ElementStart) {
		Err(Error::LimitExceeded(v)) => {
			assert_eq!(v.limit, Limit::EntityReplacement);
			assert_eq!(v.value, 3);
		}
		other => panic!("unexpected result: {:?}", other),
	}
}

#[test]
fn character_offset_survives_refills() {
	let mut s = char_scanner("abcdefgh<", 4);
	let mut consumed = 0;
	loop {
		let span = s.scan_content().unwrap();
		consumed += span.len();
		if span.next_char() == Some('<') {
			break;
		}
	}
	assert_eq!(consumed, 8);
	assert_eq!(s.character_offset(), 8);
	assert_eq!(s.scan_char(None).unwrap(), '<');
	assert_eq!(s.character_offset(), 9);
}

#[test]
fn detecting_version_skips_accounting() {
	let mut s = char_scanner("", 64);
	s.set_security_limits(SecurityManager::new().with_limit(Limit::GeneralEntitySize, 2));
	s.push_internal_entity("e", "<?xml");
	s.set_detecting_version(true);
	assert!(s.skip_string("<?xml").unwrap());
	s.set_detecting_version(false);
	assert_eq!(s.limit_analyzer().value(Limit::GeneralEntitySize), 0);
}

#[test]
fn chunked_utf8_input_decodes_identically() {
	let text = "<doc attr='ä€'>\r\nzwölf 𝄞</doc>";
	let mut s = EntityScanner::new();
	s.push_stream_entity("doc", BufferQueue::chunked(text.as_bytes(), 1), None).unwrap();
	let (out, _) = drain(&mut s);
	assert_eq!(out, normalized(text));
}

#[test]
fn xml11_line_ends_in_content() {
	let opts = ScannerOptions::default().xml_version(XMLVersion::V1_1);
	let mut s = EntityScanner::with_options(opts);
	s.push_char_entity("doc", StrReader::new("a\u{85}b\u{2028}c"));
	let span = s.scan_content().unwrap();
	assert_eq!(span, "a");
	assert_eq!(span.next_char(), Some('\n'));
	assert_eq!(s.scan_content().unwrap(), "\nb");
	assert_eq!(s.scan_content().unwrap(), "\nc");
	assert_eq!(s.line_number(), 3);
}

#[test]
fn xml11_restricted_chars_are_not_content() {
	let opts = ScannerOptions::default().xml_version(XMLVersion::V1_1);
	let mut s = EntityScanner::with_options(opts);
	s.push_char_entity("doc", StrReader::new("a\u{1}b"));
	let span = s.scan_content().unwrap();
	assert_eq!(span, "a");
	assert_eq!(span.next_char(), Some('\u{1}'));
}

#[test]
fn invalid_char_in_cdata_section_names_the_context() {
	let mut s = char_scanner("ab\u{fffe}]]>", 64);
	let reports = recording_reporter(&mut s);
	let mut buf = StringBuffer::new();
	match s.scan_data("]]>", &mut buf, 0) {
		Err(Error::NotWellFormed(WFError::InvalidChar(ctx, 0xfffe))) => assert_eq!(ctx, error::ERRCTX_CDATA_SECTION),
		other => panic!("unexpected result: {:?}", other),
	}
	assert_eq!(reports.borrow()[0].0, "InvalidChar");
}

#[test]
fn io_errors_are_not_sticky() {
	let mut q = BufferQueue::new();
	q.push(b"<abc".to_vec());
	let mut s = EntityScanner::new();
	s.push_stream_entity("doc", q, None).unwrap();
	assert!(s.skip_string("<abc").unwrap());
	match s.peek_char() {
		Err(Error::IO(e)) => assert_eq!(e.kind(), io::ErrorKind::WouldBlock),
		other => panic!("unexpected result: {:?}", other),
	}
	assert!(s.error().is_none());
}

#[test]
fn listeners_are_told_about_refills() {
	let loads = Rc::new(RefCell::new(Vec::new()));
	let sink = loads.clone();
	let mut s = char_scanner("abcdefgh", 4);
	s.register_listener(move |pos: usize| sink.borrow_mut().push(pos));
	let name = s.scan_name(NameType::ElementStart).unwrap().unwrap();
	assert_eq!(&*name, "abcdefgh");
	assert_eq!(&*loads.borrow(), &[0, 4, 8]);
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(256))]

	#[test]
	fn prop_drained_text_is_normalized_at_any_buffer_size(
		chars in prop::collection::vec(prop::sample::select(vec!['a', '<', '&', '\r', '\n', 'é', '\t']), 0..80),
		buffer_size in 1usize..9,
	) {
		let text: String = chars.into_iter().collect();
		let mut s = char_scanner(&text, buffer_size);
		let (out, last) = drain(&mut s);
		let expected = normalized(&text);
		prop_assert_eq!(&out, &expected);
		if !text.is_empty() {
			prop_assert_eq!(last, expected_position(&expected, text.chars().count()));
		}
	}

	#[test]
	fn prop_scan_data_finds_first_delimiter(
		chars in prop::collection::vec(prop::sample::select(vec!['a', '-', '>', '\r', '\n']), 0..60),
		buffer_size in 1usize..9,
		chunk_limit in 0usize..4,
	) {
		let mut text: String = chars.into_iter().collect();
		text.push_str("-->tail");
		let mut s = char_scanner(&text, buffer_size);
		let mut buf = StringBuffer::new();
		let mut data = String::new();
		loop {
			buf.clear();
			let more = s.scan_data("-->", &mut buf, chunk_limit).unwrap();
			data.push_str(buf.as_str());
			if !more {
				break;
			}
		}
		let norm = normalized(&text);
		let end = norm.find("-->").unwrap();
		prop_assert_eq!(&data, &norm[..end]);
		prop_assert_eq!(s.peek_char().unwrap(), norm[end + 3..].chars().next().unwrap());
	}
}
