#[macro_use]
extern crate afl;
extern crate xescan;

use xescan::{BufferQueue, EntityScanner, Error, ScannerOptions};

fn drain(mut s: EntityScanner) -> Result<String, Error> {
	let mut out = String::new();
	loop {
		match s.scan_content() {
			Ok(span) => out.push_str(&span.to_string()),
			Err(Error::EndOfDocument) => return Ok(out),
			Err(e) => return Err(e),
		}
		match s.scan_char(None) {
			Ok(c) => out.push(c),
			Err(Error::EndOfDocument) => return Ok(out),
			Err(e) => return Err(e),
		}
	}
}

fn scan_whole(data: &[u8]) -> Result<String, Error> {
	let mut s = EntityScanner::new();
	s.push_stream_entity("fuzz", std::io::Cursor::new(data.to_vec()), None)?;
	drain(s)
}

fn scan_chunked(data: &[u8]) -> Result<String, Error> {
	let mut s = EntityScanner::with_options(
		ScannerOptions::default().buffer_size(7).xmldecl_buffer_size(3),
	);
	s.push_stream_entity("fuzz", BufferQueue::chunked(data, 1), None)?;
	drain(s)
}

fn main() {
	fuzz!(|data: &[u8]| {
		let whole = scan_whole(data);
		let chunked = scan_chunked(data);
		match (whole, chunked) {
			(Ok(a), Ok(b)) => assert_eq!(a, b),
			(Err(_), Err(_)) => (),
			(a, b) => panic!("buffering changed the outcome: {:?} vs. {:?}", a, b),
		}
	});
}
