use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use xescan::{EntityScanner, Error, NameType, ScannerOptions, StringBuffer};

fn content_document(nlines: usize) -> Vec<u8> {
	let mut out = Vec::new();
	for i in 0..nlines {
		out.extend_from_slice(format!("line {} of the benchmark document, with some filler text\r\n", i).as_bytes());
	}
	out
}

fn names_document(nnames: usize) -> Vec<u8> {
	let mut out = Vec::new();
	for i in 0..nnames {
		out.extend_from_slice(format!("element-{} xmlns:ns{} ", i % 97, i % 13).as_bytes());
	}
	out
}

fn comment_document(ncomments: usize) -> Vec<u8> {
	let mut out = Vec::new();
	for i in 0..ncomments {
		out.extend_from_slice(format!("a comment - number {} -- with dashes-->", i).as_bytes());
	}
	out
}

fn scanner(data: &[u8], buffer_size: usize, encoding: Option<&str>) -> EntityScanner {
	let mut s = EntityScanner::with_options(ScannerOptions::default().buffer_size(buffer_size));
	s.push_stream_entity("bench", std::io::Cursor::new(data.to_vec()), encoding).unwrap();
	s
}

fn drain_content(s: &mut EntityScanner) -> usize {
	let mut n = 0;
	loop {
		match s.scan_content() {
			Ok(span) => n += span.len(),
			Err(Error::EndOfDocument) => return n,
			other => panic!("oh no! {:?}", other.map(|span| span.to_string())),
		}
		match s.scan_char(None) {
			Ok(_) => n += 1,
			Err(Error::EndOfDocument) => return n,
			Err(other) => panic!("oh no! {:?}", other),
		}
	}
}

fn content_perf(c: &mut Criterion) {
	let data = content_document(2000);
	let mut group = c.benchmark_group("scan_content");
	group.throughput(Throughput::Bytes(data.len() as u64));
	for buffer_size in [64usize, 8192].iter() {
		for encoding in ["UTF-8", "ISO-8859-1"].iter() {
			group.bench_with_input(
				BenchmarkId::new(*encoding, buffer_size),
				buffer_size,
				|b, buffer_size| {
					b.iter(|| {
						let mut s = scanner(black_box(&data[..]), *buffer_size, Some(*encoding));
						drain_content(&mut s)
					})
				},
			);
		}
	}
	group.finish();
}

fn names_perf(c: &mut Criterion) {
	let data = names_document(2000);
	let mut group = c.benchmark_group("scan_name");
	group.throughput(Throughput::Bytes(data.len() as u64));
	group.bench_function("qnames", |b| {
		b.iter(|| {
			let mut s = scanner(black_box(&data[..]), 8192, None);
			let mut n = 0;
			loop {
				match s.scan_qname(NameType::AttributeName) {
					Ok(Some(_)) => n += 1,
					Ok(None) | Err(Error::EndOfDocument) => break,
					Err(other) => panic!("oh no! {:?}", other),
				}
				match s.skip_spaces() {
					Ok(_) => (),
					Err(Error::EndOfDocument) => break,
					Err(other) => panic!("oh no! {:?}", other),
				}
			}
			n
		})
	});
	group.bench_function("names", |b| {
		b.iter(|| {
			let mut s = scanner(black_box(&data[..]), 8192, None);
			let mut n = 0;
			loop {
				match s.scan_name(NameType::ElementStart) {
					Ok(Some(_)) => n += 1,
					Ok(None) | Err(Error::EndOfDocument) => break,
					Err(other) => panic!("oh no! {:?}", other),
				}
				match s.skip_spaces() {
					Ok(_) => (),
					Err(Error::EndOfDocument) => break,
					Err(other) => panic!("oh no! {:?}", other),
				}
			}
			n
		})
	});
	group.finish();
}

fn data_perf(c: &mut Criterion) {
	let data = comment_document(2000);
	let mut group = c.benchmark_group("scan_data");
	group.throughput(Throughput::Bytes(data.len() as u64));
	for buffer_size in [64usize, 8192].iter() {
		group.bench_with_input(
			BenchmarkId::new("comments", buffer_size),
			buffer_size,
			|b, buffer_size| {
				b.iter(|| {
					let mut s = scanner(black_box(&data[..]), *buffer_size, None);
					let mut buf = StringBuffer::new();
					let mut n = 0;
					for _ in 0..2000 {
						buf.clear();
						while s.scan_data("-->", &mut buf, 0).unwrap() {}
						n += buf.len();
					}
					n
				})
			},
		);
	}
	group.finish();
}

criterion_group!(benches, content_perf, names_perf, data_perf);
criterion_main!(benches);
