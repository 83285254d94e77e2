/*!
# Chunked byte input

[`BufferQueue`] is a byte source which is filled chunk by chunk. Reads never
cross a chunk boundary, which makes it useful for feeding entities in
pieces. When the queue runs dry before [`BufferQueue::push_eof`] was called,
reads fail with [`std::io::ErrorKind::WouldBlock`].
*/
use std::collections::VecDeque;
use std::io;

use bytes::{Buf, Bytes};

pub const ERR_NODATA: &'static str = "no data in buffer";

/// Queue of byte chunks readable through [`std::io::Read`] and
/// [`std::io::BufRead`].
#[derive(Debug, Clone, Default)]
pub struct BufferQueue {
	q: VecDeque<Bytes>,
	len: usize,
	eof: bool,
}

impl BufferQueue {
	pub fn new() -> BufferQueue {
		BufferQueue::default()
	}

	/// Create a queue holding `data` split into chunks of `chunk_size`
	/// bytes, with the end of input already pushed.
	pub fn chunked(data: &[u8], chunk_size: usize) -> BufferQueue {
		let mut q = BufferQueue::new();
		for chunk in data.chunks(chunk_size.max(1)) {
			q.push(chunk.to_vec());
		}
		q.push_eof();
		q
	}

	/// Append a chunk. Empty chunks are dropped.
	///
	/// # Panics
	///
	/// If the end of input has already been pushed.
	pub fn push<T: Into<Bytes>>(&mut self, chunk: T) {
		if self.eof {
			panic!("cannot push behind eof");
		}
		let chunk = chunk.into();
		if chunk.is_empty() {
			return;
		}
		self.len = match self.len.checked_add(chunk.len()) {
			None => panic!("length overflow"),
			Some(v) => v,
		};
		self.q.push_back(chunk);
	}

	/// Number of buffered bytes.
	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn push_eof(&mut self) {
		self.eof = true;
	}

	pub fn eof_pushed(&self) -> bool {
		self.eof
	}

	fn no_data(&self) -> io::Result<()> {
		if self.eof {
			Ok(())
		} else {
			Err(io::Error::new(io::ErrorKind::WouldBlock, ERR_NODATA))
		}
	}
}

impl io::Read for BufferQueue {
	fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
		let front = match self.q.front_mut() {
			Some(front) => front,
			None => return self.no_data().map(|_| 0),
		};
		let n = front.len().min(dst.len());
		front.copy_to_slice(&mut dst[..n]);
		if front.is_empty() {
			self.q.pop_front();
		}
		self.len -= n;
		Ok(n)
	}
}

impl io::BufRead for BufferQueue {
	fn fill_buf(&mut self) -> io::Result<&[u8]> {
		if self.q.is_empty() {
			self.no_data()?;
			return Ok(&[]);
		}
		match self.q.front() {
			Some(front) => Ok(&front[..]),
			None => Ok(&[]),
		}
	}

	fn consume(&mut self, amt: usize) {
		if amt == 0 {
			return;
		}
		let front = match self.q.front_mut() {
			Some(front) if amt <= front.len() => front,
			_ => panic!("attempt to consume beyond end of buffer"),
		};
		front.advance(amt);
		if front.is_empty() {
			self.q.pop_front();
		}
		self.len -= amt;
	}
}
