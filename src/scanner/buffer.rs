use crate::error::{Error, Result};

use super::EntityScanner;

impl EntityScanner {
	pub(super) fn invoke_listeners(&mut self, load_pos: usize) {
		for (_, listener) in self.listeners.iter_mut() {
			listener.refresh(load_pos);
		}
	}

	/// Read more chars into the current entity, placing them at `offset`.
	///
	/// `position` is set to `offset` and `count` to the end of the new
	/// data. Loading at offset 0 discards the buffer content, which then
	/// counts towards the base offset. Returns true if the entity is exhausted; in that case, with
	/// `change_entity` set, it is popped and scanning continues in the
	/// parent.
	pub(super) fn load(&mut self, offset: usize, change_entity: bool, notify: bool) -> Result<bool> {
		if notify {
			self.invoke_listeners(offset);
		}
		let decl_cap = self.opts.xmldecl_buffer_size.max(1);
		let e = self.current_mut()?;
		if offset == 0 {
			e.base_offset += e.count;
			e.count = 0;
			e.position = 0;
		}
		if offset >= e.ch.len() {
			e.grow_to(offset + 1);
		}
		let mut length = e.ch.len() - offset;
		if !e.may_read_chunks && length > decl_cap {
			length = decl_cap;
		}
		loop {
			match e.source.read_chars(&mut e.ch[offset..offset + length])? {
				Some(0) => continue,
				Some(n) => {
					log::trace!("loaded {} chars into entity {:?} at {}", n, e.name, offset);
					e.count = offset + n;
					e.position = offset;
					return Ok(false);
				}
				None => break,
			}
		}
		e.count = offset;
		e.position = offset;
		if change_entity {
			self.leave_exhausted_entity()?;
		}
		Ok(true)
	}

	/// Pop the exhausted current entity and make sure its parent has data.
	fn leave_exhausted_entity(&mut self) -> Result<()> {
		self.end_entity();
		let parent_drained = match self.entities.last() {
			Some(parent) => parent.position == parent.count,
			None => return Err(Error::EndOfDocument),
		};
		if parent_drained {
			self.load(0, true, false)?;
		}
		Ok(())
	}

	/// Load data into an empty buffer, switching to the parent entity if
	/// the current one is exhausted.
	pub(super) fn ensure_data(&mut self, notify: bool) -> Result<()> {
		let drained = {
			let e = self.current()?;
			e.position == e.count
		};
		if drained {
			self.load(0, true, notify)?;
		}
		Ok(())
	}

	/// Make at least `n` chars available after the cursor.
	///
	/// Unread data is moved to the front of the buffer if there is not
	/// enough room behind it, and the buffer grows if it cannot hold `n`
	/// chars at all. Returns false if the entity ends first; with
	/// `change_entity` set, it is then popped.
	pub(super) fn arrange_capacity(&mut self, n: usize, change_entity: bool) -> Result<bool> {
		loop {
			let (remaining, room) = {
				let e = self.current()?;
				(e.remaining(), e.ch.len() - e.position)
			};
			if remaining >= n {
				return Ok(true);
			}
			let compacting = room < n;
			if compacting {
				self.invoke_listeners(0);
				let e = self.current_mut()?;
				let position = e.position;
				e.compact(position);
				if e.ch.len() < n {
					e.grow_to(n);
				}
			}
			let (count, position) = {
				let e = self.current()?;
				(e.count, e.position)
			};
			let depth = self.entities.len();
			let ended = self.load(count, change_entity, !compacting)?;
			if self.entities.len() == depth {
				self.current_mut()?.position = position;
			}
			if ended {
				return Ok(false);
			}
		}
	}

	/// Keep the token `ch[start..position]` while refilling an exhausted
	/// buffer.
	///
	/// The token is moved to the front of the buffer, which grows if the
	/// token fills it entirely. Returns true if the entity ended.
	pub(super) fn reload_keeping(&mut self, start: usize) -> Result<bool> {
		let length = {
			let e = self.current()?;
			e.position - start
		};
		self.invoke_listeners(length);
		{
			let e = self.current_mut()?;
			e.compact(start);
			if length >= e.ch.len() {
				e.grow_to(length + 1);
			}
		}
		self.load(length, false, false)
	}

	/// Make at least `n` chars available after the cursor, without leaving
	/// the current entity.
	///
	/// Returns false if the entity ends first.
	pub fn ensure_lookahead(&mut self, n: usize) -> Result<bool> {
		self.check_err()?;
		let r = self.arrange_capacity(n, false);
		self.record(r)
	}
}
