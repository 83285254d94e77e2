/*!
# Symbol interning

Names scanned by the [`EntityScanner`](crate::EntityScanner) are handed to
a [`SymbolTable`], which returns a shared [`Symbol`]. The default table is
[`Context`].
*/
#[cfg(not(feature = "weak_symbols"))]
use std::collections::HashSet;
use std::fmt;

#[cfg(feature = "mt")]
use std::sync::{Arc, Mutex, MutexGuard};
#[cfg(all(feature = "weak_symbols", feature = "mt"))]
use std::sync::Weak;
#[cfg(not(feature = "mt"))]
use std::rc::Rc;
#[cfg(all(feature = "weak_symbols", not(feature = "mt")))]
use std::rc::Weak;
#[cfg(not(feature = "mt"))]
use std::cell::{RefCell, RefMut};

use smartstring::alias::String as SmartString;

#[cfg(feature = "weak_symbols")]
use weak_table;

#[cfg(feature = "mt")]
pub type RcPtr<T> = Arc<T>;

#[cfg(not(feature = "mt"))]
pub type RcPtr<T> = Rc<T>;

/// Interned name.
///
/// Two symbols obtained from the same table for equal text point to the
/// same allocation.
pub type Symbol = RcPtr<str>;

#[cfg(feature = "weak_symbols")]
type SymbolSet = weak_table::WeakHashSet<Weak<str>>;
#[cfg(not(feature = "weak_symbols"))]
type SymbolSet = HashSet<Symbol>;

/**
# Interning of scanned names

The scanner passes a slice of its buffer; implementations must copy what
they keep, the buffer is reused after the call returns.
*/
pub trait SymbolTable {
	/// Return the symbol for the given chars.
	fn add_symbol(&self, chars: &[char]) -> Symbol;

	/// Return the symbol for the given str.
	fn add_str(&self, s: &str) -> Symbol;
}

impl<T: SymbolTable + ?Sized> SymbolTable for RcPtr<T> {
	fn add_symbol(&self, chars: &[char]) -> Symbol {
		(**self).add_symbol(chars)
	}

	fn add_str(&self, s: &str) -> Symbol {
		(**self).add_str(s)
	}
}

/**
# Shared symbol table

The context can be shared between scanners with an immutable reference
(wrap it in an [`RcPtr`] and pass a clone to each scanner). If the crate
is built with the `mt` feature, the Context is Send and Sync, otherwise it
is neither.

With the `weak_symbols` feature, symbols are only held weakly: once the last
[`Symbol`] for a string is dropped, the string is lazily removed from the
table.
*/
pub struct Context {
	#[cfg(feature = "mt")]
	symbols: Mutex<SymbolSet>,
	#[cfg(not(feature = "mt"))]
	symbols: RefCell<SymbolSet>,
}

impl Context {
	#[cfg(feature = "mt")]
	fn wrap_symbols(symbols: SymbolSet) -> Mutex<SymbolSet> {
		return Mutex::new(symbols)
	}

	#[cfg(not(feature = "mt"))]
	fn wrap_symbols(symbols: SymbolSet) -> RefCell<SymbolSet> {
		return RefCell::new(symbols)
	}

	/// Create a new context
	pub fn new() -> Context {
		Context{
			symbols: Self::wrap_symbols(SymbolSet::new()),
		}
	}

	#[cfg(feature = "mt")]
	fn lock_symbols<'a>(&'a self) -> MutexGuard<'a, SymbolSet> {
		// a poisoned set is still a valid set
		match self.symbols.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	#[cfg(not(feature = "mt"))]
	fn lock_symbols<'a>(&'a self) -> RefMut<'a, SymbolSet> {
		self.symbols.borrow_mut()
	}

	/// Intern a piece of text
	///
	/// A refcounted pointer to the stored text is returned.
	pub fn intern(&self, s: &str) -> Symbol {
		let mut symbols = self.lock_symbols();
		#[cfg(feature = "weak_symbols")]
		let existing = symbols.get(s);
		#[cfg(not(feature = "weak_symbols"))]
		let existing = symbols.get(s).cloned();
		match existing {
			Some(ptr) => ptr,
			None => {
				let ptr: Symbol = RcPtr::from(s);
				symbols.insert(ptr.clone());
				ptr
			},
		}
	}

	/// Remove all unreferenced strings from storage and shrink the storage to
	/// fit the requirements.
	///
	/// Without `weak_symbols`, only the storage is shrunk.
	pub fn release_temporaries(&self) {
		let mut symbols = self.lock_symbols();
		#[cfg(feature = "weak_symbols")]
		symbols.remove_expired();
		symbols.shrink_to_fit();
	}

	/// Return the number of strings interned.
	///
	/// With `weak_symbols`, this count includes strings which are
	/// unreferenced and which would be removed before the next reallocation.
	pub fn len(&self) -> usize {
		self.lock_symbols().len()
	}
}

impl Default for Context {
	fn default() -> Self {
		Self::new()
	}
}

impl SymbolTable for Context {
	fn add_symbol(&self, chars: &[char]) -> Symbol {
		// names are short; this stays inline in the common case
		let s: SmartString = chars.iter().copied().collect();
		self.intern(&s)
	}

	fn add_str(&self, s: &str) -> Symbol {
		self.intern(s)
	}
}

impl fmt::Debug for Context {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		let mut f = f.debug_struct("Context");
		f.field("instance", &(self as *const Context));
		{
			let symbols = self.lock_symbols();
			f.field("symbols.capacity()", &symbols.capacity()).field("symbols.len()", &symbols.len());
		}
		f.finish()
	}
}
