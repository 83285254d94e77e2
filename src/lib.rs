/*!
# Streaming XML entity scanning

This crate provides the character-level input layer of an XML processor. It
reads entities (the document, external parsed entities and the replacement
text of internal entities) through a single [`EntityScanner`], which keeps
a stack of open entities and hands out the primitives a parser is built
from: peeking and consuming chars, names and qualified names, content
runs, attribute value chunks and delimited data sections.

## Features

* Encoding detection from the first bytes of an entity, including byte
  order marks, and switching the decoder on an encoding declaration
* Line end normalization (`\r\n`, `\r` and, for XML 1.1, NEL and LS) in
  place, with line, column and character offset tracking
* Transparent continuation in the parent entity when an entity ends
* Accounting of general entity expansions against configurable limits
* Name interning through a pluggable [`SymbolTable`]
* Sticky fatal errors, reported once through an [`ErrorReporter`]

## Example

```
use xescan::{EntityScanner, NameType, StringBuffer};
let doc = b"<?xml version='1.0'?>\r\n<!--hi-->";
let mut scanner = EntityScanner::new();
scanner.push_stream_entity("doc", &doc[..], None).unwrap();
assert!(scanner.skip_string("<?xml").unwrap());
assert!(scanner.skip_decl_spaces().unwrap());
assert!(scanner.skip_string("version='1.0'?>").unwrap());
assert!(scanner.skip_char('\n', None).unwrap());
assert!(scanner.skip_string("<!--").unwrap());
let mut comment = StringBuffer::new();
while scanner.scan_data("-->", &mut comment, 0).unwrap() {}
assert_eq!(comment.as_str(), "hi");
assert_eq!(scanner.line_number(), 2);
```

## Configuration

[`ScannerOptions`] controls buffer sizes, the XML version rules and the
encoding behaviour. Resource limits are configured on a
[`SecurityManager`], either through the API or from the environment (see
[`SecurityManager::from_env`]).
*/
pub mod bufq;
pub mod entity;
mod errctx;
pub mod error;
pub mod limits;
pub mod options;
pub mod reader;
pub mod reporter;
pub mod scanner;
pub mod sniff;
pub mod strings;
pub mod symbols;

#[cfg(test)]
mod tests;

#[doc(inline)]
pub use bufq::BufferQueue;
#[doc(inline)]
pub use entity::ScannedEntity;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use limits::{Limit, LimitAnalyzer, SecurityLimits, SecurityManager};
#[doc(inline)]
pub use options::{ScannerOptions, XMLVersion};
#[doc(inline)]
pub use reader::{CharRead, ReaderKind, StrReader};
#[doc(inline)]
pub use reporter::{ErrorReporter, LogReporter};
#[doc(inline)]
pub use scanner::{BufferListener, EntityHandler, EntityScanner, ListenerId, NameType, QName};
pub use strings::{StringBuffer, TextSpan};
pub use symbols::{Context, Symbol, SymbolTable};

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
