//! GEDCOM engine
//!
//! Two-phase processing of genealogy data:
//!
//! 1. **Grammar compilation** — a lineage-linked grammar file (`.gedg`)
//!    compiles into an in-memory [`grammar::Grammar`]: named structures,
//!    their variations, nested blocks and per-line cardinalities.
//! 2. **Data parsing** — a `.ged` byte stream is charset-sniffed
//!    ([`encoding::detector`]), decoded ([`encoding`], including the
//!    ANSEL codec), tokenized line by line ([`lexer`]) and streamed
//!    through the grammar ([`parser`]) into a generic [`node::Node`]
//!    tree, which serializes back losslessly ([`writer`]).
//!
//! [`store::Store`] bundles both phases behind a load / query / write
//! facade.

pub mod encoding;
pub mod formats;
pub mod grammar;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod store;
pub mod writer;

pub use encoding::{Charset, EncodingError};
pub use grammar::{Grammar, GrammarError, GrammarOptions};
pub use node::{Flavor, Node};
pub use parser::ParseError;
pub use store::{Store, StoreError};
