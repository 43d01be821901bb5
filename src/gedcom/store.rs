//! High-level load / query / write facade
//!
//! A [`Store`] combines a compiled grammar with one parsed data file:
//! it remembers the detected charset so a write reproduces the original
//! byte form, and exposes thin record accessors over the node tree.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::gedcom::encoding::{self, detector, Charset, EncodingError};
use crate::gedcom::grammar::{Grammar, GrammarError, GrammarOptions};
use crate::gedcom::node::{Flavor, Node};
use crate::gedcom::parser::{self, ParseError, DATA_EXTENSION};
use crate::gedcom::writer;

/// Errors from the load / write facade.
#[derive(Debug)]
pub enum StoreError {
    Grammar(GrammarError),
    Parse(ParseError),
    Encoding(EncodingError),
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Grammar(e) => write!(f, "grammar error: {e}"),
            StoreError::Parse(e) => write!(f, "parse error: {e}"),
            StoreError::Encoding(e) => write!(f, "encoding error: {e}"),
            StoreError::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<GrammarError> for StoreError {
    fn from(error: GrammarError) -> Self {
        StoreError::Grammar(error)
    }
}

impl From<ParseError> for StoreError {
    fn from(error: ParseError) -> Self {
        StoreError::Parse(error)
    }
}

impl From<EncodingError> for StoreError {
    fn from(error: EncodingError) -> Self {
        StoreError::Encoding(error)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::Io(error)
    }
}

/// A loaded GEDCOM file: grammar, tree and the charset it arrived in.
#[derive(Debug)]
pub struct Store {
    grammar: Grammar,
    root: Node,
    charset: Charset,
}

impl Store {
    /// Compile the grammar at `grammar_path` and parse the data file at
    /// `data_path` through it.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        grammar_path: P,
        data_path: Q,
    ) -> Result<Self, StoreError> {
        Self::load_with_options(grammar_path, data_path, GrammarOptions::default())
    }

    /// [`Store::load`] with explicit grammar strictness.
    pub fn load_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
        grammar_path: P,
        data_path: Q,
        options: GrammarOptions,
    ) -> Result<Self, StoreError> {
        let grammar = Grammar::from_path(grammar_path, options)?;
        let data_path = data_path.as_ref();
        let extension = data_path.extension().and_then(|e| e.to_str());
        if extension != Some(DATA_EXTENSION) {
            return Err(ParseError::Extension(data_path.display().to_string()).into());
        }
        let bytes = fs::read(data_path)?;
        Self::from_bytes(grammar, &bytes)
    }

    /// Parse in-memory bytes against an already compiled grammar.
    pub fn from_bytes(grammar: Grammar, bytes: &[u8]) -> Result<Self, StoreError> {
        let charset = detector::detect(bytes)?;
        let text = encoding::decode(bytes, charset);
        let root = parser::parse_text(&text, &grammar, Flavor::Gedcom)?;
        Ok(Store {
            grammar,
            root,
            charset,
        })
    }

    /// Serialize the tree back in the charset it was loaded with.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<(), StoreError> {
        writer::write_with_charset(&self.root, self.charset, out)?;
        Ok(())
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// The header record, when the file has one.
    pub fn header(&self) -> Option<&Node> {
        self.root.child_with_tag("HEAD")
    }

    /// All records carrying `tag`.
    pub fn records_with_tag(&self, tag: &str) -> Vec<&Node> {
        self.root.children_with_tag(tag)
    }

    fn record_with_id<'s>(&'s self, tag: &str, id: &str) -> Option<&'s Node> {
        self.root
            .children()
            .iter()
            .find(|r| r.tag() == tag && r.id() == Some(id))
    }

    pub fn individuals(&self) -> Vec<&Node> {
        self.records_with_tag("INDI")
    }

    pub fn individual(&self, id: &str) -> Option<&Node> {
        self.record_with_id("INDI", id)
    }

    pub fn families(&self) -> Vec<&Node> {
        self.records_with_tag("FAM")
    }

    pub fn family(&self, id: &str) -> Option<&Node> {
        self.record_with_id("FAM", id)
    }

    pub fn sources(&self) -> Vec<&Node> {
        self.records_with_tag("SOUR")
    }

    pub fn notes(&self) -> Vec<&Node> {
        self.records_with_tag("NOTE")
    }

    pub fn submitters(&self) -> Vec<&Node> {
        self.records_with_tag("SUBM")
    }
}
