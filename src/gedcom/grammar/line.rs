//! Grammar-definition line parser
//!
//! One line of the lineage-linked grammar describes either a reference to
//! a named structure (`<<STRUCTURE_NAME>>`) or a tag definition (tag
//! names, optional xref/value shapes), always with a `{min:max}`
//! cardinality. The raw text is tokenized with a small logos alphabet and
//! the tokens are classified in a second pass.

use std::collections::BTreeSet;
use std::fmt;

use logos::Logos;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::gedcom::grammar::block::GrammarBlock;
use crate::gedcom::grammar::{GrammarError, GrammarOptions};

/// Unbounded cardinality, written `M` in the grammar.
pub const UNBOUNDED: i32 = -1;

/// Token shapes of one grammar-definition line, in priority order.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+")]
enum ShapeToken {
    /// `{min:max}`, `max` may be the literal `M`
    #[regex(r"\{\d+:(\d+|M)\}", |lex| lex.slice().to_owned())]
    Cardinality(String),

    /// `<<STRUCTURE_NAME>>`
    #[regex(r"<<[A-Z0-9_]+>>", |lex| lex.slice().to_owned())]
    StructureRef(String),

    /// `@<XREF:KIND>@`
    #[regex(r"@<[A-Z0-9_:]+>@", |lex| lex.slice().to_owned())]
    XRefType(String),

    /// `<VALUE_NAME>`
    #[regex(r"<[A-Z0-9_:]+>", |lex| lex.slice().to_owned())]
    ValueType(String),

    /// `[A|B|...]` — classified afterwards by its element shapes
    #[regex(r"\[[^\[\]]+\]", |lex| lex.slice().to_owned())]
    Alternatives(String),

    /// bare tag name
    #[regex(r"[A-Z_][A-Z0-9_]*", |lex| lex.slice().to_owned())]
    Tag(String),
}

static XREF_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@<[A-Z0-9_:]+>@$").expect("xref element pattern must compile"));
static VALUE_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<[A-Z0-9_:]+>$").expect("value element pattern must compile"));
static TAG_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("tag element pattern must compile"));

/// One parsed grammar-definition line.
///
/// Exactly one of `structure_name` and the tag-name sets is populated: a
/// line references a structure or defines tags, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarLine {
    min: i32,
    max: i32,
    structure_name: Option<String>,
    tag_names_before_xref: BTreeSet<String>,
    tag_names_after_xref: BTreeSet<String>,
    xref_names: BTreeSet<String>,
    value_names: BTreeSet<String>,
    value_possibilities: BTreeSet<Option<String>>,
    child_block: Option<GrammarBlock>,
    original_text: String,
}

impl GrammarLine {
    /// Parse one already-normalized grammar line (whitespace collapsed,
    /// comment stripped, leading level token removed).
    pub fn parse(
        text: &str,
        line_number: usize,
        options: GrammarOptions,
    ) -> Result<GrammarLine, GrammarError> {
        let mut line = GrammarLine {
            min: 0,
            max: UNBOUNDED,
            structure_name: None,
            tag_names_before_xref: BTreeSet::new(),
            tag_names_after_xref: BTreeSet::new(),
            xref_names: BTreeSet::new(),
            value_names: BTreeSet::new(),
            value_possibilities: BTreeSet::new(),
            child_block: None,
            original_text: text.to_owned(),
        };

        let mut lexer = ShapeToken::lexer(text);
        let mut tokens = Vec::new();
        while let Some(result) = lexer.next() {
            match result {
                Ok(token) => tokens.push(token),
                Err(()) => {
                    if options.strict {
                        return Err(GrammarError::Line {
                            line: line_number,
                            text: text.to_owned(),
                            message: format!("unrecognized token '{}'", lexer.slice()),
                        });
                    }
                    warn!(line = line_number, token = lexer.slice(), "skipping unrecognized grammar token");
                }
            }
        }

        if tokens.is_empty() || tokens.len() > 4 {
            return Err(GrammarError::Line {
                line: line_number,
                text: text.to_owned(),
                message: format!("expected 1 to 4 tokens, found {}", tokens.len()),
            });
        }

        let mut seen_xref = false;
        let mut previous_was_tag = false;
        for token in tokens {
            let mut was_tag = false;
            match token {
                ShapeToken::Cardinality(text) => line.apply_cardinality(&text),
                ShapeToken::StructureRef(text) => {
                    line.structure_name = Some(strip(&text, 2).to_owned());
                }
                ShapeToken::XRefType(text) => {
                    line.xref_names.insert(strip(&text, 2).to_owned());
                    seen_xref = true;
                }
                ShapeToken::ValueType(text) => {
                    line.value_names.insert(strip(&text, 1).to_owned());
                }
                ShapeToken::Tag(text) => {
                    line.add_tag(text, seen_xref);
                    was_tag = true;
                }
                ShapeToken::Alternatives(text) => {
                    let outcome = line.apply_alternatives(
                        &text,
                        line_number,
                        seen_xref,
                        previous_was_tag,
                        options,
                    )?;
                    seen_xref |= outcome.introduced_xref;
                    was_tag = outcome.is_tag_list;
                }
            }
            previous_was_tag = was_tag;
        }

        if line.structure_name.is_some() && line.has_tags() {
            return Err(GrammarError::Line {
                line: line_number,
                text: text.to_owned(),
                message: "a line is either a structure reference or a tag definition".to_owned(),
            });
        }

        Ok(line)
    }

    fn apply_cardinality(&mut self, token: &str) {
        let inner = strip(token, 1);
        if let Some((min, max)) = inner.split_once(':') {
            self.min = min.parse().unwrap_or(0);
            self.max = if max == "M" {
                UNBOUNDED
            } else {
                max.parse().unwrap_or(UNBOUNDED)
            };
        }
    }

    /// Classify a `[...]` token by its element shapes.
    fn apply_alternatives(
        &mut self,
        token: &str,
        line_number: usize,
        seen_xref: bool,
        follows_tag: bool,
        options: GrammarOptions,
    ) -> Result<AlternativesOutcome, GrammarError> {
        let elements: Vec<&str> = strip(token, 1).split('|').collect();

        if elements.iter().all(|e| XREF_ELEMENT.is_match(e)) {
            for element in elements {
                self.xref_names.insert(strip(element, 2).to_owned());
            }
            return Ok(AlternativesOutcome {
                introduced_xref: true,
                is_tag_list: false,
            });
        }
        if elements.iter().all(|e| VALUE_ELEMENT.is_match(e)) {
            for element in elements {
                self.value_names.insert(strip(element, 1).to_owned());
            }
            return Ok(AlternativesOutcome::default());
        }
        if follows_tag {
            for element in elements {
                if element == "NULL" || element == "<NULL>" {
                    self.value_possibilities.insert(None);
                } else {
                    self.value_possibilities.insert(Some(element.to_owned()));
                }
            }
            return Ok(AlternativesOutcome::default());
        }
        for element in elements {
            if TAG_ELEMENT.is_match(element) {
                self.add_tag(element.to_owned(), seen_xref);
            } else if options.strict {
                return Err(GrammarError::Line {
                    line: line_number,
                    text: self.original_text.clone(),
                    message: format!("unrecognized alternative '{element}'"),
                });
            } else {
                warn!(line = line_number, token = element, "skipping unrecognized alternative");
            }
        }
        Ok(AlternativesOutcome {
            introduced_xref: false,
            is_tag_list: true,
        })
    }

    fn add_tag(&mut self, tag: String, seen_xref: bool) {
        if seen_xref {
            self.tag_names_after_xref.insert(tag);
        } else {
            self.tag_names_before_xref.insert(tag);
        }
    }

    /// Identity used for indexing and display: the structure name, or the
    /// bracketed pipe-joined tag list.
    pub fn id(&self) -> String {
        if let Some(name) = &self.structure_name {
            return name.clone();
        }
        let tags: Vec<&str> = self.tag_names().collect();
        format!("[{}]", tags.join("|"))
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    /// Whether at least one occurrence is required.
    pub fn mandatory(&self) -> bool {
        self.min > 0
    }

    pub fn structure_name(&self) -> Option<&str> {
        self.structure_name.as_deref()
    }

    /// All tag names, before- and after-xref buckets chained.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tag_names_before_xref
            .iter()
            .chain(self.tag_names_after_xref.iter())
            .map(String::as_str)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_names_before_xref.contains(tag) || self.tag_names_after_xref.contains(tag)
    }

    fn has_tags(&self) -> bool {
        !self.tag_names_before_xref.is_empty() || !self.tag_names_after_xref.is_empty()
    }

    pub fn has_tag_before_xref(&self) -> bool {
        !self.tag_names_before_xref.is_empty()
    }

    pub fn has_tag_after_xref(&self) -> bool {
        !self.tag_names_after_xref.is_empty()
    }

    pub fn xref_names(&self) -> &BTreeSet<String> {
        &self.xref_names
    }

    pub fn value_names(&self) -> &BTreeSet<String> {
        &self.value_names
    }

    pub fn value_possibilities(&self) -> &BTreeSet<Option<String>> {
        &self.value_possibilities
    }

    pub fn child_block(&self) -> Option<&GrammarBlock> {
        self.child_block.as_ref()
    }

    /// One-time attachment of the nested block, during block compilation.
    pub(crate) fn set_child_block(&mut self, block: GrammarBlock) {
        debug_assert!(self.child_block.is_none(), "child block assigned twice");
        self.child_block = Some(block);
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }
}

impl fmt::Display for GrammarLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let max = if self.max == UNBOUNDED {
            "M".to_owned()
        } else {
            self.max.to_string()
        };
        write!(f, "{} {{{}:{}}}", self.id(), self.min, max)
    }
}

/// How a `[...]` token was classified.
#[derive(Default)]
struct AlternativesOutcome {
    introduced_xref: bool,
    is_tag_list: bool,
}

/// Strip `n` characters from both ends of a delimiter-wrapped token.
fn strip(token: &str, n: usize) -> &str {
    &token[n..token.len() - n]
}
