//! Streaming tree builder
//!
//! Consumes the decoded line stream and builds the node tree under the
//! guidance of a compiled [`Grammar`]. Two parallel stacks track the
//! currently open nodes and their grammar contexts; they grow and shrink
//! together, so every open tag has a grammar context (or the permissive
//! custom case). The tree is built bottom-up: a node attaches to its
//! parent when it closes, which renumbers its subtree and keeps the
//! level invariant.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::gedcom::encoding::{self, detector, EncodingError};
use crate::gedcom::grammar::line::UNBOUNDED;
use crate::gedcom::grammar::{Grammar, GrammarBlock, GrammarLine};
use crate::gedcom::lexer;
use crate::gedcom::node::{Flavor, Node};

/// Required extension of data files.
pub const DATA_EXTENSION: &str = "ged";

/// Errors surfaced while parsing a data file. Every variant tied to an
/// input line carries its 1-based number.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Io(String),
    Extension(String),
    Encoding(EncodingError),
    Malformed { line: usize },
    LevelJump { line: usize, from: i32, to: i32 },
    UnexpectedTag { line: usize, tag: String },
    Cardinality { line: usize, id: String, min: i32, max: i32 },
    Unbalanced,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io(message) => write!(f, "i/o error: {message}"),
            ParseError::Extension(path) => {
                write!(f, "data file must have the .{DATA_EXTENSION} extension: {path}")
            }
            ParseError::Encoding(error) => write!(f, "{error}"),
            ParseError::Malformed { line } => {
                write!(f, "line {line} does not match the GEDCOM line shape")
            }
            ParseError::LevelJump { line, from, to } => {
                write!(f, "line {line} jumps from level {from} to level {to}")
            }
            ParseError::UnexpectedTag { line, tag } => {
                write!(f, "line {line}: tag {tag} is not allowed here and is not a custom tag")
            }
            ParseError::Cardinality { line, id, min, max } => {
                write!(f, "line {line}: {id} violates its {{{min}:{max}}} cardinality")
            }
            ParseError::Unbalanced => write!(f, "tags not properly closed"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<EncodingError> for ParseError {
    fn from(error: EncodingError) -> Self {
        ParseError::Encoding(error)
    }
}

/// Grammar position of one open node. The custom case is the permissive
/// fallback for vendor-extension subtrees; it enforces nothing.
#[derive(Debug, Clone, Copy)]
enum GrammarContext<'g> {
    Block(&'g GrammarBlock),
    Line(&'g GrammarLine),
    Custom,
}

/// Parse the data file at `path` against `grammar`.
pub fn parse_path<P: AsRef<Path>>(
    path: P,
    grammar: &Grammar,
    flavor: Flavor,
) -> Result<Node, ParseError> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|e| e.to_str());
    if extension != Some(DATA_EXTENSION) {
        return Err(ParseError::Extension(path.display().to_string()));
    }
    let bytes = fs::read(path).map_err(|e| ParseError::Io(format!("{}: {e}", path.display())))?;
    parse_bytes(&bytes, grammar, flavor)
}

/// Detect the charset of `bytes`, decode, and parse.
pub fn parse_bytes(bytes: &[u8], grammar: &Grammar, flavor: Flavor) -> Result<Node, ParseError> {
    let charset = detector::detect(bytes)?;
    let text = encoding::decode(bytes, charset);
    parse_text(&text, grammar, flavor)
}

/// Parse already-decoded text against `grammar`.
pub fn parse_text(text: &str, grammar: &Grammar, flavor: Flavor) -> Result<Node, ParseError> {
    let mut nodes: Vec<Node> = vec![Node::root(flavor)];
    let mut contexts: Vec<GrammarContext> =
        vec![GrammarContext::Block(grammar.root_structure().root_block())];
    let mut previous_level: i32 = nodes[0].level();
    let mut line_count = 0;

    // all three EOL conventions are accepted; a trailing EOL does not
    // produce a final empty line, but blank lines anywhere else fail as
    // malformed below
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = normalized.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }

    for (index, line) in lines.into_iter().enumerate() {
        let number = index + 1;
        line_count = number;
        let node =
            lexer::parse_line(line, flavor).ok_or(ParseError::Malformed { line: number })?;
        let level = node.level();
        if level > previous_level + 1 {
            return Err(ParseError::LevelJump {
                line: number,
                from: previous_level,
                to: level,
            });
        }

        while level <= previous_level {
            if close(&mut nodes, &mut contexts, number)?.is_some() {
                return Err(ParseError::Unbalanced);
            }
            previous_level -= 1;
        }

        let current = *contexts.last().ok_or(ParseError::Unbalanced)?;
        let context = resolve(grammar, current, node.tag(), node.is_custom()).ok_or_else(|| {
            ParseError::UnexpectedTag {
                line: number,
                tag: node.tag().to_owned(),
            }
        })?;
        nodes.push(node);
        contexts.push(context);
        if nodes.len() != contexts.len() {
            return Err(ParseError::Unbalanced);
        }
        previous_level = level;
    }

    loop {
        if let Some(root) = close(&mut nodes, &mut contexts, line_count)? {
            if !nodes.is_empty() || !contexts.is_empty() {
                return Err(ParseError::Unbalanced);
            }
            return Ok(root);
        }
    }
}

/// Close the top frame of both stacks: validate the grammar position,
/// then attach the node to its parent — or, for the synthetic root,
/// return the finished tree.
fn close<'g>(
    nodes: &mut Vec<Node>,
    contexts: &mut Vec<GrammarContext<'g>>,
    line: usize,
) -> Result<Option<Node>, ParseError> {
    let node = nodes.pop().ok_or(ParseError::Unbalanced)?;
    let context = contexts.pop().ok_or(ParseError::Unbalanced)?;

    // the legacy per-occurrence bound: closing a single occurrence only
    // checks that one occurrence is admissible, sibling totals are not
    // aggregated
    if let GrammarContext::Line(grammar_line) = context {
        let min = grammar_line.min();
        let max = grammar_line.max();
        if min > 1 || (max != UNBOUNDED && max < 1) {
            return Err(ParseError::Cardinality {
                line,
                id: grammar_line.id(),
                min,
                max,
            });
        }
    }

    match nodes.last_mut() {
        Some(parent) => {
            parent.add_child(node);
            Ok(None)
        }
        None => Ok(Some(node)),
    }
}

/// Resolve the grammar context governing a child tag under `context`.
/// `None` means the tag is illegal here.
fn resolve<'g>(
    grammar: &'g Grammar,
    context: GrammarContext<'g>,
    tag: &str,
    custom: bool,
) -> Option<GrammarContext<'g>> {
    let found = match context {
        GrammarContext::Custom => return Some(GrammarContext::Custom),
        GrammarContext::Line(line) => line
            .child_block()
            .and_then(|block| find_in_block(grammar, block, tag, &mut HashSet::new())),
        GrammarContext::Block(block) => find_in_block(grammar, block, tag, &mut HashSet::new()),
    };
    match found {
        Some(line) => Some(GrammarContext::Line(line)),
        None if custom => Some(GrammarContext::Custom),
        None => None,
    }
}

/// Search a block's lines for `tag`, descending into referenced named
/// structures across all their variations. The visited set guards
/// against structure-reference cycles.
fn find_in_block<'g>(
    grammar: &'g Grammar,
    block: &'g GrammarBlock,
    tag: &str,
    visited: &mut HashSet<&'g str>,
) -> Option<&'g GrammarLine> {
    for line in block.lines() {
        if line.has_tag(tag) {
            return Some(line);
        }
        let Some(name) = line.structure_name() else {
            continue;
        };
        if !visited.insert(name) {
            continue;
        }
        for variation in grammar.variations_with_id(name, tag) {
            if let Some(found) = variation.root_block().grammar_line(tag) {
                debug!(structure = name, tag, "descended into structure");
                return Some(found);
            }
        }
        for variation in grammar.variations(name) {
            if let Some(found) = find_in_block(grammar, variation.root_block(), tag, visited) {
                return Some(found);
            }
        }
    }
    None
}
