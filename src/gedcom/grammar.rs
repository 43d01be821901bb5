//! Lineage-linked grammar compilation
//!
//! A `.gedg` grammar file starts with header keyword lines
//! (`GEDCOM_VERSION=`, `GEDCOM_DATE=`, `GEDCOM_SOURCE=`,
//! `GEDCOM_DESCRIPTION=`), followed by structure definitions. Each
//! definition is a `NAME :=` line and either one flat block or several
//! variation blocks delimited by bare `[`, `|`, `]` lines. Comments
//! (`/* ... */`) are stripped and whitespace runs collapse to single
//! spaces before any parsing.
//!
//! A compiled [`Grammar`] is immutable and may be shared read-only across
//! any number of sequential parses.

pub mod block;
pub mod line;
pub mod structure;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

pub use block::GrammarBlock;
pub use line::GrammarLine;
pub use structure::GrammarStructure;

/// Required extension of grammar files.
pub const GRAMMAR_EXTENSION: &str = "gedg";

/// A grammar-file line paired with its 1-based line number.
pub type NumberedLine = (usize, String);

/// Compilation strictness. With `strict`, unrecognized tokens inside a
/// grammar line are fatal instead of logged and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GrammarOptions {
    pub strict: bool,
}

/// Errors surfaced while compiling a grammar file.
#[derive(Debug, Clone, PartialEq)]
pub enum GrammarError {
    Io(String),
    Extension(String),
    Header { line: usize, message: String },
    Line { line: usize, text: String, message: String },
    Structure { name: String, message: String },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::Io(message) => write!(f, "i/o error: {message}"),
            GrammarError::Extension(path) => {
                write!(f, "grammar file must have the .{GRAMMAR_EXTENSION} extension: {path}")
            }
            GrammarError::Header { line, message } => {
                write!(f, "malformed grammar header at line {line}: {message}")
            }
            GrammarError::Line { line, text, message } => {
                write!(f, "grammar line {line} ('{text}'): {message}")
            }
            GrammarError::Structure { name, message } => {
                write!(f, "structure {name}: {message}")
            }
        }
    }
}

impl std::error::Error for GrammarError {}

static STRUCTURE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z0-9_]+) ?:=$").expect("structure header pattern must compile"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern must compile"));

/// A compiled grammar: header metadata plus every named structure with
/// its variations, and an index from first-level ids to the variations
/// that can open with them.
#[derive(Debug, Clone)]
pub struct Grammar {
    version: String,
    date: Option<String>,
    source: String,
    description: String,
    root_name: String,
    structures: HashMap<String, Vec<GrammarStructure>>,
    variation_index: HashMap<String, HashMap<String, Vec<usize>>>,
}

impl Grammar {
    /// Compile the grammar file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P, options: GrammarOptions) -> Result<Self, GrammarError> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str());
        if extension != Some(GRAMMAR_EXTENSION) {
            return Err(GrammarError::Extension(path.display().to_string()));
        }
        let text =
            fs::read_to_string(path).map_err(|e| GrammarError::Io(format!("{}: {e}", path.display())))?;
        Self::from_text(&text, options)
    }

    /// Compile grammar text.
    pub fn from_text(text: &str, options: GrammarOptions) -> Result<Self, GrammarError> {
        let lines = normalize(text);

        let mut version = None;
        let mut date = None;
        let mut source = None;
        let mut description: Option<String> = None;

        let mut position = 0;
        while position < lines.len() {
            let (number, text) = &lines[position];
            if STRUCTURE_HEADER.is_match(text) {
                break;
            }
            if let Some(rest) = text.strip_prefix("GEDCOM_VERSION=") {
                version = Some(rest.to_owned());
            } else if let Some(rest) = text.strip_prefix("GEDCOM_DATE=") {
                date = Some(rest.to_owned());
            } else if let Some(rest) = text.strip_prefix("GEDCOM_SOURCE=") {
                source = Some(rest.to_owned());
            } else if let Some(rest) = text.strip_prefix("GEDCOM_DESCRIPTION=") {
                description = Some(rest.to_owned());
            } else if let Some(existing) = description.as_mut() {
                existing.push(' ');
                existing.push_str(text);
            } else {
                return Err(GrammarError::Header {
                    line: *number,
                    message: format!("unexpected line before structures: '{text}'"),
                });
            }
            position += 1;
        }

        let header_end = lines.get(position).map(|(n, _)| *n).unwrap_or(lines.len() + 1);
        let version = version.ok_or_else(|| missing_keyword(header_end, "GEDCOM_VERSION"))?;
        let source = source.ok_or_else(|| missing_keyword(header_end, "GEDCOM_SOURCE"))?;
        let description =
            description.ok_or_else(|| missing_keyword(header_end, "GEDCOM_DESCRIPTION"))?;

        let mut grammar = Grammar {
            version,
            date,
            source,
            description,
            root_name: String::new(),
            structures: HashMap::new(),
            variation_index: HashMap::new(),
        };

        let mut current: Option<(String, Vec<NumberedLine>)> = None;
        for (number, text) in &lines[position..] {
            if let Some(captures) = STRUCTURE_HEADER.captures(text) {
                if let Some((name, body)) = current.take() {
                    grammar.add_structures(&name, &body, options)?;
                }
                current = Some((captures[1].to_owned(), Vec::new()));
            } else if let Some((_, body)) = current.as_mut() {
                body.push((*number, text.clone()));
            } else {
                return Err(GrammarError::Header {
                    line: *number,
                    message: format!("expected a structure definition, found '{text}'"),
                });
            }
        }
        if let Some((name, body)) = current.take() {
            grammar.add_structures(&name, &body, options)?;
        }
        if grammar.root_name.is_empty() {
            return Err(GrammarError::Header {
                line: lines.len(),
                message: "grammar defines no structures".to_owned(),
            });
        }

        grammar.build_variation_index();
        Ok(grammar)
    }

    /// Compile one structure body, splitting `[` / `|` / `]` delimited
    /// variations when present.
    fn add_structures(
        &mut self,
        name: &str,
        body: &[NumberedLine],
        options: GrammarOptions,
    ) -> Result<(), GrammarError> {
        if self.root_name.is_empty() {
            self.root_name = name.to_owned();
        }

        let mut compiled = Vec::new();
        if body.first().map(|(_, t)| t.as_str()) == Some("[") {
            let mut variation: Vec<NumberedLine> = Vec::new();
            let mut closed = false;
            for (number, text) in &body[1..] {
                match text.as_str() {
                    "|" => {
                        compiled.push(GrammarStructure::new(name, &variation, options)?);
                        variation.clear();
                    }
                    "]" => {
                        compiled.push(GrammarStructure::new(name, &variation, options)?);
                        variation.clear();
                        closed = true;
                    }
                    _ if closed => {
                        return Err(GrammarError::Structure {
                            name: name.to_owned(),
                            message: format!("line {number} follows the closing variation bracket"),
                        });
                    }
                    _ => variation.push((*number, text.clone())),
                }
            }
            if !closed {
                return Err(GrammarError::Structure {
                    name: name.to_owned(),
                    message: "unterminated variation bracket".to_owned(),
                });
            }
        } else {
            compiled.push(GrammarStructure::new(name, body, options)?);
        }

        self.structures
            .entry(name.to_owned())
            .or_default()
            .extend(compiled);
        Ok(())
    }

    /// Index every first-level id of every variation for parse-time
    /// descent into structure references.
    fn build_variation_index(&mut self) {
        for (name, variations) in &self.structures {
            let entry = self.variation_index.entry(name.clone()).or_default();
            for (position, variation) in variations.iter().enumerate() {
                for id in variation.root_block().line_ids() {
                    entry.entry(id.to_owned()).or_default().push(position);
                }
            }
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The root structure: the first one defined in the grammar file.
    pub fn root_structure(&self) -> &GrammarStructure {
        &self.structures[&self.root_name][0]
    }

    /// All variations registered under `name`.
    pub fn variations(&self, name: &str) -> &[GrammarStructure] {
        self.structures.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Variations of `name` whose first level declares `id` directly.
    pub fn variations_with_id(&self, name: &str, id: &str) -> Vec<&GrammarStructure> {
        let Some(by_id) = self.variation_index.get(name) else {
            return Vec::new();
        };
        let Some(positions) = by_id.get(id) else {
            return Vec::new();
        };
        let variations = self.variations(name);
        positions.iter().map(|&p| &variations[p]).collect()
    }

    pub fn structure_names(&self) -> Vec<&str> {
        self.structures.keys().map(String::as_str).collect()
    }
}

fn missing_keyword(line: usize, keyword: &str) -> GrammarError {
    GrammarError::Header {
        line,
        message: format!("missing {keyword}= before the first structure"),
    }
}

/// Strip comments, collapse whitespace runs, and drop blank lines,
/// keeping 1-based line numbers.
fn normalize(text: &str) -> Vec<NumberedLine> {
    let mut in_comment = false;
    let mut lines = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let stripped = strip_comments(raw, &mut in_comment);
        let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
        let trimmed = collapsed.trim();
        if !trimmed.is_empty() {
            lines.push((index + 1, trimmed.to_owned()));
        }
    }
    lines
}

/// Remove `/* ... */` spans, tracking comments left open across lines.
fn strip_comments(raw: &str, in_comment: &mut bool) -> String {
    let mut out = String::new();
    let mut rest = raw;
    loop {
        if *in_comment {
            match rest.find("*/") {
                Some(position) => {
                    rest = &rest[position + 2..];
                    *in_comment = false;
                }
                None => return out,
            }
        } else {
            match rest.find("/*") {
                Some(position) => {
                    out.push_str(&rest[..position]);
                    rest = &rest[position + 2..];
                    *in_comment = true;
                }
                None => {
                    out.push_str(rest);
                    return out;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "GEDCOM_VERSION=5.5.1\n\
        GEDCOM_DATE=15 NOV 2019\n\
        GEDCOM_SOURCE=FamilySearch\n\
        GEDCOM_DESCRIPTION=The lineage-linked grammar\n";

    fn compile(text: &str) -> Grammar {
        Grammar::from_text(text, GrammarOptions::default()).unwrap()
    }

    #[test]
    fn test_header_metadata() {
        let grammar = compile(&format!("{HEADER}HEAD :=\nn HEAD {{1:1}}\n"));
        assert_eq!(grammar.version(), "5.5.1");
        assert_eq!(grammar.date(), Some("15 NOV 2019"));
        assert_eq!(grammar.source(), "FamilySearch");
        assert_eq!(grammar.description(), "The lineage-linked grammar");
    }

    #[test]
    fn test_multiline_description() {
        let text = format!(
            "GEDCOM_VERSION=5.5.1\nGEDCOM_SOURCE=X\nGEDCOM_DESCRIPTION=first part\n\
             and the rest\nHEAD :=\nn HEAD {{1:1}}\n"
        );
        let grammar = compile(&text);
        assert_eq!(grammar.description(), "first part and the rest");
    }

    #[test]
    fn test_missing_header_keyword_is_fatal() {
        let text = "GEDCOM_VERSION=5.5.1\nHEAD :=\nn HEAD {1:1}\n";
        let error = Grammar::from_text(text, GrammarOptions::default()).unwrap_err();
        assert!(matches!(error, GrammarError::Header { .. }));
    }

    #[test]
    fn test_root_structure_is_first_defined() {
        let text = format!(
            "{HEADER}GEDCOM_FILE :=\nn <<HEADER>> {{1:1}}\nn TRLR {{1:1}}\n\
             HEADER :=\nn HEAD {{1:1}}\n+1 SOUR <APPROVED_SYSTEM_ID> {{1:1}}\n"
        );
        let grammar = compile(&text);
        assert_eq!(grammar.root_structure().name(), "GEDCOM_FILE");
        assert_eq!(grammar.variations("HEADER").len(), 1);
    }

    #[test]
    fn test_variations() {
        let text = format!(
            "{HEADER}FAMILY_EVENT_STRUCTURE :=\n[\nn [ANUL|CENS|DIV|DIVF] {{1:1}}\n\
             |\nn MARR [Y|<NULL>] {{1:1}}\n]\n"
        );
        let grammar = compile(&text);
        let variations = grammar.variations("FAMILY_EVENT_STRUCTURE");
        assert_eq!(variations.len(), 2);
        assert!(variations[0].root_block().has_grammar_line("ANUL"));
        assert!(variations[1].root_block().has_grammar_line("MARR"));

        let with_marr = grammar.variations_with_id("FAMILY_EVENT_STRUCTURE", "MARR");
        assert_eq!(with_marr.len(), 1);
        assert!(grammar
            .variations_with_id("FAMILY_EVENT_STRUCTURE", "ENGA")
            .is_empty());
    }

    #[test]
    fn test_unterminated_variation_is_fatal() {
        let text = format!("{HEADER}S :=\n[\nn MARR {{1:1}}\n");
        assert!(Grammar::from_text(&text, GrammarOptions::default()).is_err());
    }

    #[test]
    fn test_comments_and_blank_lines_are_stripped() {
        let text = format!(
            "{HEADER}\n/* the root */\nHEAD := /* trailing */\n\nn HEAD {{1:1}}\n"
        );
        let grammar = compile(&text);
        assert_eq!(grammar.root_structure().name(), "HEAD");
    }

    #[test]
    fn test_multiline_comment() {
        let text = format!(
            "{HEADER}HEAD :=\n/* a comment\nspanning lines */\nn HEAD {{1:1}}\n"
        );
        let grammar = compile(&text);
        assert!(grammar.root_structure().root_block().has_grammar_line("HEAD"));
    }

    #[test]
    fn test_whitespace_collapse() {
        let text = format!("{HEADER}HEAD :=\nn   HEAD    {{1:1}}\n");
        let grammar = compile(&text);
        assert!(grammar.root_structure().root_block().has_grammar_line("HEAD"));
    }

    #[test]
    fn test_extension_is_required() {
        let error = Grammar::from_path("/tmp/grammar.txt", GrammarOptions::default()).unwrap_err();
        assert!(matches!(error, GrammarError::Extension(_)));
    }

    #[test]
    fn test_no_structures_is_fatal() {
        assert!(Grammar::from_text(HEADER, GrammarOptions::default()).is_err());
    }
}
