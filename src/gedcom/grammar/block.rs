//! Sibling grouping of grammar lines
//!
//! A block is the ordered run of grammar lines sharing one leading level
//! token (`n` or `+K`). Lines with a different leading token buffer into a
//! pending sub-block that attaches to the most recent sibling when the
//! next same-level line (or the end of input) is reached.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::gedcom::grammar::line::GrammarLine;
use crate::gedcom::grammar::{GrammarError, GrammarOptions, NumberedLine};

static LEVEL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(n|\+[1-9][0-9]?)$").expect("level token pattern must compile"));

/// Ordered grammar lines at one nesting level, with an id index.
///
/// The index keeps every line declaring an id, in declaration order, so
/// overlapping tag sets resolve to the earliest declaration instead of
/// last-writer-wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrammarBlock {
    lines: Vec<GrammarLine>,
    index: HashMap<String, Vec<usize>>,
}

impl GrammarBlock {
    /// Parse the lines of one block, recursing into sub-blocks. Empty
    /// input yields an empty block.
    pub fn parse(lines: &[NumberedLine], options: GrammarOptions) -> Result<Self, GrammarError> {
        let mut block = GrammarBlock::default();
        let Some((first_number, first_text)) = lines.first() else {
            return Ok(block);
        };

        let token = first_text.split(' ').next().unwrap_or_default();
        if !LEVEL_TOKEN.is_match(token) {
            return Err(GrammarError::Line {
                line: *first_number,
                text: first_text.clone(),
                message: format!("expected a level token, found '{token}'"),
            });
        }
        let prefix = format!("{token} ");

        let mut pending: Vec<NumberedLine> = Vec::new();
        for (number, text) in lines {
            if let Some(rest) = text.strip_prefix(&prefix) {
                block.flush_pending(&mut pending, options)?;
                let line = GrammarLine::parse(rest, *number, options)?;
                block.push_line(line);
            } else {
                pending.push((*number, text.clone()));
            }
        }
        block.flush_pending(&mut pending, options)?;
        Ok(block)
    }

    fn flush_pending(
        &mut self,
        pending: &mut Vec<NumberedLine>,
        options: GrammarOptions,
    ) -> Result<(), GrammarError> {
        if pending.is_empty() {
            return Ok(());
        }
        let sub_block = GrammarBlock::parse(pending, options)?;
        let owner = self.lines.last_mut().ok_or_else(|| GrammarError::Line {
            line: pending[0].0,
            text: pending[0].1.clone(),
            message: "nested line with no preceding sibling".to_owned(),
        })?;
        owner.set_child_block(sub_block);
        pending.clear();
        Ok(())
    }

    fn push_line(&mut self, line: GrammarLine) {
        let position = self.lines.len();
        if let Some(name) = line.structure_name() {
            self.index.entry(name.to_owned()).or_default().push(position);
        } else {
            for tag in line.tag_names() {
                self.index.entry(tag.to_owned()).or_default().push(position);
            }
        }
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[GrammarLine] {
        &self.lines
    }

    /// First line declaring `id` (a tag or a structure name).
    pub fn grammar_line(&self, id: &str) -> Option<&GrammarLine> {
        self.index
            .get(id)
            .and_then(|positions| positions.first())
            .map(|&p| &self.lines[p])
    }

    /// Every line declaring `id`, in declaration order.
    pub fn grammar_lines(&self, id: &str) -> Vec<&GrammarLine> {
        self.index
            .get(id)
            .map(|positions| positions.iter().map(|&p| &self.lines[p]).collect())
            .unwrap_or_default()
    }

    pub fn has_grammar_line(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All ids declared by this block's lines.
    pub fn line_ids(&self) -> Vec<&str> {
        self.index.keys().map(String::as_str).collect()
    }

    /// Whether any line at this level requires at least one occurrence.
    pub fn has_mandatory_lines(&self) -> bool {
        self.lines.iter().any(GrammarLine::mandatory)
    }

    /// Position of `line` among this block's lines, by identity.
    pub fn position(&self, line: &GrammarLine) -> Option<usize> {
        self.lines.iter().position(|l| std::ptr::eq(l, line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(lines: &[&str]) -> Vec<NumberedLine> {
        lines
            .iter()
            .enumerate()
            .map(|(i, l)| (i + 1, (*l).to_owned()))
            .collect()
    }

    #[test]
    fn test_empty_input_is_empty_block() {
        let block = GrammarBlock::parse(&[], GrammarOptions::default()).unwrap();
        assert!(block.lines().is_empty());
    }

    #[test]
    fn test_flat_block() {
        let block = GrammarBlock::parse(
            &numbered(&["n HUSB @<XREF:INDI>@ {0:1}", "n WIFE @<XREF:INDI>@ {0:1}"]),
            GrammarOptions::default(),
        )
        .unwrap();
        assert_eq!(block.lines().len(), 2);
        assert!(block.has_grammar_line("HUSB"));
        assert!(block.has_grammar_line("WIFE"));
    }

    #[test]
    fn test_nested_sub_block() {
        let block = GrammarBlock::parse(
            &numbered(&[
                "n HEAD {1:1}",
                "+1 SOUR <APPROVED_SYSTEM_ID> {1:1}",
                "+2 VERS <VERSION_NUMBER> {0:1}",
                "n TRLR {1:1}",
            ]),
            GrammarOptions::default(),
        )
        .unwrap();

        assert_eq!(block.lines().len(), 2);
        let head = block.grammar_line("HEAD").unwrap();
        let sour_block = head.child_block().unwrap();
        assert!(sour_block.has_grammar_line("SOUR"));
        let sour = sour_block.grammar_line("SOUR").unwrap();
        assert!(sour.child_block().unwrap().has_grammar_line("VERS"));
        assert!(block.grammar_line("TRLR").unwrap().child_block().is_none());
    }

    #[test]
    fn test_index_keeps_declaration_order_on_collision() {
        let block = GrammarBlock::parse(
            &numbered(&["n EVEN <EVENT_DESCRIPTOR> {0:1}", "n EVEN {0:M}"]),
            GrammarOptions::default(),
        )
        .unwrap();

        let all = block.grammar_lines("EVEN");
        assert_eq!(all.len(), 2);
        let first = block.grammar_line("EVEN").unwrap();
        assert_eq!(block.position(first), Some(0));
    }

    #[test]
    fn test_mandatory_lines() {
        let block = GrammarBlock::parse(
            &numbered(&["n CHIL @<XREF:INDI>@ {0:M}"]),
            GrammarOptions::default(),
        )
        .unwrap();
        assert!(!block.has_mandatory_lines());

        let block = GrammarBlock::parse(
            &numbered(&["n FAMC @<XREF:FAM>@ {1:1}"]),
            GrammarOptions::default(),
        )
        .unwrap();
        assert!(block.has_mandatory_lines());
    }

    #[test]
    fn test_line_ids_cover_alternatives() {
        let block = GrammarBlock::parse(
            &numbered(&["n [BIRT|CHR] <Y> {1:1}"]),
            GrammarOptions::default(),
        )
        .unwrap();
        let mut ids = block.line_ids();
        ids.sort_unstable();
        assert_eq!(ids, vec!["BIRT", "CHR"]);
    }

    #[test]
    fn test_bad_level_token_is_fatal() {
        let result = GrammarBlock::parse(
            &numbered(&["x HEAD {1:1}"]),
            GrammarOptions::default(),
        );
        assert!(result.is_err());
    }
}
