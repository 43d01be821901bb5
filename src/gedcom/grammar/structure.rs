//! Named grammar structure
//!
//! A structure names one top-level block of the grammar file, e.g.
//! `FAMILY_EVENT_STRUCTURE`. Several structures may share a name — the
//! grammar keeps them as variations under that name.

use crate::gedcom::grammar::block::GrammarBlock;
use crate::gedcom::grammar::{GrammarError, GrammarOptions, NumberedLine};

/// One variation of a named structure: the name plus its root block.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarStructure {
    name: String,
    root_block: GrammarBlock,
}

impl GrammarStructure {
    /// Compile one structure body into its root block.
    pub fn new(
        name: &str,
        lines: &[NumberedLine],
        options: GrammarOptions,
    ) -> Result<Self, GrammarError> {
        let root_block = GrammarBlock::parse(lines, options).map_err(|source| {
            GrammarError::Structure {
                name: name.to_owned(),
                message: source.to_string(),
            }
        })?;
        Ok(GrammarStructure {
            name: name.to_owned(),
            root_block,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_block(&self) -> &GrammarBlock {
        &self.root_block
    }
}
