//! Physical-line tokenizer for GEDCOM data files
//!
//! A physical line has the fixed shape `LEVEL [@ID@] TAG [@XREF@] [VALUE]`
//! and is matched with a single capture-group pattern. Lines that do not
//! match (blank lines, leading whitespace, missing tag) produce no node;
//! the parser turns that into a numbered hard error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::gedcom::node::{Flavor, Node};

/// Fixed shape of one physical line. The value group is `(?s)` so an
/// already-joined multi-line value can pass through unharmed when a node
/// is built programmatically.
static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+) (?:@([^@ ]+)@ )?([A-Za-z0-9_.]+)(?: @([^@ ]+)@)?(?: (?s:(.*)))?$")
        .expect("line pattern must compile")
});

/// Parse one physical line into a node, or `None` when the line does not
/// match the GEDCOM line shape.
pub fn parse_line(text: &str, flavor: Flavor) -> Option<Node> {
    let captures = LINE_PATTERN.captures(text)?;

    let level: i32 = captures.get(1)?.as_str().parse().ok()?;
    let tag = captures.get(3)?.as_str();
    if tag.is_empty() {
        return None;
    }

    let mut node = Node::with_flavor(tag, flavor);
    node.set_level(level);
    node.set_id(captures.get(2).map(|m| m.as_str()));
    node.set_xref(captures.get(4).map(|m| m.as_str()));
    if let Some(value) = captures.get(5) {
        let unescaped = unescape_at(value.as_str());
        node.set_raw_value(Some(&unescaped));
    }
    Some(node)
}

/// Undo the writer's `@` escaping so file round-trips are lossless.
fn unescape_at(value: &str) -> String {
    value.replace("@@", "@")
}
