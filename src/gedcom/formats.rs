//! Output formats for a parsed node tree
//!
//! Two inspection formats next to the native writer: a JSON rendering of
//! the tree and a treeviz view (one line per node, two-space indentation
//! per level, values truncated for quick scanning).

use crate::gedcom::node::Node;

/// How many value characters a treeviz line shows before truncating.
const TREEVIZ_VALUE_LEN: usize = 40;

/// Pretty-printed JSON rendering of the tree.
pub fn to_json(root: &Node) -> String {
    serde_json::to_string_pretty(root).unwrap_or_default()
}

/// One line per node: indentation for nesting, then tag, id/xref and a
/// truncated value.
pub fn to_treeviz_str(root: &Node) -> String {
    let mut out = String::new();
    for record in root.children() {
        emit(record, 0, &mut out);
    }
    out
}

fn emit(node: &Node, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(node.tag());
    if let Some(id) = node.id() {
        out.push_str(&format!(" @{id}@"));
    }
    if let Some(xref) = node.xref() {
        out.push_str(&format!(" -> @{xref}@"));
    }
    if let Some(value) = node.raw_value() {
        out.push(' ');
        if value.chars().count() > TREEVIZ_VALUE_LEN {
            let truncated: String = value.chars().take(TREEVIZ_VALUE_LEN).collect();
            out.push_str(&truncated);
            out.push('…');
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
    for child in node.children() {
        emit(child, depth + 1, out);
    }
}
