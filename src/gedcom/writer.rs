//! Lossless GEDCOM serializer
//!
//! Reconstitutes the exact textual form of a node tree: one line per
//! node in pre-order, values written raw (continuation children are
//! their own lines), `@` escaped as `@@`, and the EOL and byte encoding
//! derived from the tree's own header charset declaration. Field order
//! differs between record level and nested lines — `LEVEL [@ID@] TAG`
//! at level 0 but `LEVEL TAG [@XREF@] [@ID@]` below — and both are
//! preserved for format compatibility.

use std::io::{self, Write};

use tracing::warn;

use crate::gedcom::encoding::{self, detector, Charset};
use crate::gedcom::node::Node;

/// Charset to serialize with, read from the tree's own `HEAD.CHAR`
/// declaration and run through the same vendor corrections as
/// detection. Defaults to ANSEL when undeclared or unusable.
pub fn charset_of(root: &Node) -> Charset {
    let Some(head) = root.child_with_tag("HEAD") else {
        return Charset::Ansel;
    };
    let declared = head
        .child_with_tag("CHAR")
        .or_else(|| head.child_with_tag("CHARACTER"))
        .and_then(Node::value);
    let Some(declared) = declared else {
        return Charset::Ansel;
    };
    let source = head.child_with_tag("SOUR").and_then(Node::value);
    match detector::correct(&declared, source.as_deref(), None) {
        Ok(charset) => charset,
        Err(error) => {
            warn!(%error, "writing with the ANSEL fallback");
            Charset::Ansel
        }
    }
}

/// Serialize the tree to its textual form using the charset's EOL.
pub fn to_text(root: &Node, charset: Charset) -> String {
    let mut out = String::new();
    for record in root.children() {
        emit(record, charset.eol(), &mut out);
    }
    out
}

/// Serialize and encode the tree, charset derived from the tree itself.
pub fn write<W: Write>(root: &Node, out: &mut W) -> io::Result<()> {
    write_with_charset(root, charset_of(root), out)
}

/// Serialize and encode the tree with an explicit charset.
pub fn write_with_charset<W: Write>(root: &Node, charset: Charset, out: &mut W) -> io::Result<()> {
    let text = to_text(root, charset);
    out.write_all(&encoding::encode(&text, charset))
}

fn emit(node: &Node, eol: &str, out: &mut String) {
    out.push_str(&node.level().to_string());
    if node.level() == 0 {
        if let Some(id) = node.id() {
            out.push_str(" @");
            out.push_str(id);
            out.push('@');
        }
        out.push(' ');
        out.push_str(node.tag());
    } else {
        out.push(' ');
        out.push_str(node.tag());
        if let Some(xref) = node.xref() {
            out.push_str(" @");
            out.push_str(xref);
            out.push('@');
        }
        if let Some(id) = node.id() {
            out.push_str(" @");
            out.push_str(id);
            out.push('@');
        }
    }
    if let Some(value) = node.raw_value() {
        out.push(' ');
        out.push_str(&value.replace('@', "@@"));
    }
    out.push_str(eol);
    for child in node.children() {
        emit(child, eol, out);
    }
}
