//! Generic GEDCOM tree node
//!
//! Every parsed line becomes one `Node`: a level, an optional record id, a
//! tag, an optional cross-reference and an optional value, plus ordered
//! children. The tree is flavor-aware: the [`Flavor`] selects how logical
//! multi-line values map onto continuation children (`CONC`/`CONT` for
//! GEDCOM, `NEW_LINE` for FLEF), while every other behavior is shared.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

/// Maximum length of a physical GEDCOM line.
const MAX_PHYSICAL_LINE: usize = 255;

/// Level digits, the continuation tag and the two separating spaces.
const CONTINUATION_OVERHEAD: usize = 8;

/// Longest value chunk that still fits on one physical line next to a
/// continuation tag.
const CHUNK_LEN: usize = MAX_PHYSICAL_LINE - CONTINUATION_OVERHEAD;

/// Level assigned to the synthetic root that holds all records.
pub const ROOT_LEVEL: i32 = -1;

/// Tag of the synthetic root node.
pub const ROOT_TAG: &str = "ROOT";

/// Continuation semantics for multi-line values.
///
/// `Gedcom` splits a logical value on embedded newlines into `CONT`
/// children and additionally on physical line length into `CONC`
/// children. `Flef` splits on embedded newlines only, into `NEW_LINE`
/// children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Flavor {
    #[default]
    Gedcom,
    Flef,
}

impl Flavor {
    /// Whether `tag` is one of this flavor's continuation tags.
    pub fn is_continuation(&self, tag: &str) -> bool {
        match self {
            Flavor::Gedcom => tag == "CONC" || tag == "CONT",
            Flavor::Flef => tag == "NEW_LINE",
        }
    }

    /// Whether a continuation child with `tag` starts a new logical line.
    fn starts_new_line(&self, tag: &str) -> bool {
        match self {
            Flavor::Gedcom => tag == "CONT",
            Flavor::Flef => tag == "NEW_LINE",
        }
    }

    /// Tag that continues the value on a new logical line.
    fn newline_tag(&self) -> &'static str {
        match self {
            Flavor::Gedcom => "CONT",
            Flavor::Flef => "NEW_LINE",
        }
    }

    /// Chunk length for same-line splitting, if the flavor splits on length.
    fn chunk_len(&self) -> Option<usize> {
        match self {
            Flavor::Gedcom => Some(CHUNK_LEN),
            Flavor::Flef => None,
        }
    }
}

/// One node of the generic GEDCOM tree.
///
/// Invariant: every child's level is `parent.level + 1`; [`Node::add_child`]
/// renumbers the attached subtree to keep this true. Equality and hashing
/// cover `(tag, xref, value, children)` only — two structurally identical
/// subtrees compare equal regardless of the record ids or levels they were
/// assigned.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    level: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    xref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
    custom: bool,
    #[serde(skip)]
    flavor: Flavor,
}

impl Node {
    /// Create a node with the default (GEDCOM) flavor at level 0.
    pub fn new(tag: &str) -> Self {
        Self::with_flavor(tag, Flavor::Gedcom)
    }

    /// Create a node with an explicit flavor at level 0.
    pub fn with_flavor(tag: &str, flavor: Flavor) -> Self {
        let tag = tag.to_uppercase();
        let custom = tag.starts_with('_');
        Node {
            level: 0,
            id: None,
            tag,
            xref: None,
            value: None,
            children: Vec::new(),
            custom,
            flavor,
        }
    }

    /// The synthetic root that record-level nodes attach to.
    pub fn root(flavor: Flavor) -> Self {
        let mut node = Node::with_flavor(ROOT_TAG, flavor);
        node.level = ROOT_LEVEL;
        node
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn xref(&self) -> Option<&str> {
        self.xref.as_deref()
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Whether this is a vendor-extension tag (leading underscore).
    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn set_id(&mut self, id: Option<&str>) {
        self.id = id.map(str::to_owned);
    }

    pub fn set_xref(&mut self, xref: Option<&str>) {
        self.xref = xref.map(str::to_owned);
    }

    pub(crate) fn set_level(&mut self, level: i32) {
        self.level = level;
    }

    /// Raw single-line value as stored on this node, with continuation
    /// children left un-joined. The writer emits this form.
    pub fn raw_value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub(crate) fn set_raw_value(&mut self, value: Option<&str>) {
        self.value = value.filter(|v| !v.is_empty()).map(str::to_owned);
    }

    /// Logical value: the stored value joined with all continuation
    /// children, newline-separated where the continuation tag demands it.
    pub fn value(&self) -> Option<String> {
        let mut joined = self.value.clone().unwrap_or_default();
        let mut present = self.value.is_some();
        for child in &self.children {
            if self.flavor.is_continuation(&child.tag) {
                present = true;
                if self.flavor.starts_new_line(&child.tag) {
                    joined.push('\n');
                }
                if let Some(chunk) = &child.value {
                    joined.push_str(chunk);
                }
            }
        }
        if present {
            Some(joined)
        } else {
            None
        }
    }

    /// Set the logical value, replacing any previous continuation children.
    ///
    /// The value is split back into a primary value plus continuation
    /// children according to the node's flavor, so
    /// `set_value` followed by [`Node::value`] is idempotent.
    pub fn set_value(&mut self, value: &str) {
        let flavor = self.flavor;
        self.children.retain(|c| !flavor.is_continuation(&c.tag));
        self.value = None;
        if value.is_empty() {
            return;
        }

        let mut continuations = Vec::new();
        for (i, segment) in value.split('\n').enumerate() {
            let chunks = split_chunks(segment, self.flavor.chunk_len());
            for (j, chunk) in chunks.into_iter().enumerate() {
                if i == 0 && j == 0 {
                    self.value = if chunk.is_empty() { None } else { Some(chunk) };
                    continue;
                }
                let tag = if j == 0 { self.flavor.newline_tag() } else { "CONC" };
                let mut child = Node::with_flavor(tag, self.flavor);
                child.value = if chunk.is_empty() { None } else { Some(chunk) };
                continuations.push(child);
            }
        }
        for child in continuations.into_iter().rev() {
            self.insert_child(0, child);
        }
    }

    /// Builder-style [`Node::set_value`].
    pub fn with_value(mut self, value: &str) -> Self {
        self.set_value(value);
        self
    }

    /// Attach `child`, renumbering its whole subtree to keep the level
    /// invariant.
    pub fn add_child(&mut self, mut child: Node) {
        child.renumber(self.level + 1);
        self.children.push(child);
    }

    /// Attach `child` at `index` among the existing children.
    pub fn insert_child(&mut self, index: usize, mut child: Node) {
        child.renumber(self.level + 1);
        self.children.insert(index, child);
    }

    fn renumber(&mut self, level: i32) {
        self.level = level;
        for child in &mut self.children {
            child.renumber(level + 1);
        }
    }

    /// Direct children carrying `tag`, or — when `tag` contains dots — all
    /// descendants reached by walking the dotted path one generation per
    /// segment. An empty result means some segment matched nothing.
    pub fn children_with_tag(&self, tag: &str) -> Vec<&Node> {
        if tag.contains('.') {
            return self.children_with_path(tag);
        }
        self.children.iter().filter(|c| c.tag == tag).collect()
    }

    /// Direct children matching any of the given tags.
    pub fn children_with_tags(&self, tags: &[&str]) -> Vec<&Node> {
        self.children
            .iter()
            .filter(|c| tags.contains(&c.tag.as_str()))
            .collect()
    }

    fn children_with_path(&self, path: &str) -> Vec<&Node> {
        let mut generation: Vec<&Node> = vec![self];
        for segment in path.split('.') {
            generation = generation
                .iter()
                .flat_map(|n| n.children.iter().filter(|c| c.tag == segment))
                .collect();
            if generation.is_empty() {
                return Vec::new();
            }
        }
        generation
    }

    /// First direct child with `tag`, if any.
    pub fn child_with_tag(&self, tag: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Remove and return the child at `index`.
    pub fn remove_child(&mut self, index: usize) -> Node {
        self.children.remove(index)
    }

    /// Remove every direct child carrying `tag`.
    pub fn remove_children_with_tag(&mut self, tag: &str) {
        self.children.retain(|c| c.tag != tag);
    }

    /// Replace this node's content in place with `other`'s, keeping the
    /// node's own level and renumbering the new children under it.
    pub fn replace_with(&mut self, other: Node) {
        self.id = other.id;
        self.tag = other.tag;
        self.xref = other.xref;
        self.value = other.value;
        self.custom = other.custom;
        self.flavor = other.flavor;
        self.children = other.children;
        let level = self.level;
        self.renumber(level);
    }

    /// Structural hash, consistent with equality.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.xref == other.xref
            && self.value == other.value
            && self.children == other.children
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
        self.xref.hash(state);
        self.value.hash(state);
        self.children.hash(state);
    }
}

/// Split a segment into chunks of at most `len` characters. A `None`
/// length keeps the segment whole. Always yields at least one chunk so
/// empty segments survive as empty continuation lines.
fn split_chunks(segment: &str, len: Option<usize>) -> Vec<String> {
    let Some(len) = len else {
        return vec![segment.to_owned()];
    };
    if segment.chars().count() <= len {
        return vec![segment.to_owned()];
    }
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in segment.chars() {
        if count == len {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    chunks.push(current);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_child_renumbers_levels() {
        let mut indi = Node::new("INDI");
        let mut birt = Node::new("BIRT");
        birt.add_child(Node::new("DATE"));
        indi.add_child(birt);

        assert_eq!(indi.level(), 0);
        assert_eq!(indi.children()[0].level(), 1);
        assert_eq!(indi.children()[0].children()[0].level(), 2);
    }

    #[test]
    fn test_value_roundtrip_with_cont() {
        let mut note = Node::new("NOTE");
        note.set_value("line one\nline two");

        assert_eq!(note.raw_value(), Some("line one"));
        assert_eq!(note.children().len(), 1);
        assert_eq!(note.children()[0].tag(), "CONT");
        assert_eq!(note.children()[0].raw_value(), Some("line two"));
        assert_eq!(note.value(), Some("line one\nline two".to_string()));
    }

    #[test]
    fn test_value_roundtrip_is_idempotent() {
        let mut note = Node::new("NOTE");
        note.set_value("a\nb\nc");
        let first = note.value().unwrap();
        note.set_value(&first);
        assert_eq!(note.value().unwrap(), first);
    }

    #[test]
    fn test_long_value_splits_into_conc() {
        let long = "x".repeat(CHUNK_LEN * 2 + 10);
        let mut note = Node::new("NOTE");
        note.set_value(&long);

        assert_eq!(note.raw_value().unwrap().len(), CHUNK_LEN);
        let tags: Vec<&str> = note.children().iter().map(Node::tag).collect();
        assert_eq!(tags, vec!["CONC", "CONC"]);
        assert_eq!(note.value(), Some(long));
    }

    #[test]
    fn test_flef_flavor_splits_on_newlines_only() {
        let long = format!("{}\nshort", "y".repeat(CHUNK_LEN * 3));
        let mut note = Node::with_flavor("NOTE", Flavor::Flef);
        note.set_value(&long);

        let tags: Vec<&str> = note.children().iter().map(Node::tag).collect();
        assert_eq!(tags, vec!["NEW_LINE"]);
        assert_eq!(note.value(), Some(long));
    }

    #[test]
    fn test_value_starting_with_newline() {
        let mut note = Node::new("NOTE");
        note.set_value("\nsecond");
        assert_eq!(note.raw_value(), None);
        assert_eq!(note.value(), Some("\nsecond".to_string()));
    }

    #[test]
    fn test_set_value_replaces_previous_continuations() {
        let mut note = Node::new("NOTE");
        note.set_value("a\nb");
        note.set_value("plain");
        assert_eq!(note.children().len(), 0);
        assert_eq!(note.value(), Some("plain".to_string()));
    }

    #[test]
    fn test_children_with_dotted_path() {
        let mut head = Node::new("HEAD");
        let mut gedc = Node::new("GEDC");
        gedc.add_child(Node::new("VERS").with_value("5.5.1"));
        head.add_child(gedc);

        let hits = head.children_with_tag("GEDC.VERS");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value(), Some("5.5.1".to_string()));
        assert!(head.children_with_tag("GEDC.MISSING").is_empty());
    }

    #[test]
    fn test_children_with_tags_matches_any() {
        let mut indi = Node::new("INDI");
        indi.add_child(Node::new("BIRT"));
        indi.add_child(Node::new("DEAT"));
        indi.add_child(Node::new("NAME"));

        let events = indi.children_with_tags(&["BIRT", "DEAT"]);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_equality_ignores_id_and_level() {
        let mut a = Node::new("INDI");
        a.set_id(Some("I1"));
        let mut b = Node::new("INDI");
        b.set_id(Some("I2"));
        b.set_level(3);

        assert_eq!(a, b);
        assert_eq!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn test_equality_covers_children() {
        let mut a = Node::new("INDI");
        a.add_child(Node::new("NAME").with_value("John /Doe/"));
        let mut b = Node::new("INDI");
        b.add_child(Node::new("NAME").with_value("Jane /Doe/"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_replace_with_keeps_level() {
        let mut parent = Node::new("INDI");
        parent.add_child(Node::new("BIRT"));
        let mut other = Node::new("DEAT");
        other.add_child(Node::new("DATE"));

        parent.children[0].replace_with(other);
        assert_eq!(parent.children()[0].tag(), "DEAT");
        assert_eq!(parent.children()[0].level(), 1);
        assert_eq!(parent.children()[0].children()[0].level(), 2);
    }

    #[test]
    fn test_custom_flag_from_tag() {
        assert!(Node::new("_UID").is_custom());
        assert!(!Node::new("NAME").is_custom());
    }
}
