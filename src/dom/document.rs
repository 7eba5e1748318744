//! Flat id-indexed document store.
//!
//! Every node lives in one table, addressed by a dense pre-order id, so
//! document order is just ascending id order. Alongside the table the store
//! keeps a per-node subtree end, which makes `descendants` an O(1) range
//! iterator and subtree membership a range check.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::node::{Node, NodeData, NodeId};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// How the document's markup was parsed. Drives case policy for tag and
/// attribute-name comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    Xml,
}

#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) nodes: Vec<Node>,
    pub(crate) roots: Vec<NodeId>,
    /// `ends[n]` is one past the last descendant of `n`; descendants of `n`
    /// are exactly the id range `(n, ends[n])`.
    pub(crate) ends: Vec<NodeId>,
    pub(crate) mode: ParseMode,
    instance: u64,
}

/// An immutable parsed document. Cloning is cheap (shared storage) and the
/// document is safe to share across threads for concurrent reads.
#[derive(Debug, Clone)]
pub struct Document {
    inner: Arc<Inner>,
}

impl Document {
    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        roots: Vec<NodeId>,
        ends: Vec<NodeId>,
        mode: ParseMode,
    ) -> Self {
        debug_assert_eq!(nodes.len(), ends.len());
        Document {
            inner: Arc::new(Inner {
                nodes,
                roots,
                ends,
                mode,
                instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            }),
        }
    }

    /// Unique identity of this built document. Used to key per-document
    /// memoization; never reused within a process.
    #[inline]
    pub fn instance_id(&self) -> u64 {
        self.inner.instance
    }

    /// Whether two handles refer to the same built document.
    #[inline]
    pub fn same_document(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline]
    pub fn mode(&self) -> ParseMode {
        self.inner.mode
    }

    /// Number of nodes; ids are exactly `0..len()`.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    /// Top-level node ids in source order.
    #[inline]
    pub fn root_ids(&self) -> &[NodeId] {
        &self.inner.roots
    }

    /// Node record by id.
    ///
    /// An out-of-range id means a store invariant was violated; that is a
    /// bug, never reachable from public API misuse, and aborts rather than
    /// propagating.
    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        self.inner
            .nodes
            .get(id as usize)
            .unwrap_or_else(|| panic!("unknown node id {}: document store invariant violated", id))
    }

    /// Ordered child ids (empty for non-elements).
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).children()
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    /// One past the last descendant of `id`.
    #[inline]
    pub fn subtree_end(&self, id: NodeId) -> NodeId {
        self.inner.ends[id as usize]
    }

    /// Whether `id` lies in the subtree rooted at `anchor` (inclusive).
    #[inline]
    pub fn in_subtree(&self, anchor: NodeId, id: NodeId) -> bool {
        id >= anchor && id < self.subtree_end(anchor)
    }

    /// All strict descendants of `id`, lazily, in document order.
    ///
    /// Pre-order ids make a subtree contiguous, so this is a plain range.
    #[inline]
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> {
        (id + 1)..self.subtree_end(id)
    }

    /// Ancestors of `id` from the immediate parent up to a root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// The ordered child list of `id`'s parent, including `id` itself.
    /// Empty for roots.
    pub fn siblings(&self, id: NodeId) -> &[NodeId] {
        match self.parent(id) {
            Some(parent) => self.children(parent),
            None => &[],
        }
    }

    /// Siblings strictly after `id`, in document order.
    pub fn following_siblings(&self, id: NodeId) -> &[NodeId] {
        let sibs = self.siblings(id);
        match sibs.iter().position(|&s| s == id) {
            Some(pos) => &sibs[pos + 1..],
            None => &[],
        }
    }

    /// Siblings strictly before `id`, nearest first (reverse document order).
    pub fn preceding_siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let sibs = self.siblings(id);
        let pos = sibs.iter().position(|&s| s == id).unwrap_or(0);
        sibs[..pos].iter().rev().copied()
    }

    /// Every node id in document order.
    #[inline]
    pub fn walk(&self) -> impl Iterator<Item = NodeId> {
        0..self.len() as NodeId
    }

    /// Raw concatenated text content of `id` and its descendants, in
    /// document order, with no whitespace processing. This is the XPath
    /// string-value of the node.
    pub fn string_value(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.append_string_value(id, &mut out);
        out
    }

    fn append_string_value(&self, id: NodeId, out: &mut String) {
        match &self.get(id).data {
            NodeData::Text { content } | NodeData::Data { content, .. } => out.push_str(content),
            NodeData::Comment { content } => out.push_str(content),
            NodeData::ProcessingInstruction { content, .. } => out.push_str(content),
            NodeData::Element(_) => {
                for &child in self.children(id) {
                    match &self.get(child).data {
                        NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => {}
                        _ => self.append_string_value(child, out),
                    }
                }
            }
            NodeData::Doctype { .. } => {}
        }
    }

    /// First attribute value on `id` matching `name` under this document's
    /// case policy (HTML attribute names compare case-insensitively).
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        let elem = self.get(id).as_element()?;
        elem.attributes
            .iter()
            .find(|(n, _)| self.attr_name_eq(n, name))
            .map(|(_, v)| v.as_str())
    }

    /// Attribute-name equality under the document's case policy.
    #[inline]
    pub fn attr_name_eq(&self, a: &str, b: &str) -> bool {
        match self.inner.mode {
            ParseMode::Html => a.eq_ignore_ascii_case(b),
            ParseMode::Xml => a == b,
        }
    }

    /// Tag-name equality under the document's case policy.
    #[inline]
    pub fn tag_eq(&self, a: &str, b: &str) -> bool {
        match self.inner.mode {
            ParseMode::Html => a.eq_ignore_ascii_case(b),
            ParseMode::Xml => a == b,
        }
    }
}

/// Lazy parent-chain iterator.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}
