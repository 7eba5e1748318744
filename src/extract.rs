//! Selections and extraction operations.
//!
//! A selection is a handle to one matched node: the document plus a node
//! id. Extraction never mutates the document; everything here is a read.

use std::collections::HashMap;

use crate::dom::{DataKind, Document, NodeData, NodeId};
use crate::serialize::serialize_node;
use crate::tree::{TreeNode, CDATA_TAG, COMMENT_TAG, DOCTYPE_TAG, PI_TAG};

/// A matched node: `(document handle, node id)`.
#[derive(Debug, Clone)]
pub struct Selection {
    doc: Document,
    id: NodeId,
}

impl PartialEq for Selection {
    fn eq(&self, other: &Self) -> bool {
        self.doc.same_document(&other.doc) && self.id == other.id
    }
}

impl Eq for Selection {}

impl Selection {
    pub(crate) fn new(doc: Document, id: NodeId) -> Self {
        Selection { doc, id }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Element tag, or absent for non-elements.
    pub fn tag(&self) -> Option<&str> {
        self.doc.get(self.id).as_element().map(|e| e.tag.as_str())
    }

    /// The ordered attribute list, or absent for non-elements.
    pub fn attrs(&self) -> Option<&[(String, String)]> {
        self.doc
            .get(self.id)
            .as_element()
            .map(|e| e.attributes.as_slice())
    }

    /// First matching attribute value. Names compare case-insensitively on
    /// HTML documents.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.doc.attribute(self.id, name)
    }

    /// Literal content of text children only, separated by a single space,
    /// trimmed.
    pub fn own_text(&self) -> String {
        let pieces: Vec<&str> = self
            .doc
            .children(self.id)
            .iter()
            .filter_map(|&child| match &self.doc.get(child).data {
                NodeData::Text { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        pieces.join(" ").trim().to_string()
    }

    /// Text content of the node and all descendants, whitespace runs
    /// collapsed to a single space, trimmed.
    pub fn text(&self) -> String {
        let mut raw = String::new();
        collect_text(&self.doc, self.id, &mut raw);
        collapse_whitespace(&raw)
    }

    /// Serialization of the node and its descendants.
    pub fn html(&self) -> String {
        let mut out = String::new();
        serialize_node(&self.doc, self.id, &mut out);
        out
    }

    /// Content of `Data` nodes or CDATA comments.
    ///
    /// The HTML5 parser lowers CDATA sections into comments, so a comment
    /// whose content carries the literal `[CDATA[` prefix and `]]` suffix
    /// contributes the interior; markers are not balance-checked.
    /// Otherwise the collapsed content of the node's `Data` descendants.
    pub fn data(&self) -> String {
        match &self.doc.get(self.id).data {
            NodeData::Data { content, .. } => content.clone(),
            NodeData::Comment { content } => {
                if let Some(interior) = cdata_interior(content) {
                    interior.to_string()
                } else {
                    collapse_whitespace(content)
                }
            }
            _ => {
                let mut raw = String::new();
                collect_data(&self.doc, self.id, &mut raw);
                collapse_whitespace(&raw)
            }
        }
    }

    /// Map of `data-*` attributes whose suffix is a valid identifier
    /// (lowercase letters, digits, hyphens), keys lowerCamelCased:
    /// `data-x-val` becomes `xVal`. Absent for non-elements.
    pub fn dataset(&self) -> Option<HashMap<String, String>> {
        let elem = self.doc.get(self.id).as_element()?;
        let mut map = HashMap::new();
        for (name, value) in &elem.attributes {
            let Some(suffix) = name.strip_prefix("data-") else {
                continue;
            };
            if suffix.is_empty()
                || !suffix
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                continue;
            }
            let key = camelize(suffix);
            map.entry(key).or_insert_with(|| value.clone());
        }
        Some(map)
    }

    /// Tuple-tree representation of the subtree.
    pub fn tree(&self) -> TreeNode {
        node_to_tree(&self.doc, self.id)
    }
}

impl Document {
    /// Tuple-tree representation of the whole document.
    pub fn tree(&self) -> Vec<TreeNode> {
        self.root_ids()
            .iter()
            .map(|&root| node_to_tree(self, root))
            .collect()
    }
}

fn collect_text(doc: &Document, id: NodeId, out: &mut String) {
    match &doc.get(id).data {
        NodeData::Text { content } => out.push_str(content),
        NodeData::Element(elem) => {
            for &child in &elem.children {
                collect_text(doc, child, out);
            }
        }
        _ => {}
    }
}

fn collect_data(doc: &Document, id: NodeId, out: &mut String) {
    match &doc.get(id).data {
        NodeData::Data { content, .. } => out.push_str(content),
        NodeData::Element(elem) => {
            for &child in &elem.children {
                collect_data(doc, child, out);
            }
        }
        _ => {}
    }
}

/// Interior of a comment carrying CDATA markers, if present.
fn cdata_interior(content: &str) -> Option<&str> {
    if content.len() >= "[CDATA[]]".len()
        && content.starts_with("[CDATA[")
        && content.ends_with("]]")
    {
        Some(&content["[CDATA[".len()..content.len() - "]]".len()])
    } else {
        None
    }
}

/// Collapse runs of space/tab/CR/LF to a single space and trim the ends.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if matches!(c, ' ' | '\t' | '\r' | '\n') {
            in_run = true;
        } else {
            if in_run && !out.is_empty() {
                out.push(' ');
            }
            in_run = false;
            out.push(c);
        }
    }
    out
}

/// `x-val` → `xVal`.
fn camelize(suffix: &str) -> String {
    let mut out = String::with_capacity(suffix.len());
    let mut segments = suffix.split('-');
    if let Some(first) = segments.next() {
        out.push_str(first);
    }
    for segment in segments {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

fn node_to_tree(doc: &Document, id: NodeId) -> TreeNode {
    match &doc.get(id).data {
        NodeData::Element(elem) => TreeNode::Node(
            elem.qualified_name(),
            elem.attributes.clone(),
            elem.children
                .iter()
                .map(|&child| node_to_tree(doc, child))
                .collect(),
        ),
        NodeData::Text { content } => TreeNode::Text(content.clone()),
        NodeData::Data { content, kind } => match kind {
            // Script/style data came in as text; it goes back out as text.
            DataKind::Script | DataKind::Style => TreeNode::Text(content.clone()),
            DataKind::Cdata => TreeNode::Node(
                CDATA_TAG.to_string(),
                Vec::new(),
                if content.is_empty() {
                    Vec::new()
                } else {
                    vec![TreeNode::Text(content.clone())]
                },
            ),
        },
        NodeData::Comment { content } => TreeNode::Node(
            COMMENT_TAG.to_string(),
            Vec::new(),
            if content.is_empty() {
                Vec::new()
            } else {
                vec![TreeNode::Text(content.clone())]
            },
        ),
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => TreeNode::Node(
            DOCTYPE_TAG.to_string(),
            vec![
                ("name".to_string(), name.clone()),
                ("public".to_string(), public_id.clone()),
                ("system".to_string(), system_id.clone()),
            ],
            Vec::new(),
        ),
        NodeData::ProcessingInstruction { target, content } => TreeNode::Node(
            PI_TAG.to_string(),
            vec![
                ("target".to_string(), target.clone()),
                ("content".to_string(), content.clone()),
            ],
            Vec::new(),
        ),
    }
}
