//! Node records stored in the document table.
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into the document's node table).
pub type NodeId = u32;

/// Subtype of a `Data` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Contents of a `<script>` element.
    Script,
    /// Contents of a `<style>` element.
    Style,
    /// A CDATA section.
    Cdata,
}

/// Element payload: tag, attributes in source order, child ids in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Namespace prefix for XML documents (`ns` in `<ns:tag>`).
    pub namespace: Option<String>,
    /// Tag name (lowercased by the HTML parser, preserved for XML).
    pub tag: String,
    /// Attributes preserving source order and duplicates.
    pub attributes: Vec<(String, String)>,
    /// Child node ids in document order.
    pub children: Vec<NodeId>,
}

impl Element {
    /// Qualified name as written in markup (`prefix:tag` or `tag`).
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, self.tag),
            None => self.tag.clone(),
        }
    }
}

/// The tagged variant distinguishing node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element(Element),
    Text {
        content: String,
    },
    Data {
        content: String,
        kind: DataKind,
    },
    Comment {
        content: String,
    },
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    ProcessingInstruction {
        target: String,
        content: String,
    },
}

/// A node record: id, optional parent (absent ⇔ root), and payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub data: NodeData,
}

impl Node {
    /// Element payload, if this node is an element.
    #[inline]
    pub fn as_element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(elem) => Some(elem),
            _ => None,
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text { .. })
    }

    /// Child ids (empty for non-elements).
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Element(elem) => &elem.children,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        let plain = Element {
            namespace: None,
            tag: "div".to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        };
        assert_eq!(plain.qualified_name(), "div");

        let prefixed = Element {
            namespace: Some("svg".to_string()),
            tag: "rect".to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        };
        assert_eq!(prefixed.qualified_name(), "svg:rect");
    }

    #[test]
    fn test_children_empty_for_non_elements() {
        let node = Node {
            id: 0,
            parent: None,
            data: NodeData::Text {
                content: "hi".to_string(),
            },
        };
        assert!(node.children().is_empty());
    }
}
