//! Tuple-tree to document-store construction.
//!
//! A single depth-first pass assigns dense pre-order ids, records each
//! node's subtree end, and maps sentinel tags onto the non-element node
//! kinds. Value trees cannot cycle, but a depth guard rejects degenerate
//! input before it can exhaust the stack.

use crate::dom::document::{Document, ParseMode};
use crate::dom::node::{DataKind, Element, Node, NodeData, NodeId};
use crate::error::{Error, Result};
use crate::tree::{TreeNode, CDATA_TAG, COMMENT_TAG, DOCTYPE_TAG, PI_TAG};

/// Maximum nesting depth accepted from a tuple-tree. Matches the nesting
/// cap browsers apply during tree construction.
const MAX_DEPTH: usize = 512;

/// Build a document from tuple-tree roots.
pub fn build(roots: Vec<TreeNode>, mode: ParseMode) -> Result<Document> {
    let mut builder = Builder {
        nodes: Vec::new(),
        ends: Vec::new(),
        mode,
    };
    let mut root_ids = Vec::with_capacity(roots.len());
    for tree in roots {
        root_ids.push(builder.build_node(tree, None, 0, None)?);
    }
    Ok(Document::from_parts(
        builder.nodes,
        root_ids,
        builder.ends,
        mode,
    ))
}

struct Builder {
    nodes: Vec<Node>,
    ends: Vec<NodeId>,
    mode: ParseMode,
}

impl Builder {
    fn build_node(
        &mut self,
        tree: TreeNode,
        parent: Option<NodeId>,
        depth: usize,
        data_kind: Option<DataKind>,
    ) -> Result<NodeId> {
        if depth > MAX_DEPTH {
            return Err(Error::MalformedTree(format!(
                "tree deeper than {} levels",
                MAX_DEPTH
            )));
        }

        match tree {
            TreeNode::Text(content) => {
                let data = match data_kind {
                    Some(kind) => NodeData::Data { content, kind },
                    None => NodeData::Text { content },
                };
                Ok(self.push_leaf(parent, data))
            }
            TreeNode::Node(tag, attrs, children) => match tag.as_str() {
                COMMENT_TAG => {
                    let content = self.sentinel_text(&tag, children)?;
                    Ok(self.push_leaf(parent, NodeData::Comment { content }))
                }
                CDATA_TAG => {
                    let content = self.sentinel_text(&tag, children)?;
                    Ok(self.push_leaf(
                        parent,
                        NodeData::Data {
                            content,
                            kind: DataKind::Cdata,
                        },
                    ))
                }
                DOCTYPE_TAG => {
                    if !children.is_empty() {
                        return Err(Error::MalformedTree(format!(
                            "{} node cannot have children",
                            tag
                        )));
                    }
                    let find = |name: &str| {
                        attrs
                            .iter()
                            .find(|(n, _)| n == name)
                            .map(|(_, v)| v.clone())
                            .unwrap_or_default()
                    };
                    Ok(self.push_leaf(
                        parent,
                        NodeData::Doctype {
                            name: find("name"),
                            public_id: find("public"),
                            system_id: find("system"),
                        },
                    ))
                }
                PI_TAG => {
                    if !children.is_empty() {
                        return Err(Error::MalformedTree(format!(
                            "{} node cannot have children",
                            tag
                        )));
                    }
                    let find = |name: &str| {
                        attrs
                            .iter()
                            .find(|(n, _)| n == name)
                            .map(|(_, v)| v.clone())
                            .unwrap_or_default()
                    };
                    Ok(self.push_leaf(
                        parent,
                        NodeData::ProcessingInstruction {
                            target: find("target"),
                            content: find("content"),
                        },
                    ))
                }
                "" => Err(Error::MalformedTree("empty tag name".to_string())),
                other if other.starts_with('-') => Err(Error::MalformedTree(format!(
                    "unknown sentinel tag {:?}",
                    other
                ))),
                _ => self.build_element(tag, attrs, children, parent, depth),
            },
        }
    }

    fn build_element(
        &mut self,
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<TreeNode>,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Result<NodeId> {
        let (namespace, tag) = self.split_tag(tag);

        // HTML script/style contents are data, not rendered text.
        let child_data_kind = if self.mode == ParseMode::Html {
            if tag.eq_ignore_ascii_case("script") {
                Some(DataKind::Script)
            } else if tag.eq_ignore_ascii_case("style") {
                Some(DataKind::Style)
            } else {
                None
            }
        } else {
            None
        };

        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            id,
            parent,
            data: NodeData::Element(Element {
                namespace,
                tag,
                attributes: attrs,
                children: Vec::new(),
            }),
        });
        self.ends.push(0);

        let mut child_ids = Vec::with_capacity(children.len());
        for child in children {
            child_ids.push(self.build_node(child, Some(id), depth + 1, child_data_kind)?);
        }

        let end = self.nodes.len() as NodeId;
        self.ends[id as usize] = end;
        match &mut self.nodes[id as usize].data {
            NodeData::Element(elem) => elem.children = child_ids,
            _ => unreachable!(),
        }
        Ok(id)
    }

    fn push_leaf(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node { id, parent, data });
        self.ends.push(id + 1);
        id
    }

    /// Sentinel nodes carry their content as a single optional text child.
    fn sentinel_text(&self, tag: &str, children: Vec<TreeNode>) -> Result<String> {
        let mut content = String::new();
        for child in children {
            match child {
                TreeNode::Text(text) => content.push_str(&text),
                TreeNode::Node(..) => {
                    return Err(Error::MalformedTree(format!(
                        "{} node cannot have element children",
                        tag
                    )));
                }
            }
        }
        Ok(content)
    }

    /// `prefix:local` splits into a namespace prefix for XML documents.
    /// HTML tag names never split (the HTML tokenizer treats `:` as part
    /// of the name).
    fn split_tag(&self, tag: String) -> (Option<String>, String) {
        if self.mode == ParseMode::Xml {
            if let Some(pos) = tag.find(':') {
                if pos > 0 && pos + 1 < tag.len() {
                    return (Some(tag[..pos].to_string()), tag[pos + 1..].to_string());
                }
            }
        }
        (None, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preorder_ids_and_ends() {
        // <a><b/>text<c/></a>
        let doc = build(
            vec![TreeNode::element(
                "a",
                vec![],
                vec![
                    TreeNode::element("b", vec![], vec![]),
                    TreeNode::text("text"),
                    TreeNode::element("c", vec![], vec![]),
                ],
            )],
            ParseMode::Html,
        )
        .unwrap();

        assert_eq!(doc.len(), 4);
        assert_eq!(doc.root_ids(), &[0]);
        assert_eq!(doc.children(0), &[1, 2, 3]);
        assert_eq!(doc.subtree_end(0), 4);
        assert_eq!(doc.subtree_end(1), 2);
    }

    #[test]
    fn test_script_text_becomes_data() {
        let doc = build(
            vec![TreeNode::element(
                "script",
                vec![],
                vec![TreeNode::text("var x = 1;")],
            )],
            ParseMode::Html,
        )
        .unwrap();

        match &doc.get(1).data {
            NodeData::Data { content, kind } => {
                assert_eq!(content, "var x = 1;");
                assert_eq!(*kind, DataKind::Script);
            }
            other => panic!("expected data node, got {:?}", other),
        }
    }

    #[test]
    fn test_script_text_stays_text_in_xml() {
        let doc = build(
            vec![TreeNode::element(
                "script",
                vec![],
                vec![TreeNode::text("var x = 1;")],
            )],
            ParseMode::Xml,
        )
        .unwrap();
        assert!(doc.get(1).is_text());
    }

    #[test]
    fn test_sentinels() {
        let doc = build(
            vec![
                TreeNode::element(
                    "-doctype",
                    vec![("name".to_string(), "html".to_string())],
                    vec![],
                ),
                TreeNode::comment(" note "),
                TreeNode::element(
                    "-pi",
                    vec![
                        ("target".to_string(), "xml-stylesheet".to_string()),
                        ("content".to_string(), "href=\"a.css\"".to_string()),
                    ],
                    vec![],
                ),
                TreeNode::element("-cdata", vec![], vec![TreeNode::text("raw")]),
            ],
            ParseMode::Html,
        )
        .unwrap();

        assert!(matches!(&doc.get(0).data, NodeData::Doctype { name, .. } if name == "html"));
        assert!(matches!(&doc.get(1).data, NodeData::Comment { content } if content == " note "));
        assert!(matches!(
            &doc.get(2).data,
            NodeData::ProcessingInstruction { target, .. } if target == "xml-stylesheet"
        ));
        assert!(matches!(
            &doc.get(3).data,
            NodeData::Data { kind: DataKind::Cdata, content } if content == "raw"
        ));
    }

    #[test]
    fn test_xml_prefix_splits() {
        let doc = build(
            vec![TreeNode::element("svg:rect", vec![], vec![])],
            ParseMode::Xml,
        )
        .unwrap();
        let elem = doc.get(0).as_element().unwrap();
        assert_eq!(elem.namespace.as_deref(), Some("svg"));
        assert_eq!(elem.tag, "rect");
    }

    #[test]
    fn test_comment_with_element_child_is_malformed() {
        let err = build(
            vec![TreeNode::Node(
                COMMENT_TAG.to_string(),
                vec![],
                vec![TreeNode::element("div", vec![], vec![])],
            )],
            ParseMode::Html,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedTree(_)));
    }

    #[test]
    fn test_depth_guard() {
        let mut tree = TreeNode::element("leaf", vec![], vec![]);
        for _ in 0..(MAX_DEPTH + 2) {
            tree = TreeNode::element("wrap", vec![], vec![tree]);
        }
        let err = build(vec![tree], ParseMode::Html).unwrap_err();
        assert!(matches!(err, Error::MalformedTree(_)));
    }
}
