//! XPath axis navigation over the document store.
//!
//! Reverse axes (ancestor, preceding-sibling) yield nearest-first, so a
//! positional predicate `[1]` means the nearest node on those axes.

use super::parser::NodeTest;
use super::DOCUMENT_NODE;
use crate::dom::{DataKind, Document, NodeData, NodeId};

/// The supported axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Self_,
    Attribute,
}

impl Axis {
    /// Resolve an axis name as written in an expression.
    pub fn from_name(name: &str) -> Option<Self> {
        let axis = match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "self" => Axis::Self_,
            "attribute" => Axis::Attribute,
            _ => return None,
        };
        Some(axis)
    }
}

/// Parent of a node, with the virtual document node above the roots.
pub fn parent_or_document(doc: &Document, id: NodeId) -> Option<NodeId> {
    if id == DOCUMENT_NODE {
        return None;
    }
    match doc.parent(id) {
        Some(parent) => Some(parent),
        None => Some(DOCUMENT_NODE),
    }
}

/// Navigate along an axis from a context node.
pub fn navigate(doc: &Document, context: NodeId, axis: Axis) -> Vec<NodeId> {
    if context == DOCUMENT_NODE {
        return match axis {
            Axis::Child => doc.root_ids().to_vec(),
            Axis::Descendant => doc.walk().collect(),
            Axis::DescendantOrSelf => {
                let mut result = vec![DOCUMENT_NODE];
                result.extend(doc.walk());
                result
            }
            Axis::Self_ => vec![DOCUMENT_NODE],
            _ => Vec::new(),
        };
    }

    match axis {
        Axis::Child => doc.children(context).to_vec(),
        Axis::Descendant => doc.descendants(context).collect(),
        Axis::DescendantOrSelf => {
            let mut result = vec![context];
            result.extend(doc.descendants(context));
            result
        }
        Axis::Parent => parent_or_document(doc, context).into_iter().collect(),
        Axis::Ancestor => {
            let mut result: Vec<NodeId> = doc.ancestors(context).collect();
            result.push(DOCUMENT_NODE);
            result
        }
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(doc.ancestors(context));
            result.push(DOCUMENT_NODE);
            result
        }
        Axis::FollowingSibling => doc.following_siblings(context).to_vec(),
        Axis::PrecedingSibling => doc.preceding_siblings(context).collect(),
        Axis::Self_ => vec![context],
        // Attribute values are not nodes; the evaluator handles this axis.
        Axis::Attribute => Vec::new(),
    }
}

/// Check whether a node matches a node test.
pub fn matches_node_test(doc: &Document, id: NodeId, test: &NodeTest) -> bool {
    if id == DOCUMENT_NODE {
        return matches!(test, NodeTest::AnyNode);
    }

    let node = doc.get(id);
    match test {
        NodeTest::Wildcard => node.is_element(),
        NodeTest::Named(name) => match node.as_element() {
            Some(elem) => elem.namespace.is_none() && doc.tag_eq(&elem.tag, name),
            None => false,
        },
        NodeTest::Prefixed(prefix, local) => match node.as_element() {
            Some(elem) => {
                elem.namespace.as_deref() == Some(prefix.as_str()) && doc.tag_eq(&elem.tag, local)
            }
            None => false,
        },
        NodeTest::PrefixWildcard(prefix) => match node.as_element() {
            Some(elem) => elem.namespace.as_deref() == Some(prefix.as_str()),
            None => false,
        },
        NodeTest::AnyNode => true,
        NodeTest::Text => matches!(
            node.data,
            NodeData::Text { .. }
                | NodeData::Data {
                    kind: DataKind::Cdata,
                    ..
                }
        ),
        NodeTest::Comment => matches!(node.data, NodeData::Comment { .. }),
        NodeTest::Pi(target) => match &node.data {
            NodeData::ProcessingInstruction { target: actual, .. } => match target {
                Some(expected) => actual == expected,
                None => true,
            },
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{build, ParseMode};
    use crate::tree::TreeNode;

    fn sample() -> Document {
        // <root><a><b/></a><c/></root>
        build(
            vec![TreeNode::element(
                "root",
                vec![],
                vec![
                    TreeNode::element("a", vec![], vec![TreeNode::element("b", vec![], vec![])]),
                    TreeNode::element("c", vec![], vec![]),
                ],
            )],
            ParseMode::Xml,
        )
        .unwrap()
    }

    #[test]
    fn test_child_axis() {
        let doc = sample();
        assert_eq!(navigate(&doc, 0, Axis::Child), vec![1, 3]);
        assert_eq!(navigate(&doc, DOCUMENT_NODE, Axis::Child), vec![0]);
    }

    #[test]
    fn test_descendant_axis() {
        let doc = sample();
        assert_eq!(navigate(&doc, 0, Axis::Descendant), vec![1, 2, 3]);
        assert_eq!(
            navigate(&doc, DOCUMENT_NODE, Axis::Descendant),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn test_ancestor_axis_is_nearest_first() {
        let doc = sample();
        assert_eq!(navigate(&doc, 2, Axis::Ancestor), vec![1, 0, DOCUMENT_NODE]);
    }

    #[test]
    fn test_sibling_axes() {
        let doc = sample();
        assert_eq!(navigate(&doc, 1, Axis::FollowingSibling), vec![3]);
        assert_eq!(navigate(&doc, 3, Axis::PrecedingSibling), vec![1]);
    }

    #[test]
    fn test_name_test_ignores_prefixed_elements() {
        let doc = build(
            vec![TreeNode::element(
                "root",
                vec![],
                vec![
                    TreeNode::element("item", vec![], vec![]),
                    TreeNode::element("ns:item", vec![], vec![]),
                ],
            )],
            ParseMode::Xml,
        )
        .unwrap();
        assert!(matches_node_test(
            &doc,
            1,
            &NodeTest::Named("item".to_string())
        ));
        assert!(!matches_node_test(
            &doc,
            2,
            &NodeTest::Named("item".to_string())
        ));
        assert!(matches_node_test(
            &doc,
            2,
            &NodeTest::Prefixed("ns".to_string(), "item".to_string())
        ));
        assert!(matches_node_test(
            &doc,
            2,
            &NodeTest::PrefixWildcard("ns".to_string())
        ));
    }

    #[test]
    fn test_unknown_axis_name() {
        assert!(Axis::from_name("following").is_none());
        assert!(Axis::from_name("namespace").is_none());
        assert_eq!(Axis::from_name("self"), Some(Axis::Self_));
    }
}
