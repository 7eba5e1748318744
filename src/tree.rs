//! Tuple-tree representation of parsed markup.
//!
//! The external parser boundary and `Selection::tree()` both speak this
//! shape: a node is either literal text or `(tag, attributes, children)`.
//! A handful of sentinel tags carry the non-element node kinds; they start
//! with `-` so they can never collide with a real tag name.

/// Sentinel tag for doctype nodes (`name`/`public`/`system` attributes).
pub const DOCTYPE_TAG: &str = "-doctype";
/// Sentinel tag for comment nodes (single optional text child).
pub const COMMENT_TAG: &str = "-comment";
/// Sentinel tag for processing instructions (`target`/`content` attributes).
pub const PI_TAG: &str = "-pi";
/// Sentinel tag for CDATA sections (single optional text child).
pub const CDATA_TAG: &str = "-cdata";

/// A node in a tuple-tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// Literal text content.
    Text(String),
    /// `(tag, [(name, value)], [children])`.
    Node(String, Vec<(String, String)>, Vec<TreeNode>),
}

impl TreeNode {
    /// Build an element node.
    pub fn element(
        tag: impl Into<String>,
        attrs: Vec<(String, String)>,
        children: Vec<TreeNode>,
    ) -> Self {
        TreeNode::Node(tag.into(), attrs, children)
    }

    /// Build a text node.
    pub fn text(content: impl Into<String>) -> Self {
        TreeNode::Text(content.into())
    }

    /// Build a comment sentinel node.
    pub fn comment(content: impl Into<String>) -> Self {
        TreeNode::Node(
            COMMENT_TAG.to_string(),
            Vec::new(),
            vec![TreeNode::Text(content.into())],
        )
    }

    /// Look up an attribute value by exact name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            TreeNode::Node(_, attrs, _) => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            TreeNode::Text(_) => None,
        }
    }
}

impl From<&str> for TreeNode {
    fn from(s: &str) -> Self {
        TreeNode::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_attr_lookup() {
        let node = TreeNode::element(
            "div",
            vec![("id".to_string(), "main".to_string())],
            vec![TreeNode::text("hi")],
        );
        assert_eq!(node.attr("id"), Some("main"));
        assert_eq!(node.attr("class"), None);
    }

    #[test]
    fn test_comment_shape() {
        let node = TreeNode::comment(" TODO ");
        match node {
            TreeNode::Node(tag, attrs, children) => {
                assert_eq!(tag, COMMENT_TAG);
                assert!(attrs.is_empty());
                assert_eq!(children, vec![TreeNode::Text(" TODO ".to_string())]);
            }
            TreeNode::Text(_) => panic!("expected sentinel node"),
        }
    }
}
