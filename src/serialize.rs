//! HTML serialization of stored nodes.
//!
//! Attribute values are double-quoted with `"` and `&` escaped; text
//! escapes `<`, `>`, `&`. Void elements emit no closing tag. Script and
//! style data emit raw.

use memchr::{memchr2, memchr3};

use crate::dom::{DataKind, Document, NodeData, NodeId};

/// The HTML5 void element set.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| tag.eq_ignore_ascii_case(v))
}

fn escape_text(s: &str, out: &mut String) {
    let bytes = s.as_bytes();
    let mut start = 0;
    while let Some(pos) = memchr3(b'<', b'>', b'&', &bytes[start..]) {
        let abs = start + pos;
        out.push_str(&s[start..abs]);
        match bytes[abs] {
            b'<' => out.push_str("&lt;"),
            b'>' => out.push_str("&gt;"),
            _ => out.push_str("&amp;"),
        }
        start = abs + 1;
    }
    out.push_str(&s[start..]);
}

fn escape_attr(s: &str, out: &mut String) {
    let bytes = s.as_bytes();
    let mut start = 0;
    while let Some(pos) = memchr2(b'"', b'&', &bytes[start..]) {
        let abs = start + pos;
        out.push_str(&s[start..abs]);
        match bytes[abs] {
            b'"' => out.push_str("&quot;"),
            _ => out.push_str("&amp;"),
        }
        start = abs + 1;
    }
    out.push_str(&s[start..]);
}

/// Serialize `id` and its descendants into `out`.
pub fn serialize_node(doc: &Document, id: NodeId, out: &mut String) {
    match &doc.get(id).data {
        NodeData::Element(elem) => {
            let name = elem.qualified_name();
            out.push('<');
            out.push_str(&name);
            for (attr_name, attr_value) in &elem.attributes {
                out.push(' ');
                out.push_str(attr_name);
                out.push_str("=\"");
                escape_attr(attr_value, out);
                out.push('"');
            }
            out.push('>');
            if is_void(&elem.tag) {
                return;
            }
            for &child in &elem.children {
                serialize_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        NodeData::Text { content } => escape_text(content, out),
        NodeData::Data { content, kind } => match kind {
            DataKind::Cdata => {
                out.push_str("<![CDATA[");
                out.push_str(content);
                out.push_str("]]>");
            }
            DataKind::Script | DataKind::Style => out.push_str(content),
        },
        NodeData::Comment { content } => {
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
        }
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            if !public_id.is_empty() {
                out.push_str(" PUBLIC \"");
                out.push_str(public_id);
                out.push_str("\" \"");
                out.push_str(system_id);
                out.push('"');
            } else if !system_id.is_empty() {
                out.push_str(" SYSTEM \"");
                out.push_str(system_id);
                out.push('"');
            }
            out.push('>');
        }
        NodeData::ProcessingInstruction { target, content } => {
            out.push_str("<?");
            out.push_str(target);
            if !content.is_empty() {
                out.push(' ');
                out.push_str(content);
            }
            out.push_str("?>");
        }
    }
}

impl Document {
    /// Serialization of the whole document, roots in order.
    pub fn html(&self) -> String {
        let mut out = String::new();
        for &root in self.root_ids() {
            serialize_node(self, root, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{build, ParseMode};
    use crate::tree::TreeNode;

    fn html_of(tree: Vec<TreeNode>) -> String {
        build(tree, ParseMode::Html).unwrap().html()
    }

    #[test]
    fn test_element_with_attrs() {
        let out = html_of(vec![TreeNode::element(
            "a",
            vec![("href".to_string(), "x?a=1&b=\"2\"".to_string())],
            vec![TreeNode::text("link")],
        )]);
        assert_eq!(out, "<a href=\"x?a=1&amp;b=&quot;2&quot;\">link</a>");
    }

    #[test]
    fn test_text_escaping() {
        let out = html_of(vec![TreeNode::element(
            "p",
            vec![],
            vec![TreeNode::text("1 < 2 && 3 > 2")],
        )]);
        assert_eq!(out, "<p>1 &lt; 2 &amp;&amp; 3 &gt; 2</p>");
    }

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let out = html_of(vec![TreeNode::element(
            "div",
            vec![],
            vec![
                TreeNode::element("br", vec![], vec![]),
                TreeNode::element(
                    "img",
                    vec![("src".to_string(), "x.png".to_string())],
                    vec![],
                ),
            ],
        )]);
        assert_eq!(out, "<div><br><img src=\"x.png\"></div>");
    }

    #[test]
    fn test_script_data_is_raw() {
        let out = html_of(vec![TreeNode::element(
            "script",
            vec![],
            vec![TreeNode::text("if (a < b) { go(); }")],
        )]);
        assert_eq!(out, "<script>if (a < b) { go(); }</script>");
    }

    #[test]
    fn test_cdata_comment_doctype_pi() {
        let out = html_of(vec![
            TreeNode::element(
                "-doctype",
                vec![("name".to_string(), "html".to_string())],
                vec![],
            ),
            TreeNode::comment(" note "),
            TreeNode::element("-cdata", vec![], vec![TreeNode::text("raw <stuff>")]),
            TreeNode::element(
                "-pi",
                vec![
                    ("target".to_string(), "xml".to_string()),
                    ("content".to_string(), "version=\"1.0\"".to_string()),
                ],
                vec![],
            ),
        ]);
        assert_eq!(
            out,
            "<!DOCTYPE html><!-- note --><![CDATA[raw <stuff>]]><?xml version=\"1.0\"?>"
        );
    }

    #[test]
    fn test_doctype_with_ids() {
        let out = html_of(vec![TreeNode::element(
            "-doctype",
            vec![
                ("name".to_string(), "html".to_string()),
                ("public".to_string(), "-//W3C//DTD HTML 4.01//EN".to_string()),
                (
                    "system".to_string(),
                    "http://www.w3.org/TR/html4/strict.dtd".to_string(),
                ),
            ],
            vec![],
        )]);
        assert_eq!(
            out,
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \"http://www.w3.org/TR/html4/strict.dtd\">"
        );
    }
}
