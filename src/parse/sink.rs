//! Arena tree sink driven by html5ever and xml5ever.
//!
//! The sink accumulates a small mutable parse arena (the HTML5 tree
//! constructor reparents nodes, so this cannot be the final store) and is
//! converted to tuple-tree roots once parsing finishes. Both parsers share
//! the one `TreeSink` implementation.

use std::borrow::Cow;

use html5ever::interface::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::tendril::StrTendril;
use html5ever::{Attribute, ExpandedName, QualName};

use crate::dom::ParseMode;
use crate::tree::{TreeNode, DOCTYPE_TAG, PI_TAG};

fn tendril_to_string(t: StrTendril) -> String {
    let s: &str = &t;
    s.to_owned()
}

fn qual_to_string(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", &**prefix, &*name.local),
        None => (*name.local).to_string(),
    }
}

fn attrs_to_pairs(attrs: Vec<Attribute>) -> Vec<(String, String)> {
    attrs
        .into_iter()
        .map(|attr| (qual_to_string(&attr.name), tendril_to_string(attr.value)))
        .collect()
}

enum ParseData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Pi {
        target: String,
        content: String,
    },
}

struct ParseNode {
    parent: Option<usize>,
    children: Vec<usize>,
    data: ParseData,
}

/// Mutable parse arena. Handle type is the arena index; index 0 is the
/// synthetic document node.
pub struct ArenaSink {
    nodes: Vec<ParseNode>,
    errors: Vec<Cow<'static, str>>,
}

impl ArenaSink {
    pub fn new() -> Self {
        ArenaSink {
            nodes: vec![ParseNode {
                parent: None,
                children: Vec::new(),
                data: ParseData::Document,
            }],
            errors: Vec::new(),
        }
    }

    /// Recovered parse errors reported by the tokenizer/tree constructor.
    pub fn errors(&self) -> &[Cow<'static, str>] {
        &self.errors
    }

    fn new_node(&mut self, data: ParseData) -> usize {
        self.nodes.push(ParseNode {
            parent: None,
            children: Vec::new(),
            data,
        });
        self.nodes.len() - 1
    }

    fn detach(&mut self, id: usize) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&c| c != id);
        }
    }

    fn attach(&mut self, parent: usize, child: usize) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    fn insert_at(&mut self, parent: usize, index: usize, child: usize) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.insert(index, child);
    }

    /// Convert the arena to tuple-tree roots (children of the document
    /// node), mapping non-element kinds onto their sentinel tags.
    pub fn into_tree(self, mode: ParseMode) -> Vec<TreeNode> {
        let roots = self.nodes[0].children.clone();
        roots
            .into_iter()
            .map(|id| self.convert(id, mode))
            .collect()
    }

    fn convert(&self, id: usize, mode: ParseMode) -> TreeNode {
        let node = &self.nodes[id];
        match &node.data {
            ParseData::Document => {
                // Nested document nodes do not occur; treat as empty text.
                TreeNode::Text(String::new())
            }
            ParseData::Text(content) => TreeNode::Text(content.clone()),
            ParseData::Comment(content) => TreeNode::comment(content.clone()),
            ParseData::Doctype {
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
            ParseData::Pi { target, content } => TreeNode::Node(
                PI_TAG.to_string(),
                vec![
                    ("target".to_string(), target.clone()),
                    ("content".to_string(), content.clone()),
                ],
                Vec::new(),
            ),
            ParseData::Element { name, attrs } => {
                let tag = match mode {
                    // The HTML tokenizer already lowercased the local name
                    // and never produces prefixes for HTML elements.
                    ParseMode::Html => (*name.local).to_string(),
                    ParseMode::Xml => qual_to_string(name),
                };
                let children = node
                    .children
                    .iter()
                    .map(|&child| self.convert(child, mode))
                    .collect();
                TreeNode::Node(tag, attrs.clone(), children)
            }
        }
    }
}

impl Default for ArenaSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSink for ArenaSink {
    type Handle = usize;
    type Output = ArenaSink;

    fn finish(self) -> ArenaSink {
        self
    }

    fn parse_error(&mut self, msg: Cow<'static, str>) {
        self.errors.push(msg);
    }

    fn get_document(&mut self) -> usize {
        0
    }

    fn elem_name<'a>(&'a self, target: &'a usize) -> ExpandedName<'a> {
        match &self.nodes[*target].data {
            ParseData::Element { name, .. } => name.expanded(),
            _ => panic!("elem_name called on a non-element parse node"),
        }
    }

    fn create_element(
        &mut self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> usize {
        let attrs = attrs_to_pairs(attrs);
        self.new_node(ParseData::Element { name, attrs })
    }

    fn create_comment(&mut self, text: StrTendril) -> usize {
        self.new_node(ParseData::Comment(tendril_to_string(text)))
    }

    fn create_pi(&mut self, target: StrTendril, data: StrTendril) -> usize {
        self.new_node(ParseData::Pi {
            target: tendril_to_string(target),
            content: tendril_to_string(data),
        })
    }

    fn append(&mut self, parent: &usize, child: NodeOrText<usize>) {
        match child {
            NodeOrText::AppendNode(id) => self.attach(*parent, id),
            NodeOrText::AppendText(text) => {
                // Adjacent text coalesces at parse time.
                if let Some(&last) = self.nodes[*parent].children.last() {
                    if let ParseData::Text(existing) = &mut self.nodes[last].data {
                        existing.push_str(&text);
                        return;
                    }
                }
                let id = self.new_node(ParseData::Text(tendril_to_string(text)));
                self.attach(*parent, id);
            }
        }
    }

    fn append_before_sibling(&mut self, sibling: &usize, new_node: NodeOrText<usize>) {
        let Some(parent) = self.nodes[*sibling].parent else {
            // Detached sibling: no position to insert at, fall back to the
            // document node so content is not lost.
            self.append(&0, new_node);
            return;
        };
        let index = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == *sibling)
            .unwrap_or(self.nodes[parent].children.len());

        match new_node {
            NodeOrText::AppendNode(id) => self.insert_at(parent, index, id),
            NodeOrText::AppendText(text) => {
                if index > 0 {
                    let prev = self.nodes[parent].children[index - 1];
                    if let ParseData::Text(existing) = &mut self.nodes[prev].data {
                        existing.push_str(&text);
                        return;
                    }
                }
                let id = self.new_node(ParseData::Text(tendril_to_string(text)));
                self.insert_at(parent, index, id);
            }
        }
    }

    fn append_based_on_parent_node(
        &mut self,
        element: &usize,
        prev_element: &usize,
        child: NodeOrText<usize>,
    ) {
        if self.nodes[*prev_element].parent.is_some() {
            self.append_before_sibling(prev_element, child);
        } else {
            self.append(element, child);
        }
    }

    fn append_doctype_to_document(
        &mut self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        let id = self.new_node(ParseData::Doctype {
            name: tendril_to_string(name),
            public_id: tendril_to_string(public_id),
            system_id: tendril_to_string(system_id),
        });
        self.attach(0, id);
    }

    fn get_template_contents(&mut self, target: &usize) -> usize {
        // Template contents parse as ordinary children of the template
        // element; no separate fragment is kept.
        *target
    }

    fn same_node(&self, x: &usize, y: &usize) -> bool {
        x == y
    }

    fn set_quirks_mode(&mut self, _mode: QuirksMode) {}

    fn add_attrs_if_missing(&mut self, target: &usize, attrs: Vec<Attribute>) {
        let new_attrs = attrs_to_pairs(attrs);
        if let ParseData::Element { attrs, .. } = &mut self.nodes[*target].data {
            for (name, value) in new_attrs {
                if !attrs.iter().any(|(existing, _)| *existing == name) {
                    attrs.push((name, value));
                }
            }
        }
    }

    fn remove_from_parent(&mut self, target: &usize) {
        self.detach(*target);
    }

    fn reparent_children(&mut self, node: &usize, new_parent: &usize) {
        let children = std::mem::take(&mut self.nodes[*node].children);
        for &child in &children {
            self.nodes[child].parent = Some(*new_parent);
        }
        self.nodes[*new_parent].children.extend(children);
    }

    fn mark_script_already_started(&mut self, _node: &usize) {}

    fn pop(&mut self, _node: &usize) {}

    fn is_mathml_annotation_xml_integration_point(&self, _handle: &usize) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use html5ever::{local_name, namespace_url, ns};

    #[test]
    fn test_text_coalescing() {
        let mut sink = ArenaSink::new();
        let div = sink.create_element(
            QualName::new(None, ns!(html), local_name!("div")),
            Vec::new(),
            ElementFlags::default(),
        );
        sink.append(&0, NodeOrText::AppendNode(div));
        sink.append(&div, NodeOrText::AppendText(StrTendril::from("Hello, ")));
        sink.append(&div, NodeOrText::AppendText(StrTendril::from("World!")));

        let roots = sink.into_tree(ParseMode::Html);
        assert_eq!(
            roots,
            vec![TreeNode::element(
                "div",
                vec![],
                vec![TreeNode::text("Hello, World!")],
            )]
        );
    }

    #[test]
    fn test_reparent_children() {
        let mut sink = ArenaSink::new();
        let a = sink.create_element(
            QualName::new(None, ns!(html), local_name!("a")),
            Vec::new(),
            ElementFlags::default(),
        );
        let b = sink.create_element(
            QualName::new(None, ns!(html), local_name!("b")),
            Vec::new(),
            ElementFlags::default(),
        );
        sink.append(&0, NodeOrText::AppendNode(a));
        sink.append(&0, NodeOrText::AppendNode(b));
        sink.append(&a, NodeOrText::AppendText(StrTendril::from("x")));

        sink.reparent_children(&a, &b);
        let roots = sink.into_tree(ParseMode::Html);
        assert_eq!(
            roots,
            vec![
                TreeNode::element("a", vec![], vec![]),
                TreeNode::element("b", vec![], vec![TreeNode::text("x")]),
            ]
        );
    }
}
