//! quarry: extract structured data from HTML and XML documents.
//!
//! Parsed markup lands in a flat, id-indexed document store; CSS and
//! XPath front-ends compile into one selector algebra; a selection driver
//! walks the store in document order and hands matches to an accumulator.
//!
//! ```
//! use quarry::{css, Context};
//!
//! let doc = quarry::parse_html("<div id=main><p>1</p><p>2</p></div>")?;
//! let results = quarry::all(&doc, &css::compile("#main p")?, &Context::new())?;
//! assert_eq!(results.len(), 2);
//! assert_eq!(results[0].text(), "1");
//! # Ok::<(), quarry::Error>(())
//! ```

pub mod css;
pub mod dom;
mod error;
mod extract;
pub mod parse;
pub mod select;
mod serialize;
pub mod tree;
pub mod xpath;

pub use dom::{build, DataKind, Document, Element, Node, NodeData, NodeId, ParseMode};
pub use error::{Error, Grammar, Result};
pub use extract::Selection;
pub use parse::{parse_html, parse_xml};
pub use select::{
    all, one, select, Accumulator, All, Combinator, Compound, Context, Matcher, One, Queryable,
    Relation, Selector, SelectorGroup,
};
pub use tree::TreeNode;
pub use xpath::XPathValue;

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(results: &[Selection]) -> Vec<String> {
        results.iter().map(|s| s.text()).collect()
    }

    #[test]
    fn test_css_all_in_document_order() {
        let doc = parse_html("<div id=main><p>1</p><p>2</p><p>3</p></div>").unwrap();
        let results = all(&doc, &css::compile("#main p").unwrap(), &Context::new()).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.tag() == Some("p")));
        assert_eq!(texts(&results), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_css_one_is_first() {
        let doc = parse_html("<div id=main><p>1</p><p>2</p><p>3</p></div>").unwrap();
        let result = one(&doc, &css::compile("#main p").unwrap(), &Context::new())
            .unwrap()
            .unwrap();
        assert_eq!(result.text(), "1");
    }

    #[test]
    fn test_text_and_own_text() {
        let doc = parse_html("<div>Hello, <b>World!</b></div>").unwrap();
        let div = one(&doc, &css::compile("div").unwrap(), &Context::new())
            .unwrap()
            .unwrap();
        assert_eq!(div.text(), "Hello, World!");
        assert_eq!(div.own_text(), "Hello,");
    }

    #[test]
    fn test_script_data() {
        let doc = parse_html("<script id=x>Hi</script>").unwrap();
        let script = one(&doc, &css::compile("#x").unwrap(), &Context::new())
            .unwrap()
            .unwrap();
        assert_eq!(script.data(), "Hi");
        assert_eq!(script.text(), "");
    }

    #[test]
    fn test_user_selector_over_comments() {
        #[derive(Debug)]
        struct CommentContains(&'static str);

        impl Selector for CommentContains {
            fn matches(&self, doc: &Document, id: NodeId, _ctx: &Context) -> Result<bool> {
                Ok(match &doc.get(id).data {
                    NodeData::Comment { content } => content.contains(self.0),
                    _ => false,
                })
            }
        }

        let doc = parse_html("<!-- TODO x --><div>ok</div>").unwrap();
        let group: SelectorGroup = vec![Box::new(CommentContains("TODO"))];
        let results = all(&doc, &group, &Context::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].html(), "<!-- TODO x -->");
    }

    #[test]
    fn test_xpath_positional_select() {
        let doc = parse_html("<ul><li>a<li>b<li>c</ul>").unwrap();
        let result = one(&doc, &xpath::compile("//li[2]").unwrap(), &Context::new())
            .unwrap()
            .unwrap();
        assert_eq!(result.text(), "b");
    }

    #[test]
    fn test_xpath_attr_predicate_select() {
        let doc = parse_xml("<a x=\"1\"><b x=\"2\"/><b x=\"3\"/></a>").unwrap();
        let result = one(
            &doc,
            &xpath::compile("//b[@x=\"3\"]").unwrap(),
            &Context::new(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.attr("x"), Some("3"));
    }

    #[test]
    fn test_universal_selector_is_every_element() {
        let doc = parse_html("<div><p>1</p><span>2</span></div>").unwrap();
        let results = all(&doc, &css::compile("*").unwrap(), &Context::new()).unwrap();
        let expected: Vec<NodeId> = doc
            .walk()
            .filter(|&id| doc.get(id).is_element())
            .collect();
        let actual: Vec<NodeId> = results.iter().map(|r| r.id()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_xpath_union_idempotent() {
        let doc = parse_html("<ul><li>a<li>b</ul>").unwrap();
        let once = all(&doc, &xpath::compile("//li").unwrap(), &Context::new()).unwrap();
        let twice = all(
            &doc,
            &xpath::compile("//li | //li").unwrap(),
            &Context::new(),
        )
        .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_css_group_union_matches_concatenation() {
        let doc = parse_html("<p>1</p><div>2</div>").unwrap();
        let both = all(&doc, &css::compile("p, div").unwrap(), &Context::new()).unwrap();
        let ps = all(&doc, &css::compile("p").unwrap(), &Context::new()).unwrap();
        let divs = all(&doc, &css::compile("div").unwrap(), &Context::new()).unwrap();
        let concat: Vec<Selection> = ps.into_iter().chain(divs).collect();
        assert_eq!(both, concat);
    }

    #[test]
    fn test_css_structural_pseudos_end_to_end() {
        let doc =
            parse_html("<ul><li>1</li><li>2</li><li>3</li><li>4</li><li>5</li></ul>").unwrap();
        let odd = all(
            &doc,
            &css::compile("li:nth-child(odd)").unwrap(),
            &Context::new(),
        )
        .unwrap();
        assert_eq!(texts(&odd), vec!["1", "3", "5"]);

        let last_two = all(
            &doc,
            &css::compile("li:nth-last-child(-n+2)").unwrap(),
            &Context::new(),
        )
        .unwrap();
        assert_eq!(texts(&last_two), vec!["4", "5"]);
    }

    #[test]
    fn test_css_has_and_not_end_to_end() {
        let doc = parse_html(
            "<div class=linked><a href=x>link</a></div><div><span>plain</span></div>",
        )
        .unwrap();
        let with_link = all(
            &doc,
            &css::compile("div:has(a[href])").unwrap(),
            &Context::new(),
        )
        .unwrap();
        assert_eq!(with_link.len(), 1);
        assert_eq!(with_link[0].text(), "link");

        let without_link = all(
            &doc,
            &css::compile("div:not(.linked)").unwrap(),
            &Context::new(),
        )
        .unwrap();
        assert_eq!(without_link.len(), 1);
        assert_eq!(without_link[0].text(), "plain");
    }

    #[test]
    fn test_selection_as_queryable_anchors_subtree() {
        let doc = parse_html(
            "<section><ul><li>in</li></ul></section><ul><li>out</li></ul>",
        )
        .unwrap();
        let section = one(&doc, &css::compile("section").unwrap(), &Context::new())
            .unwrap()
            .unwrap();
        let inner = all(&section, &css::compile("li").unwrap(), &Context::new()).unwrap();
        assert_eq!(texts(&inner), vec!["in"]);
    }

    #[test]
    fn test_mixed_group_css_and_xpath_styles() {
        // A CSS-compiled group and an XPath-compiled group can be merged
        // into one driver call; the algebra does not care who built them.
        let doc = parse_html("<div><p>a</p><em>b</em></div>").unwrap();
        let mut group = css::compile("p").unwrap();
        group.extend(xpath::compile("//em").unwrap());
        let results = all(&doc, &group, &Context::new()).unwrap();
        assert_eq!(texts(&results), vec!["a", "b"]);
    }

    #[test]
    fn test_xpath_type_error_aborts_selection() {
        let doc = parse_html("<p>1</p>").unwrap();
        let err = all(
            &doc,
            &xpath::compile("count(//p)").unwrap(),
            &Context::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::XPathType(_)));
    }
}
