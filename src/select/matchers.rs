//! Built-in matchers: the tagged sum of primitive selectors, plus the
//! compound wrapper the CSS front-end compiles onto.

use crate::dom::{Document, Element, NodeData, NodeId};
use crate::error::{Error, Result};
use crate::select::context::Context;
use crate::select::nth::Nth;
use crate::select::{chain_matches, relation_candidates, Combinator, Relation, Selector};

/// Attribute comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// `[name]`
    Present,
    /// `[name=value]`
    Equals,
    /// `[name~=value]`, a whitespace-separated word
    Includes,
    /// `[name|=value]`, exact or dash-prefixed
    DashMatch,
    /// `[name^=value]`
    Prefix,
    /// `[name$=value]`
    Suffix,
    /// `[name*=value]`
    Substring,
}

/// An attribute matcher `(name, op, value, case)`. Attribute names compare
/// case-insensitively on HTML documents; `case_insensitive` applies to the
/// value side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrMatcher {
    pub name: String,
    pub op: AttrOp,
    pub value: String,
    pub case_insensitive: bool,
}

impl AttrMatcher {
    pub fn present(name: impl Into<String>) -> Self {
        AttrMatcher {
            name: name.into(),
            op: AttrOp::Present,
            value: String::new(),
            case_insensitive: false,
        }
    }

    pub fn new(name: impl Into<String>, op: AttrOp, value: impl Into<String>) -> Self {
        AttrMatcher {
            name: name.into(),
            op,
            value: value.into(),
            case_insensitive: false,
        }
    }

    fn matches_element(&self, doc: &Document, elem: &Element) -> bool {
        let found = elem
            .attributes
            .iter()
            .find(|(name, _)| doc.attr_name_eq(name, &self.name));
        let Some((_, actual)) = found else {
            return false;
        };

        let (actual, wanted) = if self.case_insensitive {
            (actual.to_ascii_lowercase(), self.value.to_ascii_lowercase())
        } else {
            (actual.clone(), self.value.clone())
        };

        match self.op {
            AttrOp::Present => true,
            AttrOp::Equals => actual == wanted,
            AttrOp::Includes => {
                // A sought value containing whitespace can never equal a
                // whitespace-separated word.
                if wanted.is_empty() || wanted.contains(char::is_whitespace) {
                    return false;
                }
                actual.split_whitespace().any(|word| word == wanted)
            }
            AttrOp::DashMatch => {
                actual == wanted
                    || (actual.len() > wanted.len()
                        && actual.starts_with(&wanted)
                        && actual.as_bytes()[wanted.len()] == b'-')
            }
            AttrOp::Prefix => !wanted.is_empty() && actual.starts_with(&wanted),
            AttrOp::Suffix => !wanted.is_empty() && actual.ends_with(&wanted),
            AttrOp::Substring => !wanted.is_empty() && actual.contains(&wanted),
        }
    }
}

/// Structural pseudo-classes.
#[derive(Debug)]
pub enum Pseudo {
    Root,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    /// `:not(S)` for a compound of simple selectors.
    Not(Vec<Matcher>),
    /// `:has(S)`, descendants by default, children when the combinator is
    /// explicit.
    Has(Relation, Box<dyn Selector>),
}

/// Node-kind matchers for non-element variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Comment,
    Text,
    Data,
    /// Any non-element node.
    NotElement,
}

/// The tagged sum of built-in primitive matchers.
#[derive(Debug)]
pub enum Matcher {
    /// Tag equality under the document's case policy.
    Tag(String),
    /// `*`: any element.
    AnyElement,
    Attr(AttrMatcher),
    Pseudo(Pseudo),
    Kind(Kind),
    /// Matches iff the candidate is a root.
    Root,
}

impl Matcher {
    /// `#id` sugar: an exact attribute match on `id`.
    pub fn id(value: impl Into<String>) -> Self {
        Matcher::Attr(AttrMatcher::new("id", AttrOp::Equals, value))
    }

    /// `.class` sugar: a whitespace-word attribute match on `class`.
    pub fn class(value: impl Into<String>) -> Self {
        Matcher::Attr(AttrMatcher::new("class", AttrOp::Includes, value))
    }
}

/// 1-based position of `id` among its element siblings, with the total
/// count. `of_type` restricts the sibling list to the candidate's
/// tag + namespace. None when `id` is not an element or is a root.
fn element_position(doc: &Document, id: NodeId, of_type: bool) -> Option<(usize, usize)> {
    let elem = doc.get(id).as_element()?;
    let same_kind = |other: NodeId| {
        let node = doc.get(other);
        match node.as_element() {
            Some(_) if !of_type => true,
            Some(e) => e.tag == elem.tag && e.namespace == elem.namespace,
            None => false,
        }
    };
    let mut position = None;
    let mut count = 0;
    for &sib in doc.siblings(id) {
        if same_kind(sib) {
            count += 1;
            if sib == id {
                position = Some(count);
            }
        }
    }
    position.map(|p| (p, count))
}

fn pseudo_matches(
    pseudo: &Pseudo,
    doc: &Document,
    id: NodeId,
    ctx: &Context,
) -> Result<bool> {
    let matched = match pseudo {
        Pseudo::Root => doc.get(id).is_element() && doc.parent(id).is_none(),
        Pseudo::FirstChild => element_position(doc, id, false).is_some_and(|(p, _)| p == 1),
        Pseudo::LastChild => element_position(doc, id, false).is_some_and(|(p, n)| p == n),
        Pseudo::OnlyChild => element_position(doc, id, false).is_some_and(|(_, n)| n == 1),
        Pseudo::FirstOfType => element_position(doc, id, true).is_some_and(|(p, _)| p == 1),
        Pseudo::LastOfType => element_position(doc, id, true).is_some_and(|(p, n)| p == n),
        Pseudo::OnlyOfType => element_position(doc, id, true).is_some_and(|(_, n)| n == 1),
        Pseudo::NthChild(nth) => {
            element_position(doc, id, false).is_some_and(|(p, _)| nth.matches(p))
        }
        Pseudo::NthLastChild(nth) => {
            element_position(doc, id, false).is_some_and(|(p, n)| nth.matches(n + 1 - p))
        }
        Pseudo::NthOfType(nth) => {
            element_position(doc, id, true).is_some_and(|(p, _)| nth.matches(p))
        }
        Pseudo::NthLastOfType(nth) => {
            element_position(doc, id, true).is_some_and(|(p, n)| nth.matches(n + 1 - p))
        }
        Pseudo::Not(inner) => {
            let mut all = true;
            for matcher in inner {
                if !matcher.matches(doc, id, ctx)? {
                    all = false;
                    break;
                }
            }
            !all
        }
        Pseudo::Has(relation, inner) => {
            let mut found = false;
            for candidate in relation_candidates(doc, id, *relation) {
                if chain_matches(inner.as_ref(), doc, candidate, ctx)? {
                    found = true;
                    break;
                }
            }
            found
        }
    };
    Ok(matched)
}

impl Selector for Matcher {
    fn matches(&self, doc: &Document, id: NodeId, ctx: &Context) -> Result<bool> {
        let node = doc.get(id);
        let matched = match self {
            Matcher::Tag(tag) => match node.as_element() {
                Some(elem) => doc.tag_eq(&elem.tag, tag),
                None => false,
            },
            Matcher::AnyElement => node.is_element(),
            Matcher::Attr(attr) => match node.as_element() {
                Some(elem) => attr.matches_element(doc, elem),
                None => false,
            },
            Matcher::Pseudo(pseudo) => return pseudo_matches(pseudo, doc, id, ctx),
            Matcher::Kind(kind) => match (&node.data, kind) {
                (NodeData::Comment { .. }, Kind::Comment) => true,
                (NodeData::Text { .. }, Kind::Text) => true,
                (NodeData::Data { .. }, Kind::Data) => true,
                (data, Kind::NotElement) => !matches!(data, NodeData::Element(_)),
                _ => false,
            },
            Matcher::Root => node.parent.is_none(),
        };
        Ok(matched)
    }

    fn validate(&self) -> Result<()> {
        match self {
            Matcher::Pseudo(Pseudo::Not(inner)) => {
                for matcher in inner {
                    if matches!(
                        matcher,
                        Matcher::Pseudo(Pseudo::Not(_)) | Matcher::Pseudo(Pseudo::Has(..))
                    ) {
                        return Err(Error::SelectorValidation(
                            ":not accepts only simple selectors".to_string(),
                        ));
                    }
                    matcher.validate()?;
                }
                Ok(())
            }
            Matcher::Pseudo(Pseudo::Has(_, inner)) => inner.validate(),
            _ => Ok(()),
        }
    }
}

/// One element matcher plus co-requisite filters that must all match the
/// same node, chained onward through an optional combinator. CSS compound
/// selectors compile to this.
#[derive(Debug)]
pub struct Compound {
    pub matcher: Matcher,
    pub filters: Vec<Box<dyn Selector>>,
    pub combinator: Option<Combinator>,
}

impl Compound {
    pub fn new(matcher: Matcher) -> Self {
        Compound {
            matcher,
            filters: Vec::new(),
            combinator: None,
        }
    }
}

impl Selector for Compound {
    fn matches(&self, doc: &Document, id: NodeId, ctx: &Context) -> Result<bool> {
        self.matcher.matches(doc, id, ctx)
    }

    fn combinator(&self) -> Option<&Combinator> {
        self.combinator.as_ref()
    }

    fn filters(&self) -> Option<&[Box<dyn Selector>]> {
        if self.filters.is_empty() {
            None
        } else {
            Some(&self.filters)
        }
    }

    fn validate(&self) -> Result<()> {
        self.matcher.validate()?;
        for filter in &self.filters {
            filter.validate()?;
        }
        if let Some(comb) = &self.combinator {
            comb.selector.validate()?;
        }
        Ok(())
    }
}
