//! External-parser boundary.
//!
//! Raw markup goes through html5ever (HTML mode) or xml5ever (XML mode)
//! into the shared arena sink, comes back as a tuple-tree, and is handed to
//! the document builder. Both parsers recover from malformed input rather
//! than failing; recovered errors are logged, not surfaced.

pub mod sink;

use html5ever::tendril::{StrTendril, TendrilSink};
use tracing::debug;

use crate::dom::{self, Document, ParseMode};
use crate::error::Result;
use sink::ArenaSink;

/// Parse HTML markup into a document.
pub fn parse_html(input: &str) -> Result<Document> {
    let sink = html5ever::parse_document(ArenaSink::new(), html5ever::driver::ParseOpts::default())
        .one(StrTendril::from(input));
    finish(sink, ParseMode::Html)
}

/// Parse XML markup into a document.
pub fn parse_xml(input: &str) -> Result<Document> {
    let sink = xml5ever::driver::parse_document(
        ArenaSink::new(),
        xml5ever::driver::XmlParseOpts::default(),
    )
    .one(StrTendril::from(input));
    finish(sink, ParseMode::Xml)
}

fn finish(sink: ArenaSink, mode: ParseMode) -> Result<Document> {
    if !sink.errors().is_empty() {
        debug!(
            errors = sink.errors().len(),
            first = %sink.errors()[0],
            "parser recovered from malformed markup"
        );
    }
    let roots = sink.into_tree(mode);
    let doc = dom::build(roots, mode)?;
    debug!(nodes = doc.len(), ?mode, "built document");
    Ok(doc)
}
