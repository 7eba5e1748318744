//! XPath core functions.
//!
//! Node-set: position(), last(), count(), name(), local-name()
//! Boolean: not(), true(), false()
//! String: string(), contains(), starts-with(), normalize-space()

use super::eval::{node_string, resolve_string, EvalContext};
use super::value::XPathValue;
use super::DOCUMENT_NODE;
use crate::dom::{NodeData, NodeId};
use crate::error::{Error, Result};

/// Evaluate a function call.
pub fn call(name: &str, args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue> {
    match name {
        "position" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Number(ctx.ctx.position().unwrap_or(1) as f64))
        }
        "last" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Number(ctx.ctx.last().unwrap_or(1) as f64))
        }
        "count" => fn_count(args),
        "name" => fn_name(args, ctx, false),
        "local-name" => fn_name(args, ctx, true),
        "not" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Boolean(!args[0].boolean()))
        }
        "true" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Boolean(true))
        }
        "false" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Boolean(false))
        }
        "string" => fn_string(args, ctx),
        "contains" => {
            arity(name, &args, 2, 2)?;
            let hay = resolve_string(ctx.doc, &args[0]);
            let needle = resolve_string(ctx.doc, &args[1]);
            Ok(XPathValue::Boolean(hay.contains(&needle)))
        }
        "starts-with" => {
            arity(name, &args, 2, 2)?;
            let hay = resolve_string(ctx.doc, &args[0]);
            let prefix = resolve_string(ctx.doc, &args[1]);
            Ok(XPathValue::Boolean(hay.starts_with(&prefix)))
        }
        "normalize-space" => fn_normalize_space(args, ctx),
        // The compiler rejects unknown names; reaching this is a bug in
        // the compile step, not user input.
        _ => Err(Error::XPathType(format!("unknown function: {}()", name))),
    }
}

fn arity(name: &str, args: &[XPathValue], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(Error::XPathType(format!(
            "{}() takes {} argument(s), got {}",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn fn_count(args: Vec<XPathValue>) -> Result<XPathValue> {
    arity("count", &args, 1, 1)?;
    match &args[0] {
        XPathValue::NodeSet(nodes) => Ok(XPathValue::Number(nodes.len() as f64)),
        XPathValue::StringList(list) => Ok(XPathValue::Number(list.len() as f64)),
        _ => Err(Error::XPathType(
            "count() argument must be a node-set".to_string(),
        )),
    }
}

fn fn_name(args: Vec<XPathValue>, ctx: &EvalContext<'_>, local: bool) -> Result<XPathValue> {
    let fname = if local { "local-name" } else { "name" };
    arity(fname, &args, 0, 1)?;
    let node = if args.is_empty() {
        Some(ctx.node)
    } else {
        match &args[0] {
            XPathValue::NodeSet(nodes) => nodes.first().copied(),
            _ => {
                return Err(Error::XPathType(format!(
                    "{}() argument must be a node-set",
                    fname
                )))
            }
        }
    };
    let Some(node) = node else {
        return Ok(XPathValue::String(String::new()));
    };
    Ok(XPathValue::String(qualified_name(ctx, node, local)))
}

fn qualified_name(ctx: &EvalContext<'_>, node: NodeId, local: bool) -> String {
    if node == DOCUMENT_NODE {
        return String::new();
    }
    match &ctx.doc.get(node).data {
        NodeData::Element(elem) => {
            if local {
                elem.tag.clone()
            } else {
                elem.qualified_name()
            }
        }
        NodeData::ProcessingInstruction { target, .. } => target.clone(),
        _ => String::new(),
    }
}

fn fn_string(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue> {
    arity("string", &args, 0, 1)?;
    let value = if args.is_empty() {
        node_string(ctx.doc, ctx.node)
    } else {
        resolve_string(ctx.doc, &args[0])
    };
    Ok(XPathValue::String(value))
}

fn fn_normalize_space(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue> {
    arity("normalize-space", &args, 0, 1)?;
    let s = if args.is_empty() {
        node_string(ctx.doc, ctx.node)
    } else {
        resolve_string(ctx.doc, &args[0])
    };
    let normalized: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(XPathValue::String(normalized))
}

#[cfg(test)]
mod tests {
    use super::super::evaluate;
    use crate::error::Error;

    #[test]
    fn test_name_functions() {
        let doc = crate::parse_xml("<root><ns:item/></root>").unwrap();
        assert_eq!(
            evaluate(&doc, "name(//ns:item)").unwrap().string(),
            "ns:item"
        );
        assert_eq!(
            evaluate(&doc, "local-name(//ns:item)")
                .unwrap()
                .string(),
            "item"
        );
    }

    #[test]
    fn test_string_functions() {
        let doc = crate::parse_xml("<root>  a  b  </root>").unwrap();
        assert_eq!(
            evaluate(&doc, "normalize-space(/root)")
                .unwrap()
                .string(),
            "a b"
        );
        assert!(evaluate(&doc, "contains(string(/root), 'a')")
            .unwrap()
            .boolean());
        assert!(evaluate(&doc, "starts-with('quarry', 'qua')")
            .unwrap()
            .boolean());
    }

    #[test]
    fn test_boolean_functions() {
        let doc = crate::parse_xml("<root/>").unwrap();
        assert!(evaluate(&doc, "not(false())").unwrap().boolean());
        assert!(!evaluate(&doc, "not(true())").unwrap().boolean());
    }

    #[test]
    fn test_arity_errors() {
        let doc = crate::parse_xml("<root/>").unwrap();
        assert!(matches!(
            evaluate(&doc, "contains('a')").unwrap_err(),
            Error::XPathType(_)
        ));
        assert!(matches!(
            evaluate(&doc, "not()").unwrap_err(),
            Error::XPathType(_)
        ));
    }
}
