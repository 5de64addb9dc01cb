//! Stylesheet serialization.
//!
//! Reconstructs CSS text from the node model. For a sheet straight out
//! of [`crate::css::parser::parse`] the output is byte-identical to the
//! input: rules rejoin their verbatim selector segments with `,`,
//! at-rules re-emit their raw preludes and bodies, and opaque fragments
//! are copied through untouched.

use crate::css::model::{AtBody, Node, Stylesheet};

/// Serialize a [`Stylesheet`] back to CSS text.
pub fn serialize(sheet: &Stylesheet) -> String {
    let mut out = String::new();
    write_sheet(&mut out, sheet);
    out
}

fn write_sheet(out: &mut String, sheet: &Stylesheet) {
    for node in &sheet.nodes {
        write_node(out, node);
    }
    out.push_str(&sheet.trailing);
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Rule(rule) => {
            out.push_str(&rule.leading);
            out.push_str(&rule.selectors.join(","));
            out.push('{');
            out.push_str(&rule.body);
            out.push('}');
        }
        Node::AtRule(at) => {
            out.push_str(&at.leading);
            out.push('@');
            out.push_str(&at.keyword);
            out.push_str(&at.prelude);
            match &at.body {
                AtBody::None => out.push(';'),
                AtBody::Block(raw) => {
                    out.push('{');
                    out.push_str(raw);
                    out.push('}');
                }
                AtBody::Nested(inner) => {
                    out.push('{');
                    write_sheet(out, inner);
                    out.push('}');
                }
            }
        }
        Node::Comment(comment) => {
            out.push_str(&comment.leading);
            out.push_str("/*");
            out.push_str(&comment.text);
            out.push_str("*/");
        }
        Node::Raw(fragment) => {
            out.push_str(&fragment.leading);
            out.push_str(&fragment.text);
        }
    }
}
