//! Markup output for built documents.
//!
//! Both writers walk the tree with an explicit stack, so arbitrarily deep
//! documents serialize without recursion.

use crate::document::{Document, NodeKind, NodeRef};
use crate::types::{is_rawtext_element, is_void_element};

const INDENT_STEP: &str = " ";

enum Step<'a> {
    Open(NodeRef<'a>, usize),
    Close(&'a str, usize),
}

fn push_escaped(out: &mut String, s: &str, in_attribute: bool) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn push_start_tag(out: &mut String, node: NodeRef<'_>, name: &str) {
    out.push('<');
    out.push_str(name);
    if let Some(attributes) = node.attributes() {
        for (key, value) in attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            push_escaped(out, value, true);
            out.push('"');
        }
    }
    out.push('>');
}

fn push_doctype(out: &mut String, doctype: &str) {
    out.push_str("<!DOCTYPE ");
    out.push_str(doctype);
    out.push('>');
}

/// Text under `script`/`style` is written back verbatim.
fn is_raw_text(node: NodeRef<'_>) -> bool {
    node.parent()
        .and_then(|p| p.name())
        .is_some_and(is_rawtext_element)
}

/// Void elements get no end tag unless something was appended under them.
fn needs_end_tag(node: NodeRef<'_>, name: &str) -> bool {
    !(is_void_element(name) && node.child_ids().is_empty())
}

pub fn to_markup(doc: &Document) -> String {
    node_to_markup(doc.root())
}

/// Markup for `node` and its subtree. For the document root this includes the
/// doctype.
pub fn node_to_markup(node: NodeRef<'_>) -> String {
    let mut out = String::new();
    let mut stack = vec![Step::Open(node, 0)];
    while let Some(step) = stack.pop() {
        let node = match step {
            Step::Close(name, _) => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
                continue;
            }
            Step::Open(node, _) => node,
        };
        match node.kind() {
            NodeKind::Document { doctype } => {
                if let Some(doctype) = doctype {
                    push_doctype(&mut out, doctype);
                }
                stack.extend(node.children().rev().map(|c| Step::Open(c, 0)));
            }
            NodeKind::Element { name, .. } => {
                push_start_tag(&mut out, node, name);
                if needs_end_tag(node, name) {
                    stack.push(Step::Close(name, 0));
                    stack.extend(node.children().rev().map(|c| Step::Open(c, 0)));
                }
            }
            NodeKind::Text(text) => {
                if is_raw_text(node) {
                    out.push_str(text);
                } else {
                    push_escaped(&mut out, text, false);
                }
            }
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
    }
    out
}

/// One tag, text run, or comment per line, indented by depth. Text is trimmed
/// and whitespace-only runs are dropped.
pub fn prettify(doc: &Document) -> String {
    fn indent(out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str(INDENT_STEP);
        }
    }

    let mut out = String::new();
    if let Some(doctype) = doc.doctype() {
        push_doctype(&mut out, doctype);
        out.push('\n');
    }

    let mut stack: Vec<Step<'_>> = doc.root().children().rev().map(|c| Step::Open(c, 0)).collect();
    while let Some(step) = stack.pop() {
        match step {
            Step::Close(name, depth) => {
                indent(&mut out, depth);
                out.push_str("</");
                out.push_str(name);
                out.push_str(">\n");
            }
            Step::Open(node, depth) => match node.kind() {
                NodeKind::Element { name, .. } => {
                    indent(&mut out, depth);
                    push_start_tag(&mut out, node, name);
                    out.push('\n');
                    if needs_end_tag(node, name) {
                        stack.push(Step::Close(name, depth));
                        stack.extend(node.children().rev().map(|c| Step::Open(c, depth + 1)));
                    }
                }
                NodeKind::Text(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    indent(&mut out, depth);
                    if is_raw_text(node) {
                        out.push_str(text);
                    } else {
                        push_escaped(&mut out, text, false);
                    }
                    out.push('\n');
                }
                NodeKind::Comment(text) => {
                    indent(&mut out, depth);
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->\n");
                }
                NodeKind::Document { .. } => {}
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{node_to_markup, prettify, to_markup};
    use crate::dom_builder::{TreeBuilderConfig, build_dom, parse};
    use crate::replacer::Replacer;
    use crate::types::Token;

    fn parse_default(input: &str) -> crate::document::Document {
        parse(input, &TreeBuilderConfig::default()).unwrap()
    }

    #[test]
    fn well_formed_markup_round_trips() {
        let input = r#"<!DOCTYPE html><html><head><style>p > b { x: "y" }</style></head><body><p class="a b" hidden="">x &amp; y<br><img src="i.png"></p><!-- note --></body></html>"#;
        assert_eq!(to_markup(&parse_default(input)), input);
    }

    #[test]
    fn escapes_text_and_attribute_values() {
        let doc = build_dom(
            [
                Token::start_with("a", [("title", r#"say "hi" & <go>"#)]),
                Token::text("1 < 2 & 3 > 2"),
                Token::end("a"),
            ],
            &TreeBuilderConfig::default(),
        )
        .unwrap();
        assert_eq!(
            to_markup(&doc),
            r#"<a title="say &quot;hi&quot; &amp; &lt;go&gt;">1 &lt; 2 &amp; 3 &gt; 2</a>"#
        );
    }

    #[test]
    fn implicit_closes_become_explicit() {
        let doc = parse_default("<div><p>one<p>two</div><b>open");
        assert_eq!(to_markup(&doc), "<div><p>one<p>two</p></p></div><b>open</b>");
    }

    #[test]
    fn rewritten_names_are_written_on_both_tags() {
        let config = TreeBuilderConfig::default().with_rewriter(Replacer::new("b", "blockquote"));
        let doc = parse("<p><b>quoted</B></p>", &config).unwrap();
        assert_eq!(to_markup(&doc), "<p><blockquote>quoted</blockquote></p>");
        let quote = doc.root().find("blockquote").unwrap();
        assert_eq!(node_to_markup(quote), "<blockquote>quoted</blockquote>");
    }

    #[test]
    fn prettify_indents_by_depth() {
        let doc = parse_default("<!DOCTYPE html><html><body>\n  <p>Hi <b>there</b></p><br><!--c--></body></html>");
        assert_eq!(
            prettify(&doc),
            "<!DOCTYPE html>\n<html>\n <body>\n  <p>\n   Hi\n   <b>\n    there\n   </b>\n  </p>\n  <br>\n  <!--c-->\n </body>\n</html>\n"
        );
    }

    #[test]
    fn deep_trees_serialize_without_recursion() {
        let depth = 10_000;
        let input = "<i>".repeat(depth);
        let doc = parse_default(&input);
        let out = to_markup(&doc);
        assert!(out.starts_with("<i><i>"));
        assert!(out.ends_with("</i></i>"));
        assert_eq!(out.len(), depth * "<i></i>".len());
        assert_eq!(prettify(&doc).lines().count(), depth * 2);
    }
}
