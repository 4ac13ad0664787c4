use crate::document::{Document, NodeKind, NodeRef};
use std::fmt::{self, Write};

/// Deterministic line rendering of a tree for test comparisons.
/// Not a public stable format.
///
/// One line per node, indented two spaces per level:
/// - `#document` (with ` doctype="..."` when present),
/// - `<name attr="value" ...>` with attributes in source order,
/// - `"text"` and `<!-- comment -->` with control characters escaped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomSnapshot {
    lines: Vec<String>,
}

impl DomSnapshot {
    pub fn new(root: NodeRef<'_>) -> Self {
        const INDENT_STEP: usize = 2;
        let mut lines = Vec::new();
        let mut stack = vec![(root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let mut line = " ".repeat(depth * INDENT_STEP);
            write_node_line(&mut line, node);
            lines.push(line);
            stack.extend(node.children().rev().map(|c| (c, depth + 1)));
        }
        Self { lines }
    }

    pub fn of(doc: &Document) -> Self {
        Self::new(doc.root())
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for DomSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i != 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

pub fn assert_dom_eq(expected: &Document, actual: &Document) {
    let expected = DomSnapshot::of(expected);
    let actual = DomSnapshot::of(actual);
    if expected != actual {
        panic!(
            "DOM mismatch\n{}",
            diff_lines(expected.as_lines(), actual.as_lines())
        );
    }
}

fn write_node_line(out: &mut String, node: NodeRef<'_>) {
    match node.kind() {
        NodeKind::Document { doctype } => {
            out.push_str("#document");
            if let Some(dt) = doctype {
                out.push_str(" doctype=\"");
                write_escaped(out, dt);
                out.push('"');
            }
        }
        NodeKind::Element { name, attributes } => {
            out.push('<');
            out.push_str(name);
            for (attr, value) in attributes {
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                write_escaped(out, value);
                out.push('"');
            }
            out.push('>');
        }
        NodeKind::Text(text) => {
            out.push('"');
            write_escaped(out, text);
            out.push('"');
        }
        NodeKind::Comment(text) => {
            out.push_str("<!-- ");
            write_escaped(out, text);
            out.push_str(" -->");
        }
    }
}

fn write_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            ch if ch < ' ' => {
                let _ = write!(out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
}

/// Human-readable report of the first differing line, with two lines of
/// context on either side. Empty when the inputs are equal.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    fn line(lines: &[String], i: usize) -> &str {
        lines.get(i).map(String::as_str).unwrap_or("<missing>")
    }

    let max = expected.len().max(actual.len());
    let mut out = String::new();

    let mismatch = (0..max).find(|&i| line(expected, i) != line(actual, i));
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(
            out,
            "first mismatch at line {} (showing {}..={}):",
            i + 1,
            start + 1,
            end
        );
        for idx in start..end {
            let marker = if idx == i { ">" } else { " " };
            let _ = writeln!(out, "{marker} {:>4}  expected: {}", idx + 1, line(expected, idx));
            let _ = writeln!(out, "{marker} {:>4}    actual: {}", idx + 1, line(actual, idx));
        }
    }
    out
}
