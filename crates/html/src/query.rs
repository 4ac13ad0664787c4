//! Lookups and text extraction over a finished [`Document`].

use crate::document::{Document, NodeKind, NodeRef};
use crate::types::Id;
use std::collections::BTreeMap;

#[inline]
fn is_ascii_ws(byte: u8) -> bool {
    matches!(byte, b' ' | b'\n' | b'\t' | b'\r' | b'\x0c')
}

fn trim_ascii_ws(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii() && is_ascii_ws(c as u8))
}

impl<'a> NodeRef<'a> {
    fn is_named(&self, name: &str) -> bool {
        self.name().is_some_and(|n| n.eq_ignore_ascii_case(name))
    }

    /// Every descendant element named `name`, in document order.
    pub fn find_all(self, name: &'a str) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.descendants().filter(move |n| n.is_named(name))
    }

    pub fn find(&self, name: &str) -> Option<NodeRef<'a>> {
        self.descendants().find(|n| n.is_named(name))
    }

    /// Direct element children named `name`, in document order.
    pub fn children_named(self, name: &'a str) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.element_children().filter(move |n| n.is_named(name))
    }

    pub fn find_child(&self, name: &str) -> Option<NodeRef<'a>> {
        self.element_children().find(|n| n.is_named(name))
    }

    /// Direct element children carrying attribute `attr`.
    pub fn children_with_attr(self, attr: &'a str) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.element_children().filter(move |n| n.has_attr(attr))
    }

    /// Every descendant element carrying attribute `attr`, whatever its value.
    pub fn find_all_with_attr(self, attr: &'a str) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.descendants().filter(move |n| n.has_attr(attr))
    }

    /// Every descendant element accepted by `pred`.
    pub fn find_all_by<P>(self, mut pred: P) -> impl Iterator<Item = NodeRef<'a>> + 'a
    where
        P: FnMut(&NodeRef<'a>) -> bool + 'a,
    {
        self.descendants().filter(move |n| n.is_element() && pred(n))
    }

    /// Nearest ancestor element named `name`. The document root never matches.
    pub fn find_parent(&self, name: &str) -> Option<NodeRef<'a>> {
        self.ancestors().find(|n| n.is_named(name))
    }

    pub fn find_parent_by<P>(&self, mut pred: P) -> Option<NodeRef<'a>>
    where
        P: FnMut(&NodeRef<'a>) -> bool,
    {
        self.ancestors().find(|n| n.is_element() && pred(n))
    }

    /// Concatenated text of this node and everything below it, untouched.
    pub fn text(&self) -> String {
        if let Some(text) = self.as_text() {
            return text.to_string();
        }
        let mut out = String::new();
        for text in self.descendants().filter_map(|n| n.as_text()) {
            out.push_str(text);
        }
        out
    }

    /// Text runs trimmed of ASCII whitespace and joined with single spaces;
    /// whitespace-only runs are skipped.
    pub fn stripped_text(&self) -> String {
        let mut out = String::new();
        let runs = self
            .as_text()
            .into_iter()
            .chain(self.descendants().filter_map(|n| n.as_text()));
        for run in runs.map(trim_ascii_ws).filter(|t| !t.is_empty()) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(run);
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub href: Option<String>,
}

/// Every `<a>` below `root` with its stripped text and `href`, if any.
pub fn collect_links(root: NodeRef<'_>) -> Vec<Link> {
    root.find_all("a")
        .map(|a| Link {
            text: a.stripped_text(),
            href: a.attr("href").map(str::to_string),
        })
        .collect()
}

/// Element count per tag name, sorted by name.
pub fn tag_counts(root: NodeRef<'_>) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for name in root.descendants().filter_map(|n| n.name()) {
        *counts.entry(name).or_insert(0) += 1;
    }
    counts
}

/// Outcome of [`Document::set_attr`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrChange {
    Added,
    Replaced(String),
}

impl Document {
    /// Adds or replaces an attribute. `None` when `id` is not an element.
    pub fn set_attr(
        &mut self,
        id: Id,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<AttrChange> {
        let mut element = self.element_mut(id)?;
        Some(match element.attributes_mut().set(name, value) {
            Some(previous) => AttrChange::Replaced(previous),
            None => AttrChange::Added,
        })
    }

    pub fn remove_attr(&mut self, id: Id, name: &str) -> Option<String> {
        self.element_mut(id)?.attributes_mut().remove(name)
    }

    /// Ids of every element named `name`, for edits that need `&mut self`.
    pub fn element_ids(&self, name: &str) -> Vec<Id> {
        self.root()
            .descendants()
            .filter(|n| n.is_named(name))
            .map(|n| n.id())
            .collect()
    }

    /// Number of element nodes.
    pub fn element_count(&self) -> usize {
        self.root()
            .descendants()
            .filter(|n| matches!(n.kind(), NodeKind::Element { .. }))
            .count()
    }
}
