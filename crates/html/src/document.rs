//! Arena-backed document tree.
//!
//! Nodes live in one `Vec` and refer to each other by [`Id`]. Each child list
//! owns its entries; the `parent` field is a plain back-reference, so dropping
//! the document is a flat deallocation with no cycles to break.

use crate::attributes::Attributes;
use crate::types::Id;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document { doctype: Option<String> },
    Element { name: String, attributes: Attributes },
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    parent: Option<Id>,
    children: Vec<Id>,
    kind: NodeKind,
}

#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document { doctype: None },
            }],
        }
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[Id::ROOT.index()].children.is_empty()
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            doc: self,
            id: Id::ROOT,
        }
    }

    pub fn get(&self, id: Id) -> Option<NodeRef<'_>> {
        (id.index() < self.nodes.len()).then_some(NodeRef { doc: self, id })
    }

    pub fn doctype(&self) -> Option<&str> {
        match &self.nodes[Id::ROOT.index()].kind {
            NodeKind::Document { doctype } => doctype.as_deref(),
            _ => unreachable!("document root is always a document node"),
        }
    }

    /// Mutable access to an element's name and attributes. `None` for
    /// non-element nodes and unknown ids.
    pub fn element_mut(&mut self, id: Id) -> Option<ElementMut<'_>> {
        match &mut self.nodes.get_mut(id.index())?.kind {
            NodeKind::Element { name, attributes } => Some(ElementMut { name, attributes }),
            _ => None,
        }
    }

    /// Renames an element, returning its previous name.
    pub fn rename(&mut self, id: Id, name: impl Into<String>) -> Option<String> {
        let mut element = self.element_mut(id)?;
        Some(element.set_name(name))
    }

    /// `None` when the arena is full, i.e. it already holds `NodeId::MAX + 1`
    /// nodes.
    pub(crate) fn append(&mut self, parent: Id, kind: NodeKind) -> Option<Id> {
        let id = Id::from_index(self.nodes.len())?;
        self.nodes.push(NodeData {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        let siblings = &mut self.nodes[parent.index()].children;
        debug_assert!(!siblings.contains(&id));
        siblings.push(id);
        Some(id)
    }

    /// Appends a text run, merging it into a directly preceding run when
    /// `coalesce` is set.
    pub(crate) fn append_text(&mut self, parent: Id, text: String, coalesce: bool) -> Option<()> {
        if coalesce
            && let Some(&last) = self.nodes[parent.index()].children.last()
            && let NodeKind::Text(existing) = &mut self.nodes[last.index()].kind
        {
            existing.push_str(&text);
            return Some(());
        }
        self.append(parent, NodeKind::Text(text)).map(|_| ())
    }

    pub(crate) fn set_doctype(&mut self, value: String) {
        if let NodeKind::Document { doctype } = &mut self.nodes[Id::ROOT.index()].kind {
            *doctype = Some(value);
        }
    }
}

pub struct ElementMut<'a> {
    name: &'a mut String,
    attributes: &'a mut Attributes,
}

impl ElementMut<'_> {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> String {
        std::mem::replace(&mut *self.name, name.into())
    }

    pub fn attributes(&self) -> &Attributes {
        &*self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut *self.attributes
    }
}

/// Borrowed view of one node; cheap to copy and pass around.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: Id,
}

impl<'a> NodeRef<'a> {
    fn data(&self) -> &'a NodeData {
        &self.doc.nodes[self.id.index()]
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.data().kind
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind(), NodeKind::Element { .. })
    }

    /// Tag name for elements, `None` for everything else.
    pub fn name(&self) -> Option<&'a str> {
        match self.kind() {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&'a Attributes> {
        match self.kind() {
            NodeKind::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.attributes()?.get(name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes().is_some_and(|a| a.contains(name))
    }

    /// Contents of a text node.
    pub fn as_text(&self) -> Option<&'a str> {
        match self.kind() {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        let parent = self.data().parent?;
        Some(NodeRef {
            doc: self.doc,
            id: parent,
        })
    }

    pub fn child_ids(&self) -> &'a [Id] {
        &self.data().children
    }

    pub fn children(self) -> impl DoubleEndedIterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        self.data()
            .children
            .iter()
            .map(move |&id| NodeRef { doc, id })
    }

    pub fn element_children(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.children().filter(NodeRef::is_element)
    }

    /// Parent, grandparent, ... up to and including the document root.
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors {
            next: self.parent(),
        }
    }

    /// Depth-first pre-order walk of everything below this node. Each call
    /// starts a fresh walk.
    pub fn descendants(&self) -> Descendants<'a> {
        let mut stack = Vec::new();
        stack.extend(self.data().children.iter().rev().copied());
        Descendants {
            doc: self.doc,
            stack,
        }
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", self.kind())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

pub struct Ancestors<'a> {
    next: Option<NodeRef<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<Id>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = NodeRef { doc: self.doc, id };
        // Reverse so the first child is popped next.
        self.stack.extend(node.child_ids().iter().rev().copied());
        Some(node)
    }
}
