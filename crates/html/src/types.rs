use crate::attributes::Attributes;

pub type NodeId = u32;

/// Arena handle of a node inside a [`crate::Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub NodeId);

impl Id {
    /// The document root always occupies the first arena slot.
    pub const ROOT: Id = Id(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// `None` once the arena has outgrown [`NodeId`].
    pub(crate) fn from_index(index: usize) -> Option<Id> {
        NodeId::try_from(index).ok().map(Id)
    }
}

/// A single tokenizer event consumed by the tree builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Attributes,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

impl Token {
    pub fn start(name: impl Into<String>) -> Self {
        Token::StartTag {
            name: name.into(),
            attributes: Attributes::new(),
            self_closing: false,
        }
    }

    pub fn start_with<K, V>(name: impl Into<String>, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Token::StartTag {
            name: name.into(),
            attributes: attributes.into_iter().collect(),
            self_closing: false,
        }
    }

    pub fn void(name: impl Into<String>) -> Self {
        Token::StartTag {
            name: name.into(),
            attributes: Attributes::new(),
            self_closing: true,
        }
    }

    pub fn end(name: impl Into<String>) -> Self {
        Token::EndTag(name.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Token::Text(text.into())
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Token::Comment(text.into())
    }
}

/// Elements that never have content. Matched ASCII case-insensitively.
pub(crate) fn is_void_element(name: &str) -> bool {
    const VOID_ELEMENTS: [&str; 14] = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ];
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(name))
}

/// Elements whose body the tokenizer treats as raw text, and the serializer
/// writes back unescaped.
pub(crate) fn is_rawtext_element(name: &str) -> bool {
    name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")
}
