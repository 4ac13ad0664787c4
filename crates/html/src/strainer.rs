//! Element filter evaluated once per start tag.
//!
//! A strainer only ever sees elements whose ancestors were all included; an
//! excluded element takes its whole subtree with it, so nothing below it is
//! offered to the strainer again.

use crate::attributes::Attributes;
use crate::error::PolicyError;
use std::fmt;
use std::sync::Arc;

pub type FilterFn = dyn Fn(&str, &Attributes) -> Result<bool, PolicyError> + Send + Sync;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Include,
    Exclude,
}

impl Decision {
    fn from_bool(include: bool) -> Self {
        if include {
            Decision::Include
        } else {
            Decision::Exclude
        }
    }
}

/// Built-in filter shapes plus an escape hatch for caller predicates.
///
/// All built-in variants are infallible and pure; only [`Strainer::Custom`]
/// can produce a [`PolicyError`].
#[derive(Clone, Default)]
pub enum Strainer {
    /// Keep everything.
    #[default]
    Any,
    Name(String),
    Names(Vec<String>),
    /// Element carries the attribute, whatever its value.
    HasAttr(String),
    AttrEquals {
        name: String,
        value: String,
    },
    Not(Box<Strainer>),
    Custom(Arc<FilterFn>),
}

impl Strainer {
    pub fn name(name: impl Into<String>) -> Self {
        Strainer::Name(name.into())
    }

    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Strainer::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn has_attr(name: impl Into<String>) -> Self {
        Strainer::HasAttr(name.into())
    }

    pub fn attr_equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Strainer::AttrEquals {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Keeps every element except those named `name` (and their subtrees).
    pub fn except(name: impl Into<String>) -> Self {
        Strainer::Name(name.into()).negate()
    }

    pub fn negate(self) -> Self {
        match self {
            Strainer::Not(inner) => *inner,
            other => Strainer::Not(Box::new(other)),
        }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, &Attributes) -> Result<bool, PolicyError> + Send + Sync + 'static,
    {
        Strainer::Custom(Arc::new(f))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Strainer::Any)
    }

    pub fn decide(&self, name: &str, attributes: &Attributes) -> Result<Decision, PolicyError> {
        self.matches(name, attributes).map(Decision::from_bool)
    }

    fn matches(&self, name: &str, attributes: &Attributes) -> Result<bool, PolicyError> {
        Ok(match self {
            Strainer::Any => true,
            Strainer::Name(expected) => expected.eq_ignore_ascii_case(name),
            Strainer::Names(expected) => expected.iter().any(|n| n.eq_ignore_ascii_case(name)),
            Strainer::HasAttr(attr) => attributes.contains(attr),
            Strainer::AttrEquals { name: attr, value } => {
                attributes.get(attr).is_some_and(|v| v == value)
            }
            Strainer::Not(inner) => !inner.matches(name, attributes)?,
            Strainer::Custom(f) => f(name, attributes)?,
        })
    }
}

impl fmt::Debug for Strainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strainer::Any => f.write_str("Any"),
            Strainer::Name(n) => f.debug_tuple("Name").field(n).finish(),
            Strainer::Names(n) => f.debug_tuple("Names").field(n).finish(),
            Strainer::HasAttr(a) => f.debug_tuple("HasAttr").field(a).finish(),
            Strainer::AttrEquals { name, value } => f
                .debug_struct("AttrEquals")
                .field("name", name)
                .field("value", value)
                .finish(),
            Strainer::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Strainer::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
