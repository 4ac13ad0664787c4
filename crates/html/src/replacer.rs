//! Tag-name rewriting applied while tags are opened and closed.
//!
//! A [`Replacer`] is an ordered chain of rules; each rule sees the output of the
//! previous one. Names no rule matches pass through untouched, so the empty
//! chain is the identity.

use crate::error::PolicyError;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Caller rule: `Ok(None)` leaves the name unchanged.
pub type RewriteFn = dyn Fn(&str) -> Result<Option<String>, PolicyError> + Send + Sync;

#[derive(Clone)]
pub enum Rule {
    Rename { from: String, to: String },
    Custom(Arc<RewriteFn>),
}

impl Rule {
    fn apply(&self, name: &str) -> Result<Option<String>, PolicyError> {
        match self {
            Rule::Rename { from, to } => Ok(from.eq_ignore_ascii_case(name).then(|| to.clone())),
            Rule::Custom(f) => f(name),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Rename { from, to } => write!(f, "{from:?} -> {to:?}"),
            Rule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Replacer {
    rules: Vec<Rule>,
}

impl Replacer {
    pub fn identity() -> Self {
        Self::default()
    }

    /// Single `(original, replacement)` pair, e.g. `Replacer::new("b", "strong")`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::identity().then(from, to)
    }

    pub fn then(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rules.push(Rule::Rename {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn then_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<Option<String>, PolicyError> + Send + Sync + 'static,
    {
        self.rules.push(Rule::Custom(Arc::new(f)));
        self
    }

    pub fn is_identity(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rewrite<'n>(&self, name: &'n str) -> Result<Cow<'n, str>, PolicyError> {
        let mut current = Cow::Borrowed(name);
        for rule in &self.rules {
            if let Some(next) = rule.apply(&current)? {
                current = Cow::Owned(next);
            }
        }
        Ok(current)
    }
}

impl<F, T> FromIterator<(F, T)> for Replacer
where
    F: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (F, T)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Replacer::identity(), |r, (from, to)| r.then(from, to))
    }
}
