//! Streaming HTML tree builder with parse-time filtering and tag renaming.
//!
//! Tokens flow from the [`Tokenizer`] into a [`TreeBuilder`], which consults a
//! [`Strainer`] to decide which elements get built and a [`Replacer`] to rename
//! tags as they open and close. Rejected subtrees are never allocated.
//!
//! ```
//! use html::{Replacer, Strainer, TreeBuilderConfig, parse, to_markup};
//!
//! let config = TreeBuilderConfig::default()
//!     .with_filter(Strainer::except("script"))
//!     .with_rewriter(Replacer::new("b", "strong"));
//! let doc = parse("<b><script>ignored</script>bold</b>", &config).unwrap();
//! assert_eq!(to_markup(&doc), "<strong>bold</strong>");
//! ```

pub mod error;
pub mod query;
pub mod serialize;
#[cfg(any(test, feature = "dom-snapshot"))]
pub mod snapshot;

mod attributes;
mod document;
mod dom_builder;
mod entities;
mod replacer;
mod strainer;
mod tokenizer;
mod types;

pub use crate::attributes::{Attributes, Iter as AttributeIter};
pub use crate::document::{Ancestors, Descendants, Document, ElementMut, NodeKind, NodeRef};
pub use crate::dom_builder::{
    BuildStats, BuilderState, FilterName, TreeBuilder, TreeBuilderConfig, build_dom, parse,
    try_build_dom,
};
pub use crate::error::{BoxError, BuildError, BuildResult, PolicyError};
pub use crate::query::{AttrChange, Link, collect_links, tag_counts};
pub use crate::replacer::{Replacer, RewriteFn, Rule};
pub use crate::serialize::{node_to_markup, prettify, to_markup};
pub use crate::strainer::{Decision, FilterFn, Strainer};
pub use crate::tokenizer::{Tokenizer, tokenize};
pub use crate::types::{Id, NodeId, Token};
