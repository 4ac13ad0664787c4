//! Failures surfaced by a parse.
//!
//! Malformed nesting is never an error; only the policies and the token source
//! can abort a build, and they do so without a partial tree.

use std::error::Error as StdError;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Raised by a caller-supplied filter or rewrite rule.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PolicyError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl PolicyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("element filter failed on <{tag}>: {source}")]
    Filter {
        tag: String,
        #[source]
        source: PolicyError,
    },

    #[error("name rewriter failed on <{tag}>: {source}")]
    Rewrite {
        tag: String,
        #[source]
        source: PolicyError,
    },

    #[error("token source failed: {0}")]
    Upstream(#[source] BoxError),

    /// The document already holds as many nodes as [`crate::NodeId`] can address.
    #[error("document node limit reached ({limit} nodes)")]
    NodeLimit { limit: u64 },
}

impl BuildError {
    /// The policy fault behind this error, if the parse was aborted by one.
    pub fn policy(&self) -> Option<&PolicyError> {
        match self {
            BuildError::Filter { source, .. } | BuildError::Rewrite { source, .. } => Some(source),
            BuildError::Upstream(_) | BuildError::NodeLimit { .. } => None,
        }
    }
}

pub type BuildResult<T> = Result<T, BuildError>;
