//! Streaming tree builder.
//!
//! Consumes tokens one at a time and grows a [`Document`] while two policies
//! run at tag time: the [`Replacer`] renames a tag when it is opened and when
//! it is closed, and the [`Strainer`] decides whether an element is built at
//! all. Excluded elements are never allocated; their subtree is skipped by
//! counting nesting depth until the matching end tag.
//!
//! Malformed nesting is absorbed rather than reported:
//! - an end tag with no open element of that name is ignored;
//! - an end tag matching a deeper open element closes everything above it;
//! - whatever is still open at end of input is closed in LIFO order.

use crate::attributes::Attributes;
use crate::document::{Document, NodeKind};
use crate::error::{BoxError, BuildError, BuildResult};
use crate::replacer::Replacer;
use crate::strainer::{Decision, Strainer};
use crate::tokenizer::Tokenizer;
use crate::types::{Id, NodeId, Token, is_void_element};
use std::borrow::Cow;

/// Which spelling of a tag name the strainer is shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterName {
    /// The name after the replacer has run.
    #[default]
    Rewritten,
    /// The name as written in the source markup.
    Source,
}

#[derive(Clone, Debug)]
pub struct TreeBuilderConfig {
    pub filter: Strainer,
    pub rewriter: Replacer,
    pub filter_on: FilterName,
    /// Merge text from consecutive text tokens into one run.
    pub coalesce_text: bool,
}

impl Default for TreeBuilderConfig {
    fn default() -> Self {
        Self {
            filter: Strainer::Any,
            rewriter: Replacer::identity(),
            filter_on: FilterName::Rewritten,
            coalesce_text: true,
        }
    }
}

impl TreeBuilderConfig {
    pub fn with_filter(mut self, filter: Strainer) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_rewriter(mut self, rewriter: Replacer) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn filter_on(mut self, filter_on: FilterName) -> Self {
        self.filter_on = filter_on;
        self
    }

    pub fn coalesce_text(mut self, coalesce: bool) -> Self {
        self.coalesce_text = coalesce;
        self
    }
}

/// `Done` is not represented: [`TreeBuilder::finish`] consumes the builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderState {
    Idle,
    Building,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub elements: usize,
    /// Elements the strainer rejected (roots of skipped subtrees).
    pub excluded: usize,
    /// Start tags skipped because an ancestor was excluded.
    pub suppressed: usize,
    pub stray_end_tags: usize,
    /// Elements closed by a mismatched end tag or by end of input.
    pub implicitly_closed: usize,
}

/// Open-element stack entry. `node` is `None` for an excluded element, which
/// only keeps its name so the matching end tag can be found.
#[derive(Debug)]
struct OpenElement {
    name: String,
    node: Option<Id>,
}

pub struct TreeBuilder {
    config: TreeBuilderConfig,
    document: Document,
    open: Vec<OpenElement>,
    // Number of excluded entries on the stack. They always sit above every
    // materialized entry.
    suppressed: usize,
    state: BuilderState,
    stats: BuildStats,
}

impl TreeBuilder {
    pub fn new(config: TreeBuilderConfig) -> Self {
        Self {
            config,
            document: Document::new(),
            open: Vec::new(),
            suppressed: 0,
            state: BuilderState::Idle,
            stats: BuildStats::default(),
        }
    }

    pub fn config(&self) -> &TreeBuilderConfig {
        &self.config
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Number of open stack entries, excluded markers included.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn is_suppressing(&self) -> bool {
        self.suppressed > 0
    }

    /// Feeds one token. An error means a policy failed; the builder should be
    /// dropped, as the tree it holds is incomplete.
    pub fn push_token(&mut self, token: Token) -> BuildResult<()> {
        self.state = BuilderState::Building;
        match token {
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => self.start_tag(name, attributes, self_closing),
            Token::EndTag(name) => self.end_tag(&name),
            Token::Text(text) => {
                if !self.is_suppressing() && !text.is_empty() {
                    let parent = self.insertion_parent();
                    self.document
                        .append_text(parent, text, self.config.coalesce_text)
                        .ok_or_else(node_limit)?;
                }
                Ok(())
            }
            Token::Comment(text) => {
                if !self.is_suppressing() {
                    let parent = self.insertion_parent();
                    self.document
                        .append(parent, NodeKind::Comment(text))
                        .ok_or_else(node_limit)?;
                }
                Ok(())
            }
            Token::Doctype(doctype) => {
                if !self.is_suppressing() {
                    self.document.set_doctype(doctype);
                }
                Ok(())
            }
        }
    }

    /// Closes whatever is still open and hands over the tree.
    pub fn finish(mut self) -> Document {
        let still_open = self.open.len();
        self.open.clear();
        self.suppressed = 0;
        self.stats.implicitly_closed += still_open;
        log::debug!(
            target: "html.tree_builder",
            "finished: {} nodes, {} closed at end of input, stats={:?}",
            self.document.len(),
            still_open,
            self.stats
        );
        self.document
    }

    fn insertion_parent(&self) -> Id {
        debug_assert!(!self.is_suppressing());
        self.open
            .last()
            .and_then(|entry| entry.node)
            .unwrap_or(Id::ROOT)
    }

    fn rewrite<'n>(&self, name: &'n str) -> BuildResult<Cow<'n, str>> {
        self.config
            .rewriter
            .rewrite(name)
            .map_err(|source| BuildError::Rewrite {
                tag: name.to_string(),
                source,
            })
    }

    fn start_tag(
        &mut self,
        name: String,
        attributes: Attributes,
        self_closing: bool,
    ) -> BuildResult<()> {
        let effective = self.rewrite(&name)?.into_owned();
        // Void elements never open, flagged or not.
        let closed = self_closing || is_void_element(&name);

        if self.is_suppressing() {
            self.stats.suppressed += 1;
            if !closed {
                self.suppressed += 1;
                self.open.push(OpenElement {
                    name: effective,
                    node: None,
                });
            }
            return Ok(());
        }

        let observed = match self.config.filter_on {
            FilterName::Rewritten => effective.as_str(),
            FilterName::Source => name.as_str(),
        };
        let decision = self
            .config
            .filter
            .decide(observed, &attributes)
            .map_err(|source| BuildError::Filter {
                tag: observed.to_string(),
                source,
            })?;

        match decision {
            Decision::Include => {
                let parent = self.insertion_parent();
                let id = self
                    .document
                    .append(
                        parent,
                        NodeKind::Element {
                            name: effective.clone(),
                            attributes,
                        },
                    )
                    .ok_or_else(node_limit)?;
                self.stats.elements += 1;
                if !closed {
                    self.open.push(OpenElement {
                        name: effective,
                        node: Some(id),
                    });
                }
            }
            Decision::Exclude => {
                self.stats.excluded += 1;
                if !closed {
                    log::trace!(target: "html.tree_builder", "suppressing <{effective}> subtree");
                    self.suppressed = 1;
                    self.open.push(OpenElement {
                        name: effective,
                        node: None,
                    });
                }
            }
        }
        Ok(())
    }

    fn end_tag(&mut self, name: &str) -> BuildResult<()> {
        let effective = self.rewrite(name)?;
        let Some(index) = self
            .open
            .iter()
            .rposition(|entry| entry.name.eq_ignore_ascii_case(&effective))
        else {
            log::trace!(target: "html.tree_builder", "ignoring stray </{effective}>");
            self.stats.stray_end_tags += 1;
            return Ok(());
        };

        let closed = &self.open[index..];
        let markers = closed.iter().filter(|entry| entry.node.is_none()).count();
        self.stats.implicitly_closed += closed.len() - 1;
        self.open.truncate(index);

        let was_suppressing = self.is_suppressing();
        self.suppressed -= markers;
        if was_suppressing && !self.is_suppressing() {
            log::trace!(target: "html.tree_builder", "suppression lifted at </{effective}>");
        }
        debug_assert_eq!(
            self.suppressed,
            self.open.iter().filter(|entry| entry.node.is_none()).count()
        );
        Ok(())
    }
}

fn node_limit() -> BuildError {
    BuildError::NodeLimit {
        limit: u64::from(NodeId::MAX) + 1,
    }
}

/// Builds a document from an infallible token sequence.
pub fn build_dom<I>(tokens: I, config: &TreeBuilderConfig) -> BuildResult<Document>
where
    I: IntoIterator<Item = Token>,
{
    let mut builder = TreeBuilder::new(config.clone());
    for token in tokens {
        builder.push_token(token)?;
    }
    Ok(builder.finish())
}

/// Builds a document from a fallible token source. The first source error
/// aborts the build and is returned unchanged as [`BuildError::Upstream`].
pub fn try_build_dom<I, E>(tokens: I, config: &TreeBuilderConfig) -> BuildResult<Document>
where
    I: IntoIterator<Item = Result<Token, E>>,
    E: Into<BoxError>,
{
    let mut builder = TreeBuilder::new(config.clone());
    for token in tokens {
        let token = token.map_err(|err| BuildError::Upstream(err.into()))?;
        builder.push_token(token)?;
    }
    Ok(builder.finish())
}

/// Tokenizes `input` and builds it in one pass.
pub fn parse(input: &str, config: &TreeBuilderConfig) -> BuildResult<Document> {
    build_dom(Tokenizer::new(input), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyError;

    fn names(doc: &Document) -> Vec<&str> {
        doc.root().descendants().filter_map(|n| n.name()).collect()
    }

    #[test]
    fn build_dom_stress_deep_nesting() {
        let depth: usize = 10_000;
        let mut tokens = Vec::with_capacity(depth * 2);
        for _ in 0..depth {
            tokens.push(Token::start("div"));
        }
        for _ in 0..depth {
            tokens.push(Token::end("div"));
        }

        let doc = build_dom(tokens, &TreeBuilderConfig::default()).unwrap();

        let mut current = doc.root();
        let mut seen = 0usize;
        while let Some(child) = current.children().next() {
            assert_eq!(child.name(), Some("div"));
            assert_eq!(current.child_ids().len(), 1);
            seen += 1;
            current = child;
        }
        assert_eq!(seen, depth);
    }

    #[test]
    fn state_moves_from_idle_to_building() {
        let mut builder = TreeBuilder::new(TreeBuilderConfig::default());
        assert_eq!(builder.state(), BuilderState::Idle);
        builder.push_token(Token::text("x")).unwrap();
        assert_eq!(builder.state(), BuilderState::Building);
        let doc = builder.finish();
        assert_eq!(doc.root().children().next().and_then(|n| n.as_text()), Some("x"));
    }

    #[test]
    fn suppression_counter_tracks_nesting_inside_excluded_subtree() {
        let config = TreeBuilderConfig::default().with_filter(Strainer::except("nav"));
        let mut builder = TreeBuilder::new(config);
        for token in [
            Token::start("body"),
            Token::start("nav"),
            Token::start("ul"),
            Token::start("li"),
        ] {
            builder.push_token(token).unwrap();
        }
        assert!(builder.is_suppressing());
        assert_eq!(builder.depth(), 4);

        builder.push_token(Token::end("li")).unwrap();
        builder.push_token(Token::end("ul")).unwrap();
        assert!(builder.is_suppressing());
        builder.push_token(Token::end("nav")).unwrap();
        assert!(!builder.is_suppressing());
        builder.push_token(Token::start("main")).unwrap();

        let stats = builder.stats();
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.suppressed, 2);
        let doc = builder.finish();
        assert_eq!(names(&doc), ["body", "main"]);
    }

    #[test]
    fn end_tag_of_outer_element_lifts_suppression() {
        let config = TreeBuilderConfig::default().with_filter(Strainer::except("aside"));
        let tokens = [
            Token::start("div"),
            Token::start("aside"),
            Token::start("p"),
            Token::text("hidden"),
            Token::end("div"),
            Token::text("after"),
        ];
        let doc = build_dom(tokens, &config).unwrap();
        assert_eq!(names(&doc), ["div"]);
        let texts: Vec<_> = doc.root().children().filter_map(|n| n.as_text()).collect();
        assert_eq!(texts, ["after"]);
    }

    #[test]
    fn excluded_void_element_does_not_suppress_siblings() {
        let config = TreeBuilderConfig::default().with_filter(Strainer::except("img"));
        let tokens = [
            Token::start("p"),
            Token::void("img"),
            Token::text("caption"),
            Token::void("br"),
            Token::end("p"),
        ];
        let doc = build_dom(tokens, &config).unwrap();
        assert_eq!(names(&doc), ["p", "br"]);
        let p = doc.root().children().next().unwrap();
        assert_eq!(p.children().filter_map(|n| n.as_text()).collect::<Vec<_>>(), ["caption"]);
    }

    #[test]
    fn unflagged_void_start_tag_never_opens() {
        let tokens = || {
            [
                Token::start("p"),
                Token::start("IMG"),
                Token::text("caption"),
                Token::end("p"),
                Token::text("after"),
            ]
        };

        let kept = build_dom(tokens(), &TreeBuilderConfig::default()).unwrap();
        let p = kept.root().find("p").unwrap();
        let img = p.find("img").unwrap();
        assert!(img.child_ids().is_empty());
        assert_eq!(p.text(), "caption");

        let config = TreeBuilderConfig::default().with_filter(Strainer::except("img"));
        let mut builder = TreeBuilder::new(config);
        for token in tokens() {
            builder.push_token(token).unwrap();
            assert!(!builder.is_suppressing());
        }
        assert_eq!(builder.stats().excluded, 1);
        let dropped = builder.finish();
        assert_eq!(names(&dropped), ["p"]);
        assert_eq!(dropped.root().find("p").unwrap().text(), "caption");
        assert_eq!(dropped.root().text(), "captionafter");
    }

    #[test]
    fn void_start_tag_under_suppression_pushes_nothing() {
        let config = TreeBuilderConfig::default().with_filter(Strainer::except("nav"));
        let mut builder = TreeBuilder::new(config);
        for token in [Token::start("nav"), Token::start("br"), Token::end("nav")] {
            builder.push_token(token).unwrap();
        }
        assert_eq!(builder.depth(), 0);
        assert!(!builder.is_suppressing());
        assert_eq!(builder.stats().suppressed, 1);
    }

    #[test]
    fn mismatched_end_tag_closes_intervening_elements() {
        let tokens = [
            Token::start("div"),
            Token::start("span"),
            Token::start("b"),
            Token::end("div"),
            Token::text("tail"),
        ];
        let mut builder = TreeBuilder::new(TreeBuilderConfig::default());
        for token in tokens {
            builder.push_token(token).unwrap();
        }
        assert_eq!(builder.depth(), 0);
        assert_eq!(builder.stats().implicitly_closed, 2);
        let doc = builder.finish();
        let top: Vec<_> = doc.root().children().map(|n| n.id()).collect();
        assert_eq!(top.len(), 2);
        assert_eq!(doc.get(top[1]).and_then(|n| n.as_text()), Some("tail"));
    }

    #[test]
    fn filter_can_observe_source_names() {
        let tokens = || {
            [
                Token::start("b"),
                Token::text("x"),
                Token::end("b"),
                Token::start("i"),
                Token::end("i"),
            ]
        };
        let base = TreeBuilderConfig::default()
            .with_rewriter(Replacer::new("b", "strong"))
            .with_filter(Strainer::except("b"));

        let rewritten = build_dom(tokens(), &base).unwrap();
        assert_eq!(names(&rewritten), ["strong", "i"]);

        let source = build_dom(tokens(), &base.clone().filter_on(FilterName::Source)).unwrap();
        assert_eq!(names(&source), ["i"]);
    }

    #[test]
    fn coalescing_is_configurable() {
        let tokens = || [Token::text("a"), Token::text("b"), Token::comment("c"), Token::text("d")];
        let merged = build_dom(tokens(), &TreeBuilderConfig::default()).unwrap();
        assert_eq!(merged.root().child_ids().len(), 3);
        let split = build_dom(tokens(), &TreeBuilderConfig::default().coalesce_text(false)).unwrap();
        assert_eq!(split.root().child_ids().len(), 4);
    }

    #[test]
    fn doctype_and_comments_inside_excluded_subtree_are_dropped() {
        let config = TreeBuilderConfig::default().with_filter(Strainer::except("template"));
        let tokens = [
            Token::Doctype("html".to_string()),
            Token::start("template"),
            Token::comment("inner"),
            Token::end("template"),
            Token::comment("outer"),
        ];
        let doc = build_dom(tokens, &config).unwrap();
        assert_eq!(doc.doctype(), Some("html"));
        let kinds: Vec<_> = doc.root().children().map(|n| n.kind().clone()).collect();
        assert_eq!(kinds, [NodeKind::Comment("outer".to_string())]);
    }

    #[test]
    fn rewriter_failure_aborts_even_inside_excluded_subtree() {
        let config = TreeBuilderConfig::default()
            .with_filter(Strainer::except("svg"))
            .with_rewriter(Replacer::identity().then_with(|name| {
                if name == "blink" {
                    Err(PolicyError::new("no blinking"))
                } else {
                    Ok(None)
                }
            }));
        let tokens = [Token::start("svg"), Token::start("blink")];
        let err = build_dom(tokens, &config).unwrap_err();
        assert!(matches!(&err, BuildError::Rewrite { tag, .. } if tag == "blink"));
        assert_eq!(err.policy().map(PolicyError::message), Some("no blinking"));
    }

    #[test]
    fn upstream_errors_are_returned_unchanged() {
        let tokens: Vec<Result<Token, std::io::Error>> = vec![
            Ok(Token::start("p")),
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "socket closed")),
            Ok(Token::end("p")),
        ];
        let err = try_build_dom(tokens, &TreeBuilderConfig::default()).unwrap_err();
        let BuildError::Upstream(source) = &err else {
            panic!("expected upstream error, got {err:?}");
        };
        let io = source.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::UnexpectedEof);
        assert!(err.to_string().contains("socket closed"));
    }

    #[test]
    fn parse_runs_tokenizer_and_builder() {
        let config = TreeBuilderConfig::default().with_rewriter(Replacer::new("i", "em"));
        let doc = parse("<div><i>Italic</i> <b>Bold</b></div>", &config).unwrap();
        assert_eq!(names(&doc), ["div", "em", "b"]);
    }
}
