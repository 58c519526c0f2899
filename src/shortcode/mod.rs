//! Shortcode expansion.
//!
//! A document body is parsed into text and invocations ([`parser`]), each
//! invocation is looked up in a [`Registry`] and rendered, bodies first. The
//! whole pass is pure: it never touches the filesystem, and cross-document
//! lookups go through a [`LinkResolver`].

mod builtin;
pub mod parser;
pub mod registry;
pub mod template;

use parser::{Invocation, Node, Params};
use registry::Registry;
use std::path::Path;
use template::Call;
use thiserror::Error;

/// Failure to parse a body or resolve one invocation in it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortcodeError {
    #[error("unterminated shortcode tag")]
    Unterminated { line: usize },

    #[error("unterminated quote in shortcode `{name}`")]
    UnterminatedQuote { name: String, line: usize },

    #[error("shortcode `{name}` mixes positional and named arguments")]
    MixedParams { name: String, line: usize },

    #[error("closing tag `{name}` has no matching opening tag")]
    StrayClose { name: String, line: usize },

    #[error("invalid shortcode name `{name}`")]
    InvalidName { name: String, line: usize },

    #[error("unknown shortcode `{name}`")]
    Unknown { name: String, line: usize },

    #[error("shortcode `{name}`: {source}")]
    Render {
        name: String,
        line: usize,
        #[source]
        source: RenderError,
    },
}

impl ShortcodeError {
    pub fn line(&self) -> usize {
        match self {
            Self::Unterminated { line }
            | Self::UnterminatedQuote { line, .. }
            | Self::MixedParams { line, .. }
            | Self::StrayClose { line, .. }
            | Self::InvalidName { line, .. }
            | Self::Unknown { line, .. }
            | Self::Render { line, .. } => *line,
        }
    }
}

/// Content error raised while rendering a single shortcode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("missing required parameter `{0}`")]
    MissingParameter(String),

    #[error("requires a body but was used without a closing tag")]
    MissingInner,

    #[error("reference to `{0}` does not resolve to any document")]
    DanglingReference(String),
}

/// Maps a document reference to its route.
pub trait LinkResolver: Sync {
    /// Route of `target` (content-relative, extension optional) as seen from
    /// the document at `from`.
    fn resolve(&self, target: &str, from: &Path) -> Option<String>;
}

/// Per-document inputs available to native shortcodes.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    /// Content-relative path of the document being rendered.
    pub page: &'a Path,
    /// Site base URL without a trailing slash; may be empty.
    pub base_url: &'a str,
    pub links: &'a dyn LinkResolver,
}

/// One invocation seen during expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub name: String,
    pub params: Params,
    pub line: usize,
}

/// Result of expanding one body.
#[derive(Debug, Default)]
pub struct Expansion {
    pub output: String,
    pub errors: Vec<ShortcodeError>,
    /// Invocations that rendered to blank text, as `(name, line)`.
    pub empty: Vec<(String, usize)>,
    pub calls: Vec<CallRecord>,
}

impl Expansion {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Expand every invocation in `body`.
///
/// `first_line` is the line of `body`'s first byte in its file. A body that
/// fails to parse is returned unchanged with the parse error recorded. A
/// failing invocation contributes no output; the rest still expands.
pub fn expand(
    body: &str,
    first_line: usize,
    registry: &Registry,
    ctx: &RenderContext<'_>,
) -> Expansion {
    let nodes = match parser::parse(body, first_line) {
        Ok(nodes) => nodes,
        Err(err) => {
            return Expansion {
                output: body.to_owned(),
                errors: vec![err],
                ..Default::default()
            };
        }
    };

    let mut expander = Expander {
        registry,
        ctx,
        report: Expansion::default(),
    };
    let output = expander.nodes(&nodes);
    expander.report.output = output;
    expander.report
}

struct Expander<'r, 'c> {
    registry: &'r Registry,
    ctx: &'r RenderContext<'c>,
    report: Expansion,
}

impl Expander<'_, '_> {
    fn nodes(&mut self, nodes: &[Node<'_>]) -> String {
        let mut out = String::new();
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Literal(text) => out.push_str(text),
                Node::Call(invocation) => out.push_str(&self.call(invocation)),
            }
        }
        out
    }

    fn call(&mut self, invocation: &Invocation<'_>) -> String {
        let Invocation {
            name,
            params,
            inner,
            markdown,
            line,
        } = invocation;

        self.report.calls.push(CallRecord {
            name: (*name).to_owned(),
            params: params.clone(),
            line: *line,
        });

        let inner = inner.as_ref().map(|nodes| self.nodes(nodes));

        let Some(shortcode) = self.registry.get(name) else {
            self.report.errors.push(ShortcodeError::Unknown {
                name: (*name).to_owned(),
                line: *line,
            });
            return String::new();
        };

        let call = Call {
            name,
            params,
            inner: inner.as_deref(),
            markdown: *markdown,
        };
        match shortcode.render(&call, self.ctx) {
            Ok(fragment) => {
                if fragment.trim().is_empty() {
                    self.report.empty.push(((*name).to_owned(), *line));
                }
                fragment
            }
            Err(source) => {
                self.report.errors.push(ShortcodeError::Render {
                    name: (*name).to_owned(),
                    line: *line,
                    source,
                });
                String::new()
            }
        }
    }
}
