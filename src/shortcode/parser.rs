//! Shortcode lexing and tree building.
//!
//! # Syntax
//!
//! ```text
//! {{< name arg1 "arg two" >}}          standalone
//! {{< name key="value" />}}            explicitly self-closing
//! {{< name >}} body {{< /name >}}      with body (nesting-aware)
//! {{% name %}} markdown {{% /name %}}  markdown-flavoured
//! {{</* name */>}}                     escaped, emitted as `{{< name >}}`
//! ```
//!
//! Parsing runs in two passes: [`lex`] produces a flat token stream, and
//! [`build`] pairs opening tags with closing tags. An opening tag with no
//! matching close is standalone; its would-be body stays in the parent.

use super::ShortcodeError;

/// Tag delimiters of the two invocation flavours.
const STANDARD: (&str, &str) = ("{{<", ">}}");
const MARKDOWN: (&str, &str) = ("{{%", "%}}");

// ============================================================================
// Parameters
// ============================================================================

/// Arguments of one invocation. Positional and named arguments never mix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    Positional(Vec<String>),
    Named(Vec<(String, String)>),
}

impl Default for Params {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl Params {
    /// Positional argument by index.
    pub fn at(&self, index: usize) -> Option<&str> {
        match self {
            Self::Positional(values) => values.get(index).map(String::as_str),
            Self::Named(_) => None,
        }
    }

    /// Named argument by key. The last occurrence wins.
    pub fn named(&self, key: &str) -> Option<&str> {
        match self {
            Self::Named(pairs) => pairs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            Self::Positional(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tree
// ============================================================================

/// A resolved-to-be shortcode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub name: &'a str,
    pub params: Params,
    /// Body between the opening and closing tags, if the call has one.
    pub inner: Option<Vec<Node<'a>>>,
    /// `{{% %}}` flavour.
    pub markdown: bool,
    /// 1-based line of the opening tag.
    pub line: usize,
}

/// Element of a parsed document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    Text(&'a str),
    /// Escaped invocation, emitted verbatim without the comment markers.
    Literal(String),
    Call(Invocation<'a>),
}

/// Parse a body into nodes. `first_line` is the line number of the first
/// byte of `source` in its file.
pub fn parse(source: &str, first_line: usize) -> Result<Vec<Node<'_>>, ShortcodeError> {
    let tokens = lex(source, first_line)?;
    build(tokens)
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Literal(String),
    Open {
        name: &'a str,
        params: Params,
        markdown: bool,
        self_closing: bool,
        line: usize,
    },
    Close {
        name: &'a str,
        line: usize,
    },
}

/// Tracks line numbers while scanning forward through the source.
struct LineCounter<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(source: &'a str, first_line: usize) -> Self {
        Self {
            source,
            offset: 0,
            line: first_line,
        }
    }

    /// Line number of byte `pos`. Positions must be non-decreasing.
    fn at(&mut self, pos: usize) -> usize {
        self.line += self.source[self.offset..pos].matches('\n').count();
        self.offset = pos;
        self.line
    }
}

fn lex(source: &str, first_line: usize) -> Result<Vec<Token<'_>>, ShortcodeError> {
    let mut tokens = Vec::new();
    let mut lines = LineCounter::new(source, first_line);
    let mut pos = 0;

    while let Some(rel) = find_tag_start(&source[pos..]) {
        let start = pos + rel;
        if start > pos {
            tokens.push(Token::Text(&source[pos..start]));
        }
        let line = lines.at(start);

        let (open, close) = if source[start..].starts_with(STANDARD.0) {
            STANDARD
        } else {
            MARKDOWN
        };
        let content_start = start + open.len();

        // Escaped form: {{</* ... */>}}
        if source[content_start..].starts_with("/*") {
            let terminator = format!("*/{close}");
            let Some(end_rel) = source[content_start + 2..].find(&terminator) else {
                return Err(ShortcodeError::Unterminated { line });
            };
            let inner = &source[content_start + 2..content_start + 2 + end_rel];
            tokens.push(Token::Literal(format!("{open}{inner}{close}")));
            pos = content_start + 2 + end_rel + terminator.len();
            continue;
        }

        let content_end = find_tag_end(source, content_start, close, line)?;
        let content = source[content_start..content_end].trim();
        tokens.push(lex_tag(content, open == MARKDOWN.0, line)?);
        pos = content_end + close.len();
    }

    if pos < source.len() {
        tokens.push(Token::Text(&source[pos..]));
    }
    Ok(tokens)
}

fn find_tag_start(s: &str) -> Option<usize> {
    match (s.find(STANDARD.0), s.find(MARKDOWN.0)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Find the closing delimiter, skipping over quoted argument values.
fn find_tag_end(
    source: &str,
    from: usize,
    close: &str,
    line: usize,
) -> Result<usize, ShortcodeError> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(b'"') if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'`' => quote = Some(b),
            None if bytes[i..].starts_with(close.as_bytes()) => return Ok(i),
            None => {}
        }
        i += 1;
    }

    if quote.is_some() {
        let name = source[from..]
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_owned();
        return Err(ShortcodeError::UnterminatedQuote { name, line });
    }
    Err(ShortcodeError::Unterminated { line })
}

/// Lex the content between delimiters (already trimmed).
fn lex_tag(content: &str, markdown: bool, line: usize) -> Result<Token<'_>, ShortcodeError> {
    if let Some(rest) = content.strip_prefix('/') {
        let name = rest.trim();
        validate_name(name, line)?;
        return Ok(Token::Close { name, line });
    }

    let (content, self_closing) = match content.strip_suffix('/') {
        Some(rest) => (rest.trim_end(), true),
        None => (content, false),
    };

    let name_end = content
        .find(char::is_whitespace)
        .unwrap_or(content.len());
    let name = &content[..name_end];
    validate_name(name, line)?;

    let params = lex_params(&content[name_end..], name, line)?;

    Ok(Token::Open {
        name,
        params,
        markdown,
        self_closing,
        line,
    })
}

fn validate_name(name: &str, line: usize) -> Result<(), ShortcodeError> {
    let valid = !name.is_empty()
        && !name.starts_with('/')
        && !name.ends_with('/')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/'));

    if valid {
        Ok(())
    } else {
        Err(ShortcodeError::InvalidName {
            name: name.to_owned(),
            line,
        })
    }
}

/// Split `a "b c" key=value key2="d e"` into parameters.
fn lex_params(input: &str, name: &str, line: usize) -> Result<Params, ShortcodeError> {
    let mut positional = Vec::new();
    let mut named = Vec::new();
    let mut chars = input.chars().peekable();

    let unterminated = || ShortcodeError::UnterminatedQuote {
        name: name.to_owned(),
        line,
    };

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else { break };

        if first == '"' || first == '`' {
            chars.next();
            positional.push(read_quoted(&mut chars, first).ok_or_else(unterminated)?);
            continue;
        }

        let mut word = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
            word.push(c);
        }

        if chars.next_if_eq(&'=').is_some() {
            let value = match chars.peek() {
                Some(&q) if q == '"' || q == '`' => {
                    chars.next();
                    read_quoted(&mut chars, q).ok_or_else(unterminated)?
                }
                _ => {
                    let mut value = String::new();
                    while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                        value.push(c);
                    }
                    value
                }
            };
            named.push((word, value));
        } else {
            positional.push(word);
        }
    }

    match (positional.is_empty(), named.is_empty()) {
        (_, true) => Ok(Params::Positional(positional)),
        (true, false) => Ok(Params::Named(named)),
        (false, false) => Err(ShortcodeError::MixedParams {
            name: name.to_owned(),
            line,
        }),
    }
}

/// Read until the closing quote. `"` supports `\"` and `\\`; backticks are raw.
fn read_quoted(chars: &mut impl Iterator<Item = char>, quote: char) -> Option<String> {
    let mut value = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' if quote == '"' => match chars.next()? {
                e @ ('"' | '\\') => value.push(e),
                other => {
                    value.push('\\');
                    value.push(other);
                }
            },
            c if c == quote => return Some(value),
            c => value.push(c),
        }
    }
    None
}

// ============================================================================
// Tree building
// ============================================================================

struct Frame<'a> {
    call: Invocation<'a>,
    children: Vec<Node<'a>>,
}

fn build(tokens: Vec<Token<'_>>) -> Result<Vec<Node<'_>>, ShortcodeError> {
    let mut root: Vec<Node<'_>> = Vec::new();
    let mut stack: Vec<Frame<'_>> = Vec::new();

    fn current<'s, 'a>(root: &'s mut Vec<Node<'a>>, stack: &'s mut [Frame<'a>]) -> &'s mut Vec<Node<'a>> {
        match stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => root,
        }
    }

    for token in tokens {
        match token {
            Token::Text(text) => current(&mut root, &mut stack).push(Node::Text(text)),
            Token::Literal(text) => current(&mut root, &mut stack).push(Node::Literal(text)),
            Token::Open {
                name,
                params,
                markdown,
                self_closing,
                line,
            } => {
                let call = Invocation {
                    name,
                    params,
                    inner: None,
                    markdown,
                    line,
                };
                if self_closing {
                    current(&mut root, &mut stack).push(Node::Call(call));
                } else {
                    stack.push(Frame {
                        call,
                        children: Vec::new(),
                    });
                }
            }
            Token::Close { name, line } => {
                let Some(index) = stack.iter().rposition(|f| f.call.name == name) else {
                    return Err(ShortcodeError::StrayClose {
                        name: name.to_owned(),
                        line,
                    });
                };

                // Frames opened after the matching one never got a closer.
                while stack.len() > index + 1 {
                    unwind_standalone(&mut root, &mut stack);
                }

                if let Some(mut frame) = stack.pop() {
                    frame.call.inner = Some(frame.children);
                    current(&mut root, &mut stack).push(Node::Call(frame.call));
                }
            }
        }
    }

    while !stack.is_empty() {
        unwind_standalone(&mut root, &mut stack);
    }

    Ok(root)
}

/// Pop the top frame as a bodiless call followed by its collected children.
fn unwind_standalone<'a>(root: &mut Vec<Node<'a>>, stack: &mut Vec<Frame<'a>>) {
    let Some(frame) = stack.pop() else { return };
    let parent = match stack.last_mut() {
        Some(parent) => &mut parent.children,
        None => root,
    };
    parent.push(Node::Call(frame.call));
    parent.extend(frame.children);
}
