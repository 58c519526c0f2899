//! Shortcode template mini-language.
//!
//! A small subset of Go's `text/template`, enough for presentational
//! fragments:
//!
//! | Action                              | Meaning                               |
//! |-------------------------------------|---------------------------------------|
//! | `{{ .Get 0 }}`                      | positional argument, required         |
//! | `{{ .Get "key" }}`                  | named argument, required              |
//! | `{{ .Get "key" \| default "x" }}`   | optional argument with fallback       |
//! | `{{ .Inner }}`                      | invocation body, required             |
//! | `{{ .Name }}`                       | shortcode name                        |
//! | `{{ with .Get 1 }}..{{ . }}..{{ end }}` | section rendered if value is truthy |
//! | `{{/* comment */}}`                 | dropped                               |
//!
//! `{{-` and `-}}` trim the whitespace before and after the action.
//!
//! Argument values are HTML-escaped on output. `.Inner` is inserted as-is.
//! Templates are compiled once at registry load time, so syntax errors
//! surface before any document is rendered.

use super::{RenderError, parser::Params};
use quick_xml::escape::escape;
use thiserror::Error;

/// Syntax error in a template source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("template `{name}`: {message}")]
pub struct TemplateError {
    pub name: String,
    pub line: usize,
    pub message: String,
}

/// What a shortcode template sees of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    pub name: &'a str,
    pub params: &'a Params,
    /// Body with its own shortcodes already resolved.
    pub inner: Option<&'a str>,
    pub markdown: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Positional(usize),
    Named(String),
    Inner,
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Expr {
    source: Source,
    fallback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Value(Expr),
    /// `{{ . }}` inside a `with` block.
    Dot,
    With { expr: Expr, body: Vec<Segment> },
}

/// A compiled shortcode template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

/// A looked-up value and whether it must be escaped.
#[derive(Clone, Copy)]
enum Resolved<'a> {
    Escaped(&'a str),
    Raw(&'a str),
}

impl Resolved<'_> {
    fn write(self, out: &mut String) {
        match self {
            Self::Escaped(s) => out.push_str(&escape(s)),
            Self::Raw(s) => out.push_str(s),
        }
    }

    /// `with` skips blank values and the literal `false`.
    fn is_truthy(self) -> bool {
        let s = match self {
            Self::Escaped(s) | Self::Raw(s) => s.trim(),
        };
        !s.is_empty() && s != "false"
    }
}

impl Template {
    pub fn compile(name: &str, source: &str) -> Result<Self, TemplateError> {
        let pieces = lex(name, source)?;
        let mut iter = pieces.into_iter();
        let segments = parse_block(name, &mut iter, None)?;
        Ok(Self {
            name: name.to_owned(),
            segments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitute the invocation's values into the template.
    pub fn render(&self, call: &Call<'_>) -> Result<String, RenderError> {
        let mut out = String::new();
        render_segments(&self.segments, call, None, &mut out)?;
        Ok(out)
    }
}

// ============================================================================
// Lexing
// ============================================================================

enum Piece {
    Text(String),
    Action { content: String, line: usize },
}

fn lex(name: &str, source: &str) -> Result<Vec<Piece>, TemplateError> {
    let mut pieces = Vec::new();
    let mut rest = source;
    let mut line = 1;
    let mut trim_next = false;

    while let Some(start) = rest.find("{{") {
        let mut text = rest[..start].to_owned();
        if trim_next {
            text = text.trim_start().to_owned();
        }
        line += rest[..start].matches('\n').count();

        let after = &rest[start + 2..];
        let Some(end) = find_action_end(after) else {
            return Err(TemplateError {
                name: name.to_owned(),
                line,
                message: "unclosed action".into(),
            });
        };

        let mut content = after[..end].trim_end();
        if let Some(stripped) = content.strip_prefix('-')
            && stripped.starts_with(char::is_whitespace)
        {
            text = text.trim_end().to_owned();
            content = stripped;
        }
        trim_next = false;
        if let Some(stripped) = content.strip_suffix('-')
            && stripped.ends_with(char::is_whitespace)
        {
            trim_next = true;
            content = stripped;
        }

        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }
        pieces.push(Piece::Action {
            content: content.trim().to_owned(),
            line,
        });

        line += after[..end].matches('\n').count();
        rest = &after[end + 2..];
    }

    let tail = if trim_next { rest.trim_start() } else { rest };
    if !tail.is_empty() {
        pieces.push(Piece::Text(tail.to_owned()));
    }
    Ok(pieces)
}

/// Position of `}}` closing an action, ignoring string literals.
fn find_action_end(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'}' if !in_string && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse until `{{ end }}` (when inside `with`, opened at `open_line`) or EOF.
fn parse_block(
    name: &str,
    pieces: &mut impl Iterator<Item = Piece>,
    open_line: Option<usize>,
) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let err = |line: usize, message: String| TemplateError {
        name: name.to_owned(),
        line,
        message,
    };

    while let Some(piece) = pieces.next() {
        let (content, line) = match piece {
            Piece::Text(text) => {
                segments.push(Segment::Text(text));
                continue;
            }
            Piece::Action { content, line } => (content, line),
        };

        if content.starts_with("/*") && content.ends_with("*/") {
            continue;
        }

        match content.as_str() {
            "end" if open_line.is_some() => return Ok(segments),
            "end" => return Err(err(line, "`end` without `with`".into())),
            "." if open_line.is_some() => {
                segments.push(Segment::Dot);
                continue;
            }
            "." => return Err(err(line, "`.` outside of `with`".into())),
            _ => {}
        }

        if let Some(rest) = content.strip_prefix("with ") {
            let expr = parse_expr(rest.trim()).map_err(|m| err(line, m))?;
            if expr.fallback.is_some() {
                return Err(err(line, "`default` is not allowed in `with`".into()));
            }
            let body = parse_block(name, pieces, Some(line))?;
            segments.push(Segment::With { expr, body });
            continue;
        }

        let expr = parse_expr(&content).map_err(|m| err(line, m))?;
        segments.push(Segment::Value(expr));
    }

    match open_line {
        Some(line) => Err(err(line, "`with` without `end`".into())),
        None => Ok(segments),
    }
}

/// Parse `.Get 0`, `.Get "key"`, `.Inner`, `.Name`, each optionally
/// followed by `| default <literal>`.
fn parse_expr(s: &str) -> Result<Expr, String> {
    let (head, pipe) = match split_pipe(s) {
        Some((head, pipe)) => (head.trim(), Some(pipe.trim())),
        None => (s.trim(), None),
    };

    let source = match head {
        ".Inner" => Source::Inner,
        ".Name" => Source::Name,
        _ => {
            let Some(arg) = head.strip_prefix(".Get") else {
                return Err(format!("unsupported action `{s}`"));
            };
            let arg = arg.trim();
            if arg.is_empty() {
                return Err("`.Get` needs an index or a quoted key".into());
            }
            match parse_literal(arg) {
                Some(key) if arg.starts_with('"') => Source::Named(key),
                _ => arg
                    .parse::<usize>()
                    .map(Source::Positional)
                    .map_err(|_| format!("invalid `.Get` argument `{arg}`"))?,
            }
        }
    };

    let fallback = match pipe {
        None => None,
        Some(pipe) => {
            let Some(value) = pipe.strip_prefix("default") else {
                return Err(format!("unsupported function in `{pipe}`"));
            };
            let value = value.trim();
            Some(parse_literal(value).ok_or_else(|| format!("invalid default `{value}`"))?)
        }
    };

    Ok(Expr { source, fallback })
}

/// Split at the first `|` outside a string literal.
fn split_pipe(s: &str) -> Option<(&str, &str)> {
    let mut in_string = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '|' if !in_string => return Some((&s[..i], &s[i + 1..])),
            _ => {}
        }
    }
    None
}

/// A quoted string (with `\"` and `\\` escapes) or a bare number.
fn parse_literal(s: &str) -> Option<String> {
    if let Some(inner) = s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => out.push(chars.next()?),
                '"' => return None,
                c => out.push(c),
            }
        }
        return Some(out);
    }
    if !s.is_empty() && s.parse::<f64>().is_ok() {
        return Some(s.to_owned());
    }
    None
}

// ============================================================================
// Rendering
// ============================================================================

fn lookup<'c>(source: &'c Source, call: &Call<'c>) -> Option<Resolved<'c>> {
    match source {
        Source::Positional(i) => call.params.at(*i).map(Resolved::Escaped),
        Source::Named(key) => call.params.named(key).map(Resolved::Escaped),
        Source::Inner => call.inner.map(Resolved::Raw),
        Source::Name => Some(Resolved::Escaped(call.name)),
    }
}

fn missing(source: &Source) -> RenderError {
    match source {
        Source::Positional(i) => RenderError::MissingParameter(i.to_string()),
        Source::Named(key) => RenderError::MissingParameter(key.clone()),
        Source::Inner => RenderError::MissingInner,
        Source::Name => unreachable!("`.Name` always resolves"),
    }
}

fn render_segments(
    segments: &[Segment],
    call: &Call<'_>,
    dot: Option<Resolved<'_>>,
    out: &mut String,
) -> Result<(), RenderError> {
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Dot => {
                if let Some(value) = dot {
                    value.write(out);
                }
            }
            Segment::Value(expr) => match (lookup(&expr.source, call), &expr.fallback) {
                (Some(value), _) => value.write(out),
                (None, Some(fallback)) => Resolved::Escaped(fallback).write(out),
                (None, None) => return Err(missing(&expr.source)),
            },
            Segment::With { expr, body } => {
                if let Some(value) = lookup(&expr.source, call)
                    && value.is_truthy()
                {
                    render_segments(body, call, Some(value), out)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positional(values: &[&str]) -> Params {
        Params::Positional(values.iter().map(|s| s.to_string()).collect())
    }

    fn named(pairs: &[(&str, &str)]) -> Params {
        Params::Named(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn render(src: &str, params: &Params, inner: Option<&str>) -> Result<String, RenderError> {
        let template = Template::compile("t", src).unwrap();
        template.render(&Call {
            name: "t",
            params,
            inner,
            markdown: false,
        })
    }

    #[test]
    fn test_literal_text() {
        assert_eq!(render("<hr>", &Params::default(), None).unwrap(), "<hr>");
    }

    #[test]
    fn test_positional_substitution() {
        let out = render("<b>{{ .Get 0 }}</b> at {{ .Get 1 }}", &positional(&["Dev", "ACME"]), None);
        assert_eq!(out.unwrap(), "<b>Dev</b> at ACME");
    }

    #[test]
    fn test_named_substitution() {
        let out = render(r#"<img src="{{ .Get "src" }}">"#, &named(&[("src", "/a.png")]), None);
        assert_eq!(out.unwrap(), r#"<img src="/a.png">"#);
    }

    #[test]
    fn test_missing_required_parameter() {
        let err = render("{{ .Get 1 }}", &positional(&["only"]), None).unwrap_err();
        assert_eq!(err, RenderError::MissingParameter("1".into()));

        let err = render(r#"{{ .Get "src" }}"#, &named(&[("alt", "x")]), None).unwrap_err();
        assert_eq!(err, RenderError::MissingParameter("src".into()));
    }

    #[test]
    fn test_named_lookup_on_positional_call_is_missing() {
        let err = render(r#"{{ .Get "src" }}"#, &positional(&["a.png"]), None).unwrap_err();
        assert_eq!(err, RenderError::MissingParameter("src".into()));
    }

    #[test]
    fn test_default_fallback() {
        let src = r#"<summary>{{ .Get "summary" | default "Details" }}</summary>"#;
        assert_eq!(render(src, &named(&[]), None).unwrap(), "<summary>Details</summary>");
        assert_eq!(
            render(src, &named(&[("summary", "More")]), None).unwrap(),
            "<summary>More</summary>"
        );
    }

    #[test]
    fn test_inner_required() {
        assert_eq!(render("<p>{{ .Inner }}</p>", &Params::default(), None), Err(RenderError::MissingInner));
        assert_eq!(
            render("<p>{{ .Inner }}</p>", &Params::default(), Some("<em>x</em>")).unwrap(),
            "<p><em>x</em></p>"
        );
    }

    #[test]
    fn test_params_are_escaped() {
        let out = render("{{ .Get 0 }}", &positional(&["<script>\"x\" & y"]), None).unwrap();
        assert_eq!(out, "&lt;script&gt;&quot;x&quot; &amp; y");
    }

    #[test]
    fn test_with_block() {
        let src = r#"<figure>{{ with .Get "caption" }}<figcaption>{{ . }}</figcaption>{{ end }}</figure>"#;
        assert_eq!(
            render(src, &named(&[("caption", "A & B")]), None).unwrap(),
            "<figure><figcaption>A &amp; B</figcaption></figure>"
        );
        assert_eq!(render(src, &named(&[]), None).unwrap(), "<figure></figure>");
        assert_eq!(render(src, &named(&[("caption", "  ")]), None).unwrap(), "<figure></figure>");
    }

    #[test]
    fn test_dot_is_a_segment_not_an_expression() {
        let template = Template::compile("t", "{{ with .Get 0 }}{{ . }}{{ . }}{{ end }}").unwrap();
        let call = Call {
            name: "t",
            params: &positional(&["ab"]),
            inner: None,
            markdown: false,
        };
        assert_eq!(template.render(&call).unwrap(), "abab");
    }

    #[test]
    fn test_with_false_is_skipped() {
        let src = r#"<details{{ with .Get "open" }} open{{ end }}>"#;
        assert_eq!(render(src, &named(&[("open", "true")]), None).unwrap(), "<details open>");
        assert_eq!(render(src, &named(&[("open", "false")]), None).unwrap(), "<details>");
    }

    #[test]
    fn test_with_inner_is_raw() {
        let src = "{{ with .Inner }}<div>{{ . }}</div>{{ end }}";
        assert_eq!(render(src, &Params::default(), Some("<i>x</i>")).unwrap(), "<div><i>x</i></div>");
        assert_eq!(render(src, &Params::default(), None).unwrap(), "");
    }

    #[test]
    fn test_nested_with_reaches_params() {
        let src = "{{ with .Get 0 }}[{{ . }}{{ with .Get 1 }}/{{ . }}{{ end }}]{{ end }}";
        assert_eq!(render(src, &positional(&["a", "b"]), None).unwrap(), "[a/b]");
        assert_eq!(render(src, &positional(&["a"]), None).unwrap(), "[a]");
    }

    #[test]
    fn test_trim_markers() {
        let src = "<div>\n  {{- .Get 0 -}}\n</div>";
        assert_eq!(render(src, &positional(&["x"]), None).unwrap(), "<div>x</div>");
    }

    #[test]
    fn test_name_and_comment() {
        let src = "{{/* shown as name */}}{{ .Name }}";
        assert_eq!(render(src, &Params::default(), None).unwrap(), "t");
    }

    #[test]
    fn test_compile_errors() {
        let cases = [
            "{{ .Get 0 ",
            "{{ with .Get 0 }}no end",
            "{{ end }}",
            "{{ . }}",
            "{{ .Params }}",
            "{{ .Get }}",
            "{{ .Get zero }}",
            "{{ .Get 0 | upper }}",
            "{{ with .Get 0 | default \"x\" }}{{ end }}",
        ];
        for src in cases {
            assert!(Template::compile("bad", src).is_err(), "should reject: {src}");
        }
    }

    #[test]
    fn test_compile_error_line() {
        let err = Template::compile("bad", "a\nb\n{{ .Nope }}").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.name, "bad");
    }

    #[test]
    fn test_action_with_braces_in_string() {
        let src = r#"{{ .Get "k" | default "}}" }}"#;
        assert_eq!(render(src, &named(&[]), None).unwrap(), "}}");
    }
}
