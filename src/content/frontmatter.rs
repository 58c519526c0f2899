//! Front-matter splitting and decoding.
//!
//! A document starts with a metadata block in one of three formats:
//!
//! | Opening  | Closing        | Format |
//! |----------|----------------|--------|
//! | `---`    | `---` or `...` | YAML   |
//! | `+++`    | `+++`          | TOML   |
//! | `{`      | matching `}`   | JSON   |
//!
//! All three are normalized into a JSON object before field extraction, so
//! the typed [`FrontMatter`] is decoded the same way regardless of format.

use crate::utils::date::ContentDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Front-matter block formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    const fn name(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// Errors produced while reading a metadata block.
#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("missing front-matter block")]
    Missing,

    #[error("unterminated {} front-matter block", .0.name())]
    Unterminated(Format),

    #[error("invalid YAML front-matter: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("invalid TOML front-matter: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON front-matter: {0}")]
    Json(#[from] serde_json::Error),

    #[error("front-matter must be a key/value table")]
    NotATable,

    #[error("invalid front-matter field: {0}")]
    Field(String),

    #[error("invalid date in `{field}`: `{value}`")]
    InvalidDate { field: &'static str, value: String },
}

/// A source file cut into its metadata block and body.
#[derive(Debug, Clone, Copy)]
pub struct Split<'a> {
    pub format: Format,
    /// Block content without delimiters (for JSON, the object itself).
    pub raw: &'a str,
    pub body: &'a str,
    /// 1-based line number on which the body starts.
    pub body_line: usize,
}

/// Decoded document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<ContentDate>,
    pub lastmod: Option<ContentDate>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub aliases: Vec<String>,
    pub draft: bool,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub weight: Option<i64>,
    /// Every key not listed above, keys lowercased.
    pub extra: BTreeMap<String, Value>,
}

/// Field layout shared by all formats, before date and set normalization.
#[derive(Debug, Deserialize)]
struct RawFrontMatter {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    lastmod: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    tags: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    categories: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    aliases: Vec<String>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    weight: Option<i64>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Accept `tags: rust` as well as `tags: [rust, java]`. `null` is empty.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}

/// Cut a source file into front-matter and body.
pub fn split(source: &str) -> Result<Split<'_>, FrontMatterError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let first = source.lines().next().unwrap_or_default().trim_end();

    match first {
        "---" => split_delimited(source, Format::Yaml, &["---", "..."]),
        "+++" => split_delimited(source, Format::Toml, &["+++"]),
        // `{{` opens a shortcode, not an object.
        _ if first.starts_with('{') && !first.starts_with("{{") => split_json(source),
        _ => Err(FrontMatterError::Missing),
    }
}

fn split_delimited<'a>(
    source: &'a str,
    format: Format,
    closers: &[&str],
) -> Result<Split<'a>, FrontMatterError> {
    // Skip the opening delimiter line.
    let raw_start = source.find('\n').map_or(source.len(), |i| i + 1);
    let mut offset = raw_start;
    let mut line_no = 2;

    for line in source[raw_start..].split_inclusive('\n') {
        if closers.contains(&line.trim_end()) {
            let body_start = offset + line.len();
            return Ok(Split {
                format,
                raw: &source[raw_start..offset],
                body: &source[body_start..],
                body_line: line_no + 1,
            });
        }
        offset += line.len();
        line_no += 1;
    }

    Err(FrontMatterError::Unterminated(format))
}

fn split_json(source: &str) -> Result<Split<'_>, FrontMatterError> {
    let mut stream = serde_json::Deserializer::from_str(source).into_iter::<Value>();
    match stream.next() {
        Some(Ok(_)) => {}
        Some(Err(e)) if e.is_eof() => return Err(FrontMatterError::Unterminated(Format::Json)),
        Some(Err(e)) => return Err(e.into()),
        None => return Err(FrontMatterError::Unterminated(Format::Json)),
    }

    let end = stream.byte_offset();
    let rest = &source[end..];
    // The rest of the closing line belongs to the block.
    let body_start = end + rest.find('\n').map_or(rest.len(), |i| i + 1);
    let body_line = source[..body_start].matches('\n').count() + 1;

    Ok(Split {
        format: Format::Json,
        raw: &source[..end],
        body: &source[body_start..],
        body_line,
    })
}

/// Decode a split block into typed metadata.
pub fn decode(split: &Split<'_>) -> Result<FrontMatter, FrontMatterError> {
    let table = match split.format {
        Format::Yaml if split.raw.trim().is_empty() => Map::new(),
        Format::Yaml => into_table(serde_yaml_ng::from_str::<Value>(split.raw)?)?,
        Format::Toml => {
            let table: toml::Table = toml::from_str(split.raw)?;
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect()
        }
        Format::Json => into_table(serde_json::from_str::<Value>(split.raw)?)?,
    };

    // Keys are matched case-insensitively (`Title`, `lastMod`).
    let table: Map<String, Value> = table
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect();

    let raw: RawFrontMatter = serde_json::from_value(Value::Object(table))
        .map_err(|e| FrontMatterError::Field(e.to_string()))?;

    Ok(FrontMatter {
        title: raw.title,
        date: parse_date("date", raw.date)?,
        lastmod: parse_date("lastmod", raw.lastmod)?,
        tags: dedup(raw.tags),
        categories: dedup(raw.categories),
        aliases: dedup(raw.aliases),
        draft: raw.draft,
        description: raw.description,
        slug: raw.slug,
        weight: raw.weight,
        extra: raw.extra,
    })
}

/// Split and decode in one step. Returns metadata, body and body start line.
pub fn parse(source: &str) -> Result<(FrontMatter, &str, usize), FrontMatterError> {
    let split = split(source)?;
    let front = decode(&split)?;
    Ok((front, split.body, split.body_line))
}

fn into_table(value: Value) -> Result<Map<String, Value>, FrontMatterError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(FrontMatterError::NotATable),
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn parse_date(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<ContentDate>, FrontMatterError> {
    match value {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => ContentDate::parse(&s)
            .map(Some)
            .ok_or(FrontMatterError::InvalidDate { field, value: s }),
    }
}

/// Drop repeated entries, keeping the first occurrence's position.
fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = rustc_hash::FxHashSet::default();
    items
        .into_iter()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}
