//! URL slugification.
//!
//! Turns file stems, front-matter slugs and taxonomy terms into URL-safe
//! path segments.

use crate::config::SlugMode;

/// Characters forbidden in URL path segments
const FORBIDDEN_CHARS: &[char] = &[
    '<', '>', ':', '|', '?', '*', '#', '\\', '(', ')', '[', ']', '\t', '\r', '\n', '"', '\'', '/',
];

/// Convert a segment according to the configured mode.
pub fn slugify_with(text: &str, mode: &SlugMode) -> String {
    match mode {
        SlugMode::On => slugify(text),
        SlugMode::Safe => sanitize_text(text),
        SlugMode::No => text.to_owned(),
    }
}

/// Full slugification: transliterate to ASCII, lowercase, collapse every run
/// of non-alphanumeric characters into a single `-`.
///
/// `"Über Monads & Functors"` → `"uber-monads-functors"`
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Remove forbidden characters, lowercase, and replace whitespace with `-`.
/// Non-ASCII letters are preserved.
fn sanitize_text(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}
