//! Tag and category indices.
//!
//! Terms are grouped by slug, so `Rust`, `rust` and `RUST` are one term. The
//! display name is the first spelling met while walking posts newest first.

use crate::{
    config::SlugMode,
    content::{Site, document::Post},
    utils::slug::slugify_with,
};
use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer, ser::SerializeSeq};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub slug: String,
    pub name: String,
    /// Routes of tagged posts, in post order.
    pub routes: Vec<String>,
}

impl Term {
    pub fn count(&self) -> usize {
        self.routes.len()
    }
}

#[derive(Debug, Default)]
pub struct Taxonomy {
    terms: Vec<Term>,
    by_slug: FxHashMap<String, usize>,
}

impl Taxonomy {
    pub fn build(site: &Site, field: fn(&Post) -> &[String], mode: &SlugMode) -> Self {
        let mut taxonomy = Self::default();

        for doc in site.posts() {
            let Some(post) = doc.as_post() else { continue };
            for name in field(post) {
                taxonomy.add(name, &doc.route, mode);
            }
        }

        taxonomy
    }

    fn add(&mut self, name: &str, route: &str, mode: &SlugMode) {
        let slug = term_slug(name, mode);
        let index = *self.by_slug.entry(slug.clone()).or_insert_with(|| {
            self.terms.push(Term {
                slug,
                name: name.to_owned(),
                routes: Vec::new(),
            });
            self.terms.len() - 1
        });

        let routes = &mut self.terms[index].routes;
        // `Rust` and `rust` on one post still count once.
        if routes.last().is_none_or(|last| last != route) {
            routes.push(route.to_owned());
        }
    }

    /// Look a term up by any spelling.
    pub fn get(&self, name: &str, mode: &SlugMode) -> Option<&Term> {
        self.by_slug
            .get(&term_slug(name, mode))
            .map(|&i| &self.terms[i])
    }

    /// Terms by post count, most used first, ties by name.
    pub fn sorted(&self) -> Vec<&Term> {
        let mut terms: Vec<&Term> = self.terms.iter().collect();
        terms.sort_by(|a, b| {
            b.count()
                .cmp(&a.count())
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

fn term_slug(name: &str, mode: &SlugMode) -> String {
    let lowered = name.trim().to_lowercase();
    let slug = slugify_with(&lowered, mode);
    if slug.is_empty() { lowered } else { slug }
}

impl Serialize for Taxonomy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            slug: &'a str,
            name: &'a str,
            count: usize,
            posts: &'a [String],
        }

        let sorted = self.sorted();
        let mut seq = serializer.serialize_seq(Some(sorted.len()))?;
        for term in sorted {
            seq.serialize_element(&Entry {
                slug: &term.slug,
                name: &term.name,
                count: term.count(),
                posts: &term.routes,
            })?;
        }
        seq.end()
    }
}

/// Both built-in taxonomies.
#[derive(Debug, Default, Serialize)]
pub struct Taxonomies {
    pub tags: Taxonomy,
    pub categories: Taxonomy,
}

impl Taxonomies {
    pub fn build(site: &Site, mode: &SlugMode) -> Self {
        Self {
            tags: Taxonomy::build(site, |p| p.tags.as_slice(), mode),
            categories: Taxonomy::build(site, |p| p.categories.as_slice(), mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::document::{Document, Layout};
    use std::path::{Path, PathBuf};

    fn site(posts: &[(&str, &str, &str)]) -> Site {
        let sections = vec!["posts".to_owned()];
        let layout = Layout {
            post_sections: &sections,
            slug: &SlugMode::On,
        };
        let docs = posts
            .iter()
            .map(|(name, date, tags)| {
                let relative = format!("posts/{name}.md");
                let source = format!("---\ntitle: {name}\ndate: {date}\ntags: [{tags}]\ncategories: fp\n---\n");
                Document::parse(PathBuf::from(&relative), Path::new(&relative), &source, layout).unwrap()
            })
            .collect();
        Site::new(docs)
    }

    #[test]
    fn test_grouping_keeps_first_spelling() {
        let site = site(&[
            ("new", "2022-01-01", "Rust, Java"),
            ("old", "2020-01-01", "rust"),
        ]);
        let tax = Taxonomies::build(&site, &SlugMode::On);

        let rust = tax.tags.get("RUST", &SlugMode::On).unwrap();
        assert_eq!(rust.name, "Rust");
        assert_eq!(rust.slug, "rust");
        assert_eq!(rust.routes, vec!["/posts/new/", "/posts/old/"]);
        assert_eq!(tax.tags.len(), 2);
    }

    #[test]
    fn test_same_post_counts_once() {
        let site = site(&[("a", "2022-01-01", "Rust, rust")]);
        let tax = Taxonomies::build(&site, &SlugMode::On);
        assert_eq!(tax.tags.get("rust", &SlugMode::On).unwrap().count(), 1);
    }

    #[test]
    fn test_sorted_by_count_then_name() {
        let site = site(&[
            ("a", "2022-01-03", "zeta, java"),
            ("b", "2022-01-02", "zeta, Alpha"),
            ("c", "2022-01-01", "beta"),
        ]);
        let tax = Taxonomies::build(&site, &SlugMode::On);
        let names: Vec<&str> = tax.tags.sorted().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "Alpha", "beta", "java"]);
    }

    #[test]
    fn test_categories_and_json() {
        let site = site(&[("a", "2022-01-01", "x"), ("b", "2021-01-01", "x")]);
        let tax = Taxonomies::build(&site, &SlugMode::On);
        assert_eq!(tax.categories.get("FP", &SlugMode::On).unwrap().count(), 2);

        let json = serde_json::to_value(&tax).unwrap();
        assert_eq!(json["tags"][0]["name"], "x");
        assert_eq!(json["tags"][0]["count"], 2);
        assert_eq!(json["categories"][0]["posts"][1], "/posts/b/");
    }
}
