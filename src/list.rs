//! `list` and `taxonomy` commands.
//!
//! Both print to stdout, as aligned text or as JSON with `--json`. Files that
//! fail to load are logged and left out; use `check` to see why.

use crate::{
    config::{SiteConfig, SlugMode},
    content::{self, Document, Site},
    log,
    taxonomy::{Taxonomies, Taxonomy},
};
use anyhow::Result;
use rustc_hash::FxHashSet;

/// Print posts newest first, optionally restricted to one tag and/or category.
pub fn list_posts(
    config: &SiteConfig,
    tag: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let site = load_site(config)?;
    let mode = &config.content.slug;
    let posts = select_posts(&site, tag, category, mode);

    if json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
    } else {
        for line in posts.iter().map(|doc| post_line(doc)) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Print tag and category counts.
pub fn list_taxonomies(config: &SiteConfig, json: bool) -> Result<()> {
    let site = load_site(config)?;
    let taxonomies = Taxonomies::build(&site, &config.content.slug);

    if json {
        println!("{}", serde_json::to_string_pretty(&taxonomies)?);
    } else {
        print!("{}", taxonomy_text("tags", &taxonomies.tags));
        print!("{}", taxonomy_text("categories", &taxonomies.categories));
    }
    Ok(())
}

fn load_site(config: &SiteConfig) -> Result<Site> {
    let loaded = content::load(config, None)?;
    for failure in &loaded.failures {
        log!("warn"; "skipped {failure}");
    }
    if loaded.site.is_empty() {
        log!("warn"; "no documents under {}", config.content.dir.display());
    }
    Ok(loaded.site)
}

/// Posts carrying both the given tag and category, in listing order.
///
/// Terms match by slug, so `--tag RUST` finds posts tagged `rust`.
pub fn select_posts<'a>(
    site: &'a Site,
    tag: Option<&str>,
    category: Option<&str>,
    mode: &SlugMode,
) -> Vec<&'a Document> {
    let taxonomies = Taxonomies::build(site, mode);
    let tagged = tag.map(|t| term_routes(&taxonomies.tags, t, mode));
    let filed = category.map(|c| term_routes(&taxonomies.categories, c, mode));

    site.posts()
        .iter()
        .filter(|doc| tagged.as_ref().is_none_or(|r| r.contains(doc.route.as_str())))
        .filter(|doc| filed.as_ref().is_none_or(|r| r.contains(doc.route.as_str())))
        .collect()
}

fn term_routes<'a>(taxonomy: &'a Taxonomy, name: &str, mode: &SlugMode) -> FxHashSet<&'a str> {
    taxonomy
        .get(name, mode)
        .map(|term| term.routes.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

fn post_line(doc: &Document) -> String {
    let date = doc.date().map(|d| d.ymd()).unwrap_or_default();
    let mut line = format!("{date:<10}  {}  {}", doc.title(), doc.route);
    if let Some(post) = doc.as_post()
        && !post.tags.is_empty()
    {
        line.push_str(&format!("  [{}]", post.tags.join(", ")));
    }
    line
}

fn taxonomy_text(heading: &str, taxonomy: &Taxonomy) -> String {
    let mut out = format!("{heading} ({})\n", taxonomy.len());
    if taxonomy.is_empty() {
        out.push_str("    -\n");
    }
    for term in taxonomy.sorted() {
        out.push_str(&format!("{:>5}  {}\n", term.count(), term.name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::document::Layout;
    use std::path::{Path, PathBuf};

    fn site() -> Site {
        let sections = vec!["posts".to_owned()];
        let layout = Layout {
            post_sections: &sections,
            slug: &SlugMode::On,
        };
        let sources = [
            ("posts/lambdas.md", "title: Lambdas\ndate: 2021-03-01\ntags: [Java, FP]\ncategories: [code]"),
            ("posts/monads.md", "title: Monads\ndate: 2022-05-10\ntags: [Haskell, fp]\ncategories: [code]"),
            ("posts/trip.md", "title: Trip\ndate: 2020-07-01\ntags: [travel]\ncategories: [life]"),
            ("about.md", "title: About"),
        ];
        let docs = sources
            .iter()
            .map(|(relative, fm)| {
                let source = format!("---\n{fm}\n---\nbody\n");
                Document::parse(PathBuf::from(relative), Path::new(relative), &source, layout).unwrap()
            })
            .collect();
        Site::new(docs)
    }

    fn titles(docs: &[&Document]) -> Vec<String> {
        docs.iter().map(|d| d.title().to_owned()).collect()
    }

    #[test]
    fn test_select_all_posts() {
        let site = site();
        let posts = select_posts(&site, None, None, &SlugMode::On);
        assert_eq!(titles(&posts), vec!["Monads", "Lambdas", "Trip"]);
    }

    #[test]
    fn test_select_by_tag_any_case() {
        let site = site();
        let posts = select_posts(&site, Some("FP"), None, &SlugMode::On);
        assert_eq!(titles(&posts), vec!["Monads", "Lambdas"]);

        let posts = select_posts(&site, Some("java"), None, &SlugMode::On);
        assert_eq!(titles(&posts), vec!["Lambdas"]);
    }

    #[test]
    fn test_select_by_tag_and_category() {
        let site = site();
        let posts = select_posts(&site, Some("fp"), Some("life"), &SlugMode::On);
        assert!(posts.is_empty());

        let posts = select_posts(&site, None, Some("Life"), &SlugMode::On);
        assert_eq!(titles(&posts), vec!["Trip"]);
    }

    #[test]
    fn test_unknown_tag_selects_nothing() {
        let site = site();
        assert!(select_posts(&site, Some("cobol"), None, &SlugMode::On).is_empty());
    }

    #[test]
    fn test_post_line() {
        let site = site();
        let line = post_line(&site.posts()[1]);
        assert_eq!(line, "2021-03-01  Lambdas  /posts/lambdas/  [Java, FP]");
    }

    #[test]
    fn test_taxonomy_text() {
        let site = site();
        let taxonomies = Taxonomies::build(&site, &SlugMode::On);
        let text = taxonomy_text("categories", &taxonomies.categories);
        assert_eq!(text, "categories (2)\n    2  code\n    1  life\n");
    }
}
