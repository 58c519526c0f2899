//! `render` command: print one document body with its shortcodes expanded.
//!
//! The whole site is loaded so `ref`/`relref` can resolve. The expanded
//! Markdown goes to stdout; problems go to the log.

use crate::{
    check::load_registry,
    config::SiteConfig,
    content::{self, Document},
    log,
    shortcode::{self, Expansion, RenderContext},
};
use anyhow::{Context, Result, bail};
use std::{
    io::{Write, stdout},
    path::{Path, PathBuf},
};

/// Render `file` to stdout. Returns false when any shortcode failed.
pub fn render_file(config: &SiteConfig, file: &Path) -> Result<bool> {
    let (relative, expansion) = render_document(config, file)?;

    let mut out = stdout().lock();
    out.write_all(expansion.output.as_bytes())
        .context("Failed to write rendered output")?;
    out.flush().ok();

    for err in &expansion.errors {
        log!("error"; "{relative}:{}: {err}", err.line());
    }
    for (name, line) in &expansion.empty {
        log!("warn"; "{relative}:{line}: shortcode `{name}` rendered to blank text");
    }
    Ok(expansion.is_ok())
}

/// Expand `file`, returning its content-relative path and the expansion.
pub fn render_document(config: &SiteConfig, file: &Path) -> Result<(String, Expansion)> {
    let source = locate(config, file)
        .with_context(|| format!("Document not found: {}", file.display()))?;

    let loaded = content::load(config, None)?;
    let Some(doc) = loaded.site.get_by_source(&source) else {
        let relative = relative_to(&source, &config.content.dir);
        match loaded.failures.iter().find(|f| f.relative == relative) {
            Some(failure) => bail!("Cannot render {failure}"),
            None => bail!(
                "{} is not a document under {}",
                file.display(),
                config.content.dir.display()
            ),
        }
    };

    let (registry, diagnostics) = load_registry(config)?;
    for diagnostic in &diagnostics {
        log!("warn"; "{diagnostic}");
    }

    Ok((doc.relative.clone(), expand_document(config, doc, &loaded.site, &registry)))
}

fn expand_document(
    config: &SiteConfig,
    doc: &Document,
    site: &content::Site,
    registry: &shortcode::registry::Registry,
) -> Expansion {
    let ctx = RenderContext {
        page: Path::new(&doc.relative),
        base_url: config.base_url(),
        links: site,
    };
    shortcode::expand(&doc.body, doc.body_line, registry, &ctx)
}

/// Resolve a user-supplied path: as given, against the project root, then
/// against the content directory.
fn locate(config: &SiteConfig, file: &Path) -> Option<PathBuf> {
    let candidates = [
        file.to_path_buf(),
        config.get_root().join(file),
        config.content.dir.join(file),
    ];
    candidates
        .iter()
        .filter(|p| p.is_file())
        .find_map(|p| p.canonicalize().ok())
}

fn relative_to(path: &Path, dir: &Path) -> String {
    path.strip_prefix(dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site(files: &[(&str, &str)]) -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        for (path, content) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        let mut config = SiteConfig::from_str("[base]\nurl = \"https://example.com/\"").unwrap();
        config.set_root(&root);
        config.config_path = root.join("quire.toml");
        config.content.dir = root.join("content");
        config.content.static_dir = root.join("static");
        config.content.shortcodes = root.join("layouts/shortcodes");
        (dir, config)
    }

    const HELLO: &str = "---\ntitle: Hello\ndate: 2021-01-01\n---\nHi.\n";

    #[test]
    fn test_render_expands_shortcodes() {
        let (_dir, config) = site(&[
            ("content/posts/hello.md", HELLO),
            (
                "content/about.md",
                "---\ntitle: About\n---\nRead {{< ref \"posts/hello.md\" >}}.\n",
            ),
        ]);

        let (relative, expansion) = render_document(&config, Path::new("content/about.md")).unwrap();
        assert_eq!(relative, "about.md");
        assert!(expansion.is_ok());
        assert_eq!(expansion.output, "Read https://example.com/posts/hello/.\n");
    }

    #[test]
    fn test_render_path_relative_to_content() {
        let (_dir, config) = site(&[("content/posts/hello.md", HELLO)]);
        let (relative, _) = render_document(&config, Path::new("posts/hello.md")).unwrap();
        assert_eq!(relative, "posts/hello.md");
    }

    #[test]
    fn test_render_uses_user_shortcodes() {
        let (_dir, config) = site(&[
            ("layouts/shortcodes/shout.html", "<b>{{ .Get 0 }}</b>"),
            ("content/note.md", "---\ntitle: Note\n---\n{{< shout hey >}}"),
        ]);
        let (_, expansion) = render_document(&config, Path::new("content/note.md")).unwrap();
        assert_eq!(expansion.output, "<b>hey</b>");
    }

    #[test]
    fn test_render_reports_errors_with_lines() {
        let (_dir, config) = site(&[(
            "content/note.md",
            "---\ntitle: Note\n---\nok\n{{< youtube x >}}\n",
        )]);
        let (_, expansion) = render_document(&config, Path::new("content/note.md")).unwrap();
        assert!(!expansion.is_ok());
        assert_eq!(expansion.errors[0].line(), 5);
    }

    #[test]
    fn test_render_broken_document() {
        let (_dir, config) = site(&[("content/bad.md", "---\ndate: 2021-01-01\n---\n")]);
        let err = render_document(&config, Path::new("content/bad.md")).unwrap_err();
        assert!(err.to_string().contains("bad.md"));
    }

    #[test]
    fn test_render_missing_file() {
        let (_dir, config) = site(&[("content/a.md", "---\ntitle: A\n---\n")]);
        assert!(render_document(&config, Path::new("content/nope.md")).is_err());
    }
}
