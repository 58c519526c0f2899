//! Named shortcode registry.
//!
//! A shortcode is either a compiled [`Template`] or a native closure. Native
//! shortcodes receive the [`RenderContext`] and can look up other documents,
//! which templates cannot.

use super::{
    RenderContext, RenderError, builtin,
    template::{Call, Template, TemplateError},
};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Extensions recognised in the shortcode template directory.
const TEMPLATE_EXTENSIONS: &[&str] = &["html", "md"];

/// A registered native shortcode function.
pub type NativeFn =
    Box<dyn Fn(&Call<'_>, &RenderContext<'_>) -> Result<String, RenderError> + Send + Sync>;

pub enum Shortcode {
    Template(Template),
    Native(NativeFn),
}

impl Shortcode {
    pub fn render(&self, call: &Call<'_>, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        match self {
            Self::Template(template) => template.render(call),
            Self::Native(func) => func(call, ctx),
        }
    }
}

impl std::fmt::Debug for Shortcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template(template) => write!(f, "Template({})", template.name()),
            Self::Native(_) => f.write_str("Native"),
        }
    }
}

/// Registry of named shortcodes.
#[derive(Debug, Default)]
pub struct Registry(FxHashMap<String, Shortcode>);

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `cv-entry`, `details`, `figure`, `ref` and `relref`.
    pub fn with_builtins() -> Result<Self, TemplateError> {
        let mut registry = Self::new();
        builtin::register(&mut registry)?;
        Ok(registry)
    }

    pub fn register_template(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        let template = Template::compile(name, source)?;
        self.0.insert(name.to_owned(), Shortcode::Template(template));
        Ok(())
    }

    pub fn register_native<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&Call<'_>, &RenderContext<'_>) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        self.0.insert(name.to_owned(), Shortcode::Native(Box::new(func)));
    }

    pub fn get(&self, name: &str) -> Option<&Shortcode> {
        self.0.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Register every template file under `dir`, overriding earlier entries.
    ///
    /// `dir/blog/aside.html` registers `blog/aside`. A missing directory is
    /// not an error. Templates that fail to compile are returned, not
    /// registered; I/O failures abort.
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<(PathBuf, TemplateError)>> {
        let mut failures = Vec::new();
        if !dir.is_dir() {
            return Ok(failures);
        }

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
            let path = entry.path();
            let Some(name) = template_name(dir, path) else {
                continue;
            };

            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read shortcode {}", path.display()))?;
            if let Err(err) = self.register_template(&name, &source) {
                failures.push((path.to_path_buf(), err));
            }
        }

        Ok(failures)
    }
}

/// Shortcode name for a template file, or `None` if `path` is not one.
fn template_name(dir: &Path, path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let ext = path.extension()?.to_str()?;
    if !TEMPLATE_EXTENSIONS.contains(&ext) {
        return None;
    }

    let relative = path.strip_prefix(dir).ok()?.with_extension("");
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcode::parser::Params;
    use tempfile::TempDir;

    struct NoLinks;

    impl crate::shortcode::LinkResolver for NoLinks {
        fn resolve(&self, _target: &str, _from: &Path) -> Option<String> {
            None
        }
    }

    fn ctx() -> RenderContext<'static> {
        RenderContext {
            page: Path::new("about.md"),
            base_url: "",
            links: &NoLinks,
        }
    }

    fn call<'a>(name: &'a str, params: &'a Params) -> Call<'a> {
        Call {
            name,
            params,
            inner: None,
            markdown: false,
        }
    }

    #[test]
    fn test_builtins_present() {
        let registry = Registry::with_builtins().unwrap();
        assert_eq!(
            registry.names(),
            vec!["cv-entry", "details", "figure", "ref", "relref"]
        );
    }

    #[test]
    fn test_register_template_and_render() {
        let mut registry = Registry::new();
        registry.register_template("hello", "Hi {{ .Get 0 }}!").unwrap();

        let params = Params::Positional(vec!["Bob".into()]);
        let out = registry
            .get("hello")
            .unwrap()
            .render(&call("hello", &params), &ctx())
            .unwrap();
        assert_eq!(out, "Hi Bob!");
    }

    #[test]
    fn test_register_native() {
        let mut registry = Registry::new();
        registry.register_native("page", |_, ctx| Ok(ctx.page.display().to_string()));

        let params = Params::default();
        let out = registry
            .get("page")
            .unwrap()
            .render(&call("page", &params), &ctx())
            .unwrap();
        assert_eq!(out, "about.md");
    }

    #[test]
    fn test_register_template_rejects_bad_syntax() {
        let mut registry = Registry::new();
        assert!(registry.register_template("bad", "{{ with .Get 0 }}").is_err());
        assert!(registry.get("bad").is_none());
    }

    #[test]
    fn test_load_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("note.html"), "<aside>{{ .Inner }}</aside>").unwrap();
        fs::write(dir.path().join("blog/quote.md"), "> {{ .Get 0 }}").unwrap();
        fs::write(dir.path().join("broken.html"), "{{ .Nope }}").unwrap();
        fs::write(dir.path().join("README.txt"), "ignored").unwrap();

        let mut registry = Registry::new();
        let failures = registry.load_dir(dir.path()).unwrap();

        assert!(registry.get("note").is_some());
        assert!(registry.get("blog/quote").is_some());
        assert!(registry.get("README").is_none());
        assert_eq!(failures.len(), 1);
        assert!(failures[0].0.ends_with("broken.html"));
    }

    #[test]
    fn test_load_dir_overrides_builtin() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("figure.html"), "<img src=\"{{ .Get 0 }}\">").unwrap();

        let mut registry = Registry::with_builtins().unwrap();
        registry.load_dir(dir.path()).unwrap();

        let params = Params::Positional(vec!["a.png".into()]);
        let out = registry
            .get("figure")
            .unwrap()
            .render(&call("figure", &params), &ctx())
            .unwrap();
        assert_eq!(out, "<img src=\"a.png\">");
    }

    #[test]
    fn test_load_missing_dir() {
        let mut registry = Registry::new();
        let failures = registry.load_dir(Path::new("/definitely/not/here")).unwrap();
        assert!(failures.is_empty());
    }
}
