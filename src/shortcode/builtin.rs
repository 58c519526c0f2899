//! Built-in shortcodes.
//!
//! | Name       | Arguments                                        | Body      |
//! |------------|--------------------------------------------------|-----------|
//! | `cv-entry` | `0` role, `1` organisation, `2` dates, `3` place | optional  |
//! | `details`  | `summary`, `open`                                | required  |
//! | `figure`   | `src`, `alt`, `title`, `caption`, `link`, `class`| none      |
//! | `ref`      | `0` or `path`: target document                   | none      |
//! | `relref`   | `0` or `path`: target document                   | none      |

use super::{
    RenderContext, RenderError,
    registry::Registry,
    template::{Call, TemplateError},
};

pub const CV_ENTRY: &str = r#"<div class="cv-entry">
<div class="cv-entry-header">
<span class="cv-entry-title">{{ .Get 0 }}</span>
{{- with .Get 2 }}
<span class="cv-entry-dates">{{ . }}</span>
{{- end }}
</div>
{{- with .Get 1 }}
<div class="cv-entry-org">{{ . }}</div>
{{- end }}
{{- with .Get 3 }}
<div class="cv-entry-location">{{ . }}</div>
{{- end }}
{{- with .Inner }}
<div class="cv-entry-body">

{{ . }}

</div>
{{- end }}
</div>"#;

pub const DETAILS: &str = r#"<details{{ with .Get "open" }} open{{ end }}>
<summary>{{ .Get "summary" | default "Details" }}</summary>

{{ .Inner }}

</details>"#;

pub const FIGURE: &str = r#"<figure{{ with .Get "class" }} class="{{ . }}"{{ end }}>
{{- with .Get "link" }}
<a href="{{ . }}">
{{- end }}
<img src="{{ .Get "src" }}"{{ with .Get "alt" }} alt="{{ . }}"{{ end }}{{ with .Get "title" }} title="{{ . }}"{{ end }}>
{{- with .Get "link" }}
</a>
{{- end }}
{{- with .Get "caption" }}
<figcaption>{{ . }}</figcaption>
{{- end }}
</figure>"#;

/// Register every built-in on `registry`.
pub fn register(registry: &mut Registry) -> Result<(), TemplateError> {
    for (name, source) in [("cv-entry", CV_ENTRY), ("details", DETAILS), ("figure", FIGURE)] {
        registry.register_template(name, source)?;
    }

    registry.register_native("ref", |call, ctx| {
        resolve_ref(call, ctx).map(|route| format!("{}{route}", ctx.base_url))
    });
    registry.register_native("relref", resolve_ref);
    Ok(())
}

/// Route of the referenced document, with the anchor re-attached.
fn resolve_ref(call: &Call<'_>, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let target = call
        .params
        .at(0)
        .or_else(|| call.params.named("path"))
        .ok_or_else(|| RenderError::MissingParameter("0".into()))?;

    let (path, anchor) = match target.split_once('#') {
        Some((path, anchor)) => (path, Some(anchor)),
        None => (target, None),
    };

    let self_path;
    let path = if path.is_empty() {
        self_path = ctx.page.to_string_lossy();
        self_path.as_ref()
    } else {
        path
    };

    let route = ctx
        .links
        .resolve(path, ctx.page)
        .ok_or_else(|| RenderError::DanglingReference(target.to_owned()))?;

    Ok(match anchor {
        Some(anchor) => format!("{route}#{anchor}"),
        None => route,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcode::{LinkResolver, parser::Params};
    use std::path::Path;

    struct Routes;

    impl LinkResolver for Routes {
        fn resolve(&self, target: &str, _from: &Path) -> Option<String> {
            match target {
                "posts/currying.md" => Some("/posts/currying/".into()),
                "about.md" => Some("/about/".into()),
                _ => None,
            }
        }
    }

    fn render(name: &str, params: Params, inner: Option<&str>) -> Result<String, RenderError> {
        let registry = Registry::with_builtins().unwrap();
        let ctx = RenderContext {
            page: Path::new("about.md"),
            base_url: "https://example.com",
            links: &Routes,
        };
        registry.get(name).unwrap().render(
            &Call {
                name,
                params: &params,
                inner,
                markdown: false,
            },
            &ctx,
        )
    }

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

    #[test]
    fn test_cv_entry_full() {
        let out = render(
            "cv-entry",
            positional(&["Software Engineer", "ACME Corp", "2018 - 2021", "Berlin"]),
            Some("Built things."),
        )
        .unwrap();

        assert!(out.starts_with("<div class=\"cv-entry\">"));
        assert!(out.contains("<span class=\"cv-entry-title\">Software Engineer</span>"));
        assert!(out.contains("<span class=\"cv-entry-dates\">2018 - 2021</span>"));
        assert!(out.contains("<div class=\"cv-entry-org\">ACME Corp</div>"));
        assert!(out.contains("<div class=\"cv-entry-location\">Berlin</div>"));
        assert!(out.contains("\n\nBuilt things.\n\n"));
        assert!(out.ends_with("</div>"));
    }

    #[test]
    fn test_cv_entry_minimal() {
        let out = render("cv-entry", positional(&["Student"]), None).unwrap();
        assert_eq!(
            out,
            "<div class=\"cv-entry\">\n<div class=\"cv-entry-header\">\n<span class=\"cv-entry-title\">Student</span>\n</div>\n</div>"
        );
    }

    #[test]
    fn test_cv_entry_requires_title() {
        let err = render("cv-entry", positional(&[]), Some("body")).unwrap_err();
        assert_eq!(err, RenderError::MissingParameter("0".into()));
    }

    #[test]
    fn test_details() {
        let out = render("details", named(&[("summary", "Show proof")]), Some("QED")).unwrap();
        assert_eq!(out, "<details>\n<summary>Show proof</summary>\n\nQED\n\n</details>");
    }

    #[test]
    fn test_details_open_and_default_summary() {
        let out = render("details", named(&[("open", "true")]), Some("x")).unwrap();
        assert!(out.starts_with("<details open>\n<summary>Details</summary>"));
    }

    #[test]
    fn test_details_requires_body() {
        assert_eq!(
            render("details", named(&[("summary", "s")]), None),
            Err(RenderError::MissingInner)
        );
    }

    #[test]
    fn test_figure_full() {
        let out = render(
            "figure",
            named(&[
                ("src", "/img/lambda.png"),
                ("alt", "A lambda"),
                ("caption", "Figure 1"),
                ("link", "https://example.com/big.png"),
            ]),
            None,
        )
        .unwrap();
        assert_eq!(
            out,
            "<figure>\n<a href=\"https://example.com/big.png\">\n<img src=\"/img/lambda.png\" alt=\"A lambda\">\n</a>\n<figcaption>Figure 1</figcaption>\n</figure>"
        );
    }

    #[test]
    fn test_figure_minimal() {
        let out = render("figure", named(&[("src", "a.png")]), None).unwrap();
        assert_eq!(out, "<figure>\n<img src=\"a.png\">\n</figure>");
    }

    #[test]
    fn test_figure_requires_src() {
        assert_eq!(
            render("figure", named(&[("alt", "x")]), None),
            Err(RenderError::MissingParameter("src".into()))
        );
    }

    #[test]
    fn test_ref_and_relref() {
        assert_eq!(
            render("ref", positional(&["posts/currying.md"]), None).unwrap(),
            "https://example.com/posts/currying/"
        );
        assert_eq!(
            render("relref", positional(&["posts/currying.md#curry"]), None).unwrap(),
            "/posts/currying/#curry"
        );
        assert_eq!(
            render("relref", named(&[("path", "posts/currying.md")]), None).unwrap(),
            "/posts/currying/"
        );
    }

    #[test]
    fn test_ref_anchor_only_targets_current_page() {
        assert_eq!(
            render("relref", positional(&["#education"]), None).unwrap(),
            "/about/#education"
        );
    }

    #[test]
    fn test_ref_dangling() {
        assert_eq!(
            render("ref", positional(&["posts/missing.md"]), None),
            Err(RenderError::DanglingReference("posts/missing.md".into()))
        );
    }
}
