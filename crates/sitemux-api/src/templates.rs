//! Template lookup and rendering
//!
//! Templates live under `<base_dir>/<root>/<name>`, where the roots come from
//! [`template_roots`]. The first root holding the file wins.

use chrono::Datelike;
use sitemux_router::{template_roots, ResolutionContext};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Template errors
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Invalid template name: {0:?}")]
    InvalidName(String),

    #[error("Template {name} not found in roots {searched:?}")]
    NotFound { name: String, searched: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Locates templates for a resolved request
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    base_dir: PathBuf,
}

impl TemplateLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the first existing `name` across the request's template roots
    pub async fn locate(
        &self,
        ctx: &ResolutionContext,
        name: &str,
    ) -> Result<PathBuf, TemplateError> {
        validate_name(name)?;

        let roots = template_roots(ctx);
        for root in &roots {
            let candidate = root.dir(&self.base_dir).join(name);
            trace!("Trying template {}", candidate.display());
            let is_file = tokio::fs::metadata(&candidate)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if is_file {
                debug!("Template {} served from root {}", name, root);
                return Ok(candidate);
            }
        }

        Err(TemplateError::NotFound {
            name: name.to_string(),
            searched: roots.iter().map(|r| r.to_string()).collect(),
        })
    }

    /// Locate `name` and render it with the request's site variables
    pub async fn render(&self, ctx: &ResolutionContext, name: &str) -> Result<String, TemplateError> {
        let path = self.locate(ctx, name).await?;
        let source = tokio::fs::read_to_string(&path).await?;
        Ok(render_placeholders(&source, ctx))
    }
}

/// Reject anything that could escape a template root
fn validate_name(name: &str) -> Result<(), TemplateError> {
    let path = Path::new(name);
    let plain = !name.is_empty()
        && !name.contains('\\')
        && !name.contains('\0')
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

    if plain {
        Ok(())
    } else {
        Err(TemplateError::InvalidName(name.to_string()))
    }
}

/// Substitute `{{ site.* }}` placeholders
///
/// Unknown placeholders are left untouched.
pub fn render_placeholders(source: &str, ctx: &ResolutionContext) -> String {
    let year = chrono::Utc::now().year().to_string();
    let mut vars: Vec<(&str, &str)> = vec![("site.current_year", year.as_str())];

    if let Some(tenant) = ctx.tenant() {
        let branding = &tenant.branding;
        vars.extend([
            ("site.name", tenant.name.as_str()),
            ("site.slug", tenant.slug.as_str()),
            ("site.company_name", branding.company_name.as_str()),
            ("site.primary_color", branding.primary_color.as_str()),
            ("site.secondary_color", branding.secondary_color.as_str()),
            (
                "site.contact_email",
                branding.contact_email.as_deref().unwrap_or_default(),
            ),
        ]);
    }

    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = after[..end].trim();
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(&escape_html(value)),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitemux_proto::{Branding, Tenant};
    use sitemux_router::ResolutionSource;
    use std::fs;

    fn resolved(slug: &str) -> ResolutionContext {
        ResolutionContext::Resolved {
            tenant: Tenant {
                id: 1,
                slug: slug.to_string(),
                name: "Acme <Chile>".to_string(),
                is_active: true,
                branding: Branding::new("Acme SpA"),
            },
            source: ResolutionSource::Domain,
        }
    }

    fn write(base: &Path, rel: &str, contents: &str) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_tenant_root_wins_over_default() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "acme/index.html", "acme");
        write(dir.path(), "_default/index.html", "default");

        let loader = TemplateLoader::new(dir.path());
        let path = loader.locate(&resolved("acme"), "index.html").await.unwrap();

        assert_eq!(path, dir.path().join("acme/index.html"));
    }

    #[tokio::test]
    async fn test_falls_back_to_default_root() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "_default/index.html", "default");

        let loader = TemplateLoader::new(dir.path());

        let path = loader.locate(&resolved("acme"), "index.html").await.unwrap();
        assert_eq!(path, dir.path().join("_default/index.html"));

        let path = loader
            .locate(&ResolutionContext::Unresolved, "index.html")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("_default/index.html"));
    }

    #[tokio::test]
    async fn test_missing_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let loader = TemplateLoader::new(dir.path());

        match loader.locate(&resolved("acme"), "about.html").await {
            Err(TemplateError::NotFound { name, searched }) => {
                assert_eq!(name, "about.html");
                assert_eq!(searched, vec!["acme", "_default"]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "secret.html", "secret");
        let loader = TemplateLoader::new(dir.path());

        for name in ["", "../secret.html", "/etc/passwd", "./index.html", "a\\b.html"] {
            assert!(
                matches!(
                    loader.locate(&resolved("acme"), name).await,
                    Err(TemplateError::InvalidName(_))
                ),
                "name {name:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_nested_names_allowed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "_default/partials/footer.html", "footer");
        let loader = TemplateLoader::new(dir.path());

        assert!(loader
            .locate(&resolved("acme"), "partials/footer.html")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_directory_is_not_a_template() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("acme/about.html")).unwrap();
        write(dir.path(), "_default/about.html", "default about");
        let loader = TemplateLoader::new(dir.path());

        let path = loader.locate(&resolved("acme"), "about.html").await.unwrap();
        assert_eq!(path, dir.path().join("_default/about.html"));
    }

    #[test]
    fn test_render_placeholders() {
        let rendered = render_placeholders(
            "<h1>{{ site.name }}</h1><p style=\"color: {{site.primary_color}}\">{{ unknown }}</p>",
            &resolved("acme"),
        );

        assert_eq!(
            rendered,
            "<h1>Acme &lt;Chile&gt;</h1><p style=\"color: #2563eb\">{{ unknown }}</p>"
        );
    }

    #[test]
    fn test_render_unterminated_placeholder() {
        let rendered = render_placeholders("a {{ site.name", &resolved("acme"));
        assert_eq!(rendered, "a {{ site.name");
    }

    #[tokio::test]
    async fn test_render_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "_default/index.html", "© {{ site.current_year }}");
        let loader = TemplateLoader::new(dir.path());

        let html = loader
            .render(&ResolutionContext::Unresolved, "index.html")
            .await
            .unwrap();
        assert_eq!(html, format!("© {}", chrono::Utc::now().year()));
    }
}
