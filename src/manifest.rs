//! Site manifest support
//!
//! Lets a deployment run without a database by declaring its tenants and
//! hostnames in a single YAML file:
//!
//! ```yaml
//! defaults:
//!   default_tenant: servelec
//!   base_domain: tuapp.cl
//!
//! tenants:
//!   - name: Servelec Ingeniería
//!     slug: servelec
//!     primary_color: "#0f766e"
//!     domains: [servelec.cl, www.servelec.cl]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sitemux_proto::{Branding, Domain, DomainKind, Tenant, TenantSlug};
use sitemux_router::TenantRegistry;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Manifest file format
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SiteManifest {
    /// Deployment-wide settings
    #[serde(default)]
    pub defaults: ManifestDefaults,

    /// Tenant definitions
    #[serde(default)]
    pub tenants: Vec<ManifestTenant>,
}

/// Settings applied to the whole deployment
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ManifestDefaults {
    /// Tenant served when no hostname matches
    pub default_tenant: Option<String>,

    /// Platform domain used to classify tenant subdomains
    pub base_domain: Option<String>,
}

/// A single tenant in the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestTenant {
    /// Display name
    pub name: String,

    /// Derived from `name` when omitted
    pub slug: Option<String>,

    pub company_name: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub contact_email: Option<String>,

    /// Inactive tenants are loaded but never served
    #[serde(default = "default_active")]
    pub active: bool,

    /// Hostnames; the first one is the primary domain
    #[serde(default)]
    pub domains: Vec<String>,
}

fn default_active() -> bool {
    true
}

impl SiteManifest {
    /// Load a manifest from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {:?}", path))?;

        Self::parse(&content)
    }

    /// Parse a manifest from a YAML string
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: SiteManifest =
            serde_yaml::from_str(content).context("Failed to parse YAML manifest")?;

        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        let mut slugs = HashSet::new();
        for tenant in &self.tenants {
            let slug = tenant.slug()?;
            if !slugs.insert(slug.as_str().to_string()) {
                anyhow::bail!("Duplicate tenant slug: {}", slug);
            }
        }

        if let Some(default) = &self.defaults.default_tenant {
            if !slugs.contains(default) {
                anyhow::bail!("Default tenant '{}' is not declared in the manifest", default);
            }
        }

        Ok(())
    }

    /// Build an in-memory registry with sequential ids
    pub fn to_registry(&self) -> Result<TenantRegistry> {
        let registry = TenantRegistry::new();
        let base_domain = self.defaults.base_domain.as_deref().unwrap_or_default();
        let mut domain_id = 0;

        for (index, entry) in self.tenants.iter().enumerate() {
            let tenant = entry.to_tenant(index as i32 + 1)?;
            let tenant_id = tenant.id;
            let slug = tenant.slug.clone();
            registry
                .register_tenant(tenant)
                .with_context(|| format!("Failed to register tenant {}", slug))?;

            for (position, hostname) in entry.domains.iter().enumerate() {
                domain_id += 1;
                let is_primary = position == 0;
                let kind = DomainKind::classify(&hostname.to_ascii_lowercase(), base_domain)
                    .unwrap_or(if is_primary {
                        DomainKind::Primary
                    } else {
                        DomainKind::Alias
                    });

                registry
                    .register_domain(Domain {
                        id: domain_id,
                        tenant_id,
                        hostname: hostname.clone(),
                        kind,
                        is_primary,
                        is_active: entry.active,
                    })
                    .with_context(|| format!("Failed to bind {} to {}", hostname, slug))?;
            }
        }

        info!(
            "Loaded {} tenant(s) and {} domain(s) from manifest",
            registry.tenant_count(),
            registry.domain_count()
        );

        Ok(registry)
    }
}

impl ManifestTenant {
    fn slug(&self) -> Result<TenantSlug> {
        let slug = match &self.slug {
            Some(slug) => TenantSlug::parse(slug),
            None => TenantSlug::from_name(&self.name),
        };
        slug.with_context(|| format!("Invalid slug for tenant '{}'", self.name))
    }

    fn to_tenant(&self, id: i32) -> Result<Tenant> {
        let mut branding = Branding::new(
            self.company_name
                .clone()
                .unwrap_or_else(|| self.name.clone()),
        );
        if let Some(color) = &self.primary_color {
            branding.primary_color = Branding::validate_color(color)?;
        }
        if let Some(color) = &self.secondary_color {
            branding.secondary_color = Branding::validate_color(color)?;
        }
        branding.contact_email = self.contact_email.clone();

        Ok(Tenant {
            id,
            slug: self.slug()?.into_inner(),
            name: self.name.clone(),
            is_active: self.active,
            branding,
        })
    }
}
