//! Request-to-tenant resolution

use crate::directory::{DirectoryError, TenantDirectory};
use crate::host::normalize_host;
use serde::{Deserialize, Serialize};
use sitemux_proto::{Tenant, TenantSlug};
use std::fmt;
use tracing::{debug, trace, warn};

/// Default name of the override query parameter
pub const DEFAULT_OVERRIDE_PARAM: &str = "tenant";

/// How a tenant was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    /// Explicit override query parameter
    Override,
    /// Hostname matched an active domain
    Domain,
    /// Process-wide default tenant
    Default,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Override => "override",
            ResolutionSource::Domain => "domain",
            ResolutionSource::Default => "default",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request outcome of tenant lookup
///
/// Created once per request and passed explicitly to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionContext {
    Resolved {
        tenant: Tenant,
        source: ResolutionSource,
    },
    Unresolved,
}

impl ResolutionContext {
    pub fn tenant(&self) -> Option<&Tenant> {
        match self {
            ResolutionContext::Resolved { tenant, .. } => Some(tenant),
            ResolutionContext::Unresolved => None,
        }
    }

    pub fn source(&self) -> Option<ResolutionSource> {
        match self {
            ResolutionContext::Resolved { source, .. } => Some(*source),
            ResolutionContext::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionContext::Resolved { .. })
    }
}

/// Deployment settings consumed by the resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Tenant used when neither override nor hostname match
    pub default_slug: Option<String>,
    /// Query parameter carrying the override slug
    pub override_param: String,
    /// Honour the override parameter (development and test deployments only)
    pub allow_override: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_slug: None,
            override_param: DEFAULT_OVERRIDE_PARAM.to_string(),
            allow_override: false,
        }
    }
}

/// Resolves requests to tenants against a [`TenantDirectory`]
pub struct TenantResolver<D> {
    directory: D,
    config: ResolverConfig,
}

impl<D: TenantDirectory> TenantResolver<D> {
    pub fn new(directory: D, config: ResolverConfig) -> Self {
        Self { directory, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Resolve a request
    ///
    /// Order, first match wins:
    /// 1. `override_slug` naming an active tenant (only if overrides are allowed)
    /// 2. Active domain whose hostname equals the normalized host
    /// 3. Configured default slug naming an active tenant
    /// 4. [`ResolutionContext::Unresolved`]
    ///
    /// A host that normalizes to nothing yields `Unresolved` before any rule
    /// runs. Only backend failures are errors. This never writes to the
    /// directory.
    pub async fn resolve(
        &self,
        host: &str,
        override_slug: Option<&str>,
    ) -> Result<ResolutionContext, DirectoryError> {
        // A malformed host short-circuits every rule, the override included
        let Some(hostname) = normalize_host(host) else {
            debug!("Unusable host header {:?}, request unresolved", host);
            return Ok(ResolutionContext::Unresolved);
        };

        if let Some(tenant) = self.lookup_override(override_slug).await? {
            return Ok(resolved(tenant, ResolutionSource::Override));
        }

        trace!("Looking up tenant for host: {}", hostname);
        if let Some(tenant) = self.directory.active_tenant_by_hostname(&hostname).await? {
            return Ok(resolved(tenant, ResolutionSource::Domain));
        }

        if let Some(slug) = self.config.default_slug.as_deref() {
            if let Some(tenant) = self.directory.active_tenant_by_slug(slug).await? {
                return Ok(resolved(tenant, ResolutionSource::Default));
            }
            debug!("Default tenant {} is missing or inactive", slug);
        }

        debug!("No tenant for host {}", host);
        Ok(ResolutionContext::Unresolved)
    }

    async fn lookup_override(
        &self,
        override_slug: Option<&str>,
    ) -> Result<Option<Tenant>, DirectoryError> {
        let Some(raw) = override_slug.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        if !self.config.allow_override {
            trace!("Ignoring tenant override {:?}: overrides disabled", raw);
            return Ok(None);
        }

        let slug = match TenantSlug::parse(raw) {
            Ok(slug) => slug,
            Err(_) => {
                warn!("Ignoring malformed tenant override {:?}", raw);
                return Ok(None);
            }
        };

        self.directory.active_tenant_by_slug(slug.as_str()).await
    }
}

fn resolved(tenant: Tenant, source: ResolutionSource) -> ResolutionContext {
    debug!("Resolved tenant {} via {}", tenant.slug, source);
    ResolutionContext::Resolved { tenant, source }
}
