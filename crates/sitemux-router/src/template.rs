//! Template root selection
//!
//! For a resolved tenant `acme` the search order is `[acme, _default]`; for an
//! unresolved request it is `[_default]`. The shared root is always last, so
//! every site renders even without customization. Nothing here touches the
//! filesystem: existence checks belong to whoever renders.

use crate::resolver::ResolutionContext;
use serde::{Serialize, Serializer};
use sitemux_proto::{TenantSlug, DEFAULT_ROOT};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A directory searched for presentation templates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateRoot {
    /// Tenant-specific templates keyed by slug
    Tenant(TenantSlug),
    /// Shared templates every tenant falls back to
    Default,
}

impl TemplateRoot {
    /// Identifier of this root (`<slug>` or `_default`)
    pub fn as_str(&self) -> &str {
        match self {
            TemplateRoot::Tenant(slug) => slug.as_str(),
            TemplateRoot::Default => DEFAULT_ROOT,
        }
    }

    /// Directory of this root under `base`
    ///
    /// Safe to join: a [`TenantSlug`] cannot contain separators or `..`.
    pub fn dir(&self, base: &Path) -> PathBuf {
        base.join(self.as_str())
    }
}

impl fmt::Display for TemplateRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TemplateRoot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Ordered template roots for a resolution outcome, most specific first
///
/// A stored slug that fails validation contributes no tenant root.
pub fn template_roots(ctx: &ResolutionContext) -> Vec<TemplateRoot> {
    let mut roots = Vec::with_capacity(2);

    if let Some(tenant) = ctx.tenant() {
        match TenantSlug::parse(&tenant.slug) {
            Ok(slug) => roots.push(TemplateRoot::Tenant(slug)),
            Err(_) => warn!(
                "Tenant {} has an unsafe slug {:?}, using shared templates only",
                tenant.id, tenant.slug
            ),
        }
    }

    roots.push(TemplateRoot::Default);
    roots
}
