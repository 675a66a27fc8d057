//! Tenant resolution for multi-tenant site hosting
//!
//! Maps an inbound request's host (and an optional explicit override) to the
//! tenant that owns it, then derives the ordered template roots used to render
//! that tenant's pages. Resolution precedence:
//!
//! 1. Explicit override slug (when enabled)
//! 2. Exact hostname match, case-insensitive, port ignored
//! 3. Configured default tenant
//! 4. Unresolved

pub mod directory;
pub mod host;
pub mod registry;
pub mod resolver;
pub mod template;

pub use directory::{DirectoryError, TenantDirectory};
pub use host::normalize_host;
pub use registry::{RegistryError, TenantRegistry};
pub use resolver::{ResolutionContext, ResolutionSource, ResolverConfig, TenantResolver};
pub use template::{template_roots, TemplateRoot};
