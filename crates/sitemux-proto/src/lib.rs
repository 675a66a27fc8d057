//! Shared site-hosting types
//!
//! This crate defines the tenant and domain records exchanged between the
//! resolver, the persistence layer and the HTTP surface, plus the validated
//! [`TenantSlug`] used wherever a slug ends up in a path.

pub mod models;
pub mod slug;

pub use models::{Branding, Domain, DomainKind, Tenant};
pub use slug::TenantSlug;

use thiserror::Error;

/// Identifier of the shared template root every site falls back to
pub const DEFAULT_ROOT: &str = "_default";

/// Maximum slug length (matches the `tenants.slug` column)
pub const MAX_SLUG_LEN: usize = 100;

/// Errors raised while validating shared types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtoError {
    #[error("Invalid tenant slug: {0:?}")]
    InvalidSlug(String),

    #[error("Invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),

    #[error("Unknown domain kind: {0}")]
    UnknownDomainKind(String),
}
