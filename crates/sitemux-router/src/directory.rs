//! Read access to tenant and domain records

use async_trait::async_trait;
use sitemux_proto::Tenant;
use std::sync::Arc;
use thiserror::Error;

/// Directory lookup errors
///
/// A lookup that finds nothing is `Ok(None)`, never an error.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory backend error: {0}")]
    Backend(String),
}

/// Read-only view over stored tenants and domains
///
/// Implementations must only ever return active tenants. Concurrent
/// administrative writes are tolerated: whatever state is visible at read
/// time is what the lookup reports.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Active tenant with exactly this slug
    async fn active_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DirectoryError>;

    /// Active tenant owning an active domain with this normalized hostname
    ///
    /// If several active domains carry the hostname, the one with the lowest
    /// id wins.
    async fn active_tenant_by_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<Tenant>, DirectoryError>;
}

#[async_trait]
impl<T: TenantDirectory + ?Sized> TenantDirectory for Arc<T> {
    async fn active_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DirectoryError> {
        (**self).active_tenant_by_slug(slug).await
    }

    async fn active_tenant_by_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<Tenant>, DirectoryError> {
        (**self).active_tenant_by_hostname(hostname).await
    }
}
