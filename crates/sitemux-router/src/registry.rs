//! In-memory tenant registry
//!
//! Backs manifest-driven deployments and tests. Reads are lock-free per shard
//! (`DashMap`), so the registry can be shared across request handlers while
//! an operator deactivates tenants.

use crate::directory::{DirectoryError, TenantDirectory};
use crate::host::normalize_host;
use async_trait::async_trait;
use dashmap::DashMap;
use sitemux_proto::{Domain, Tenant, TenantSlug};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tenant already registered: {0}")]
    TenantAlreadyExists(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Hostname already bound to an active domain: {0}")]
    HostnameTaken(String),

    #[error("Domain already registered: {0}")]
    DomainAlreadyExists(String),

    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    #[error("Invalid hostname: {0:?}")]
    InvalidHostname(String),

    #[error("Invalid tenant slug: {0:?}")]
    InvalidSlug(String),
}

/// In-memory tenant directory
pub struct TenantRegistry {
    /// Tenants by id
    tenants: Arc<DashMap<i32, Tenant>>,
    /// Tenant ids by slug
    slugs: Arc<DashMap<String, i32>>,
    /// Domains by id
    domains: Arc<DashMap<i32, Domain>>,
    /// Domain ids by normalized hostname (inactive rows keep their entry)
    hostnames: Arc<DashMap<String, Vec<i32>>>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self {
            tenants: Arc::new(DashMap::new()),
            slugs: Arc::new(DashMap::new()),
            domains: Arc::new(DashMap::new()),
            hostnames: Arc::new(DashMap::new()),
        }
    }

    /// Register a tenant
    ///
    /// The slug must pass [`TenantSlug::parse`] and be unused.
    pub fn register_tenant(&self, tenant: Tenant) -> Result<(), RegistryError> {
        TenantSlug::parse(&tenant.slug)
            .map_err(|_| RegistryError::InvalidSlug(tenant.slug.clone()))?;

        if self.tenants.contains_key(&tenant.id) {
            return Err(RegistryError::TenantAlreadyExists(tenant.id.to_string()));
        }

        match self.slugs.entry(tenant.slug.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(RegistryError::TenantAlreadyExists(tenant.slug));
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(tenant.id);
            }
        }

        debug!("Registered tenant {} ({})", tenant.slug, tenant.id);
        self.tenants.insert(tenant.id, tenant);
        Ok(())
    }

    /// Register a domain for an already registered tenant
    ///
    /// The hostname is normalized first. At most one active domain may hold a
    /// hostname; inactive rows do not block a new binding.
    pub fn register_domain(&self, mut domain: Domain) -> Result<(), RegistryError> {
        if !self.tenants.contains_key(&domain.tenant_id) {
            return Err(RegistryError::TenantNotFound(domain.tenant_id.to_string()));
        }

        if self.domains.contains_key(&domain.id) {
            return Err(RegistryError::DomainAlreadyExists(domain.id.to_string()));
        }

        let hostname = normalize_host(&domain.hostname)
            .ok_or_else(|| RegistryError::InvalidHostname(domain.hostname.clone()))?;
        domain.hostname = hostname.clone();

        // Holding the entry keeps the check-and-insert atomic for this hostname
        let mut ids = self.hostnames.entry(hostname.clone()).or_default();
        let taken = ids.iter().any(|id| {
            self.domains
                .get(id)
                .map(|existing| existing.is_active)
                .unwrap_or(false)
        });

        if taken && domain.is_active {
            return Err(RegistryError::HostnameTaken(hostname));
        }

        trace!("Registering domain {} -> tenant {}", hostname, domain.tenant_id);
        ids.push(domain.id);
        self.domains.insert(domain.id, domain);
        Ok(())
    }

    /// Deactivate a tenant and every domain it owns
    pub fn deactivate_tenant(&self, slug: &str) -> Result<(), RegistryError> {
        let tenant_id = *self
            .slugs
            .get(slug)
            .ok_or_else(|| RegistryError::TenantNotFound(slug.to_string()))?;

        if let Some(mut tenant) = self.tenants.get_mut(&tenant_id) {
            tenant.is_active = false;
        }

        for mut domain in self.domains.iter_mut() {
            if domain.tenant_id == tenant_id {
                domain.is_active = false;
            }
        }

        debug!("Deactivated tenant {} and its domains", slug);
        Ok(())
    }

    /// Deactivate every domain bound to a hostname
    pub fn deactivate_domain(&self, hostname: &str) -> Result<(), RegistryError> {
        let hostname = normalize_host(hostname)
            .ok_or_else(|| RegistryError::InvalidHostname(hostname.to_string()))?;

        let ids = self
            .hostnames
            .get(&hostname)
            .map(|ids| ids.clone())
            .ok_or_else(|| RegistryError::DomainNotFound(hostname.clone()))?;

        for id in ids {
            if let Some(mut domain) = self.domains.get_mut(&id) {
                domain.is_active = false;
            }
        }

        Ok(())
    }

    /// Get a tenant by slug regardless of state
    pub fn tenant(&self, slug: &str) -> Option<Tenant> {
        let id = *self.slugs.get(slug)?;
        self.tenants.get(&id).map(|t| t.value().clone())
    }

    /// Domains owned by a tenant, ordered by hostname
    pub fn domains_of(&self, tenant_id: i32) -> Vec<Domain> {
        let mut domains: Vec<Domain> = self
            .domains
            .iter()
            .filter(|d| d.tenant_id == tenant_id)
            .map(|d| d.value().clone())
            .collect();
        domains.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        domains
    }

    /// All tenants, ordered by slug
    pub fn all_tenants(&self) -> Vec<Tenant> {
        let mut tenants: Vec<Tenant> = self.tenants.iter().map(|t| t.value().clone()).collect();
        tenants.sort_by(|a, b| a.slug.cmp(&b.slug));
        tenants
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    pub fn clear(&self) {
        self.hostnames.clear();
        self.domains.clear();
        self.slugs.clear();
        self.tenants.clear();
    }

    fn active_tenant(&self, id: i32) -> Option<Tenant> {
        self.tenants
            .get(&id)
            .filter(|t| t.is_active)
            .map(|t| t.value().clone())
    }
}

impl Default for TenantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenantDirectory for TenantRegistry {
    async fn active_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DirectoryError> {
        let Some(id) = self.slugs.get(slug).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.active_tenant(id))
    }

    async fn active_tenant_by_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<Tenant>, DirectoryError> {
        let Some(ids) = self.hostnames.get(hostname).map(|ids| ids.clone()) else {
            return Ok(None);
        };

        let mut candidates: Vec<Domain> = ids
            .iter()
            .filter_map(|id| self.domains.get(id).map(|d| d.value().clone()))
            .filter(|d| d.is_active)
            .collect();
        candidates.sort_by_key(|d| d.id);

        Ok(candidates
            .iter()
            .find_map(|d| self.active_tenant(d.tenant_id)))
    }
}
