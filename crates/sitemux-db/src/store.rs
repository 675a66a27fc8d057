//! Tenant and domain administration backed by the database
//!
//! Writes happen here (provisioning, domain binding, deactivation). The
//! request path only ever goes through the read-only [`TenantDirectory`]
//! implementation at the bottom of this file.

use crate::entities::{domain, tenant};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, NotSet, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use sitemux_proto::{Branding, Domain, DomainKind, ProtoError, Tenant, TenantSlug};
use sitemux_router::{normalize_host, DirectoryError, TenantDirectory};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error("Tenant slug already taken: {0}")]
    SlugTaken(String),

    #[error("Hostname already bound to a tenant: {0}")]
    HostnameTaken(String),

    #[error("Invalid hostname: {0:?}")]
    InvalidHostname(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Domain not found: {0}")]
    DomainNotFound(String),
}

/// A tenant to create
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTenant {
    /// Display name
    pub name: String,
    /// Explicit slug; derived from `name` when absent
    pub slug: Option<String>,
    /// Defaults to `name`
    pub company_name: Option<String>,
    pub contact_email: Option<String>,
    /// `#rrggbb`, defaults to the platform palette
    pub primary_color: Option<String>,
    /// `#rrggbb`, defaults to a darker shade of the primary color when that is given
    pub secondary_color: Option<String>,
}

/// A hostname to bind to a tenant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDomain {
    pub hostname: String,
    /// Classified from the hostname when absent
    pub kind: Option<DomainKind>,
    /// The first domain of a tenant is primary regardless
    pub is_primary: bool,
}

impl NewDomain {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Default::default()
        }
    }
}

/// Full tenant provisioning in one transaction
#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    pub tenant: NewTenant,
    /// Main hostname
    pub primary_domain: Option<String>,
    /// Additional alias hostnames
    pub extra_domains: Vec<String>,
    /// Also bind `{slug}.{base_domain}`
    pub with_subdomain: bool,
}

/// Result of [`TenantStore::provision_tenant`]
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedTenant {
    pub tenant: Tenant,
    pub domains: Vec<Domain>,
}

/// Partial branding update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandingUpdate {
    pub company_name: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub contact_email: Option<String>,
}

/// A tenant with all of its domains
#[derive(Debug, Clone, Serialize)]
pub struct TenantSummary {
    pub tenant: Tenant,
    /// Ordered by hostname
    pub domains: Vec<Domain>,
}

impl TenantSummary {
    pub fn active_domains(&self) -> impl Iterator<Item = &Domain> {
        self.domains.iter().filter(|d| d.is_active)
    }
}

/// Database-backed tenant store
#[derive(Clone)]
pub struct TenantStore {
    db: DatabaseConnection,
    /// Platform domain that tenant subdomains hang off (e.g. `tuapp.cl`)
    base_domain: String,
}

impl TenantStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            base_domain: "localhost".to_string(),
        }
    }

    pub fn with_base_domain(mut self, base_domain: impl Into<String>) -> Self {
        self.base_domain = base_domain.into().trim_start_matches('.').to_ascii_lowercase();
        self
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Create a tenant without domains
    pub async fn create_tenant(&self, new: NewTenant) -> Result<Tenant, StoreError> {
        let model = insert_tenant(&self.db, &new).await?;
        Ok(model.into())
    }

    /// Bind a hostname to an existing tenant
    pub async fn add_domain(&self, slug: &str, new: NewDomain) -> Result<Domain, StoreError> {
        let txn = self.db.begin().await?;

        let tenant = find_tenant(&txn, slug).await?;
        let model = insert_domain(&txn, &self.base_domain, tenant.id, &new).await?;

        txn.commit().await?;
        Ok(model.into())
    }

    /// Create a tenant with its primary, alias and platform subdomain hostnames
    pub async fn provision_tenant(
        &self,
        request: ProvisionRequest,
    ) -> Result<ProvisionedTenant, StoreError> {
        let txn = self.db.begin().await?;

        let tenant = insert_tenant(&txn, &request.tenant).await?;
        let mut domains = Vec::new();

        if let Some(primary) = &request.primary_domain {
            let new = NewDomain {
                hostname: primary.clone(),
                kind: None,
                is_primary: true,
            };
            domains.push(insert_domain(&txn, &self.base_domain, tenant.id, &new).await?);
        }

        for extra in &request.extra_domains {
            let new = NewDomain::new(extra.clone());
            domains.push(insert_domain(&txn, &self.base_domain, tenant.id, &new).await?);
        }

        if request.with_subdomain && self.has_platform_domain() {
            let hostname = format!("{}.{}", tenant.slug, self.base_domain);
            if find_domain_model(&txn, &hostname).await?.is_none() {
                let new = NewDomain {
                    hostname,
                    kind: Some(DomainKind::Subdomain),
                    is_primary: false,
                };
                domains.push(insert_domain(&txn, &self.base_domain, tenant.id, &new).await?);
            } else {
                debug!("Subdomain {} already bound, skipping", hostname);
            }
        }

        txn.commit().await?;

        info!(
            "Provisioned tenant {} with {} domain(s)",
            tenant.slug,
            domains.len()
        );

        Ok(ProvisionedTenant {
            tenant: tenant.into(),
            domains: domains.into_iter().map(Domain::from).collect(),
        })
    }

    /// Make a domain its tenant's only primary domain
    pub async fn set_primary_domain(&self, hostname: &str) -> Result<Domain, StoreError> {
        let hostname = normalized(hostname)?;
        let txn = self.db.begin().await?;

        let existing = find_domain_model(&txn, &hostname)
            .await?
            .ok_or_else(|| StoreError::DomainNotFound(hostname.clone()))?;

        clear_primary(&txn, existing.tenant_id).await?;

        let mut active = existing.into_active_model();
        active.is_primary = Set(true);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        info!("Primary domain set to {}", hostname);
        Ok(updated.into())
    }

    /// Stop routing a hostname
    pub async fn deactivate_domain(&self, hostname: &str) -> Result<Domain, StoreError> {
        let hostname = normalized(hostname)?;
        let existing = find_domain_model(&self.db, &hostname)
            .await?
            .ok_or_else(|| StoreError::DomainNotFound(hostname.clone()))?;

        let mut active = existing.into_active_model();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;

        info!("Deactivated domain {}", hostname);
        Ok(updated.into())
    }

    /// Deactivate a tenant and every domain it owns
    ///
    /// Rows are kept; nothing is physically deleted.
    pub async fn deactivate_tenant(&self, slug: &str) -> Result<Tenant, StoreError> {
        let txn = self.db.begin().await?;

        let existing = find_tenant(&txn, slug).await?;
        let tenant_id = existing.id;

        let mut active = existing.into_active_model();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        let cascaded = domain::Entity::update_many()
            .col_expr(domain::Column::IsActive, Expr::value(false))
            .col_expr(domain::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(domain::Column::TenantId.eq(tenant_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(
            "Deactivated tenant {} and {} domain(s)",
            slug, cascaded.rows_affected
        );
        Ok(updated.into())
    }

    /// Reactivate a tenant
    ///
    /// Domains keep their current state and must be reactivated explicitly.
    pub async fn activate_tenant(&self, slug: &str) -> Result<Tenant, StoreError> {
        let existing = find_tenant(&self.db, slug).await?;

        let mut active = existing.into_active_model();
        active.is_active = Set(true);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;

        info!("Activated tenant {}", slug);
        Ok(updated.into())
    }

    /// Reactivate a previously deactivated hostname
    pub async fn activate_domain(&self, hostname: &str) -> Result<Domain, StoreError> {
        let hostname = normalized(hostname)?;
        let existing = find_domain_model(&self.db, &hostname)
            .await?
            .ok_or_else(|| StoreError::DomainNotFound(hostname.clone()))?;

        let mut active = existing.into_active_model();
        active.is_active = Set(true);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;

        info!("Activated domain {}", hostname);
        Ok(updated.into())
    }

    /// Update presentation settings
    pub async fn update_branding(
        &self,
        slug: &str,
        update: BrandingUpdate,
    ) -> Result<Tenant, StoreError> {
        let existing = find_tenant(&self.db, slug).await?;
        let mut active = existing.into_active_model();

        if let Some(company_name) = update.company_name {
            active.company_name = Set(company_name);
        }
        if let Some(color) = update.primary_color {
            active.primary_color = Set(Branding::validate_color(&color)?);
        }
        if let Some(color) = update.secondary_color {
            active.secondary_color = Set(Branding::validate_color(&color)?);
        }
        if let Some(email) = update.contact_email {
            active.contact_email = Set(Some(email).filter(|e| !e.is_empty()));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(updated.into())
    }

    /// Find a tenant by slug regardless of state
    pub async fn find_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        let model = tenant::Entity::find()
            .filter(tenant::Column::Slug.eq(slug))
            .one(&self.db)
            .await?;
        Ok(model.map(Tenant::from))
    }

    /// Find a domain by hostname regardless of state
    pub async fn find_domain(&self, hostname: &str) -> Result<Option<Domain>, StoreError> {
        let hostname = normalized(hostname)?;
        Ok(find_domain_model(&self.db, &hostname).await?.map(Domain::from))
    }

    /// All tenants with their domains, ordered by name
    pub async fn list_tenants(&self, active_only: bool) -> Result<Vec<TenantSummary>, StoreError> {
        let mut query = tenant::Entity::find();
        if active_only {
            query = query.filter(tenant::Column::IsActive.eq(true));
        }

        let rows = query
            .order_by_asc(tenant::Column::Id)
            .find_with_related(domain::Entity)
            .all(&self.db)
            .await?;

        let mut summaries: Vec<TenantSummary> = rows
            .into_iter()
            .map(|(tenant, domains)| {
                let mut domains: Vec<Domain> = domains.into_iter().map(Domain::from).collect();
                domains.sort_by(|a, b| a.hostname.cmp(&b.hostname));
                TenantSummary {
                    tenant: tenant.into(),
                    domains,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.tenant.name.cmp(&b.tenant.name));

        Ok(summaries)
    }

    /// The active primary domain, else the first active domain by hostname
    pub async fn primary_domain(&self, tenant_id: i32) -> Result<Option<Domain>, StoreError> {
        let primary = domain::Entity::find()
            .filter(domain::Column::TenantId.eq(tenant_id))
            .filter(domain::Column::IsActive.eq(true))
            .filter(domain::Column::IsPrimary.eq(true))
            .one(&self.db)
            .await?;

        if let Some(primary) = primary {
            return Ok(Some(primary.into()));
        }

        let first = domain::Entity::find()
            .filter(domain::Column::TenantId.eq(tenant_id))
            .filter(domain::Column::IsActive.eq(true))
            .order_by_asc(domain::Column::Hostname)
            .one(&self.db)
            .await?;

        Ok(first.map(Domain::from))
    }

    /// Public URL of a tenant's site
    pub async fn site_url(&self, tenant_id: i32) -> Result<Option<String>, StoreError> {
        Ok(self
            .primary_domain(tenant_id)
            .await?
            .map(|d| format!("https://{}", d.hostname)))
    }

    /// Count of tenants and active tenants
    pub async fn tenant_counts(&self) -> Result<(u64, u64), StoreError> {
        let total = tenant::Entity::find().count(&self.db).await?;
        let active = tenant::Entity::find()
            .filter(tenant::Column::IsActive.eq(true))
            .count(&self.db)
            .await?;
        Ok((total, active))
    }

    fn has_platform_domain(&self) -> bool {
        !self.base_domain.is_empty() && self.base_domain != "localhost"
    }
}

#[async_trait]
impl TenantDirectory for TenantStore {
    async fn active_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DirectoryError> {
        let model = tenant::Entity::find()
            .filter(tenant::Column::Slug.eq(slug))
            .filter(tenant::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(backend_error)?;

        Ok(model.map(Tenant::from))
    }

    async fn active_tenant_by_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<Tenant>, DirectoryError> {
        trace!("Querying active tenant for hostname {}", hostname);

        // Lowest domain id wins should the uniqueness constraint ever be bypassed
        let row = domain::Entity::find()
            .find_also_related(tenant::Entity)
            .filter(domain::Column::Hostname.eq(hostname))
            .filter(domain::Column::IsActive.eq(true))
            .filter(tenant::Column::IsActive.eq(true))
            .order_by_asc(domain::Column::Id)
            .one(&self.db)
            .await
            .map_err(backend_error)?;

        Ok(row.and_then(|(_, tenant)| tenant).map(Tenant::from))
    }
}

fn backend_error(err: DbErr) -> DirectoryError {
    DirectoryError::Backend(err.to_string())
}

fn normalized(hostname: &str) -> Result<String, StoreError> {
    normalize_host(hostname).ok_or_else(|| StoreError::InvalidHostname(hostname.to_string()))
}

/// Map a unique-constraint violation to `conflict`, anything else to a database error
fn unique_violation_or(err: DbErr, conflict: StoreError) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => conflict,
        _ => StoreError::Database(err),
    }
}

async fn find_tenant<C: ConnectionTrait>(conn: &C, slug: &str) -> Result<tenant::Model, StoreError> {
    tenant::Entity::find()
        .filter(tenant::Column::Slug.eq(slug))
        .one(conn)
        .await?
        .ok_or_else(|| StoreError::TenantNotFound(slug.to_string()))
}

async fn find_domain_model<C: ConnectionTrait>(
    conn: &C,
    hostname: &str,
) -> Result<Option<domain::Model>, StoreError> {
    Ok(domain::Entity::find()
        .filter(domain::Column::Hostname.eq(hostname))
        .one(conn)
        .await?)
}

async fn clear_primary<C: ConnectionTrait>(conn: &C, tenant_id: i32) -> Result<(), StoreError> {
    domain::Entity::update_many()
        .col_expr(domain::Column::IsPrimary, Expr::value(false))
        .filter(domain::Column::TenantId.eq(tenant_id))
        .filter(domain::Column::IsPrimary.eq(true))
        .exec(conn)
        .await?;
    Ok(())
}

async fn insert_tenant<C: ConnectionTrait>(
    conn: &C,
    new: &NewTenant,
) -> Result<tenant::Model, StoreError> {
    let slug = match &new.slug {
        Some(slug) => TenantSlug::parse(slug)?,
        None => TenantSlug::from_name(&new.name)?,
    };

    if tenant::Entity::find()
        .filter(tenant::Column::Slug.eq(slug.as_str()))
        .one(conn)
        .await?
        .is_some()
    {
        return Err(StoreError::SlugTaken(slug.into_inner()));
    }

    let mut branding = Branding::new(new.company_name.clone().unwrap_or_else(|| new.name.clone()));
    if let Some(color) = &new.primary_color {
        branding.primary_color = Branding::validate_color(color)?;
        branding.secondary_color = darken_color(&branding.primary_color);
    }
    if let Some(color) = &new.secondary_color {
        branding.secondary_color = Branding::validate_color(color)?;
    }

    let now = Utc::now();
    let model = tenant::ActiveModel {
        id: NotSet,
        slug: Set(slug.as_str().to_string()),
        name: Set(new.name.clone()),
        company_name: Set(branding.company_name),
        primary_color: Set(branding.primary_color),
        secondary_color: Set(branding.secondary_color),
        contact_email: Set(new.contact_email.clone().filter(|e| !e.is_empty())),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| unique_violation_or(e, StoreError::SlugTaken(slug.as_str().to_string())))?;

    info!("Created tenant {} ({})", model.slug, model.id);
    Ok(model)
}

async fn insert_domain<C: ConnectionTrait>(
    conn: &C,
    base_domain: &str,
    tenant_id: i32,
    new: &NewDomain,
) -> Result<domain::Model, StoreError> {
    let hostname = normalized(&new.hostname)?;

    if find_domain_model(conn, &hostname).await?.is_some() {
        return Err(StoreError::HostnameTaken(hostname));
    }

    let has_domains = domain::Entity::find()
        .filter(domain::Column::TenantId.eq(tenant_id))
        .count(conn)
        .await?
        > 0;
    let is_primary = new.is_primary || !has_domains;

    let kind = new
        .kind
        .or_else(|| DomainKind::classify(&hostname, base_domain))
        .unwrap_or(if is_primary {
            DomainKind::Primary
        } else {
            DomainKind::Alias
        });

    if is_primary {
        clear_primary(conn, tenant_id).await?;
    }

    let now = Utc::now();
    let model = domain::ActiveModel {
        id: NotSet,
        tenant_id: Set(tenant_id),
        hostname: Set(hostname.clone()),
        kind: Set(kind.into()),
        is_primary: Set(is_primary),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| unique_violation_or(e, StoreError::HostnameTaken(hostname.clone())))?;

    info!("Bound {} to tenant {} as {}", hostname, tenant_id, kind);
    Ok(model)
}

/// Darken a validated `#rrggbb` color by 20%
fn darken_color(color: &str) -> String {
    let hex = color.trim_start_matches('#');
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map(|v| (u16::from(v) * 4 / 5) as u8)
            .unwrap_or(0)
    };
    format!("#{:02x}{:02x}{:02x}", channel(0), channel(2), channel(4))
}
