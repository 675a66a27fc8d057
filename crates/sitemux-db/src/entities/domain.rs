//! Domain entity: a hostname bound to one tenant

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored form of [`sitemux_proto::DomainKind`]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Kind {
    #[sea_orm(string_value = "primary")]
    Primary,

    #[sea_orm(string_value = "alias")]
    Alias,

    #[sea_orm(string_value = "subdomain")]
    Subdomain,

    #[sea_orm(string_value = "development")]
    Development,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "domains")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning tenant
    pub tenant_id: i32,

    /// Lowercase hostname without port (unique)
    #[sea_orm(unique)]
    pub hostname: String,

    pub kind: Kind,

    /// At most one primary domain per tenant
    pub is_primary: bool,

    pub is_active: bool,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Domain belongs to a tenant
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Kind> for sitemux_proto::DomainKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Primary => sitemux_proto::DomainKind::Primary,
            Kind::Alias => sitemux_proto::DomainKind::Alias,
            Kind::Subdomain => sitemux_proto::DomainKind::Subdomain,
            Kind::Development => sitemux_proto::DomainKind::Development,
        }
    }
}

impl From<sitemux_proto::DomainKind> for Kind {
    fn from(kind: sitemux_proto::DomainKind) -> Self {
        match kind {
            sitemux_proto::DomainKind::Primary => Kind::Primary,
            sitemux_proto::DomainKind::Alias => Kind::Alias,
            sitemux_proto::DomainKind::Subdomain => Kind::Subdomain,
            sitemux_proto::DomainKind::Development => Kind::Development,
        }
    }
}

impl From<Model> for sitemux_proto::Domain {
    fn from(model: Model) -> Self {
        sitemux_proto::Domain {
            id: model.id,
            tenant_id: model.tenant_id,
            hostname: model.hostname,
            kind: model.kind.into(),
            is_primary: model.is_primary,
            is_active: model.is_active,
        }
    }
}
