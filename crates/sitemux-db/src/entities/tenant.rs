//! Tenant entity: one customer account and its landing site

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Tenant slug (unique, immutable, used as template directory name)
    #[sea_orm(unique)]
    pub slug: String,

    /// Display name
    pub name: String,

    /// Name shown on the rendered site
    pub company_name: String,

    /// `#rrggbb`
    pub primary_color: String,

    /// `#rrggbb`
    pub secondary_color: String,

    pub contact_email: Option<String>,

    /// Inactive tenants are kept but never routed to
    pub is_active: bool,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Tenant owns its domains
    #[sea_orm(has_many = "super::domain::Entity")]
    Domains,
}

impl Related<super::domain::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Domains.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for sitemux_proto::Tenant {
    fn from(model: Model) -> Self {
        sitemux_proto::Tenant {
            id: model.id,
            slug: model.slug,
            name: model.name,
            is_active: model.is_active,
            branding: sitemux_proto::Branding {
                company_name: model.company_name,
                primary_color: model.primary_color,
                secondary_color: model.secondary_color,
                contact_email: model.contact_email,
            },
        }
    }
}
