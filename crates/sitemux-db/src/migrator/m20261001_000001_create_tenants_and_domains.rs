//! Initial schema: tenants and the domains routed to them

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. Create tenants table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(pk_auto(Tenants::Id))
                    .col(string_len(Tenants::Slug, 100).not_null().unique_key())
                    .col(string_len(Tenants::Name, 100).not_null())
                    .col(string_len(Tenants::CompanyName, 200).not_null())
                    .col(
                        string_len(Tenants::PrimaryColor, 7)
                            .not_null()
                            .default("#2563eb"),
                    )
                    .col(
                        string_len(Tenants::SecondaryColor, 7)
                            .not_null()
                            .default("#1e40af"),
                    )
                    .col(string_len_null(Tenants::ContactEmail, 255))
                    .col(boolean(Tenants::IsActive).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(Tenants::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Tenants::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tenants_is_active")
                    .table(Tenants::Table)
                    .col(Tenants::IsActive)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. Create domains table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Domains::Table)
                    .if_not_exists()
                    .col(pk_auto(Domains::Id))
                    .col(integer(Domains::TenantId).not_null())
                    .col(string_len(Domains::Hostname, 255).not_null().unique_key())
                    .col(string_len(Domains::Kind, 16).not_null().default("alias"))
                    .col(boolean(Domains::IsPrimary).not_null().default(false))
                    .col(boolean(Domains::IsActive).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(Domains::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Domains::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_domains_tenant_id")
                            .from(Domains::Table, Domains::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_domains_tenant_active")
                    .table(Domains::Table)
                    .col(Domains::TenantId)
                    .col(Domains::IsActive)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Domains::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tenants::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
    Slug,
    Name,
    CompanyName,
    PrimaryColor,
    SecondaryColor,
    ContactEmail,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Domains {
    Table,
    Id,
    TenantId,
    Hostname,
    Kind,
    IsPrimary,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
