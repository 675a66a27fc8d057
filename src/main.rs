//! Sitemux CLI - Multi-tenant site host
//!
//! Serves one landing site per tenant, chosen by the request's hostname, and
//! manages the tenants and domains behind it.

mod manifest;
mod scaffold;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sitemux_api::{ApiServer, ApiServerConfig};
use sitemux_db::{NewDomain, NewTenant, ProvisionRequest, TenantStore};
use sitemux_proto::{DomainKind, TenantSlug};
use sitemux_router::{template_roots, ResolutionContext, ResolverConfig, TenantDirectory, TenantResolver};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::manifest::SiteManifest;

/// Sitemux - One deployment, many branded sites
#[derive(Parser, Debug)]
#[command(name = "sitemux")]
#[command(about = "Sitemux - One deployment, many branded sites")]
#[command(version)]
#[command(long_version = concat!(env!("GIT_TAG"), "\nCommit: ", env!("GIT_HASH"), "\nBuilt: ", env!("BUILD_TIME")))]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Database URL (sqlite://... or postgres://...)
    #[arg(
        long,
        global = true,
        env = "SITEMUX_DATABASE_URL",
        default_value = "sqlite://./sitemux.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve tenant sites over HTTP
    #[command(long_about = r#"
Serve tenant sites over HTTP. Each request is matched to a tenant by its
Host header and rendered from that tenant's template root, falling back to
the shared `_default` root.

EXAMPLES:
  # Serve from the database
  sitemux serve --bind 0.0.0.0:8000 --templates ./templates/tenants

  # Serve from a manifest, with a fallback tenant for unknown hosts
  sitemux serve --manifest sites.yml --default-tenant servelec

  # Local development: pick the tenant with ?tenant=<slug>
  sitemux serve --allow-override

ENVIRONMENT VARIABLES:
  SITEMUX_DATABASE_URL    Database URL
  SITEMUX_BIND            Bind address
  SITEMUX_TEMPLATES       Template base directory
  SITEMUX_DEFAULT_TENANT  Tenant served when no hostname matches
  SITEMUX_ALLOW_OVERRIDE  Honour the override query parameter
    "#)]
    Serve {
        /// Address to bind
        #[arg(long, env = "SITEMUX_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,

        /// Directory holding one template root per tenant plus `_default`
        #[arg(long, env = "SITEMUX_TEMPLATES", default_value = "templates/tenants")]
        templates: PathBuf,

        /// Tenant served when no hostname matches
        #[arg(long, env = "SITEMUX_DEFAULT_TENANT")]
        default_tenant: Option<String>,

        /// Query parameter carrying a tenant override
        #[arg(long, default_value = sitemux_router::resolver::DEFAULT_OVERRIDE_PARAM)]
        override_param: String,

        /// Honour the override query parameter (development only)
        #[arg(long, env = "SITEMUX_ALLOW_OVERRIDE")]
        allow_override: bool,

        /// Serve tenants declared in a YAML manifest instead of the database
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Run database migrations
    Migrate,

    /// Manage tenants
    #[command(subcommand)]
    Tenant(TenantCommands),

    /// Manage domains
    #[command(subcommand)]
    Domain(DomainCommands),

    /// Show how a hostname resolves
    Resolve {
        /// Hostname (port allowed)
        host: String,

        /// Tenant override to test
        #[arg(long)]
        tenant: Option<String>,

        /// Tenant used when no hostname matches
        #[arg(long, env = "SITEMUX_DEFAULT_TENANT")]
        default_tenant: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TenantCommands {
    /// Create a tenant and bind its domains
    Create {
        /// Display name
        name: String,

        /// Primary domain (e.g., servelec.cl)
        domain: String,

        /// Explicit slug (derived from the name otherwise)
        #[arg(long)]
        slug: Option<String>,

        /// Additional alias domains
        #[arg(long = "extra-domain")]
        extra_domains: Vec<String>,

        /// Contact email
        #[arg(long)]
        email: Option<String>,

        /// Primary brand color (#rrggbb)
        #[arg(long)]
        color: Option<String>,

        /// Platform domain; also binds `{slug}.{base_domain}`
        #[arg(long, env = "SITEMUX_BASE_DOMAIN", default_value = "localhost")]
        base_domain: String,

        /// Seed the tenant's template root from `_default`
        #[arg(long)]
        copy_templates: bool,

        /// Template base directory
        #[arg(long, env = "SITEMUX_TEMPLATES", default_value = "templates/tenants")]
        templates: PathBuf,
    },

    /// List tenants and their domains
    List {
        /// Hide inactive tenants
        #[arg(long)]
        active_only: bool,
    },

    /// Deactivate a tenant and all of its domains
    Deactivate { slug: String },

    /// Reactivate a tenant (domains stay as they are)
    Activate { slug: String },
}

#[derive(Subcommand, Debug)]
enum DomainCommands {
    /// Bind a hostname to a tenant
    Add {
        slug: String,
        host: String,

        /// primary, alias, subdomain or development (classified otherwise)
        #[arg(long)]
        kind: Option<DomainKind>,

        /// Make this the tenant's primary domain
        #[arg(long)]
        primary: bool,
    },

    /// Stop serving a hostname
    Deactivate { host: String },

    /// Reactivate a hostname
    Activate { host: String },

    /// Make a hostname its tenant's primary domain
    SetPrimary { host: String },
}

/// Setup logging with the specified log level
fn setup_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

async fn open_store(database_url: &str) -> Result<TenantStore> {
    let db = sitemux_db::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database: {}", database_url))?;

    sitemux_db::migrate(&db)
        .await
        .context("Failed to run database migrations")?;

    Ok(TenantStore::new(db))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Serve {
            bind,
            templates,
            default_tenant,
            override_param,
            allow_override,
            manifest,
        } => {
            serve(
                &cli.database_url,
                bind,
                templates,
                default_tenant,
                override_param,
                allow_override,
                manifest,
            )
            .await
        }
        Commands::Migrate => {
            open_store(&cli.database_url).await?;
            println!("Migrations applied");
            Ok(())
        }
        Commands::Tenant(command) => {
            let store = open_store(&cli.database_url).await?;
            handle_tenant_command(store, command).await
        }
        Commands::Domain(command) => {
            let store = open_store(&cli.database_url).await?;
            handle_domain_command(store, command).await
        }
        Commands::Resolve {
            host,
            tenant,
            default_tenant,
        } => {
            let store = open_store(&cli.database_url).await?;
            resolve(store, &host, tenant.as_deref(), default_tenant).await
        }
    }
}

async fn serve(
    database_url: &str,
    bind: SocketAddr,
    templates: PathBuf,
    default_tenant: Option<String>,
    override_param: String,
    allow_override: bool,
    manifest: Option<PathBuf>,
) -> Result<()> {
    info!("Sitemux starting...");

    let (directory, default_tenant) = match manifest {
        Some(path) => {
            info!("Loading sites from manifest {:?}", path);
            let manifest = SiteManifest::load(&path)?;
            let registry: Arc<dyn TenantDirectory> = Arc::new(manifest.to_registry()?);
            let default_tenant =
                default_tenant.or_else(|| manifest.defaults.default_tenant.clone());
            (registry, default_tenant)
        }
        None => {
            let store: Arc<dyn TenantDirectory> = Arc::new(open_store(database_url).await?);
            (store, default_tenant)
        }
    };

    if let Some(slug) = &default_tenant {
        info!("Default tenant: {}", slug);
    }
    if allow_override {
        warn!(
            "⚠️  Tenant override enabled via ?{}=<slug> (development only)",
            override_param
        );
    }
    if !templates.join(sitemux_proto::DEFAULT_ROOT).is_dir() {
        warn!(
            "Shared template root {:?} is missing; pages will fail to render",
            templates.join(sitemux_proto::DEFAULT_ROOT)
        );
    }

    let server = ApiServer::new(
        ApiServerConfig {
            bind_addr: bind,
            template_dir: templates,
        },
        directory,
        ResolverConfig {
            default_slug: default_tenant,
            override_param,
            allow_override,
        },
    );

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tokio::select! {
        _ = &mut ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        result = server.start() => {
            if let Err(e) = result {
                error!("Server error: {:#}", e);
                return Err(e);
            }
        }
    }

    info!("Sitemux stopped");
    Ok(())
}

async fn handle_tenant_command(store: TenantStore, command: TenantCommands) -> Result<()> {
    match command {
        TenantCommands::Create {
            name,
            domain,
            slug,
            extra_domains,
            email,
            color,
            base_domain,
            copy_templates,
            templates,
        } => {
            let store = store.with_base_domain(base_domain);
            let provisioned = store
                .provision_tenant(ProvisionRequest {
                    tenant: NewTenant {
                        name,
                        slug,
                        contact_email: email,
                        primary_color: color,
                        ..Default::default()
                    },
                    primary_domain: Some(domain),
                    extra_domains,
                    with_subdomain: true,
                })
                .await
                .context("Failed to create tenant")?;

            let tenant = &provisioned.tenant;
            println!("✅ Tenant '{}' created (id {})", tenant.slug, tenant.id);
            println!("   Name: {}", tenant.name);
            println!(
                "   Colors: {} / {}",
                tenant.branding.primary_color, tenant.branding.secondary_color
            );
            for domain in &provisioned.domains {
                let marker = if domain.is_primary { " (primary)" } else { "" };
                println!("   Domain: {} [{}]{}", domain.hostname, domain.kind, marker);
            }

            if copy_templates {
                let slug = TenantSlug::parse(&tenant.slug)?;
                let copied = scaffold::copy_default_templates(&templates, &slug)?;
                println!(
                    "   Templates: {} file(s) copied to {:?}",
                    copied,
                    templates.join(slug.as_str())
                );
            }
        }
        TenantCommands::List { active_only } => {
            let tenants = store.list_tenants(active_only).await?;
            if tenants.is_empty() {
                println!("No tenants configured");
                println!("Create one with: sitemux tenant create <name> <domain>");
                return Ok(());
            }

            println!("Tenants ({})", tenants.len());
            println!();
            for summary in &tenants {
                let tenant = &summary.tenant;
                let status = if tenant.is_active { "✅" } else { "⏸️ " };
                println!("  {} {} - {}", status, tenant.slug, tenant.name);
                for domain in &summary.domains {
                    let state = if domain.is_active { "" } else { " (inactive)" };
                    let marker = if domain.is_primary { " *" } else { "" };
                    println!(
                        "      {} [{}]{}{}",
                        domain.hostname, domain.kind, marker, state
                    );
                }
            }
        }
        TenantCommands::Deactivate { slug } => {
            store.deactivate_tenant(&slug).await?;
            println!("Tenant '{}' and its domains deactivated", slug);
        }
        TenantCommands::Activate { slug } => {
            store.activate_tenant(&slug).await?;
            println!("Tenant '{}' activated", slug);
            println!("Domains keep their state; reactivate with: sitemux domain activate <host>");
        }
    }

    Ok(())
}

async fn handle_domain_command(store: TenantStore, command: DomainCommands) -> Result<()> {
    match command {
        DomainCommands::Add {
            slug,
            host,
            kind,
            primary,
        } => {
            let domain = store
                .add_domain(
                    &slug,
                    NewDomain {
                        hostname: host,
                        kind,
                        is_primary: primary,
                    },
                )
                .await?;
            println!(
                "✅ {} bound to '{}' as {}{}",
                domain.hostname,
                slug,
                domain.kind,
                if domain.is_primary { " (primary)" } else { "" }
            );
        }
        DomainCommands::Deactivate { host } => {
            let domain = store.deactivate_domain(&host).await?;
            println!("Domain {} deactivated", domain.hostname);
        }
        DomainCommands::Activate { host } => {
            let domain = store.activate_domain(&host).await?;
            println!("Domain {} activated", domain.hostname);
        }
        DomainCommands::SetPrimary { host } => {
            let domain = store.set_primary_domain(&host).await?;
            println!("Domain {} is now primary", domain.hostname);
        }
    }

    Ok(())
}

async fn resolve(
    store: TenantStore,
    host: &str,
    override_slug: Option<&str>,
    default_tenant: Option<String>,
) -> Result<()> {
    let resolver = TenantResolver::new(
        store,
        ResolverConfig {
            default_slug: default_tenant,
            allow_override: override_slug.is_some(),
            ..ResolverConfig::default()
        },
    );

    let ctx = resolver.resolve(host, override_slug).await?;
    match &ctx {
        ResolutionContext::Resolved { tenant, source } => {
            println!("Host:    {}", host);
            println!("Tenant:  {} ({})", tenant.slug, tenant.name);
            println!("Source:  {}", source);
        }
        ResolutionContext::Unresolved => {
            println!("Host:    {}", host);
            println!("Tenant:  none (no site configured)");
        }
    }

    let roots: Vec<String> = template_roots(&ctx).iter().map(|r| r.to_string()).collect();
    println!("Roots:   {}", roots.join(" -> "));

    Ok(())
}
