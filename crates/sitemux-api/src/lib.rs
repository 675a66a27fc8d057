pub mod handlers;
pub mod middleware;
pub mod models;
pub mod templates;

use axum::{middleware as axum_middleware, routing::get, Router};
use sitemux_router::{ResolverConfig, TenantDirectory, TenantResolver};
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use templates::{TemplateError, TemplateLoader};

/// Application state shared across handlers
pub struct AppState {
    pub resolver: TenantResolver<Arc<dyn TenantDirectory>>,
    pub templates: TemplateLoader,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sitemux API",
        version = "0.1.0",
        description = "Multi-tenant site host: per-host tenant resolution and template rendering",
        contact(
            name = "Sitemux Team",
            email = "team@sitemux.dev"
        )
    ),
    paths(
        handlers::health_check,
        handlers::site_info,
        handlers::index,
        handlers::page,
    ),
    components(
        schemas(
            models::HealthResponse,
            models::SiteInfo,
            models::ErrorResponse,
            sitemux_proto::Tenant,
            sitemux_proto::Branding,
        )
    ),
    tags(
        (name = "site", description = "Tenant sites served by host"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the server
    pub bind_addr: SocketAddr,
    /// Directory holding one template root per tenant plus `_default`
    pub template_dir: PathBuf,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            template_dir: PathBuf::from("templates/tenants"),
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: ApiServerConfig,
        directory: Arc<dyn TenantDirectory>,
        resolver_config: ResolverConfig,
    ) -> Self {
        let state = Arc::new(AppState {
            resolver: TenantResolver::new(directory, resolver_config),
            templates: TemplateLoader::new(config.template_dir.clone()),
        });

        Self { config, state }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting site server on {}", self.config.bind_addr);
        info!("Templates: {}", self.config.template_dir.display());
        info!(
            "OpenAPI spec: http://{}/_api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/_api/docs", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

/// Build the router for the given state
///
/// Site routes run behind the tenant resolution middleware; health and docs
/// do not touch the directory.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_doc = ApiDoc::openapi();

    let site_router = Router::new()
        .route("/", get(handlers::index))
        .route("/_site", get(handlers::site_info))
        .route("/{page}", get(handlers::page))
        .with_state(state.clone())
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::resolve_tenant,
        ));

    Router::new()
        .route("/_health", get(handlers::health_check))
        .merge(SwaggerUi::new("/_api/docs").url("/_api/openapi.json", api_doc))
        .merge(site_router)
        .layer(TraceLayer::new_for_http())
}
