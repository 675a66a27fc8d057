//! Request handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Datelike;
use sitemux_router::{template_roots, ResolutionContext};
use std::sync::Arc;
use tracing::{debug, error};

use crate::middleware::CurrentSite;
use crate::models::{ErrorResponse, HealthResponse, SiteInfo};
use crate::templates::TemplateError;
use crate::AppState;

const NO_SITE_CONFIGURED: &str = "No site configured for this host";

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/_health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Describe the site the request resolved to
#[utoipa::path(
    get,
    path = "/_site",
    params(
        ("tenant" = Option<String>, Query, description = "Tenant override (only honoured when enabled)")
    ),
    responses(
        (status = 200, description = "Resolved site", body = SiteInfo),
        (status = 404, description = "No site configured for this host", body = ErrorResponse),
        (status = 503, description = "Tenant directory unavailable", body = ErrorResponse)
    ),
    tag = "site"
)]
pub async fn site_info(
    CurrentSite(ctx): CurrentSite,
) -> Result<Json<SiteInfo>, (StatusCode, Json<ErrorResponse>)> {
    let roots = template_roots(&ctx)
        .iter()
        .map(|r| r.to_string())
        .collect();

    match ctx {
        ResolutionContext::Resolved { tenant, source } => {
            let branding = tenant.branding.clone();
            Ok(Json(SiteInfo {
                primary_color: branding.primary_color.clone(),
                source: source.to_string(),
                template_roots: roots,
                branding,
                tenant,
                current_year: chrono::Utc::now().year(),
            }))
        }
        ResolutionContext::Unresolved => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(NO_SITE_CONFIGURED, "NO_SITE")),
        )),
    }
}

/// Site home page
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Rendered `index.html`", body = String, content_type = "text/html"),
        (status = 404, description = "No site configured for this host"),
        (status = 500, description = "Template missing from every root")
    ),
    tag = "site"
)]
pub async fn index(State(state): State<Arc<AppState>>, CurrentSite(ctx): CurrentSite) -> Response {
    render_page(&state, &ctx, "index.html").await
}

/// Site page rendered from `{page}.html`
#[utoipa::path(
    get,
    path = "/{page}",
    params(
        ("page" = String, Path, description = "Page name")
    ),
    responses(
        (status = 200, description = "Rendered page", body = String, content_type = "text/html"),
        (status = 404, description = "No site configured, or invalid page name"),
        (status = 500, description = "Template missing from every root")
    ),
    tag = "site"
)]
pub async fn page(
    State(state): State<Arc<AppState>>,
    CurrentSite(ctx): CurrentSite,
    Path(page): Path<String>,
) -> Response {
    let name = if page.ends_with(".html") {
        page
    } else {
        format!("{}.html", page)
    };
    render_page(&state, &ctx, &name).await
}

async fn render_page(state: &AppState, ctx: &ResolutionContext, name: &str) -> Response {
    if !ctx.is_resolved() {
        return (StatusCode::NOT_FOUND, Html(NO_SITE_CONFIGURED)).into_response();
    }

    match state.templates.render(ctx, name).await {
        Ok(html) => Html(html).into_response(),
        Err(TemplateError::InvalidName(name)) => {
            debug!("Rejected template name {:?}", name);
            (StatusCode::NOT_FOUND, Html("Not Found")).into_response()
        }
        Err(e @ TemplateError::NotFound { .. }) => {
            // Deployment error: the shared root must provide every page
            error!("{}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Html("Template not found")).into_response()
        }
        Err(e) => {
            error!("Failed to render {}: {}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Html("Internal Server Error")).into_response()
        }
    }
}
