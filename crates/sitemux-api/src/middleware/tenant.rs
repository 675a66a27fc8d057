//! Tenant Resolution Middleware
//!
//! Resolves the tenant for every site request from the Host header (and the
//! override query parameter when enabled), and makes the outcome available to
//! handlers via the [`CurrentSite`] extractor.

use axum::{
    extract::{FromRequestParts, Query, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use sitemux_router::ResolutionContext;
use std::{collections::HashMap, convert::Infallible, sync::Arc};
use tracing::{error, trace};

use crate::{models::ErrorResponse, AppState};

/// Resolution outcome of the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSite(pub ResolutionContext);

impl<S: Send + Sync> FromRequestParts<S> for CurrentSite {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<ResolutionContext>()
            .cloned()
            .unwrap_or(ResolutionContext::Unresolved);
        Ok(CurrentSite(ctx))
    }
}

/// Middleware that resolves the request's tenant
///
/// The Host header wins over the URI authority. An unresolved request is
/// passed through; only directory failures are rejected.
///
/// # Errors
/// Returns 503 Service Unavailable if the tenant directory cannot be queried.
pub async fn resolve_tenant(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
        .unwrap_or_default()
        .to_string();

    let override_slug = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove(&state.resolver.config().override_param));

    trace!("Resolving tenant for host {:?}", host);

    let ctx = state
        .resolver
        .resolve(&host, override_slug.as_deref())
        .await
        .map_err(|e| {
            error!("Tenant directory unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(
                    "Tenant directory unavailable",
                    "DIRECTORY_UNAVAILABLE",
                )),
            )
        })?;

    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::TemplateLoader;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use sitemux_proto::{Branding, Domain, DomainKind, Tenant};
    use sitemux_router::{
        DirectoryError, ResolverConfig, TenantDirectory, TenantRegistry, TenantResolver,
    };
    use tower::ServiceExt; // For oneshot()

    /// Directory whose backend is always down
    struct FailingDirectory;

    #[async_trait]
    impl TenantDirectory for FailingDirectory {
        async fn active_tenant_by_slug(&self, _slug: &str) -> Result<Option<Tenant>, DirectoryError> {
            Err(DirectoryError::Backend("connection refused".to_string()))
        }

        async fn active_tenant_by_hostname(
            &self,
            _hostname: &str,
        ) -> Result<Option<Tenant>, DirectoryError> {
            Err(DirectoryError::Backend("connection refused".to_string()))
        }
    }

    // Test handler that echoes the resolved slug and source
    async fn site_handler(CurrentSite(ctx): CurrentSite) -> String {
        match ctx {
            ResolutionContext::Resolved { tenant, source } => format!("{}:{:?}", tenant.slug, source),
            ResolutionContext::Unresolved => "unresolved".to_string(),
        }
    }

    fn registry() -> Arc<TenantRegistry> {
        let registry = Arc::new(TenantRegistry::new());
        for (id, slug, host) in [(1, "servelec", "servelec.cl"), (2, "acme", "acme.com")] {
            registry
                .register_tenant(Tenant {
                    id,
                    slug: slug.to_string(),
                    name: slug.to_string(),
                    is_active: true,
                    branding: Branding::new(slug),
                })
                .unwrap();
            registry
                .register_domain(Domain {
                    id,
                    tenant_id: id,
                    hostname: host.to_string(),
                    kind: DomainKind::Primary,
                    is_primary: true,
                    is_active: true,
                })
                .unwrap();
        }
        registry
    }

    fn create_test_app(directory: Arc<dyn TenantDirectory>, allow_override: bool) -> Router {
        let state = Arc::new(AppState {
            resolver: TenantResolver::new(
                directory,
                ResolverConfig {
                    allow_override,
                    ..ResolverConfig::default()
                },
            ),
            templates: TemplateLoader::new("/nonexistent"),
        });

        Router::new()
            .route("/", get(site_handler))
            .layer(middleware::from_fn_with_state(state.clone(), resolve_tenant))
            .with_state(state)
    }

    async fn body_string(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_resolves_from_host_header() {
        let app = create_test_app(registry(), false);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Host", "Servelec.CL:8000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "servelec:Domain");
    }

    #[tokio::test]
    async fn test_falls_back_to_uri_authority() {
        let app = create_test_app(registry(), false);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("http://acme.com/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "acme:Domain");
    }

    #[tokio::test]
    async fn test_override_query_parameter() {
        let app = create_test_app(registry(), true);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/?tenant=acme")
                    .header("Host", "servelec.cl")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "acme:Override");
    }

    #[tokio::test]
    async fn test_override_ignored_when_disabled() {
        let app = create_test_app(registry(), false);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/?tenant=acme")
                    .header("Host", "servelec.cl")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "servelec:Domain");
    }

    #[tokio::test]
    async fn test_unknown_host_passes_through_unresolved() {
        let app = create_test_app(registry(), false);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Host", "unknown.cl")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "unresolved");
    }

    #[tokio::test]
    async fn test_directory_failure_is_service_unavailable() {
        let app = create_test_app(Arc::new(FailingDirectory), false);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Host", "servelec.cl")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code.as_deref(), Some("DIRECTORY_UNAVAILABLE"));
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_is_unresolved() {
        let app: Router = Router::new().route("/", get(site_handler));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "unresolved");
    }
}
