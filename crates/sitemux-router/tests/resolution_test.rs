//! End-to-end resolution tests against the in-memory registry
//!
//! Covers:
//! 1. Hostname matching across letter case and port suffixes
//! 2. Inactive tenants and domains never resolving
//! 3. Override > domain > default precedence
//! 4. Template roots derived from each outcome
//! 5. Concurrent resolution while a tenant is deactivated

use sitemux_proto::{Branding, Domain, DomainKind, Tenant};
use sitemux_router::{
    template_roots, ResolutionContext, ResolutionSource, ResolverConfig, TemplateRoot,
    TenantRegistry, TenantResolver,
};
use std::sync::Arc;

fn tenant(id: i32, slug: &str, is_active: bool) -> Tenant {
    Tenant {
        id,
        slug: slug.to_string(),
        name: slug.to_string(),
        is_active,
        branding: Branding::new(slug),
    }
}

fn domain(id: i32, tenant_id: i32, hostname: &str, kind: DomainKind) -> Domain {
    Domain {
        id,
        tenant_id,
        hostname: hostname.to_string(),
        kind,
        is_primary: kind == DomainKind::Primary,
        is_active: true,
    }
}

/// servelec.cl -> servelec, www.servelec.cl (alias) -> servelec, acme.com -> acme
fn seeded(servelec_active: bool) -> Arc<TenantRegistry> {
    let registry = Arc::new(TenantRegistry::new());
    registry
        .register_tenant(tenant(1, "servelec", servelec_active))
        .expect("register servelec");
    registry
        .register_tenant(tenant(2, "acme", true))
        .expect("register acme");
    registry
        .register_domain(domain(1, 1, "servelec.cl", DomainKind::Primary))
        .expect("register servelec.cl");
    registry
        .register_domain(domain(2, 1, "www.servelec.cl", DomainKind::Alias))
        .expect("register www.servelec.cl");
    registry
        .register_domain(domain(3, 2, "acme.com", DomainKind::Primary))
        .expect("register acme.com");
    registry
}

fn resolver(
    registry: Arc<TenantRegistry>,
    default_slug: Option<&str>,
    allow_override: bool,
) -> TenantResolver<Arc<TenantRegistry>> {
    TenantResolver::new(
        registry,
        ResolverConfig {
            default_slug: default_slug.map(str::to_string),
            allow_override,
            ..ResolverConfig::default()
        },
    )
}

fn slug_of(ctx: &ResolutionContext) -> Option<&str> {
    ctx.tenant().map(|t| t.slug.as_str())
}

#[tokio::test]
async fn scenario_a_domain_resolves_to_owner() {
    let resolver = resolver(seeded(true), None, false);

    let ctx = resolver.resolve("servelec.cl", None).await.unwrap();
    assert_eq!(slug_of(&ctx), Some("servelec"));
    assert_eq!(ctx.source(), Some(ResolutionSource::Domain));
}

#[tokio::test]
async fn scenario_b_inactive_tenant_is_unresolved() {
    let resolver = resolver(seeded(false), None, false);

    let ctx = resolver.resolve("servelec.cl", None).await.unwrap();
    assert_eq!(ctx, ResolutionContext::Unresolved);
}

#[tokio::test]
async fn scenario_c_default_slug_for_unknown_host() {
    let resolver = resolver(seeded(true), Some("servelec"), false);

    let ctx = resolver.resolve("localhost", None).await.unwrap();
    assert_eq!(slug_of(&ctx), Some("servelec"));
    assert_eq!(ctx.source(), Some(ResolutionSource::Default));
}

#[tokio::test]
async fn scenario_d_override_beats_domain() {
    let resolver = resolver(seeded(true), None, true);

    let ctx = resolver
        .resolve("servelec.cl", Some("acme"))
        .await
        .unwrap();
    assert_eq!(slug_of(&ctx), Some("acme"));
    assert_eq!(ctx.source(), Some(ResolutionSource::Override));
}

#[tokio::test]
async fn test_any_case_and_port_matches() {
    let resolver = resolver(seeded(true), None, false);

    for host in [
        "servelec.cl",
        "SERVELEC.CL",
        "Servelec.Cl:8000",
        "www.servelec.cl:443",
        "WWW.SERVELEC.CL",
    ] {
        let ctx = resolver.resolve(host, None).await.unwrap();
        assert_eq!(slug_of(&ctx), Some("servelec"), "host {host}");
    }
}

#[tokio::test]
async fn test_inactive_tenant_never_resolves() {
    let registry = seeded(false);
    let resolver = resolver(registry, Some("servelec"), true);

    // Not by domain, not by override, not by default
    let by_domain = resolver.resolve("servelec.cl", None).await.unwrap();
    let by_override = resolver
        .resolve("elsewhere.cl", Some("servelec"))
        .await
        .unwrap();
    let by_default = resolver.resolve("localhost", None).await.unwrap();

    assert!(!by_domain.is_resolved());
    assert!(!by_override.is_resolved());
    assert!(!by_default.is_resolved());
}

#[tokio::test]
async fn test_inactive_domain_never_resolves() {
    let registry = seeded(true);
    registry.deactivate_domain("www.servelec.cl").unwrap();
    let resolver = resolver(registry, None, false);

    let alias = resolver.resolve("www.servelec.cl", None).await.unwrap();
    let primary = resolver.resolve("servelec.cl", None).await.unwrap();

    assert!(!alias.is_resolved());
    assert_eq!(slug_of(&primary), Some("servelec"));
}

#[tokio::test]
async fn test_nothing_configured_is_unresolved() {
    let resolver = resolver(seeded(true), None, true);

    for host in ["localhost", "unknown.cl", "127.0.0.1:8000"] {
        let ctx = resolver.resolve(host, None).await.unwrap();
        assert_eq!(ctx, ResolutionContext::Unresolved, "host {host}");
    }
}

#[tokio::test]
async fn test_domain_beats_default() {
    let resolver = resolver(seeded(true), Some("servelec"), false);

    let ctx = resolver.resolve("acme.com", None).await.unwrap();
    assert_eq!(slug_of(&ctx), Some("acme"));
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let resolver = resolver(seeded(true), Some("acme"), true);

    for (host, override_slug) in [
        ("servelec.cl", None),
        ("servelec.cl", Some("acme")),
        ("localhost", None),
        ("", None),
    ] {
        let first = resolver.resolve(host, override_slug).await.unwrap();
        let second = resolver.resolve(host, override_slug).await.unwrap();
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn test_template_roots_follow_resolution() {
    let resolver = resolver(seeded(true), None, false);

    let ctx = resolver.resolve("acme.com", None).await.unwrap();
    let roots: Vec<String> = template_roots(&ctx).iter().map(|r| r.to_string()).collect();
    assert_eq!(roots, vec!["acme".to_string(), "_default".to_string()]);

    let ctx = resolver.resolve("unknown.cl", None).await.unwrap();
    assert_eq!(template_roots(&ctx), vec![TemplateRoot::Default]);
}

#[tokio::test]
async fn test_concurrent_resolution_during_deactivation() {
    let registry = seeded(true);
    let resolver = Arc::new(resolver(registry.clone(), None, false));

    let mut handles = Vec::new();
    for i in 0..32 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move {
            let host = if i % 2 == 0 { "servelec.cl" } else { "acme.com" };
            resolver.resolve(host, None).await.unwrap()
        }));
    }

    registry.deactivate_tenant("servelec").unwrap();

    for handle in handles {
        let ctx = handle.await.unwrap();
        // Either outcome is acceptable for servelec; acme is unaffected
        if let Some(tenant) = ctx.tenant() {
            assert!(tenant.slug == "servelec" || tenant.slug == "acme");
        }
    }

    let after = resolver.resolve("servelec.cl", None).await.unwrap();
    assert!(!after.is_resolved());
    let acme = resolver.resolve("acme.com", None).await.unwrap();
    assert_eq!(slug_of(&acme), Some("acme"));
}
