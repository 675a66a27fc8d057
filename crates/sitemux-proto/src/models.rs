//! Tenant and domain records

use crate::ProtoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default primary color applied to new tenants
pub const DEFAULT_PRIMARY_COLOR: &str = "#2563eb";

/// Default secondary color applied to new tenants
pub const DEFAULT_SECONDARY_COLOR: &str = "#1e40af";

/// A customer account owning one landing site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Tenant {
    /// Row identifier
    pub id: i32,
    /// Slug as stored. Validate with [`crate::TenantSlug::parse`] before using it in a path.
    pub slug: String,
    /// Display name
    pub name: String,
    /// Inactive tenants are never resolved
    pub is_active: bool,
    /// Presentation settings
    pub branding: Branding,
}

/// Presentation settings, opaque to resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Branding {
    pub company_name: String,
    pub primary_color: String,
    pub secondary_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

impl Branding {
    /// Branding with the default palette
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            secondary_color: DEFAULT_SECONDARY_COLOR.to_string(),
            contact_email: None,
        }
    }

    /// Validate a `#rrggbb` color and return it lowercased
    pub fn validate_color(color: &str) -> Result<String, ProtoError> {
        let hex = color
            .strip_prefix('#')
            .ok_or_else(|| ProtoError::InvalidColor(color.to_string()))?;

        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ProtoError::InvalidColor(color.to_string()));
        }

        Ok(color.to_ascii_lowercase())
    }
}

/// How a hostname is attached to its tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DomainKind {
    /// The tenant's main hostname
    Primary,
    /// Additional customer-owned hostname
    Alias,
    /// `{slug}.{base_domain}` hostname owned by the platform
    Subdomain,
    /// Local or test hostname
    Development,
}

impl DomainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainKind::Primary => "primary",
            DomainKind::Alias => "alias",
            DomainKind::Subdomain => "subdomain",
            DomainKind::Development => "development",
        }
    }

    /// Classify a normalized hostname by its shape
    ///
    /// Returns `None` when the shape says nothing and the caller's choice stands.
    pub fn classify(hostname: &str, base_domain: &str) -> Option<DomainKind> {
        if matches!(hostname, "localhost" | "127.0.0.1" | "::1")
            || hostname.ends_with(".localhost")
            || hostname.ends_with(".test")
        {
            return Some(DomainKind::Development);
        }

        let base = base_domain.trim_start_matches('.');
        if !base.is_empty()
            && hostname.len() > base.len() + 1
            && hostname.ends_with(base)
            && hostname.as_bytes()[hostname.len() - base.len() - 1] == b'.'
        {
            return Some(DomainKind::Subdomain);
        }

        None
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainKind {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(DomainKind::Primary),
            "alias" => Ok(DomainKind::Alias),
            "subdomain" => Ok(DomainKind::Subdomain),
            "development" => Ok(DomainKind::Development),
            _ => Err(ProtoError::UnknownDomainKind(s.to_string())),
        }
    }
}

/// A hostname bound to exactly one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Domain {
    pub id: i32,
    pub tenant_id: i32,
    /// Lowercase hostname without port
    pub hostname: String,
    pub kind: DomainKind,
    pub is_primary: bool,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_kind_parse_and_display() {
        assert_eq!("alias".parse::<DomainKind>().unwrap(), DomainKind::Alias);
        assert_eq!("Primary".parse::<DomainKind>().unwrap(), DomainKind::Primary);
        assert_eq!(DomainKind::Subdomain.to_string(), "subdomain");
        assert!("mirror".parse::<DomainKind>().is_err());
    }

    #[test]
    fn test_classify_subdomain() {
        assert_eq!(
            DomainKind::classify("servelec.tuapp.cl", "tuapp.cl"),
            Some(DomainKind::Subdomain)
        );
        // Base domain itself and lookalikes are not subdomains
        assert_eq!(DomainKind::classify("tuapp.cl", "tuapp.cl"), None);
        assert_eq!(DomainKind::classify("eviltuapp.cl", "tuapp.cl"), None);
    }

    #[test]
    fn test_classify_development() {
        assert_eq!(
            DomainKind::classify("localhost", "tuapp.cl"),
            Some(DomainKind::Development)
        );
        assert_eq!(
            DomainKind::classify("acme.localhost", "localhost"),
            Some(DomainKind::Development)
        );
        assert_eq!(
            DomainKind::classify("acme.test", "tuapp.cl"),
            Some(DomainKind::Development)
        );
        assert_eq!(DomainKind::classify("servelec.cl", "tuapp.cl"), None);
    }

    #[test]
    fn test_validate_color() {
        assert_eq!(Branding::validate_color("#FF0000").unwrap(), "#ff0000");
        assert!(Branding::validate_color("ff0000").is_err());
        assert!(Branding::validate_color("#ff00").is_err());
        assert!(Branding::validate_color("#gg0000").is_err());
    }

    #[test]
    fn test_branding_defaults() {
        let branding = Branding::new("Servelec");
        assert_eq!(branding.primary_color, DEFAULT_PRIMARY_COLOR);
        assert_eq!(branding.secondary_color, DEFAULT_SECONDARY_COLOR);
        assert!(branding.contact_email.is_none());
    }
}
