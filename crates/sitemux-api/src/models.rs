//! API response models

use serde::{Deserialize, Serialize};
use sitemux_proto::{Branding, Tenant};
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// The site a request resolved to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SiteInfo {
    /// Resolved tenant
    pub tenant: Tenant,
    /// How the tenant was selected (`override`, `domain` or `default`)
    pub source: String,
    /// Template roots in search order
    pub template_roots: Vec<String>,
    /// Presentation settings
    pub branding: Branding,
    /// Convenience copy of `branding.primary_color`
    pub primary_color: String,
    pub current_year: i32,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: Some(code.to_string()),
        }
    }
}
