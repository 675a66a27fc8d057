//! API Middleware
//!
//! Middleware layers and extractors for per-request tenant resolution.

pub mod tenant;

pub use tenant::{resolve_tenant, CurrentSite};
