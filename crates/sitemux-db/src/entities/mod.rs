//! Database entities

pub mod domain;
pub mod tenant;

pub use domain::Entity as Domain;
pub use tenant::Entity as Tenant;

pub mod prelude {
    pub use super::domain::Entity as Domain;
    pub use super::tenant::Entity as Tenant;
}
