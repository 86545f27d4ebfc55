//! Core of the WP-LDP data model.
//!
//! Containers classify resources and carry an RDF type plus a JSON field
//! model; resource field values persist against that model; links to other
//! platform instances found in those values register deduplicated sites.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod model_source;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DeprecatedContainer, LdpSettings};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{Category, CategoryId, CONTAINER_TAXONOMY, SITE_TAXONOMY};
pub use model::container::{Container, ContainerMeta, ModelDocument, CONTAINER_CATALOG};
pub use model::resource::{FieldValue, ResourceId};
pub use model::site::Site;
pub use model_source::{BuiltinModelSource, DirectoryModelSource, ModelSource};
pub use repo::category_repo::{CategoryStore, SqliteCategoryRepository};
pub use repo::option_repo::{CachedOptionStore, OptionStore, SqliteOptionRepository};
pub use repo::resource_repo::{ResourceStore, SqliteResourceRepository};
pub use repo::{RepoError, RepoResult};
pub use service::container_registry::ContainerRegistry;
pub use service::migration::{MigrationEngine, UpgradeReport};
pub use service::permalink::PermalinkResolver;
pub use service::resource_meta::{ResourceMetaStore, SaveOutcome};
pub use service::site_registry::SiteRegistry;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
