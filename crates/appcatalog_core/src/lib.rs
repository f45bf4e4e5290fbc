//! Local catalog database for an app-store client.
//!
//! Stores repositories, products, releases, categories, installed-app
//! records and per-app extras in one SQLite file, and provides the atomic
//! maintenance steps used by repository sync.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{CatalogDatabase, DatabaseConfig, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::installed::{Extras, Installed};
pub use model::product::{Category, Product};
pub use model::release::Release;
pub use model::repository::{
    default_repositories, normalize_fingerprint, Repository, RepositoryId,
};
pub use model::ModelValidationError;
pub use repo::category_repo::{CategoryDao, SqliteCategoryDao};
pub use repo::error::{RepoError, RepoResult};
pub use repo::extras_repo::{ExtrasDao, SqliteExtrasDao};
pub use repo::installed_repo::{InstalledDao, SqliteInstalledDao};
pub use repo::product_repo::{ProductDao, ProductListQuery, ProductOrder, SqliteProductDao};
pub use repo::release_repo::{ReleaseDao, SqliteReleaseDao};
pub use repo::repository_repo::{RepositoryDao, SqliteRepositoryDao};
pub use repo::CatalogTable;
pub use service::maintenance::{
    clean_up, finish_temporary, CleanUpSummary, CleanUpTarget, PromotionSummary,
    CLEAN_UP_WINDOW,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
