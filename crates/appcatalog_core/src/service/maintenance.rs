//! Transactional catalog maintenance.
//!
//! # Responsibility
//! - `clean_up`: drop live catalog rows of stale repositories, optionally
//!   with the repositories themselves.
//! - `finish_temporary`: promote the sync staging tables into the live
//!   tables and reset staging.
//!
//! # Invariants
//! - Each operation commits completely or not at all.
//! - Staging tables are empty after every successful `finish_temporary`.
//! - Releases, installed records and extras are never touched.

use crate::db::CatalogDatabase;
use crate::model::repository::{Repository, RepositoryId};
use crate::repo::category_repo::{CategoryDao, SqliteCategoryDao};
use crate::repo::error::RepoResult;
use crate::repo::in_write_transaction;
use crate::repo::product_repo::{ProductDao, SqliteProductDao};
use crate::repo::repository_repo::{RepositoryDao, SqliteRepositoryDao};
use crate::repo::CatalogTable;
use log::{error, info};
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::time::Instant;

/// Number of repositories handled per delete statement.
pub const CLEAN_UP_WINDOW: usize = 10;

/// One repository to clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CleanUpTarget {
    pub repository_id: RepositoryId,
    /// Also delete the repository row.
    pub remove_repository: bool,
}

impl CleanUpTarget {
    /// Clears catalog rows but keeps the repository.
    pub fn keep(repository_id: RepositoryId) -> Self {
        Self {
            repository_id,
            remove_repository: false,
        }
    }

    /// Clears catalog rows and deletes the repository.
    pub fn remove(repository_id: RepositoryId) -> Self {
        Self {
            repository_id,
            remove_repository: true,
        }
    }
}

/// Rows removed by [`clean_up`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanUpSummary {
    pub products: usize,
    pub categories: usize,
    pub repositories: usize,
}

/// Rows written to the live tables by [`finish_temporary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromotionSummary {
    pub products: usize,
    pub categories: usize,
}

/// Removes live products and categories of every target repository, and
/// the repository rows of targets flagged `remove_repository`.
///
/// Runs as one transaction; an empty target set is a no-op.
pub fn clean_up(
    conn: &Connection,
    targets: impl IntoIterator<Item = CleanUpTarget>,
) -> RepoResult<CleanUpSummary> {
    let targets = targets.into_iter().collect::<BTreeSet<_>>();
    if targets.is_empty() {
        return Ok(CleanUpSummary::default());
    }
    let targets = targets.into_iter().collect::<Vec<_>>();

    let started_at = Instant::now();
    let result = in_write_transaction(conn, |conn| {
        let products = SqliteProductDao::try_new(conn)?;
        let categories = SqliteCategoryDao::try_new(conn)?;
        let repositories = SqliteRepositoryDao::try_new(conn)?;

        let mut summary = CleanUpSummary::default();
        for window in targets.chunks(CLEAN_UP_WINDOW) {
            let ids = window
                .iter()
                .map(|target| target.repository_id)
                .collect::<Vec<_>>();
            summary.products += products.delete_by_repository_ids(&ids)?;
            summary.categories += categories.delete_by_repository_ids(&ids)?;

            let removed = window
                .iter()
                .filter(|target| target.remove_repository)
                .map(|target| target.repository_id)
                .collect::<Vec<_>>();
            summary.repositories += repositories.delete_by_ids(&removed)?;
        }
        Ok(summary)
    });

    match &result {
        Ok(summary) => info!(
            "event=clean_up module=maintenance status=ok targets={} products={} categories={} repositories={} duration_ms={}",
            targets.len(),
            summary.products,
            summary.categories,
            summary.repositories,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=clean_up module=maintenance status=error targets={} duration_ms={} error={}",
            targets.len(),
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

/// Ends a repository sync.
///
/// With `success`, replaces the repository's live products and categories
/// with the staged rows and stores `repository`. In every case the staging
/// tables are emptied. Runs as one transaction.
///
/// # Errors
/// - `success` with an unsaved or invalid `repository` fails before any
///   write.
pub fn finish_temporary(
    conn: &Connection,
    repository: &Repository,
    success: bool,
) -> RepoResult<PromotionSummary> {
    let repository_id = if success {
        repository.validate()?;
        Some(repository.require_id()?)
    } else {
        None
    };

    let started_at = Instant::now();
    let result = in_write_transaction(conn, |conn| {
        let live_products = SqliteProductDao::try_new(conn)?;
        let live_categories = SqliteCategoryDao::try_new(conn)?;
        let temp_products = SqliteProductDao::try_new_temporary(conn)?;
        let temp_categories = SqliteCategoryDao::try_new_temporary(conn)?;

        let mut summary = PromotionSummary::default();
        if let Some(repository_id) = repository_id {
            live_products.delete_by_repository_id(repository_id)?;
            live_categories.delete_by_repository_id(repository_id)?;
            summary.products = live_products.copy_from(CatalogTable::Temporary)?;
            summary.categories = live_categories.copy_from(CatalogTable::Temporary)?;
            SqliteRepositoryDao::try_new(conn)?.put(repository)?;
        }

        temp_products.empty_table()?;
        temp_categories.empty_table()?;
        Ok(summary)
    });

    match &result {
        Ok(summary) => info!(
            "event=finish_temporary module=maintenance status=ok success={} products={} categories={} duration_ms={}",
            success,
            summary.products,
            summary.categories,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=finish_temporary module=maintenance status=error success={} duration_ms={} error={}",
            success,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

impl CatalogDatabase {
    /// Runs [`clean_up`] on the shared connection.
    pub fn clean_up(
        &self,
        targets: impl IntoIterator<Item = CleanUpTarget>,
    ) -> RepoResult<CleanUpSummary> {
        self.with_connection(|conn| clean_up(conn, targets))
    }

    /// Runs [`finish_temporary`] on the shared connection.
    pub fn finish_temporary(
        &self,
        repository: &Repository,
        success: bool,
    ) -> RepoResult<PromotionSummary> {
        self.with_connection(|conn| finish_temporary(conn, repository, success))
    }
}
