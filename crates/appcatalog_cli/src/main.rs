//! Command-line probe over the catalog database.
//!
//! # Responsibility
//! - Open a catalog database file the way the app does.
//! - Print schema and table summaries.
//! - Run the maintenance operations by hand.

use anyhow::{bail, Context, Result};
use appcatalog_core::db::migrations::{current_user_version, latest_version};
use appcatalog_core::{
    core_version, default_log_level, init_logging, CatalogDatabase, CatalogTable, CategoryDao,
    CleanUpTarget, DatabaseConfig, ExtrasDao, InstalledDao, ProductDao, ReleaseDao,
    RepositoryDao, RepositoryId, SqliteCategoryDao, SqliteExtrasDao, SqliteInstalledDao,
    SqliteProductDao, SqliteReleaseDao, SqliteRepositoryDao,
};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "appcatalog")]
#[command(version)]
#[command(about = "Inspect and maintain an app catalog database")]
struct Cli {
    /// Path to the catalog database file
    db_path: PathBuf,

    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Fail instead of rebuilding a database with an unknown schema version
    #[arg(long, global = true)]
    keep_unknown_schema: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, schema version and table counts
    Info,

    /// List repositories
    Repos,

    /// Drop catalog rows of repositories; `ID:remove` also deletes the repository
    CleanUp {
        /// Repository ids, each optionally suffixed with `:remove`
        #[arg(required = true, value_parser = parse_target)]
        targets: Vec<CleanUpTarget>,
    },

    /// Discard staged sync rows for a repository
    AbortSync {
        /// Repository id
        id: RepositoryId,
    },
}

fn parse_target(value: &str) -> Result<CleanUpTarget, String> {
    let (id, remove) = match value.split_once(':') {
        Some((id, "remove")) => (id, true),
        Some((_, suffix)) => return Err(format!("unknown suffix `{suffix}`, expected `remove`")),
        None => (value, false),
    };
    let id = id
        .trim()
        .parse::<RepositoryId>()
        .map_err(|err| format!("invalid repository id `{id}`: {err}"))?;
    Ok(if remove {
        CleanUpTarget::remove(id)
    } else {
        CleanUpTarget::keep(id)
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    let mut config = DatabaseConfig::at_path(&cli.db_path);
    config.destructive_fallback = !cli.keep_unknown_schema;
    let database = CatalogDatabase::open(&config)
        .with_context(|| format!("failed to open `{}`", cli.db_path.display()))?;

    match cli.command {
        Commands::Info => print_info(&database),
        Commands::Repos => print_repositories(&database),
        Commands::CleanUp { targets } => {
            let summary = database.clean_up(targets)?;
            println!(
                "removed products={} categories={} repositories={}",
                summary.products, summary.categories, summary.repositories
            );
            Ok(())
        }
        Commands::AbortSync { id } => {
            let repository = database
                .with_connection(|conn| SqliteRepositoryDao::try_new(conn)?.get(id))?;
            let Some(repository) = repository else {
                bail!("repository {id} not found");
            };
            database.finish_temporary(&repository, false)?;
            info!("event=abort_sync module=cli status=ok");
            println!("staging tables cleared");
            Ok(())
        }
    }
}

fn print_info(database: &CatalogDatabase) -> Result<()> {
    database.with_connection(|conn| {
        println!("core_version={}", core_version());
        println!(
            "schema_version={} latest={}",
            current_user_version(conn)?,
            latest_version()
        );
        println!(
            "repository={}",
            SqliteRepositoryDao::try_new(conn)?.count()?
        );
        println!("product={}", SqliteProductDao::try_new(conn)?.count()?);
        println!(
            "product_temp={}",
            SqliteProductDao::try_new_for(conn, CatalogTable::Temporary)?.count()?
        );
        println!("category={}", SqliteCategoryDao::try_new(conn)?.count()?);
        println!(
            "category_temp={}",
            SqliteCategoryDao::try_new_for(conn, CatalogTable::Temporary)?.count()?
        );
        println!("release={}", SqliteReleaseDao::try_new(conn)?.count()?);
        println!(
            "installed={}",
            SqliteInstalledDao::try_new(conn)?.all()?.len()
        );
        println!("extras={}", SqliteExtrasDao::try_new(conn)?.all()?.len());
        Ok(())
    })
}

fn print_repositories(database: &CatalogDatabase) -> Result<()> {
    let repositories =
        database.with_connection(|conn| SqliteRepositoryDao::try_new(conn)?.all())?;
    for repository in repositories {
        println!(
            "{}\t{}\t{}",
            repository.id.unwrap_or_default(),
            if repository.enabled { "enabled" } else { "disabled" },
            repository.name
        );
    }
    Ok(())
}
