//! `wpldp` command line entry point.
//!
//! # Responsibility
//! - Open the store, run the version check, and expose registry operations
//!   to shell scripts.
//! - Keep output line-oriented (`key<TAB>value`) for piping.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use wpldp_core::db::open_db;
use wpldp_core::{
    core_version, default_log_level, init_logging, BuiltinModelSource, ContainerRegistry,
    DirectoryModelSource, LdpSettings, MigrationEngine, ModelSource, PermalinkResolver,
    ResourceMetaStore, ResourceStore, SiteRegistry, SqliteCategoryRepository,
    SqliteOptionRepository, SqliteResourceRepository,
};

#[derive(Parser, Debug)]
#[command(name = "wpldp", version, about = "Linked Data Platform container store")]
struct Cli {
    #[arg(long, global = true, default_value = "wpldp.db", help = "SQLite store path")]
    db: PathBuf,
    #[arg(long, global = true, help = "Settings JSON file")]
    settings: Option<PathBuf>,
    #[arg(long, global = true, help = "Write rotating logs to this directory")]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "trace|debug|info|warn|error")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the data-model version check and prints what it did.
    Init,
    /// Upserts the container catalog.
    Bootstrap {
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Sets the "initialize containers" flag for the next bootstrap.
    EnableInit,
    Containers,
    Sites,
    /// Moves a resource into the container with the given slug.
    Assign {
        resource: Uuid,
        container: String,
    },
    /// Saves a JSON object of submitted fields for a resource.
    Save {
        resource: Uuid,
        fields: String,
        #[arg(long, help = "Container slug; defaults to the assigned container")]
        container: Option<String>,
    },
    Permalink {
        resource: Uuid,
        slug: String,
        #[arg(long)]
        home: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        let log_dir = absolute(log_dir)?;
        init_logging(level, &log_dir.to_string_lossy()).map_err(|err| anyhow!(err))?;
    }

    let settings = match &cli.settings {
        Some(path) => LdpSettings::load(path)?,
        None => LdpSettings::default(),
    };
    let conn = open_db(&cli.db).with_context(|| format!("opening {}", cli.db.display()))?;
    let categories = SqliteCategoryRepository::try_new(&conn)?;
    let options = SqliteOptionRepository::try_new(&conn)?;
    let resources = SqliteResourceRepository::try_new(&conn)?;

    let directory_models;
    let models: &dyn ModelSource = match &settings.model_dir {
        Some(dir) => {
            directory_models = DirectoryModelSource::new(dir);
            &directory_models
        }
        None => &BuiltinModelSource,
    };

    info!(
        "event=cli_start module=cli status=ok version={} db={}",
        core_version(),
        cli.db.display()
    );

    let registry = ContainerRegistry::new(&settings, &categories, &options, models);
    let engine = MigrationEngine::new(&settings, &categories, &options, &resources, models);
    let sites = SiteRegistry::new(&categories, &settings.api_path);

    match cli.command {
        Commands::Init => {
            let report = engine.check_for_update()?;
            println!("stored_version\t{}", report.stored_version);
            println!("target_version\t{}", report.target_version);
            println!("applied\t{}", report.applied);
            println!("reinitialized\t{}", report.reinitialized);
            println!("consolidated\t{}", report.consolidated.join(","));
            println!("renamed_field_keys\t{}", report.renamed_field_keys);
            println!(
                "rewritten_container_records\t{}",
                report.rewritten_container_records
            );
            println!("skipped_records\t{}", report.skipped_records);
            println!("purged_entries\t{}", report.purged_entries);
        }
        Commands::Bootstrap { force } => {
            registry.bootstrap(force)?;
            println!("containers\t{}", registry.list_containers()?.len());
        }
        Commands::EnableInit => {
            registry.set_init_flag(true)?;
            println!("container_init\ttrue");
        }
        Commands::Containers => {
            for container in registry.list_containers()? {
                println!(
                    "{}\t{}\t{}\t{}",
                    container.id,
                    container.slug,
                    container.label,
                    container.rdf_type.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Sites => {
            for site in sites.list_sites()? {
                println!("{}\t{}\t{}", site.id, site.name, site.url_prefix);
            }
        }
        Commands::Assign {
            resource,
            container,
        } => {
            let Some(target) = registry.container_by_slug(&container)? else {
                bail!("unknown container: {container}");
            };
            resources.assign_container(resource, target.id)?;
            println!("{resource}\t{}", target.slug);
        }
        Commands::Save {
            resource,
            fields,
            container,
        } => {
            let submitted: BTreeMap<String, Value> =
                serde_json::from_str(&fields).context("fields must be a JSON object")?;
            let store = ResourceMetaStore::new(&settings, &categories, &options, &resources);
            let outcome = match container {
                Some(slug) => {
                    let Some(target) = registry.container_by_slug(&slug)? else {
                        bail!("unknown container: {slug}");
                    };
                    store.save(resource, target.id, &submitted)?
                }
                None => store.save_for_resource(resource, &submitted)?,
            };
            println!("persisted\t{}", outcome.persisted.join(","));
            println!("dropped\t{}", outcome.dropped.join(","));
            println!("malformed\t{}", outcome.malformed.join(","));
        }
        Commands::Permalink {
            resource,
            slug,
            home,
        } => {
            let resolver = PermalinkResolver::new(&resources, &settings.api_path);
            let template = resolver.resource_link_template(&home, &slug);
            println!("{}", resolver.resolve(&template, resource)?);
        }
    }
    Ok(())
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}
