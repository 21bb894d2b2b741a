use anyhow::Context;
use clap::{Parser, Subcommand};
use docmigrate::{read_config, JsonFileStore, Migrate, MigrateConfig, MigrationRegistry};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE: &str = "docmigrate.json";

/// Docmigrate - inspect and stamp the version history of a document store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON document store file
    #[arg(short, long, env = "DOCMIGRATE_STORE", default_value = DEFAULT_STORE)]
    store: PathBuf,

    /// Optional JSON configuration file
    #[arg(short, long, env = "DOCMIGRATE_CONFIG")]
    config: Option<PathBuf>,

    /// Collection holding version records (overrides the config file)
    #[arg(long, env = "DOCMIGRATE_COLLECTION")]
    collection: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current version and its description
    Version,
    /// Record a version without running any migration
    Force {
        version: u64,
        #[arg(default_value = "")]
        description: String,
    },
    /// Print every version record in the order it was appended
    History,
}

async fn load_config(args: &Args) -> anyhow::Result<MigrateConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)
            .await
            .with_context(|| format!("failed to read config {}", path.display()))?
            .unwrap_or_default(),
        None => MigrateConfig::default(),
    };

    if let Some(collection) = &args.collection {
        config.migrations_collection = collection.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args).await?;

    info!(
        store = %args.store.display(),
        collection = %config.migrations_collection,
        "Opening document store"
    );

    let store = JsonFileStore::new(&args.store);
    let migrate = Migrate::new(store, MigrationRegistry::new()).with_config(&config)?;

    match args.command {
        Command::Version => {
            let (version, description) = migrate.version().await?;
            if description.is_empty() {
                println!("{}", version);
            } else {
                println!("{} {}", version, description);
            }
        }
        Command::Force {
            version,
            description,
        } => {
            migrate.set_version(version, &description).await?;
            info!(version, "Version forced");
        }
        Command::History => {
            for record in migrate.history().await? {
                println!(
                    "{}\t{}\t{}",
                    record.timestamp.to_rfc3339(),
                    record.version,
                    record.description
                );
            }
        }
    }

    Ok(())
}
