mod collect;
mod query;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tagpulse")]
#[command(about = "tagpulse command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one harvest cycle over the campaign platforms
    Collect {
        /// Restrict the cycle to a single platform (instagram or tiktok)
        #[arg(long)]
        platform: Option<String>,

        /// Print the harvest plan without calling the scraping service
        #[arg(long)]
        dry_run: bool,
    },
    /// Print recent ledger entries
    Runs {
        /// Maximum number of entries to print
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show the campaign and the store at a glance
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = tagpulse_core::load_app_config()?;

    let pool_config = tagpulse_db::PoolConfig::from_app_config(&config);
    let pool = tagpulse_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = tagpulse_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }

    match cli.command {
        Commands::Collect { platform, dry_run } => {
            collect::run_collect(&pool, &config, platform.as_deref(), dry_run).await
        }
        Commands::Runs { limit } => query::run_runs(&pool, limit).await,
        Commands::Status => query::run_status(&pool, &config).await,
    }
}
