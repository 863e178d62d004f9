use anyhow::Context;
use clap::Parser;
use kuizzz::auth::bootstrap_admin;
use kuizzz::db::{self, seed::seed_sample_data};
use kuizzz::server::app::run_server;
use kuizzz::settings::Settings;
use kuizzz::telemetry::init_tracing;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(default_value = "serve")]
    runner: Runner,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Runner {
    /// Migrate, seed and serve the HTTP API
    Serve,
    /// Only apply database migrations
    Migrate,
    /// Migrate and insert sample data
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let pool = db::establish_connection(&settings.database.path)
        .await
        .with_context(|| format!("Cannot open database {}", settings.database.path))?;

    tracing::info!("Running db migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    match cli.runner {
        Runner::Migrate => {}
        Runner::Seed => {
            seed_sample_data(&pool).await?;
        }
        Runner::Serve => {
            if settings.seed.sample_data {
                seed_sample_data(&pool).await?;
            }
            bootstrap_admin(&pool, &settings.auth).await?;
            let expired = db::queries::sessions::delete_expired_sessions(&pool).await?;
            if expired > 0 {
                tracing::info!(expired, "Removed expired sessions");
            }
            run_server(pool, settings).await?;
        }
    };
    Ok(())
}
