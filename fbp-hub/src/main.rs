// FBP Hub entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config, copying defaults on first run
// 3. Open database
// 4. Hand off to the app loop (league data, draft poller, OAuth proxy)

use fbp_hub::app;
use fbp_hub::config;
use fbp_hub::db;

use anyhow::Context;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("FBP Hub starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, season {}, {} teams",
        config.league.name,
        config.league.season,
        config.league.teams.len()
    );

    // 3. Open database
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Run until Ctrl+C
    app::run(config, db).await?;

    info!("FBP Hub shut down cleanly");
    Ok(())
}

/// Initialize tracing to write to logs/fbp-hub.log.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("fbp-hub.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fbp_hub=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    Ok(())
}
