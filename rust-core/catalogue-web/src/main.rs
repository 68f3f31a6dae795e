//! `catalogue-web` executable

use anyhow::Context;
use catalogue_core::{
    DatabasePool, LoggingMiddleware, NoCacheMiddleware, QueryExecutor, Server, TimingMiddleware,
};
use catalogue_web::{register_pages, AppConfig, AppState, Cli, CommonData, Templates};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "catalogue_core=info,catalogue_web=info";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse_args();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env()?;
    cli.apply(&mut config);

    let max_connections = Some(config.database.max_connections);
    let pool = DatabasePool::connect(&config.database.url, max_connections)
        .await
        .context("connecting to the database")?;

    let templates = Templates::from_dir(&config.site.views_dir)?;
    let common = if config.site.reload_common_data {
        CommonData::live(&config.site.common_data)
    } else {
        CommonData::cached(&config.site.common_data).await?
    };

    let executor: Arc<dyn QueryExecutor> = Arc::new(pool.clone());
    let state = AppState::new(executor, templates, common);

    let mut server = Server::with_config(config.server_config()?);
    server.add_middleware(LoggingMiddleware::new());
    server.add_middleware(TimingMiddleware::new());
    server.add_middleware(NoCacheMiddleware::new());
    server.serve_static(&config.site.static_dir);
    register_pages(&mut server, &state)?;

    let base = format!("http://{}", server.config().address);
    for page in catalogue_web::PAGES {
        info!("{}{}", base, page.path);
    }

    server.serve().await?;

    pool.close().await;
    info!("Database pool closed");
    Ok(())
}
