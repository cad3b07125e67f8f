use std::time::Duration;

use recruiting_bots::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    routes,
    services::telegram_service::{register_webhooks, telegram_clients, BotRegistry},
    utils::{logging::init_tracing, time},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;

const UPLOAD_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    init_config()?;
    let config = get_config()?;

    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    info!("Database migrations applied");

    let clients = telegram_clients(config)?;
    if let Some(webapp_url) = &config.webapp_url {
        info!("Checking Telegram webhook status...");
        register_webhooks(
            &clients,
            webapp_url,
            config.telegram_webhook_secret.as_deref(),
        )
        .await;
    }

    let app_state = AppState::new(pool, config, BotRegistry::from_clients(clients))?;
    app_state.data_dirs.ensure_layout().await?;
    info!(root = %app_state.data_dirs.root().display(), "User data directories ready");

    {
        let uploads = app_state.admin_service.uploads().clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(UPLOAD_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                uploads.sweep_expired(time::now());
            }
        });
    }

    let app = routes::router(app_state);
    let listener = TcpListener::bind(&config.server_address).await?;
    info!("Server listening on {}", config.server_address);
    axum::serve(listener, app).await?;

    Ok(())
}
