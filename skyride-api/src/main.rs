use anyhow::Context;
use skyride_api::{app, auth::JwtIdentityResolver, AppState};
use skyride_core::{Notifier, SystemClock};
use skyride_store::app_config::{Config, NotificationSinkKind};
use skyride_store::{DbClient, FileNotifier, LogNotifier, NotificationQueue, Repositories};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyride_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting SkyRide API on port {}", config.server.port);

    // Store
    let repositories = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, &config.database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Repositories::postgres(&db)
        }
        None => {
            tracing::warn!("No database.url configured, using the in-memory store");
            Repositories::in_memory()
        }
    };

    // Notifications
    let notifier: Arc<dyn Notifier> = match config.notifications.sink {
        NotificationSinkKind::Log => Arc::new(LogNotifier),
        NotificationSinkKind::File => {
            Arc::new(FileNotifier::new(config.notifications.outbox_dir.clone()))
        }
    };
    let (queue, _dispatcher) = NotificationQueue::start(notifier);

    let app_state = AppState::new(
        repositories,
        Arc::new(queue),
        JwtIdentityResolver::new(&config.auth.jwt_secret),
        Arc::new(SystemClock),
        config.rides,
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
