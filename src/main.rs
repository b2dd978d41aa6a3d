use anyhow::{Context, Result};
use document_service::{
    api::{self, AppState},
    auth::AdminAuth,
    clock::{Clock, SystemClock},
    config::Config,
    store::DocumentStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "document_service=info,server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().compact().with_target(false))
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(?config, "configuration loaded");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(
        DocumentStore::open(&config.uploads_dir, config.metadata_path(), clock.clone())
            .await
            .context("Failed to initialize document store")?,
    );

    // A corrupt metadata file must not keep the server down; it only fails
    // the requests that touch it.
    match store.sweep_expired().await {
        Ok(removed) => info!(removed, "startup sweep finished"),
        Err(e) => error!(error = %e, "startup sweep failed"),
    }
    match store.sweep_orphans().await {
        Ok(removed) => info!(removed, "startup orphan sweep finished"),
        Err(e) => error!(error = %e, "startup orphan sweep failed"),
    }

    let auth = Arc::new(
        AdminAuth::new(config.auth_settings(), clock)
            .await
            .context("Failed to initialize admin credentials")?,
    );

    if let Some(period) = config.sweep_interval {
        let sweep_store = store.clone();
        tokio::spawn(async move {
            sweep_service(sweep_store, period).await;
        });
    }

    let app = api::router(Arc::new(AppState {
        store,
        auth,
        max_upload_bytes: config.max_upload_bytes,
    }));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "document service listening");
    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}

async fn sweep_service(store: Arc<DocumentStore>, period: Duration) {
    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately; startup already swept.
    interval.tick().await;

    loop {
        interval.tick().await;

        match store.sweep_expired().await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "periodic sweep removed expired documents"),
            Err(e) => error!(error = %e, "periodic sweep failed"),
        }
    }
}
