//! Journal Client Binary
//!
//! Headless client: authenticates against the journal backend, opens the
//! live notification channel, and logs incoming notifications until
//! interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin journal-client
//! ```
//!
//! # Environment Variables
//!
//! ## Required (unless a persisted session exists)
//! - `JOURNAL_EMAIL`: Account email
//! - `JOURNAL_PASSWORD`: Account password
//!
//! ## Optional
//! - `JOURNAL_API_URL`: REST base URL (default: <http://localhost:5000>)
//! - `JOURNAL_WS_URL`: WebSocket URL (default: derived from the API URL)
//! - `JOURNAL_SESSION_FILE`: Path of the persisted session file
//! - `JOURNAL_REQUEST_TIMEOUT_SECS`: REST timeout (default: 8)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use tokio::signal;

use journal_client::{
    AlertGate, AuthClient, ClientConfig, LogAlerts, NotificationChannel, NotificationFeed,
    RequestGateway, SessionStore, telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    telemetry::init();

    tracing::info!("Starting journal client");

    let config = ClientConfig::from_env()?;
    log_config(&config);

    let session = match &config.session_file {
        Some(path) => SessionStore::load(path.clone()),
        None => SessionStore::new(),
    };

    let gateway = RequestGateway::new(&config, session.clone())?;
    let auth = AuthClient::new(gateway.clone());

    if session.is_authenticated() {
        // Confirm the persisted token still works and mark the backend
        // reachable; an expired token clears the session here.
        match auth.profile().await {
            Ok(user) => tracing::info!(user_id = user.id, "Resumed session"),
            Err(e) => tracing::warn!(error = %e, "Persisted session rejected"),
        }
    }

    if !session.is_authenticated() {
        let email = std::env::var("JOURNAL_EMAIL")
            .map_err(|_| anyhow::anyhow!("JOURNAL_EMAIL is required to log in"))?;
        let password = std::env::var("JOURNAL_PASSWORD")
            .map_err(|_| anyhow::anyhow!("JOURNAL_PASSWORD is required to log in"))?;

        let user = auth.login(&email, &password).await?;
        tracing::info!(user_id = user.id, "Logged in");
    }

    let feed = NotificationFeed::new(gateway.clone());
    let channel = NotificationChannel::new(
        config.channel.clone(),
        session.clone(),
        gateway.reachable_flag(),
    );
    feed.attach(&channel, AlertGate::new(Arc::new(LogAlerts)));
    channel.open();

    tracing::info!("Journal client ready");

    await_shutdown().await;

    channel.close();
    tracing::info!("Journal client stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    tracing::info!(
        api_url = %config.request.base_url,
        ws_url = %config.channel.url,
        timeout_secs = config.request.timeout.as_secs(),
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
