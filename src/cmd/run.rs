//! `herald run`: start the notification gateway.
//!
//! Builds the provider registry, applies the config file (if any) through
//! the configuration manager, starts the Axum HTTP server with graceful
//! shutdown, and spawns a background refresh loop that re-applies the
//! file whenever its content changes.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::RunArgs;
use crate::config::manager::ConfigManager;
use crate::config::sources::file_source::FileSource;
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::HeraldError;
use crate::logging;
use crate::provider::registry::Registry;
use crate::provider::Category;
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), HeraldError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let registry = Arc::new(Registry::with_builtin()?);
    let manager = ConfigManager::new(registry, args.admin_key.clone());

    if manager.current().await.admin_key().is_none() {
        tracing::warn!("no admin key set, POST /v1/config accepts any caller");
    }

    let source = match args.config.as_deref() {
        Some(path) => Some(FileSource::for_path(path)?),
        None => FileSource::detect().await?,
    };

    let mut file_version = ConfigVersion::Empty;
    if let Some(ref source) = source {
        let (config, version) = source.load().await?;
        manager
            .apply(config, source.name(), version.clone())
            .await?;
        file_version = version;
    } else {
        tracing::warn!(
            "no config file found, starting with no providers; \
             run 'herald init' or POST /v1/config"
        );
    }

    let state = Arc::new(AppState::new(manager));
    let snapshot = state.config.current().await;

    // Shutdown signal: dropping shutdown_tx closes the channel and stops the refresh loop
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let refresh_handle = source.map(|source| {
        let refresh_state = Arc::clone(&state);
        let poll_interval = args.poll_interval;
        tokio::spawn(async move {
            config_refresh_loop(refresh_state, source, file_version, poll_interval, shutdown_rx)
                .await;
        })
    });

    let router = server::build_router(Arc::clone(&state), args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        email_providers = snapshot.provider_count(Category::Email),
        sms_providers = snapshot.provider_count(Category::Sms),
        config_version = %snapshot.version.short(),
        "herald started"
    );
    drop(snapshot);

    // Wrap the shutdown signal to also stop the config refresh loop immediately
    let graceful_shutdown = async move {
        server::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(graceful_shutdown)
        .await?;

    // Wait for the config refresh task to finish (catches panics)
    if let Some(handle) = refresh_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "config refresh task failed");
        }
    }

    tracing::info!("herald stopped");
    Ok(())
}

/// Poll `source` and re-apply it when the file content changes.
///
/// The last version seen on disk is tracked here rather than read back
/// from the live snapshot, so a document applied through the HTTP API
/// is not overwritten until the file itself changes again.
async fn config_refresh_loop(
    state: Arc<AppState>,
    source: FileSource,
    mut file_version: ConfigVersion,
    interval_secs: u64,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    interval.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                tracing::debug!("config refresh loop shutting down");
                return;
            }
        }

        match source.has_changed(&file_version).await {
            Ok(true) => {
                tracing::info!(path = %source.path().display(), "config change detected, reloading");
                match reload(&state, &source).await {
                    Ok(version) => {
                        file_version = version;
                        state.stats.config_reloads.fetch_add(1, Ordering::Relaxed);
                    }
                    Err((version, e)) => {
                        // Remember the rejected content so it is not retried every tick.
                        if let Some(version) = version {
                            file_version = version;
                        }
                        tracing::error!(error = %e, "config reload failed, keeping current config");
                    }
                }
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "config change check failed");
            }
        }
    }
}

async fn reload(
    state: &AppState,
    source: &FileSource,
) -> Result<ConfigVersion, (Option<ConfigVersion>, HeraldError)> {
    let (config, version) = source.load().await.map_err(|e| (None, e))?;
    state
        .config
        .apply(config, source.name(), version.clone())
        .await
        .map_err(|e| (Some(version.clone()), e))?;
    Ok(version)
}
