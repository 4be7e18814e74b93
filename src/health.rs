//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version and commit, uptime, active config source metadata, enabled provider
//! counts, and cumulative send statistics.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::provider::Category;
use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub commit: String,
    pub uptime_seconds: u64,
    pub config: ConfigHealth,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub version: String,
    pub loaded_ago_seconds: u64,
    pub email_providers: usize,
    pub sms_providers: usize,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub messages_sent: u64,
    pub messages_failed: u64,
    pub config_reloads: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.config.current().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("HERALD_GIT_SHORT").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        config: ConfigHealth {
            source: snapshot.source_name.clone(),
            version: snapshot.version.short().to_string(),
            loaded_ago_seconds: snapshot.loaded_at.elapsed().as_secs(),
            email_providers: snapshot.provider_count(Category::Email),
            sms_providers: snapshot.provider_count(Category::Sms),
        },
        stats: StatsResponse {
            messages_sent: state.stats.sent.load(Ordering::Relaxed),
            messages_failed: state.stats.failed.load(Ordering::Relaxed),
            config_reloads: state.stats.config_reloads.load(Ordering::Relaxed),
        },
    })
}
