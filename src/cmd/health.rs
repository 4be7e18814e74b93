//! `herald health`: query `/health` on a running gateway.
//!
//! Prints a short status summary, or the raw JSON with `--json`. A
//! gateway that has never applied a configuration is reported as healthy
//! but flagged, since every send would answer 501.

use std::fmt::Write as _;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::cli::HealthArgs;
use crate::error::HeraldError;
use crate::health::HealthResponse;

pub async fn execute(args: HealthArgs) -> Result<(), HeraldError> {
    let body = fetch(&args.url, Duration::from_secs(args.timeout)).await?;

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    match serde_json::from_slice::<HealthResponse>(&body) {
        Ok(health) => print!("{}", render(&args.url, &health)),
        Err(e) => {
            eprintln!("Failed to parse health response: {e}");
            println!("{}", String::from_utf8_lossy(&body));
        }
    }
    Ok(())
}

async fn fetch(base: &str, timeout: Duration) -> Result<Bytes, HeraldError> {
    let uri: hyper::Uri = format!("{}/health", base.trim_end_matches('/'))
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| HeraldError::UriParse {
            source: Box::new(e),
        })?;

    let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
    let req = hyper::Request::get(uri)
        .body(Full::new(Bytes::new()))
        .map_err(|e| HeraldError::HttpRequest {
            source: Box::new(e),
        })?;

    let response = tokio::time::timeout(timeout, client.request(req))
        .await
        .map_err(|_| HeraldError::HttpRequest {
            source: format!("no response within {}s", timeout.as_secs()).into(),
        })?
        .map_err(|e| HeraldError::HttpRequest {
            source: Box::new(e),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HeraldError::HealthCheckFailed(status));
    }

    let collected = response
        .into_body()
        .collect()
        .await
        .map_err(|e| HeraldError::HttpRequest {
            source: Box::new(e),
        })?;
    Ok(collected.to_bytes())
}

fn render(url: &str, health: &HealthResponse) -> String {
    let config = &health.config;
    let stats = &health.stats;
    let mut out = String::new();

    let _ = writeln!(out, "\u{2713} herald {} is {} ({url})", health.version, health.status);
    let _ = writeln!(out, "  commit:     {}", health.commit);
    let _ = writeln!(out, "  uptime:     {}", format_uptime(health.uptime_seconds));
    let _ = writeln!(
        out,
        "  config:     {} from {}, applied {} ago",
        config.version,
        config.source,
        format_uptime(config.loaded_ago_seconds)
    );
    let _ = writeln!(
        out,
        "  providers:  {} email, {} sms",
        config.email_providers, config.sms_providers
    );
    let _ = writeln!(
        out,
        "  messages:   {} sent, {} failed ({} config reloads)",
        stats.messages_sent, stats.messages_failed, stats.config_reloads
    );
    if config.email_providers + config.sms_providers == 0 {
        let _ = writeln!(out, "  ! no providers enabled, sends will return 501");
    }
    out
}

fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
