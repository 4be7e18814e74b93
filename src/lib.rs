//! Herald is an email and SMS notification gateway.
//!
//! It accepts send requests over HTTP and relays them through one of
//! several interchangeable provider backends, selected by name. The set
//! of enabled providers and their credentials can be replaced at runtime
//! without dropping in-flight requests.
//!
//! # Architecture
//!
//! - [`api`] -- HTTP handlers for `/v1/email`, `/v1/sms`, and `/v1/config`.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Configuration document, validation, file sources, and the
//!   [`ConfigManager`](config::manager::ConfigManager) that publishes
//!   immutable snapshots.
//! - [`dispatch`] -- Provider resolution plus the fallback and retry policy.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- Correlation ids and panic responses.
//! - [`provider`] -- Provider traits, the kind registry, and built-in backends.
//! - [`server`] -- Axum server setup, shared application state, and graceful
//!   shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |
//!
//! JSON config files are always supported, since `POST /v1/config` takes JSON.

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod provider;
pub mod server;
