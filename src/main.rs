use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use models::event::NotificationEvent;
use services::{converter::ConvertApiClient, pipeline::Pipeline, storage};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + one-shot event flag ---
    let (cfg, event_file) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting image-converter with config: {:?}", cfg);

    // --- Process-wide clients, built once ---
    let storage = storage::create_storage(&cfg)
        .await
        .context("initializing object storage")?;
    let converter = ConvertApiClient::new(
        cfg.conversion_url.clone(),
        cfg.api_key.clone(),
        cfg.request_timeout,
        !cfg.inline_results,
    )
    .context("building conversion client")?;
    let pipeline = Pipeline::new(storage.clone(), Arc::new(converter), cfg.destinations());

    // --- Handle one-shot mode ---
    if let Some(path) = event_file {
        return run_once(&pipeline, &path).await;
    }

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(AppState { pipeline, storage });

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run a single notification read from `path` and print the trigger response.
async fn run_once(pipeline: &Pipeline, path: &Path) -> Result<()> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading event file {}", path.display()))?;
    let notification: NotificationEvent = serde_json::from_slice(&raw)
        .with_context(|| format!("parsing event file {}", path.display()))?;

    let report = pipeline.handle_notification(&notification).await;
    tracing::debug!("Pipeline report: {:?}", report);

    println!("{}", serde_json::to_string(&report.trigger_response())?);
    Ok(())
}
