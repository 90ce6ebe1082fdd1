//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eduvid_ai_client::AiClient;
use eduvid_api::{create_router, metrics, ApiConfig, AppState};
use eduvid_pipeline::{JobStore, PipelineConfig, PipelineRunner, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("eduvid=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting eduvid-api");

    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    let pipeline_config = PipelineConfig::from_env();
    info!(
        output_dir = %pipeline_config.output_dir.display(),
        max_concurrent_jobs = pipeline_config.max_concurrent_jobs,
        docker_image = ?pipeline_config.manim_docker_image,
        "Pipeline config"
    );
    tokio::fs::create_dir_all(&pipeline_config.output_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create output directory {}",
                pipeline_config.output_dir.display()
            )
        })?;

    let ai = AiClient::from_env().context("failed to configure AI client")?;
    let services = Services::from_config(&pipeline_config, ai);
    let runner = PipelineRunner::new(Arc::new(JobStore::new()), services, pipeline_config);

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    let app = create_router(AppState::new(config, runner), metrics_handle);

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
