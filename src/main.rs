mod config;
mod handlers;
mod models;
mod services;
mod web; // HTTP shells: standalone server and serverless function

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;

use config::{Config, Deployment};
use handlers::AnalysisPipeline;
use services::{FoodAnalyzer, GeminiAnalyzer};
use web::{function::create_function_router, server::create_server_router};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the logger reads RUST_LOG
    dotenv().ok();

    // Initialize logger, defaulting to info when RUST_LOG is unset
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("🚀 Starting food snap analyzer...");

    let config = Config::from_env().context("invalid configuration")?;

    if config.analyzer.api_key.is_none() {
        log::warn!("⚠️ GEMINI_API_KEY is not set, analyze requests will fail with API_ERROR");
        log::warn!("💡 Get an API key at https://aistudio.google.com/app/apikey");
    }

    let analyzer: Arc<dyn FoodAnalyzer> = Arc::new(GeminiAnalyzer::new(&config.analyzer));
    log::info!(
        "✅ Gemini analyzer initialized with model: {} (structured output: {})",
        config.analyzer.model,
        config.analyzer.structured_output
    );

    let pipeline = Arc::new(AnalysisPipeline::new(config.pipeline.clone(), analyzer));
    log::info!(
        "✅ Pipeline ready: max upload {} bytes, images bounded to {}px, analyzer timeout {:?}",
        config.pipeline.max_upload_bytes,
        config.pipeline.max_dimension,
        config.pipeline.analyzer_timeout
    );

    let app = match config.deployment {
        Deployment::Server => {
            let static_dir = if config.static_dir.is_dir() {
                Some(config.static_dir.clone())
            } else {
                log::warn!(
                    "⚠️ Static directory {} not found, serving API routes only",
                    config.static_dir.display()
                );
                None
            };
            create_server_router(pipeline, static_dir)
        }
        Deployment::Function => create_function_router(pipeline),
    };

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    log::info!("🌐 {:?} shell listening on http://{}", config.deployment, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    log::info!("🛑 Shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("❌ Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("🛑 Shutting down...");
}
