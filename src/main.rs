mod api;
mod bot;
mod config;
mod error;
mod fetcher;
mod merge;
mod pipeline;
mod publish;
mod render;
mod scheduler;
mod scrape;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::api::{PipelineHealth, RunLatency};
use crate::bot::TelegramBot;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::state::ReportStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let store = ReportStore::new();
    let health = Arc::new(PipelineHealth::new());
    let latency = Arc::new(RunLatency::new());

    let schedule = cfg.schedule();
    let port = cfg.port;
    let bot_token = cfg.telegram_bot_token.clone();
    let telegram_api_url = cfg.telegram_api_url.clone();
    info!(
        live = %cfg.live_url,
        week52 = %cfg.week52_url,
        summary = %cfg.summary_url,
        "sources configured"
    );

    let pipeline = Arc::new(Pipeline::from_config(
        cfg,
        Arc::clone(&store),
        Arc::clone(&health),
        Arc::clone(&latency),
    )?);
    info!(publishers = ?pipeline.publisher_names(), "pipeline ready");

    // First report right away; the server comes up without waiting for it.
    let first = Arc::clone(&pipeline);
    tokio::spawn(async move {
        first.run_once().await;
    });

    let scheduled = Arc::clone(&pipeline);
    tokio::spawn(scheduler::run(schedule, move || {
        let pipeline = Arc::clone(&scheduled);
        async move {
            pipeline.run_once().await;
        }
    }));

    match bot_token {
        Some(token) => {
            let bot = TelegramBot::new(&telegram_api_url, &token, Arc::clone(&pipeline))?;
            tokio::spawn(bot.run());
        }
        None => info!("TELEGRAM_BOT_TOKEN not set, chat bot disabled"),
    }

    let app = router(ApiState { store, health, latency });
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP server listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
