// src/main.rs

use std::sync::Arc;

use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use weaver_gateway::config::CONFIG;
use weaver_gateway::provider::ProviderSet;
use weaver_gateway::server::{self, AppState};
use weaver_gateway::trace::TraceBuffer;

/// AI chat orchestration gateway for the Tale Weaver studio.
#[derive(Parser, Debug)]
#[command(name = "weaver-gateway", version)]
struct Args {
    /// Bind host (defaults to WEAVER_HOST or 0.0.0.0)
    #[arg(long, env = "WEAVER_HOST")]
    host: Option<String>,

    /// Bind port (defaults to WEAVER_PORT or 4101)
    #[arg(long, env = "WEAVER_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads the environment
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing
    let level = CONFIG.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Weaver Gateway v{}", server::API_VERSION);

    let providers = ProviderSet::from_env();
    if providers.is_empty() {
        info!("No provider credentials found; /v1/chat/stream serves demo streams");
    } else {
        info!("Providers configured: {}", providers.configured_names().join(", "));
    }

    let trace = Arc::new(TraceBuffer::new(CONFIG.trace_capacity));
    let state = AppState::new(providers, trace);

    let host = args.host.unwrap_or_else(|| CONFIG.host.clone());
    let port = args.port.unwrap_or(CONFIG.port);
    server::run(state, &format!("{host}:{port}")).await
}
