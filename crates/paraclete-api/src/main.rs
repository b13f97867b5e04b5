//! Paraclete REST API entry point.
//!
//! Binary name: `paraclete`
//!
//! Parses CLI arguments, initializes the database and services, then
//! starts the HTTP server.

mod http;
mod state;

use clap::{Parser, Subcommand};

use state::AppState;

#[derive(Parser)]
#[command(name = "paraclete", about = "Paraclete AI advisory backend", version)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Export spans via OpenTelemetry (stdout exporter)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind, overriding config.toml
        #[arg(long)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity; RUST_LOG still wins when set.
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug,paraclete=debug",
        _ => "trace",
    };
    paraclete_observe::tracing_setup::init_tracing(cli.otel, filter)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = match cli.command {
        Commands::Serve { addr } => serve(addr).await,
    };

    paraclete_observe::tracing_setup::shutdown_tracing();
    result
}

async fn serve(addr_override: Option<String>) -> anyhow::Result<()> {
    let state = AppState::init().await?;
    let addr = addr_override.unwrap_or_else(|| state.config.bind_addr.clone());

    let router = http::router::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Paraclete API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install ctrl-c handler: {e}");
        return;
    }
    tracing::info!("shutdown signal received");
}
