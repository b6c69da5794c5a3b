//! Warden risk-gated trading executor - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Warden risk-gated trading executor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via WARDEN_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    warden_telemetry::init_logging()?;

    info!("Starting warden v{}", env!("CARGO_PKG_VERSION"));

    let config = warden_bot::AppConfig::load(args.config)?;
    info!(
        state_path = %config.emergency.state_path,
        "Configuration loaded"
    );

    let app = warden_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
