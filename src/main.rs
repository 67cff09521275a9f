//! tarpit — request-capture server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                CAPTURE SERVER                 │
//!                      │                                               │
//!   Client bytes       │  ┌─────────┐   ┌─────────┐   ┌────────────┐  │
//!   ──────────────────►│  │   net   │──►│  frame  │──►│   parser   │  │
//!                      │  │listener │   │ reader  │   └─────┬──────┘  │
//!                      │  └─────────┘   └─────────┘         │         │
//!                      │                                    ▼         │
//!                      │  ┌──────────┐   ┌─────────┐  ┌────────────┐  │
//!   Fixed response     │  │ response │◄──│ storage │◄─│  sequence  │  │
//!   ◄──────────────────│  │  (200)   │   │ writer  │  │ allocator  │  │
//!                      │  └──────────┘   └─────────┘  └────────────┘  │
//!                      │                                               │
//!                      │  config · lifecycle · tracing                 │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tarpit::capture::FileSequence;
use tarpit::config::{self, ServerConfig};
use tarpit::lifecycle::{self, Shutdown};
use tarpit::net::Listener;
use tarpit::CaptureServer;

#[derive(Parser)]
#[command(name = "tarpit")]
#[command(about = "Record every inbound HTTP request, answer with nothing useful", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "tarpit.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tarpit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::info!(config_file = %cli.config.display(), "No config file, using defaults");
        ServerConfig::default()
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        db_root = %config.capture.db_root.display(),
        idle_frame_timeout_ms = config.capture.idle_frame_timeout_ms,
        "Configuration loaded"
    );

    let allocator = FileSequence::new(config.capture.counter_path());
    if let Some(baseline) = config.capture.sequence_baseline {
        allocator.reset(baseline)?;
        tracing::info!(baseline, "Sequence counter reset");
    }

    // Bind failure is the only fatal error in the system.
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(lifecycle::watch_interrupt(shutdown));

    let server = CaptureServer::new(&config, Arc::new(allocator));
    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
