//! httpcast-server - standalone headless server exposing a sound server's
//! sinks and sources as browser-playable HTTP audio streams.

mod config;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use httpcast_core::core::{AudioCore, SinkInfo, SourceInfo};
use httpcast_core::format::{ChannelMap, SampleFormat, SampleSpec};
use httpcast_core::protocol::HttpProtocol;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::ServerConfig;

/// httpcast-server - headless HTTP audio streaming server.
#[derive(Parser, Debug)]
#[command(name = "httpcast-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "HTTPCAST_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "HTTPCAST_BIND_PORT")]
    port: Option<u16>,

    /// Bind address (overrides config file).
    #[arg(short = 'a', long, env = "HTTPCAST_BIND_ADDRESS")]
    bind_address: Option<std::net::IpAddr>,

    /// Maximum simultaneous connections (overrides config file).
    #[arg(short = 'm', long, env = "HTTPCAST_MAX_CONNECTIONS")]
    max_connections: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("httpcast-server v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(addr) = args.bind_address {
        config.bind_address = addr;
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }

    log::info!(
        "Configuration: bind={}:{}, max_connections={}",
        config.bind_address,
        config.bind_port,
        config.max_connections
    );

    let core = Arc::new(demo_core());
    let pid = process::id();
    let server_token = format!("{}/{}", httpcast_core::protocol_constants::APP_NAME, env!("CARGO_PKG_VERSION"));
    let protocol = HttpProtocol::get(core, pid, server_token, config.max_connections);

    let listener = TcpListener::bind((config.bind_address, config.bind_port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.bind_address, config.bind_port))?;
    log::info!("Listening on {}", listener.local_addr()?);

    let accept_loop = {
        let protocol = protocol.add_ref();
        async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        protocol.connect(stream, peer.to_string(), "httpcast-server".to_string());
                    }
                    Err(e) => {
                        log::error!("accept(): {e}");
                    }
                }
            }
        }
    };

    tokio::select! {
        _ = accept_loop => {},
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, cleaning up...");
        }
    }

    protocol.disconnect("httpcast-server");
    protocol.unref();

    log::info!("Shutdown complete");
    Ok(())
}

/// A small in-memory device set standing in for a real sound server's
/// sinks and sources, enough to demo `/listen` and the streaming endpoint.
fn demo_core() -> AudioCore {
    let core = AudioCore::new(
        user_name(),
        hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string()),
        machine_id(),
        format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
    );

    core.add_sink(SinkInfo {
        name: "output".into(),
        description: "Built-in Audio Analog Stereo".into(),
        sample_spec: SampleSpec { format: SampleFormat::S16LE, rate: 44100, channels: 2 },
        channel_map: ChannelMap::default_for(2),
        monitor_source_name: "output.monitor".into(),
    });
    core.add_source(SourceInfo {
        name: "output.monitor".into(),
        description: "Monitor of Built-in Audio Analog Stereo".into(),
        sample_spec: SampleSpec { format: SampleFormat::S16LE, rate: 44100, channels: 2 },
        channel_map: ChannelMap::default_for(2),
        monitor_of: Some("output".into()),
        suspended: false,
    });
    core.add_source(SourceInfo {
        name: "input".into(),
        description: "Built-in Audio Analog Stereo".into(),
        sample_spec: SampleSpec { format: SampleFormat::S16LE, rate: 44100, channels: 1 },
        channel_map: ChannelMap::default_for(1),
        monitor_of: None,
        suspended: false,
    });

    core
}

/// No portable stdlib accessor exists for the invoking user's login name; the
/// `USER`/`USERNAME` environment variables are what a real login shell sets,
/// and the fallback used when a native username lookup isn't available.
fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn machine_id() -> String {
    std::fs::read_to_string("/etc/machine-id")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
