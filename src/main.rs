//! BlitzCache server
//!
//! Serves a shared cache over TCP until SIGINT or SIGTERM.

use anyhow::Context;
use blitzcache::storage::{Cache, CacheConfig, DEFAULT_SHARD_COUNT};
use blitzcache::Server;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// In-memory cache server with timing-wheel expiry.
#[derive(Parser, Debug)]
#[command(name = "blitzcache")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = blitzcache::DEFAULT_ADDR)]
    addr: String,

    /// Number of independently locked shards (0 picks the default).
    #[arg(long, default_value_t = DEFAULT_SHARD_COUNT)]
    shards: usize,

    /// Timing wheel tick, in milliseconds.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Longest TTL the wheel tracks exactly, in seconds. Longer TTLs fire
    /// at the horizon.
    #[arg(long, default_value_t = 3600)]
    horizon_secs: u64,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            shard_count: self.shards,
            tick_duration: Duration::from_millis(self.tick_ms),
            wheel_horizon: Duration::from_secs(self.horizon_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid --log-level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(version = blitzcache::VERSION, "Starting BlitzCache");

    let cache = Arc::new(Cache::with_config(args.cache_config()).context("invalid cache configuration")?);

    let server = Server::bind(args.addr.as_str(), Arc::clone(&cache))
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;

    server.run_until(shutdown_signal()).await;

    cache.close();
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blitzcache::storage::ConfigError;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["blitzcache"]);
        assert_eq!(args.addr, "127.0.0.1:6380");

        let config = args.cache_config();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_custom_args() {
        let args = Args::parse_from([
            "blitzcache",
            "--addr",
            "0.0.0.0:7000",
            "--shards",
            "16",
            "--tick-ms",
            "10",
            "--horizon-secs",
            "60",
        ]);

        let config = args.cache_config();
        assert_eq!(config.shard_count, 16);
        assert_eq!(config.tick_duration, Duration::from_millis(10));
        assert_eq!(config.wheel_horizon, Duration::from_secs(60));
    }

    #[test]
    fn test_oversized_wheel_flags_rejected() {
        let args = Args::parse_from([
            "blitzcache",
            "--tick-ms",
            "1",
            "--horizon-secs",
            "315360000",
        ]);

        assert!(matches!(
            args.cache_config().validate(),
            Err(ConfigError::TooManySlots { .. })
        ));
    }
}
