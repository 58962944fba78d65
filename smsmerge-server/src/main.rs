// smsmerge Server - HTTP front end for the aggregation engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # smsmerge Server
//!
//! Accepts SMS requests over HTTP, merges them per recipient and originator,
//! and delivers them through MessageBird at a fixed rate.
//!
//! ## Usage
//!
//! ```bash
//! # Token from the environment
//! MESSAGEBIRD_API_TOKEN=live_xxx smsmerge-server
//!
//! # Custom port, two calls per second, leftovers re-signalled
//! smsmerge-server --api-token live_xxx --port 9000 --period-ms 500 --requeue-remainder
//! ```

mod error;
mod metrics;
mod server;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use smsmerge::{Engine, EngineConfig};
use smsmerge_gateway::{GatewayConfig, MessageBirdClient, DEFAULT_BASE_URL};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use server::{build_app, AppState};

/// Time allowed for in-flight requests after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// smsmerge HTTP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the HTTP server
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Maximum number of groups waiting for their first drain
    #[arg(short, long, default_value = "100")]
    limit: usize,

    /// Milliseconds between gateway calls
    #[arg(long, default_value = "1000")]
    period_ms: u64,

    /// MessageBird API token
    #[arg(long, env = "MESSAGEBIRD_API_TOKEN", hide_env_values = true, default_value = "")]
    api_token: String,

    /// MessageBird API root
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    gateway_url: String,

    /// Re-signal groups that still hold messages after a drain
    #[arg(long)]
    requeue_remainder: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            queue_capacity: self.limit,
            drain_period: Duration::from_millis(self.period_ms),
            ..Default::default()
        }
        .requeue_remainder(self.requeue_remainder)
    }

    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::with_access_key(self.api_token.clone()).base_url(self.gateway_url.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("smsmerge server v{}", env!("CARGO_PKG_VERSION"));

    let client =
        MessageBirdClient::new(args.gateway_config()).context("invalid gateway configuration")?;
    let engine =
        Engine::start(args.engine_config(), Arc::new(client)).context("failed to start engine")?;

    let app = build_app(AppState::new(engine.handle()));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening to requests on http://{}", addr);

    let stop = Arc::new(Notify::new());
    let serve = axum::serve(listener, app)
        .with_graceful_shutdown({
            let stop = Arc::clone(&stop);
            async move { stop.notified().await }
        })
        .into_future();
    tokio::pin!(serve);

    let handle = engine.handle();
    tokio::select! {
        res = &mut serve => res.context("server error")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("Closing server...");
            stop.notify_one();
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut serve).await {
                Ok(res) => res.context("server error")?,
                Err(_) => warn!("In-flight requests still running after {:?}", SHUTDOWN_GRACE),
            }
        }
        _ = handle.closed() => {
            error!("Engine stopped, closing server...");
            stop.notify_one();
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut serve).await.is_err() {
                warn!("In-flight requests still running after {:?}", SHUTDOWN_GRACE);
            }
        }
    }

    let snapshot = engine.shutdown().await.context("engine stopped with an error")?;
    info!("\n{}", snapshot.report());

    Ok(())
}
