//! scalar-bridge: Matrix OpenID to scalar token bridge
//!
//! Lightweight HTTP/1 server built on hyper. Each connection is served on its
//! own task; configuration and the signing key are shared read-only.

use anyhow::Context;
use clap::Parser;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use scalar_bridge_core::config::{Config, SigningKey, DEFAULT_STICKER_URL};

mod platform;
mod routes;

use platform::{ProcessEnv, ReqwestHttpClient};
use routes::AppState;

#[derive(Parser, Debug)]
#[command(name = "scalar-bridge", version, about = "Exchange Matrix OpenID tokens for scalar tokens")]
struct Args {
    /// Host to run the web server on
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to run the web server on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Server which serves the stickers
    #[arg(long, alias = "sticker_url", env = "STICKER_URL", default_value = DEFAULT_STICKER_URL)]
    sticker_url: String,

    /// Only accept users from this homeserver; empty accepts any homeserver
    #[arg(long, env = "HOMESERVER", default_value = "")]
    homeserver: String,

    /// Timeout in seconds for requests to homeservers
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 5)]
    upstream_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let signing_key = SigningKey::from_env(&ProcessEnv).context("cannot start without a signing key")?;
    let upstream_timeout = Duration::from_secs(args.upstream_timeout_secs);

    let config = Config::new(signing_key)
        .with_allowed_homeserver(args.homeserver)
        .with_sticker_url(args.sticker_url)
        .with_upstream_timeout(upstream_timeout);

    match &config.allowed_homeserver {
        Some(homeserver) => info!(homeserver = %homeserver, "accepting users from a single homeserver"),
        None => info!("accepting users from any homeserver"),
    }

    let http = ReqwestHttpClient::new(config.upstream_timeout).context("failed to build HTTP client")?;
    let state = Arc::new(AppState::new(config, Box::new(http)));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("scalar-bridge listening on {}", addr);

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        };

        let state = state.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { routes::handle_request(req, remote, &state).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(remote = %remote, error = %e, "connection error");
            }
        });
    }
}
