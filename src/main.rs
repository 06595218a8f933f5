//! Authenticating route service.
//!
//! Sits behind a Cloud-Foundry-style router. Every request arrives with its
//! real destination in `X-Cf-Forwarded-Url` and is either handled by the
//! `/auth` engine, forwarded to the backend for a valid session or open
//! path, or redirected to the login page.
//!
//! ```text
//!     Router ──▶ gateway ──┬──▶ /auth/* engine ──▶ OAuth provider
//!                          ├──▶ backend (session valid / open path)
//!                          └──▶ 303 /auth/login
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use auth_route_service::config::GatewayConfig;
use auth_route_service::http::GatewayServer;
use auth_route_service::lifecycle::{shutdown_signal, Shutdown};
use auth_route_service::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "auth-route-service")]
#[command(about = "Authenticating route service gateway", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Tenant configuration file (YAML)
    #[arg(long, env = "DOMAIN_CONFIG_FILEPATH")]
    domain_config: Option<PathBuf>,

    /// Skip TLS certificate verification when forwarding to the backend
    #[arg(long, env = "SKIP_SSL_VALIDATION", default_value_t = false)]
    skip_ssl_validation: bool,

    /// Directory served under /auth/assets/
    #[arg(long, env = "STATIC_ASSET_PATH", default_value = "web/static")]
    asset_path: PathBuf,

    /// Scheme of OAuth callback URLs
    #[arg(long, env = "CALLBACK_SCHEME", default_value = "https")]
    callback_scheme: String,

    /// Issue cookies without the Secure attribute (local development only)
    #[arg(long, env = "INSECURE_COOKIES", default_value_t = false)]
    insecure_cookies: bool,

    /// Debug logging
    #[arg(long, env = "DEBUG", default_value_t = false)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> GatewayConfig {
        GatewayConfig {
            bind_address: format!("0.0.0.0:{}", self.port),
            domain_config_path: self.domain_config,
            skip_tls_validation: self.skip_ssl_validation,
            asset_path: self.asset_path,
            callback_scheme: self.callback_scheme,
            secure_cookies: !self.insecure_cookies,
            ..GatewayConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.debug);

    tracing::info!("auth-route-service v{} starting", env!("CARGO_PKG_VERSION"));

    let config = args.into_config();
    if config.domain_config_path.is_none() {
        tracing::warn!("No tenant file configured; every request will be treated as unauthenticated");
    }

    tracing::info!(
        bind_address = %config.bind_address,
        skip_tls_validation = config.skip_tls_validation,
        secure_cookies = config.secure_cookies,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.bind_address).await?;

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config)?;
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    shutdown_signal().await;
    shutdown.trigger();

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
