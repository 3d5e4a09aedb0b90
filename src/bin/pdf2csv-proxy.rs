//! CLI binary for pdf2csv-proxy.
//!
//! A thin shim over the library crate that maps flags and environment
//! variables to `ProxyConfig` and runs the HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2csv_proxy::{server, ProxyConfig, DEFAULT_UPSTREAM_URL};
use std::io;
use std::net::{IpAddr, SocketAddr};
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Local development against a conversion service on this machine
  pdf2csv-proxy --upstream-url http://localhost:8000 --port 3000

  # Inside docker-compose (defaults reach the `python-api` service)
  pdf2csv-proxy

  # Shorter upstream timeout, verbose logs
  pdf2csv-proxy --timeout 30 --verbose

ENDPOINTS:
  GET    /health            liveness probe
  POST   /api/process-pdf   multipart form, part `pdf`
  GET    /api/consent       read the privacy-consent cookie
  PUT    /api/consent       {"accepted": true|false}
  DELETE /api/consent       clear the privacy-consent cookie

ENVIRONMENT VARIABLES:
  PYTHON_API_URL            Base URL of the conversion service
  RUST_LOG                  Overrides the log filter (e.g. pdf2csv_proxy=debug)
"#;

/// Relay statement PDF uploads to the conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2csv-proxy",
    version,
    about = "Relay statement PDF uploads to the CSV conversion service",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Base URL of the conversion service.
    #[arg(long, env = "PYTHON_API_URL", default_value = DEFAULT_UPSTREAM_URL)]
    upstream_url: String,

    /// Total timeout for one upstream call, in seconds.
    #[arg(long, env = "PDF2CSV_UPSTREAM_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Upstream TCP connect timeout, in seconds.
    #[arg(long, env = "PDF2CSV_CONNECT_TIMEOUT", default_value_t = 10)]
    connect_timeout: u64,

    /// Largest accepted upload, in MiB.
    #[arg(long, env = "PDF2CSV_MAX_UPLOAD_MB", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    max_upload_mb: u64,

    /// Largest accepted conversion-service reply, in MiB.
    #[arg(long, env = "PDF2CSV_MAX_REPLY_MB", default_value_t = 64,
          value_parser = clap::value_parser!(u64).range(1..=4096))]
    max_reply_mb: u64,

    /// Interface to listen on.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2CSV_QUIET")]
    quiet: bool,
}

impl Cli {
    fn to_config(&self) -> Result<ProxyConfig> {
        let max_upload_bytes = usize::try_from(self.max_upload_mb * 1024 * 1024)
            .context("upload limit does not fit in memory on this platform")?;
        let max_reply_bytes = usize::try_from(self.max_reply_mb * 1024 * 1024)
            .context("reply limit does not fit in memory on this platform")?;
        ProxyConfig::builder()
            .upstream_url(&self.upstream_url)
            .request_timeout_secs(self.timeout)
            .connect_timeout_secs(self.connect_timeout)
            .max_upload_bytes(max_upload_bytes)
            .max_reply_bytes(max_reply_bytes)
            .bind_addr(SocketAddr::new(self.host, self.port))
            .build()
            .context("invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = cli.to_config()?;
    info!(
        upstream = %config.upstream_endpoint(),
        timeout_secs = config.request_timeout_secs,
        max_upload_mb = cli.max_upload_mb,
        "Starting pdf2csv-proxy"
    );

    let app = server::app(&config).context("failed to initialise the conversion proxy")?;
    server::serve(app, config.bind_addr)
        .await
        .with_context(|| format!("server on {} failed", config.bind_addr))?;
    Ok(())
}
