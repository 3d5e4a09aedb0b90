//! # pdf2csv-proxy
//!
//! Upload a brokerage statement PDF, get CSV artifacts back.
//!
//! This crate is the web-facing half of the system: it records the user's
//! privacy consent, accepts the upload, and relays it to an external
//! conversion service that does the actual PDF extraction. The extraction
//! itself is not implemented here; the service is reached only through its
//! HTTP contract.
//!
//! ## Request Flow
//!
//! ```text
//! browser
//!  │  POST /api/process-pdf  (multipart, part `pdf`)
//!  │
//!  ├─ 1. Upload    buffer parts, take the first `pdf` part; empty   → 400
//!  ├─ 2. Upstream  one POST {upstream}/process-pdf, no retries      → 502
//!  ├─ 3. Map       csv_content → csvContent, everything else as-is
//!  └─ 4. Respond   200 { success, message, stats, csvContent }
//!                  anything unexpected                              → 500
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2csv_proxy::{server, ProxyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProxyConfig::builder()
//!         .upstream_url("http://localhost:8000")
//!         .build()?;
//!     let app = server::app(&config)?;
//!     server::serve(app, config.bind_addr).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2csv-proxy` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod consent;
pub mod error;
pub mod proxy;
pub mod response;
pub mod server;
pub mod upload;
pub mod upstream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ProxyConfig, ProxyConfigBuilder, DEFAULT_UPSTREAM_URL};
pub use consent::{ConsentPersistence, ConsentState, ConsentStore, CookieJar, MemoryPersistence, Unavailable};
pub use error::{ConfigError, ErrorBody, ErrorKind, OperationError};
pub use proxy::ConversionProxy;
pub use response::{ConversionResult, UpstreamReply};
pub use upload::{validate_upload, UploadedDocument};
