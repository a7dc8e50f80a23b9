//! # CoinSpot Exporter
//!
//! Polls CoinSpot's read-only balances API and republishes each coin's
//! balance, AUD value and rate as Prometheus gauges.
//!
//! ## Features
//!
//! - HMAC-SHA512 signed requests with strictly increasing nonces
//! - Signing secret fetched from HashiCorp Vault (AppRole + KV v2)
//! - `coins_balance`, `coins_aud`, `coins_rate` gauges labelled by `coin`
//! - `GET /metrics` endpoint in the Prometheus text format
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use coinspot_exporter::auth::StaticCredentials;
//! use coinspot_exporter::coinspot::CoinSpotClient;
//! use coinspot_exporter::exporter::Exporter;
//! use coinspot_exporter::metrics::CoinMetrics;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CoinSpotClient::builder()
//!         .credentials(Arc::new(StaticCredentials::new("api_key", "api_secret")))
//!         .build()?;
//!     let exporter = Exporter::new(client, Arc::new(CoinMetrics::new()?));
//!     exporter.poll_once().await?;
//!     println!("{}", exporter.metrics().render()?);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod coinspot;
pub mod config;
pub mod error;
pub mod exporter;
pub mod metrics;
pub mod server;
pub mod vault;

// Re-export commonly used types at crate root
pub use error::ExporterError;

/// Result type alias using ExporterError
pub type Result<T> = std::result::Result<T, ExporterError>;
