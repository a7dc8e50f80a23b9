//! Error types for the exporter.

use thiserror::Error;

/// The main error type for all exporter operations.
#[derive(Error, Debug)]
pub enum ExporterError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request with middleware failed
    #[error("HTTP request failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Signing failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Vault answered with a non-success status
    #[error("Vault returned HTTP {status}: {}", .errors.join("; "))]
    VaultStatus {
        /// HTTP status code
        status: u16,
        /// Contents of Vault's `errors` array
        errors: Vec<String>,
    },

    /// Vault answered but the payload was not usable
    #[error("Vault error: {0}")]
    Vault(String),

    /// The balances payload had no `balances` key
    #[error("Response missing 'balances' (status: {status}{})", message_suffix(.message))]
    MissingBalances {
        /// The top-level `status` value, as text
        status: String,
        /// The exchange's `message`, if any
        message: Option<String>,
    },

    /// A balance field could not be read as a float
    #[error("Invalid number for {coin}.{field}: {value}")]
    InvalidNumber {
        /// Coin symbol
        coin: String,
        /// Field name as sent by the exchange
        field: String,
        /// The offending value, as text
        value: String,
    },

    /// Invalid response from the API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Metric registration or encoding failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Bad configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Socket or other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(", message: {m}"))
        .unwrap_or_default()
}
