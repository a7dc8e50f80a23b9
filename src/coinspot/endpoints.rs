//! CoinSpot REST API endpoint constants.

/// Base URL for the CoinSpot REST API.
pub const COINSPOT_BASE_URL: &str = "https://www.coinspot.com.au";

/// Read-only endpoints (authentication required).
pub mod read_only {
    /// List balances for every coin held.
    pub const BALANCES: &str = "/api/ro/my/balances";
}
