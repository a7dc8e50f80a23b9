//! Trait definition for a balance source.
//!
//! The poller only needs two operations from the exchange, so it is written
//! against this trait rather than the concrete [`CoinSpotClient`]. Tests use
//! scripted implementations.
//!
//! [`CoinSpotClient`]: crate::coinspot::CoinSpotClient

use std::future::Future;

use crate::coinspot::types::BalancesResponse;
use crate::error::ExporterError;

/// Anything that can produce a balances payload.
pub trait BalanceSource: Send + Sync {
    /// Fetch balances for every coin.
    fn fetch_balances(
        &self,
    ) -> impl Future<Output = Result<BalancesResponse, ExporterError>> + Send;

    /// Fetch once and report whether the exchange answered `status: "ok"`.
    fn fetch_status(&self) -> impl Future<Output = Result<bool, ExporterError>> + Send;
}
