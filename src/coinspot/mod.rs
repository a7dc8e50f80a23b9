//! CoinSpot read-only REST API client.
//!
//! Only the balances endpoint is covered. Every request is a signed POST
//! whose JSON body carries a nonce; see [`crate::auth`] for signing.

mod client;
mod endpoints;
mod traits;
pub mod types;

pub use client::{CoinSpotClient, CoinSpotClientBuilder, DEFAULT_REQUEST_TIMEOUT, SignedRequest};
pub use endpoints::*;
pub use traits::BalanceSource;
pub use types::{BalanceField, BalanceRecord, BalancesRequest, BalancesResponse};
