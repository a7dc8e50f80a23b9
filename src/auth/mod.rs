//! Authentication for CoinSpot's read-only API.
//!
//! This module provides:
//! - Credential management with secure secret storage
//! - Nonce generation for replay attack prevention
//! - HMAC-SHA512 signing of JSON request bodies

mod credentials;
mod nonce;
mod signature;

pub use credentials::{Credentials, CredentialsProvider, StaticCredentials};
pub use nonce::{IncreasingNonce, NonceProvider};
pub use signature::sign_body;
