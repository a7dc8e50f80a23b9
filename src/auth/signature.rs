//! HMAC-SHA512 signature generation for CoinSpot API authentication.
//!
//! CoinSpot signs the raw POST body:
//! ```text
//! hex(HMAC-SHA512(json_body, api_secret))
//! ```
//!
//! The lowercase hex digest is sent in the `sign` header.

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::auth::Credentials;
use crate::error::ExporterError;

type HmacSha512 = Hmac<Sha512>;

/// Sign a request body for CoinSpot's read-only API.
///
/// The body must be the exact bytes that go on the wire.
///
/// # Example
///
/// ```rust
/// use coinspot_exporter::auth::{Credentials, sign_body};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = Credentials::new("api_key", "api_secret");
/// let signature = sign_body(&credentials, br#"{"nonce":"1700000000000000000"}"#)?;
/// assert_eq!(signature.len(), 128);
/// # Ok(())
/// # }
/// ```
pub fn sign_body(credentials: &Credentials, body: &[u8]) -> Result<String, ExporterError> {
    let mut hmac = HmacSha512::new_from_slice(credentials.expose_secret().as_bytes())
        .map_err(|e| ExporterError::Auth(format!("Invalid HMAC key: {e}")))?;
    hmac.update(body);
    Ok(hex::encode(hmac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_known_vector() {
        // RFC 4231, test case 2.
        let credentials = Credentials::new("key", "Jefe");
        let signature = sign_body(&credentials, b"what do ya want for nothing?").unwrap();

        assert_eq!(
            signature,
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn test_signature_of_nonce_body() {
        let credentials = Credentials::new("key", "test_secret");
        let signature = sign_body(&credentials, br#"{"nonce":"1700000000000000000"}"#).unwrap();

        assert_eq!(
            signature,
            "0f142bfb7ee60da7cccec8c65036e5c59d62d63eb7d961ce93761699d2710bc1\
             ce9f9a52e3fdb1754b28e1074dac6da2d70119a3a4c8d89eda79a19f3e9239d8"
        );
    }

    #[test]
    fn test_signature_is_lowercase_hex() {
        let credentials = Credentials::new("key", "my_secret");
        let signature = sign_body(&credentials, b"{}").unwrap();

        // HMAC-SHA512 produces 64 bytes, hex encoded = 128 chars
        assert_eq!(signature.len(), 128);
        assert!(
            signature
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn test_signature_consistency() {
        let credentials = Credentials::new("key", "my_secret");
        let body = br#"{"nonce":"12345"}"#;

        let sig1 = sign_body(&credentials, body).unwrap();
        let sig2 = sign_body(&credentials, body).unwrap();

        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_signature_changes_with_one_byte() {
        let credentials = Credentials::new("key", "my_secret");

        let sig1 = sign_body(&credentials, br#"{"nonce":"12345"}"#).unwrap();
        let sig2 = sign_body(&credentials, br#"{"nonce":"12346"}"#).unwrap();

        assert_ne!(sig1, sig2);
    }

    #[test]
    fn test_signature_changes_with_secret() {
        let body = br#"{"nonce":"12345"}"#;

        let sig1 = sign_body(&Credentials::new("key", "secret_a"), body).unwrap();
        let sig2 = sign_body(&Credentials::new("key", "secret_b"), body).unwrap();

        assert_ne!(sig1, sig2);
    }

    #[test]
    fn test_empty_secret_still_signs() {
        let credentials = Credentials::new("key", "");
        let signature = sign_body(&credentials, br#"{"nonce":"1"}"#).unwrap();

        assert_eq!(
            signature,
            "049dbcd046f07ae4d9618ea2a996804bedec3382de5da60105d6acf97cb71d81\
             00e4ef12a483be9563f4de947e44516effbb2221176b4a48c802aa5a8d38e54b"
        );
    }
}
