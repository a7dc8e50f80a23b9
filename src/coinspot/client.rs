//! CoinSpot REST API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use tracing::{debug, info};
use url::Url;

use crate::auth::{CredentialsProvider, IncreasingNonce, NonceProvider, sign_body};
use crate::coinspot::endpoints::{COINSPOT_BASE_URL, read_only};
use crate::coinspot::traits::BalanceSource;
use crate::coinspot::types::{BalancesRequest, BalancesResponse};
use crate::error::ExporterError;

/// Per-request timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// A fully signed request, ready to send.
///
/// The signature covers `body` byte for byte; do not re-serialize it.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub url: Url,
    pub nonce: u64,
    pub body: String,
    pub signature: String,
    pub api_key: String,
}

/// The CoinSpot read-only REST API client.
///
/// # Example
///
/// ```rust,no_run
/// use coinspot_exporter::auth::StaticCredentials;
/// use coinspot_exporter::coinspot::CoinSpotClient;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let credentials = Arc::new(StaticCredentials::new("api_key", "api_secret"));
///     let client = CoinSpotClient::builder()
///         .credentials(credentials)
///         .build()?;
///
///     let balances = client.fetch_balances().await?;
///     println!("Coins: {:?}", balances.coins()?);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct CoinSpotClient {
    http_client: ClientWithMiddleware,
    base_url: Url,
    credentials: Arc<dyn CredentialsProvider>,
    nonce_provider: Arc<dyn NonceProvider>,
}

impl CoinSpotClient {
    /// Create a new client builder.
    pub fn builder() -> CoinSpotClientBuilder {
        CoinSpotClientBuilder::new()
    }

    /// Build a signed request for the balances of every coin.
    pub fn build_balances_request(&self) -> Result<SignedRequest, ExporterError> {
        let nonce = self.nonce_provider.next_nonce();
        let url = self.base_url.join(read_only::BALANCES)?;
        self.sign(url, nonce, &BalancesRequest::new(nonce))
    }

    /// Build a signed request scoped to one coin type.
    pub fn build_coin_request(&self, coin_type: &str) -> Result<SignedRequest, ExporterError> {
        let nonce = self.nonce_provider.next_nonce();
        let mut url = self.base_url.join(read_only::BALANCES)?;
        url.query_pairs_mut().append_pair("cointype", coin_type);
        self.sign(url, nonce, &BalancesRequest::for_coin(nonce, coin_type))
    }

    fn sign(
        &self,
        url: Url,
        nonce: u64,
        request: &BalancesRequest,
    ) -> Result<SignedRequest, ExporterError> {
        let creds = self.credentials.get_credentials();
        let body = serde_json::to_string(request)?;
        let signature = sign_body(creds, body.as_bytes())?;

        Ok(SignedRequest {
            url,
            nonce,
            body,
            signature,
            api_key: creds.api_key.clone(),
        })
    }

    /// Send a signed request and decode the balances payload.
    pub async fn send(&self, request: SignedRequest) -> Result<BalancesResponse, ExporterError> {
        debug!(url = %request.url, nonce = request.nonce, "Sending signed request");
        let response = self
            .http_client
            .post(request.url)
            .header(CONTENT_TYPE, "application/json")
            .header("key", request.api_key)
            .header("sign", request.signature)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        BalancesResponse::from_body(&body).map_err(|e| {
            if status.is_success() {
                ExporterError::InvalidResponse(format!(
                    "Failed to parse response: {}. Body: {}",
                    e, body
                ))
            } else {
                ExporterError::InvalidResponse(format!("HTTP {}: {}", status, body))
            }
        })
    }

    /// Fetch balances for every coin.
    pub async fn fetch_balances(&self) -> Result<BalancesResponse, ExporterError> {
        let request = self.build_balances_request()?;
        self.send(request).await
    }

    /// Fetch balances for a single coin type.
    pub async fn fetch_coin_balances(
        &self,
        coin_type: &str,
    ) -> Result<BalancesResponse, ExporterError> {
        let request = self.build_coin_request(coin_type)?;
        self.send(request).await
    }

    /// Issue one balances request and report whether the exchange said `ok`.
    ///
    /// Logs every coin found. A non-ok status is not an error; a payload
    /// without `balances` is.
    pub async fn fetch_status(&self) -> Result<bool, ExporterError> {
        let response = self.fetch_balances().await?;
        for coin in response.coins()? {
            info!(coin, "Found coin");
        }
        Ok(response.is_ok())
    }
}

impl BalanceSource for CoinSpotClient {
    async fn fetch_balances(&self) -> Result<BalancesResponse, ExporterError> {
        CoinSpotClient::fetch_balances(self).await
    }

    async fn fetch_status(&self) -> Result<bool, ExporterError> {
        CoinSpotClient::fetch_status(self).await
    }
}

impl std::fmt::Debug for CoinSpotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinSpotClient")
            .field("base_url", &self.base_url.as_str())
            .field("credentials", self.credentials.get_credentials())
            .finish()
    }
}

/// Builder for [`CoinSpotClient`].
pub struct CoinSpotClientBuilder {
    base_url: String,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    nonce_provider: Option<Arc<dyn NonceProvider>>,
    user_agent: Option<String>,
    timeout: Duration,
}

impl CoinSpotClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: COINSPOT_BASE_URL.to_string(),
            credentials: None,
            nonce_provider: None,
            user_agent: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the credentials provider. Required.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set a custom nonce provider.
    pub fn nonce_provider(mut self, provider: Arc<dyn NonceProvider>) -> Self {
        self.nonce_provider = Some(provider);
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<CoinSpotClient, ExporterError> {
        let credentials = self.credentials.ok_or_else(|| {
            ExporterError::Auth("credentials are required for the balances endpoint".to_string())
        })?;
        let base_url = Url::parse(&self.base_url)?;

        let mut headers = HeaderMap::new();
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("coinspot-exporter/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("coinspot-exporter"));
        headers.insert(USER_AGENT, header_value);

        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()?;

        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        let nonce_provider = self
            .nonce_provider
            .unwrap_or_else(|| Arc::new(IncreasingNonce::new()));

        Ok(CoinSpotClient {
            http_client: client,
            base_url,
            credentials,
            nonce_provider,
        })
    }
}

impl Default for CoinSpotClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
