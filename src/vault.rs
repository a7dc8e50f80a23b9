//! HashiCorp Vault secret retrieval.
//!
//! The CoinSpot signing secret lives in a KV v2 engine at
//! `<mount>/data/<api key>`. Access uses an AppRole login:
//!
//! ```text
//! POST /v1/auth/approle/login   {"role_id": ..., "secret_id": ...}  -> auth.client_token
//! GET  /v1/<mount>/data/<key>   X-Vault-Token: <token>              -> data.data.<field>
//! ```

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use url::Url;

use crate::auth::{Credentials, CredentialsProvider};
use crate::config::VaultConfig;
use crate::error::ExporterError;

const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";
const DEFAULT_VAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Minimal Vault HTTP client: AppRole login and KV v2 reads.
#[derive(Clone)]
pub struct VaultClient {
    http_client: ClientWithMiddleware,
    addr: Url,
}

#[derive(Serialize)]
struct AppRoleLogin<'a> {
    role_id: &'a str,
    secret_id: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: Option<LoginAuth>,
}

#[derive(Deserialize)]
struct LoginAuth {
    client_token: String,
}

#[derive(Deserialize)]
struct KvReadResponse {
    data: Option<KvData>,
}

#[derive(Deserialize)]
struct KvData {
    data: Option<HashMap<String, Value>>,
}

#[derive(Deserialize, Default)]
struct VaultErrors {
    #[serde(default)]
    errors: Vec<String>,
}

impl VaultClient {
    /// Create a client for the Vault server at `addr`.
    pub fn new(addr: &str) -> Result<Self, ExporterError> {
        let addr = Url::parse(addr)?;
        let reqwest_client = reqwest::Client::builder()
            .timeout(DEFAULT_VAULT_TIMEOUT)
            .build()?;
        let http_client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self { http_client, addr })
    }

    /// Log in with AppRole credentials and return the client token.
    pub async fn login_approle(
        &self,
        role_id: &str,
        secret_id: &str,
    ) -> Result<SecretString, ExporterError> {
        let url = self.addr.join("v1/auth/approle/login")?;
        let body = serde_json::to_string(&AppRoleLogin { role_id, secret_id })?;

        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let body = Self::success_body(response).await?;

        let login: LoginResponse = serde_json::from_str(&body)?;
        let auth = login.auth.ok_or_else(|| {
            ExporterError::Vault("empty response from credential provider".to_string())
        })?;
        Ok(SecretString::from(auth.client_token))
    }

    /// Read one string field from a KV v2 entry.
    pub async fn read_kv_field(
        &self,
        token: &SecretString,
        mount: &str,
        path: &str,
        field: &str,
    ) -> Result<SecretString, ExporterError> {
        let url = self.addr.join(&format!(
            "v1/{}/data/{}",
            mount.trim_matches('/'),
            path.trim_matches('/')
        ))?;

        let response = self
            .http_client
            .get(url)
            .header(VAULT_TOKEN_HEADER, token.expose_secret())
            .send()
            .await?;
        let body = Self::success_body(response).await?;

        let read: KvReadResponse = serde_json::from_str(&body)?;
        let mut data = read
            .data
            .and_then(|d| d.data)
            .ok_or_else(|| ExporterError::Vault(format!("no data at {mount}/data/{path}")))?;

        match data.remove(field) {
            Some(Value::String(secret)) => Ok(SecretString::from(secret)),
            Some(_) => Err(ExporterError::Vault(format!(
                "field '{field}' at {mount}/data/{path} is not a string"
            ))),
            None => Err(ExporterError::Vault(format!(
                "field '{field}' missing at {mount}/data/{path}"
            ))),
        }
    }

    async fn success_body(response: reqwest::Response) -> Result<String, ExporterError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }
        let errors = serde_json::from_str::<VaultErrors>(&body)
            .unwrap_or_default()
            .errors;
        Err(ExporterError::VaultStatus {
            status: status.as_u16(),
            errors,
        })
    }
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("addr", &self.addr.as_str())
            .finish()
    }
}

/// Fetch the CoinSpot signing secret for `api_key`.
pub async fn fetch_signing_secret(
    config: &VaultConfig,
    api_key: &str,
) -> Result<SecretString, ExporterError> {
    let client = VaultClient::new(&config.addr)?;
    let token = client
        .login_approle(&config.role_id, &config.secret_id)
        .await?;
    client
        .read_kv_field(&token, &config.mount, api_key, &config.secret_field)
        .await
}

/// Credentials whose secret was read from Vault at startup.
#[derive(Debug, Clone)]
pub struct VaultCredentials {
    credentials: Credentials,
}

impl VaultCredentials {
    /// Fetch the secret for `api_key`.
    ///
    /// A failed fetch is logged and yields an empty secret; requests are
    /// still signed with it and will be rejected by the exchange.
    pub async fn fetch(config: &VaultConfig, api_key: &str) -> Self {
        let secret = match fetch_signing_secret(config, api_key).await {
            Ok(secret) => {
                info!(addr = %config.addr, "Signing secret retrieved from Vault");
                secret
            }
            Err(e) => {
                error!(addr = %config.addr, error = %e, "Failed to retrieve signing secret from Vault");
                warn!("Continuing with an empty signing secret; exchange requests will fail authentication");
                SecretString::from(String::new())
            }
        };

        Self {
            credentials: Credentials::from_secret(api_key, secret),
        }
    }
}

impl CredentialsProvider for VaultCredentials {
    fn get_credentials(&self) -> &Credentials {
        &self.credentials
    }
}
