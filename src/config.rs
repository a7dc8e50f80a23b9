//! Exporter configuration, read from environment variables.
//!
//! Variable names are camelCase to stay compatible with existing
//! deployments (`scrapeInterval`, `listenPort`, ...).

use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::coinspot::COINSPOT_BASE_URL;
use crate::error::ExporterError;

/// Poll cadence used when `scrapeInterval` is unset.
pub const DEFAULT_SCRAPE_INTERVAL_SECS: u64 = 10;
/// Metrics port used when `listenPort` is unset.
pub const DEFAULT_LISTEN_PORT: u16 = 2113;
/// Vault address used when `vaultAddr` is unset.
pub const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";
/// KV v2 mount holding the CoinSpot secret.
pub const DEFAULT_VAULT_MOUNT: &str = "coinspot";
/// Field of the KV entry that holds the signing secret.
pub const DEFAULT_VAULT_SECRET_FIELD: &str = "secret";

/// What the scheduler does when a poll cycle fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop polling and hand the error to the caller, which exits.
    #[default]
    Exit,
    /// Log the error and wait for the next tick.
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exit" => Ok(Self::Exit),
            "skip" => Ok(Self::Skip),
            other => Err(ExporterError::Config(format!(
                "onPollError must be 'exit' or 'skip', got '{other}'"
            ))),
        }
    }
}

/// Vault AppRole settings.
#[derive(Clone)]
pub struct VaultConfig {
    pub addr: String,
    pub role_id: String,
    pub secret_id: String,
    pub mount: String,
    pub secret_field: String,
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("addr", &self.addr)
            .field("role_id", &self.role_id)
            .field("secret_id", &"[REDACTED]")
            .field("mount", &self.mount)
            .field("secret_field", &self.secret_field)
            .finish()
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub scrape_interval: Duration,
    pub listen_port: u16,
    /// CoinSpot API key; also names the Vault entry holding its secret.
    pub api_key: String,
    pub base_url: String,
    pub vault: VaultConfig,
    pub on_poll_error: FailurePolicy,
}

impl ExporterConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ExporterError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ExporterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let interval_secs = match get("scrapeInterval") {
            Some(raw) => parse_number::<u64>("scrapeInterval", &raw)?,
            None => DEFAULT_SCRAPE_INTERVAL_SECS,
        };
        if interval_secs == 0 {
            return Err(ExporterError::Config(
                "scrapeInterval must be at least 1 second".to_string(),
            ));
        }

        let listen_port = match get("listenPort") {
            Some(raw) => parse_number::<u16>("listenPort", &raw)?,
            None => DEFAULT_LISTEN_PORT,
        };

        let api_key = get("coinspotKey").ok_or_else(|| {
            ExporterError::Config("coinspotKey (CoinSpot API key) is required".to_string())
        })?;

        let on_poll_error = match get("onPollError") {
            Some(raw) => raw.parse()?,
            None => FailurePolicy::default(),
        };

        Ok(Self {
            scrape_interval: Duration::from_secs(interval_secs),
            listen_port,
            api_key,
            base_url: get("coinspotBaseUrl").unwrap_or_else(|| COINSPOT_BASE_URL.to_string()),
            vault: VaultConfig {
                addr: get("vaultAddr").unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_string()),
                role_id: get("vaultRoleId").unwrap_or_default(),
                secret_id: get("vaultSecretId").unwrap_or_default(),
                mount: get("vaultMount").unwrap_or_else(|| DEFAULT_VAULT_MOUNT.to_string()),
                secret_field: get("vaultSecretField")
                    .unwrap_or_else(|| DEFAULT_VAULT_SECRET_FIELD.to_string()),
            },
            on_poll_error,
        })
    }

    /// Address for the metrics server: every interface, `listenPort`.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.listen_port))
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T, ExporterError> {
    raw.trim()
        .parse()
        .map_err(|_| ExporterError::Config(format!("{name} must be a number, got '{raw}'")))
}
