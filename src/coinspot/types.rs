//! Request and response types for the balances endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExporterError;

/// JSON body of a balances request.
///
/// Field order matters: the signature covers the serialized bytes, and
/// CoinSpot expects keys in this order.
#[derive(Debug, Clone, Serialize)]
pub struct BalancesRequest {
    /// Restricts the response to a single coin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cointype: Option<String>,
    /// Decimal nonce, sent as a string.
    pub nonce: String,
}

impl BalancesRequest {
    /// Request for every coin.
    pub fn new(nonce: u64) -> Self {
        Self {
            cointype: None,
            nonce: nonce.to_string(),
        }
    }

    /// Request for one coin.
    pub fn for_coin(nonce: u64, coin_type: impl Into<String>) -> Self {
        Self {
            cointype: Some(coin_type.into()),
            nonce: nonce.to_string(),
        }
    }
}

/// Raw balances response.
///
/// `balances` is a list of single-entry maps: `[{"BTC": {...}}, {"ETH": {...}}]`.
#[derive(Debug, Clone, Deserialize)]
pub struct BalancesResponse {
    /// `"ok"` on success, `"error"` otherwise.
    #[serde(default)]
    pub status: Option<Value>,
    /// Error description when `status` is not ok.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    balances: Option<Vec<BTreeMap<String, BTreeMap<String, Value>>>>,
}

impl BalancesResponse {
    /// Parse a response body.
    ///
    /// Fails on invalid JSON and on balance entries that are not mappings.
    pub fn from_body(body: &str) -> Result<Self, ExporterError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Whether the exchange reported `status: "ok"`.
    pub fn is_ok(&self) -> bool {
        self.status.as_ref().and_then(Value::as_str) == Some("ok")
    }

    /// The `status` value as text, `<missing>` when absent.
    pub fn status_text(&self) -> String {
        match &self.status {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "<missing>".to_string(),
        }
    }

    /// Coin symbols in response order. Duplicates are kept.
    pub fn coins(&self) -> Result<Vec<&str>, ExporterError> {
        Ok(self
            .entries()?
            .iter()
            .flat_map(|entry| entry.keys().map(String::as_str))
            .collect())
    }

    /// Map every coin entry to a [`BalanceRecord`].
    ///
    /// All entries are converted before anything is returned, so one bad
    /// value rejects the whole response.
    pub fn records(&self) -> Result<Vec<BalanceRecord>, ExporterError> {
        let mut records = Vec::new();
        for entry in self.entries()? {
            for (coin, fields) in entry {
                records.push(BalanceRecord::from_fields(coin, fields)?);
            }
        }
        Ok(records)
    }

    fn entries(&self) -> Result<&[BTreeMap<String, BTreeMap<String, Value>>], ExporterError> {
        self.balances
            .as_deref()
            .ok_or_else(|| ExporterError::MissingBalances {
                status: self.status_text(),
                message: self.message.clone(),
            })
    }
}

/// The fields of a coin entry that map to gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceField {
    /// `balance`: number of coins held
    Balance,
    /// `audbalance`: value of the holding in AUD
    AudBalance,
    /// `rate`: AUD price of one coin
    Rate,
}

impl BalanceField {
    /// Look up a field by its wire name.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "balance" => Some(Self::Balance),
            "audbalance" => Some(Self::AudBalance),
            "rate" => Some(Self::Rate),
            _ => None,
        }
    }

    /// The wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::AudBalance => "audbalance",
            Self::Rate => "rate",
        }
    }
}

/// One coin's values from a single poll.
///
/// A field is `None` when the exchange did not send it.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRecord {
    pub coin: String,
    pub balance: Option<f64>,
    pub aud_balance: Option<f64>,
    pub rate: Option<f64>,
}

impl BalanceRecord {
    fn from_fields(coin: &str, fields: &BTreeMap<String, Value>) -> Result<Self, ExporterError> {
        let mut record = Self {
            coin: coin.to_string(),
            balance: None,
            aud_balance: None,
            rate: None,
        };

        for (key, value) in fields {
            let Some(field) = BalanceField::from_key(key) else {
                continue;
            };
            let parsed = coerce_f64(value).ok_or_else(|| ExporterError::InvalidNumber {
                coin: coin.to_string(),
                field: field.as_str().to_string(),
                value: value.to_string(),
            })?;
            match field {
                BalanceField::Balance => record.balance = Some(parsed),
                BalanceField::AudBalance => record.aud_balance = Some(parsed),
                BalanceField::Rate => record.rate = Some(parsed),
            }
        }

        Ok(record)
    }
}

/// Read a JSON number or numeric string as `f64`.
///
/// Numbers go through their textual form so `1.5` and `"1.5"` parse the same.
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
