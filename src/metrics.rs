//! Prometheus gauges for coin balances.
//!
//! Three gauge families share the `coins` namespace and a single `coin`
//! label:
//!
//! ```text
//! coins_balance{coin="BTC"}  number of coins held
//! coins_aud{coin="BTC"}      value of the holding in AUD
//! coins_rate{coin="BTC"}     AUD price of one coin
//! ```
//!
//! The families are registered once, when [`CoinMetrics`] is constructed.
//! Label values are created on first `set` and never removed, so a coin
//! missing from a later poll keeps its last value.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::coinspot::BalanceRecord;
use crate::error::ExporterError;

const NAMESPACE: &str = "coins";
const COIN_LABEL: &str = "coin";

/// Owns the registry and the three gauge families.
///
/// Gauge updates and scrapes may run concurrently; `prometheus` gauges are
/// atomic, so no extra locking is needed.
#[derive(Clone)]
pub struct CoinMetrics {
    registry: Registry,
    balance: GaugeVec,
    aud: GaugeVec,
    rate: GaugeVec,
}

impl CoinMetrics {
    /// Create the gauge families in a fresh registry.
    pub fn new() -> Result<Self, ExporterError> {
        Self::with_registry(Registry::new())
    }

    /// Create the gauge families and register them in `registry`.
    ///
    /// Fails if the registry already holds families with these names.
    pub fn with_registry(registry: Registry) -> Result<Self, ExporterError> {
        let balance = gauge_vec("balance", "Number of coins.")?;
        let aud = gauge_vec("aud", "Value of coins in AUD.")?;
        let rate = gauge_vec("rate", "Value of each coin.")?;

        registry.register(Box::new(balance.clone()))?;
        registry.register(Box::new(aud.clone()))?;
        registry.register(Box::new(rate.clone()))?;

        Ok(Self {
            registry,
            balance,
            aud,
            rate,
        })
    }

    /// Apply one coin's values. Fields that are `None` are left untouched.
    pub fn record(&self, record: &BalanceRecord) {
        let labels = [record.coin.as_str()];
        if let Some(value) = record.balance {
            self.balance.with_label_values(&labels).set(value);
        }
        if let Some(value) = record.aud_balance {
            self.aud.with_label_values(&labels).set(value);
        }
        if let Some(value) = record.rate {
            self.rate.with_label_values(&labels).set(value);
        }
    }

    /// The `coins_balance` family.
    pub fn balance(&self) -> &GaugeVec {
        &self.balance
    }

    /// The `coins_aud` family.
    pub fn aud(&self) -> &GaugeVec {
        &self.aud
    }

    /// The `coins_rate` family.
    pub fn rate(&self) -> &GaugeVec {
        &self.rate
    }

    /// The registry backing these gauges.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode everything in the registry in the Prometheus text format.
    pub fn render(&self) -> Result<String, ExporterError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| ExporterError::InvalidResponse(format!("metrics are not UTF-8: {e}")))
    }
}

impl std::fmt::Debug for CoinMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinMetrics")
            .field("families", &self.registry.gather().len())
            .finish()
    }
}

fn gauge_vec(name: &str, help: &str) -> Result<GaugeVec, ExporterError> {
    Ok(GaugeVec::new(
        Opts::new(name, help).namespace(NAMESPACE),
        &[COIN_LABEL],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc(balance: f64, aud: f64, rate: f64) -> BalanceRecord {
        BalanceRecord {
            coin: "BTC".to_string(),
            balance: Some(balance),
            aud_balance: Some(aud),
            rate: Some(rate),
        }
    }

    #[test]
    fn test_record_sets_all_three_families() {
        let metrics = CoinMetrics::new().unwrap();
        metrics.record(&btc(1.5, 90000.25, 60000.1));

        assert_eq!(metrics.balance().with_label_values(&["BTC"]).get(), 1.5);
        assert_eq!(metrics.aud().with_label_values(&["BTC"]).get(), 90000.25);
        assert_eq!(metrics.rate().with_label_values(&["BTC"]).get(), 60000.1);
    }

    #[test]
    fn test_record_overwrites_without_accumulating() {
        let metrics = CoinMetrics::new().unwrap();
        metrics.record(&btc(1.5, 90000.25, 60000.1));
        metrics.record(&btc(1.5, 90000.25, 60000.1));

        assert_eq!(metrics.balance().with_label_values(&["BTC"]).get(), 1.5);

        metrics.record(&btc(2.0, 1.0, 0.5));
        assert_eq!(metrics.balance().with_label_values(&["BTC"]).get(), 2.0);
        assert_eq!(metrics.rate().with_label_values(&["BTC"]).get(), 0.5);
    }

    #[test]
    fn test_missing_fields_keep_previous_value() {
        let metrics = CoinMetrics::new().unwrap();
        metrics.record(&btc(1.5, 90000.25, 60000.1));
        metrics.record(&BalanceRecord {
            coin: "BTC".to_string(),
            balance: Some(3.0),
            aud_balance: None,
            rate: None,
        });

        assert_eq!(metrics.balance().with_label_values(&["BTC"]).get(), 3.0);
        assert_eq!(metrics.aud().with_label_values(&["BTC"]).get(), 90000.25);
    }

    #[test]
    fn test_render_text_format() {
        let metrics = CoinMetrics::new().unwrap();
        metrics.record(&btc(1.5, 90000.25, 60000.1));

        let text = metrics.render().unwrap();
        assert!(text.contains("# HELP coins_balance Number of coins."));
        assert!(text.contains("# TYPE coins_balance gauge"));
        assert!(text.contains(r#"coins_balance{coin="BTC"} 1.5"#));
        assert!(text.contains(r#"coins_aud{coin="BTC"} 90000.25"#));
        assert!(text.contains(r#"coins_rate{coin="BTC"} 60000.1"#));
    }

    #[test]
    fn test_registering_twice_in_one_registry_fails() {
        let registry = Registry::new();
        CoinMetrics::with_registry(registry.clone()).unwrap();

        assert!(matches!(
            CoinMetrics::with_registry(registry),
            Err(ExporterError::Metrics(_))
        ));
    }
}
