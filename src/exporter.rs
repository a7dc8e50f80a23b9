//! Poll loop: fetch balances, map them, update gauges, repeat.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::coinspot::BalanceSource;
use crate::config::FailurePolicy;
use crate::error::ExporterError;
use crate::metrics::CoinMetrics;

/// Connects a [`BalanceSource`] to a [`CoinMetrics`].
///
/// The metrics are constructed (and their families registered) before the
/// exporter exists, so every `set` lands on a registered gauge.
pub struct Exporter<S> {
    source: S,
    metrics: Arc<CoinMetrics>,
}

impl<S: BalanceSource> Exporter<S> {
    pub fn new(source: S, metrics: Arc<CoinMetrics>) -> Self {
        Self { source, metrics }
    }

    /// The gauges this exporter writes to.
    pub fn metrics(&self) -> &Arc<CoinMetrics> {
        &self.metrics
    }

    /// Startup check. Returns whether the exchange reported `ok`.
    ///
    /// A non-ok status is only logged; polling goes ahead regardless.
    pub async fn check_status(&self) -> Result<bool, ExporterError> {
        let ok = self.source.fetch_status().await?;
        if ok {
            info!("Exchange status ok");
        } else {
            warn!("Exchange status not ok; polling anyway");
        }
        Ok(ok)
    }

    /// Run one poll cycle. Returns the number of coins updated.
    ///
    /// The whole response is validated before any gauge changes.
    pub async fn poll_once(&self) -> Result<usize, ExporterError> {
        let response = self.source.fetch_balances().await?;
        let records = response.records()?;
        for record in &records {
            self.metrics.record(record);
        }
        debug!(coins = records.len(), "Poll cycle complete");
        Ok(records.len())
    }

    /// Poll every `period` until a cycle fails under [`FailurePolicy::Exit`].
    ///
    /// The first tick fires one period from now; an initial poll is expected
    /// to have run already. Ticks missed while a poll is in flight are
    /// skipped.
    pub async fn run(&self, period: Duration, policy: FailurePolicy) -> Result<(), ExporterError> {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = period.as_secs(), ?policy, "Scheduler started");

        loop {
            ticker.tick().await;
            match self.poll_once().await {
                Ok(_) => {}
                Err(e) if policy == FailurePolicy::Skip => {
                    error!(error = %e, "Poll cycle failed; skipping");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coinspot::BalancesResponse;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned bodies in order; an exhausted script repeats the last one.
    struct ScriptedSource {
        bodies: Mutex<VecDeque<&'static str>>,
        last: Mutex<&'static str>,
    }

    impl ScriptedSource {
        fn new(bodies: &[&'static str]) -> Self {
            Self {
                bodies: Mutex::new(bodies.iter().copied().collect()),
                last: Mutex::new(bodies[bodies.len() - 1]),
            }
        }

        fn next_body(&self) -> &'static str {
            let mut bodies = self.bodies.lock().unwrap();
            match bodies.pop_front() {
                Some(body) => {
                    *self.last.lock().unwrap() = body;
                    body
                }
                None => *self.last.lock().unwrap(),
            }
        }
    }

    impl BalanceSource for ScriptedSource {
        async fn fetch_balances(&self) -> Result<BalancesResponse, ExporterError> {
            BalancesResponse::from_body(self.next_body())
        }

        async fn fetch_status(&self) -> Result<bool, ExporterError> {
            let response = self.fetch_balances().await?;
            response.coins()?;
            Ok(response.is_ok())
        }
    }

    const BTC: &str = r#"{"status":"ok","balances":[{"BTC":{"balance":1.5,"audbalance":90000.25,"rate":60000.1}}]}"#;
    const BTC_ETH: &str = r#"{"status":"ok","balances":[{"BTC":{"balance":2,"audbalance":120000,"rate":60000}},{"ETH":{"balance":"3","audbalance":"9000","rate":"3000"}}]}"#;
    const NOT_OK: &str = r#"{"status":"error","balances":[{"BTC":{"balance":1.5}}]}"#;
    const BROKEN: &str = r#"{"status":"error","message":"Invalid API key"}"#;

    fn exporter(bodies: &[&'static str]) -> Exporter<ScriptedSource> {
        Exporter::new(
            ScriptedSource::new(bodies),
            Arc::new(CoinMetrics::new().unwrap()),
        )
    }

    fn balance(exporter: &Exporter<ScriptedSource>, coin: &str) -> f64 {
        exporter.metrics().balance().with_label_values(&[coin]).get()
    }

    #[tokio::test]
    async fn test_poll_sets_gauges() {
        let exporter = exporter(&[BTC]);
        assert_eq!(exporter.poll_once().await.unwrap(), 1);

        let metrics = exporter.metrics();
        assert_eq!(metrics.balance().with_label_values(&["BTC"]).get(), 1.5);
        assert_eq!(metrics.aud().with_label_values(&["BTC"]).get(), 90000.25);
        assert_eq!(metrics.rate().with_label_values(&["BTC"]).get(), 60000.1);
    }

    #[tokio::test]
    async fn test_poll_twice_is_idempotent() {
        let exporter = exporter(&[BTC, BTC]);
        exporter.poll_once().await.unwrap();
        let first = exporter.metrics().render().unwrap();
        exporter.poll_once().await.unwrap();

        assert_eq!(exporter.metrics().render().unwrap(), first);
    }

    #[tokio::test]
    async fn test_new_coins_picked_up_and_absent_coins_retained() {
        let exporter = exporter(&[BTC_ETH, BTC]);
        exporter.poll_once().await.unwrap();
        assert_eq!(balance(&exporter, "ETH"), 3.0);

        exporter.poll_once().await.unwrap();
        assert_eq!(balance(&exporter, "BTC"), 1.5);
        assert_eq!(balance(&exporter, "ETH"), 3.0);
    }

    #[tokio::test]
    async fn test_not_ok_status_does_not_block_first_poll() {
        let exporter = exporter(&[NOT_OK]);
        assert!(!exporter.check_status().await.unwrap());

        exporter.poll_once().await.unwrap();
        assert_eq!(balance(&exporter, "BTC"), 1.5);
    }

    #[tokio::test]
    async fn test_missing_balances_fails_without_touching_gauges() {
        let exporter = exporter(&[BTC, BROKEN]);
        exporter.poll_once().await.unwrap();
        let before = exporter.metrics().render().unwrap();

        assert!(matches!(
            exporter.poll_once().await,
            Err(ExporterError::MissingBalances { .. })
        ));
        assert_eq!(exporter.metrics().render().unwrap(), before);
    }

    #[tokio::test]
    async fn test_bad_value_rejects_whole_response() {
        let exporter = exporter(&[
            r#"{"status":"ok","balances":[{"BTC":{"balance":7}},{"ETH":{"balance":"n/a"}}]}"#,
        ]);

        assert!(matches!(
            exporter.poll_once().await,
            Err(ExporterError::InvalidNumber { .. })
        ));
        assert!(exporter.metrics().render().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exit_policy_returns_error() {
        let exporter = exporter(&[BTC, BROKEN]);

        let result = exporter
            .run(Duration::from_secs(10), FailurePolicy::Exit)
            .await;

        assert!(matches!(result, Err(ExporterError::MissingBalances { .. })));
        assert_eq!(balance(&exporter, "BTC"), 1.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_skip_policy_keeps_polling() {
        let exporter = exporter(&[BROKEN, BTC_ETH]);

        let result = tokio::time::timeout(
            Duration::from_secs(35),
            exporter.run(Duration::from_secs(10), FailurePolicy::Skip),
        )
        .await;

        assert!(result.is_err(), "skip policy must not end the loop");
        assert_eq!(balance(&exporter, "ETH"), 3.0);
    }
}
