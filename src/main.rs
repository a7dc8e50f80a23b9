use std::sync::Arc;

use coinspot_exporter::coinspot::CoinSpotClient;
use coinspot_exporter::config::ExporterConfig;
use coinspot_exporter::exporter::Exporter;
use coinspot_exporter::metrics::CoinMetrics;
use coinspot_exporter::server;
use coinspot_exporter::vault::VaultCredentials;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coinspot_exporter=info,tower_http=info".into()),
        )
        .init();

    let config = ExporterConfig::from_env()?;
    info!(?config, "Configuration loaded");

    // Gauges exist before anything can write to them.
    let metrics = Arc::new(CoinMetrics::new()?);

    let credentials = VaultCredentials::fetch(&config.vault, &config.api_key).await;
    let client = CoinSpotClient::builder()
        .base_url(&config.base_url)
        .credentials(Arc::new(credentials))
        .build()?;
    let exporter = Arc::new(Exporter::new(client, metrics.clone()));

    exporter.check_status().await?;
    let coins = exporter.poll_once().await?;
    info!(coins, "Initial poll complete");

    let scheduler = {
        let exporter = exporter.clone();
        let period = config.scrape_interval;
        let policy = config.on_poll_error;
        tokio::spawn(async move { exporter.run(period, policy).await })
    };

    tokio::select! {
        result = server::serve(config.listen_addr(), metrics) => {
            if let Err(e) = &result {
                error!(error = %e, "Metrics server failed");
            }
            result?;
        }
        joined = scheduler => {
            if let Ok(Err(e)) = &joined {
                error!(error = %e, "Polling stopped");
            }
            joined??;
        }
    }

    Ok(())
}
