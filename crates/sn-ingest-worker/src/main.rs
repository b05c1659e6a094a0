//! sn-ingest-worker — polls `ingestion_request` and turns RSS/podcast
//! sources into `document` rows.

use secrecy::ExposeSecret;
use sn_adapters::ingestor::{Ingestor, PodcastIngestor, RssIngestor};
use sn_config::AppConfig;
use sn_db::PgStore;
use sn_queue::PgQueue;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    sn_supervisor::logging::init_tracing(&config.log_filter);
    let _metrics = sn_supervisor::metrics::install_recorder();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sn-ingest-worker starting up");

    let pool = sn_db::connect_and_migrate(config.database_url.expose_secret()).await?;
    let store = Arc::new(PgStore::new(pool.clone()));
    let queue = Arc::new(PgQueue::new(pool));

    let rss: Arc<dyn Ingestor> = Arc::new(RssIngestor::new());
    let podcast: Arc<dyn Ingestor> = Arc::new(PodcastIngestor::new());

    let shutdown = sn_supervisor::shutdown::shutdown_signal();

    sn_supervisor::poll_loop::run_poll_loop("ingest-worker", config.poll_interval, shutdown, || {
        let store = store.clone();
        let queue = queue.clone();
        let rss = rss.clone();
        let podcast = podcast.clone();
        async move {
            match sn_ingest_worker::process_next_job(store.as_ref(), queue.as_ref(), &rss, &podcast).await {
                Ok(claimed) => {
                    sn_supervisor::metrics::record_queue_claim("ingestion", claimed);
                }
                Err(e) => {
                    tracing::error!(error = %e, "ingestion poll iteration failed");
                }
            }
        }
    })
    .await;

    Ok(())
}
