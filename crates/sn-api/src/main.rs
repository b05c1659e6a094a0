//! sn-api — the HTTP server (spec §6).

use secrecy::ExposeSecret;
use sn_adapters::{HttpCrawler, OpenAiAnalyzer, OpenAiSuggester};
use sn_api::state::AppState;
use sn_config::AppConfig;
use sn_db::PgStore;
use sn_evidence::Engine;
use sn_queue::PgQueue;
use std::net::SocketAddr;
use std::sync::Arc;

const SUGGESTER_MODEL: &str = "gpt-4o-mini";
const ANALYZER_MODEL: &str = "gpt-4o-mini";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    sn_supervisor::logging::init_tracing(&config.log_filter);
    let metrics_handle = sn_supervisor::metrics::install_recorder();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sn-api starting up");

    let pool = sn_db::connect_and_migrate(config.database_url.expose_secret()).await?;
    let store = Arc::new(PgStore::new(pool.clone()));
    let queue = Arc::new(PgQueue::new(pool));

    let openai_key = config.require_openai_key()?.expose_secret().to_string();
    let suggester = Arc::new(OpenAiSuggester::new(openai_key.clone(), SUGGESTER_MODEL));
    let analyzer = Arc::new(OpenAiAnalyzer::new(openai_key, ANALYZER_MODEL));
    let crawler = Arc::new(HttpCrawler::new());

    let engine = Engine::new(store.clone(), suggester, analyzer, crawler);

    let state = AppState { store, queue, engine, config: config.clone(), metrics_handle };
    let app = sn_api::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!(%addr, "sn-api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let mut shutdown = sn_supervisor::shutdown_signal();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    Ok(())
}
