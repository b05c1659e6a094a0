//! sn-transcribe-worker — polls `transcription_request` and turns audio
//! assets into transcript text via the configured provider.

use secrecy::ExposeSecret;
use sn_adapters::transcriber::{AssemblyTranscriber, OpenAiTranscriber, Transcriber};
use sn_config::AppConfig;
use sn_db::PgStore;
use sn_queue::PgQueue;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    sn_supervisor::logging::init_tracing(&config.log_filter);
    let _metrics = sn_supervisor::metrics::install_recorder();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sn-transcribe-worker starting up");

    let pool = sn_db::connect_and_migrate(config.database_url.expose_secret()).await?;
    let store = Arc::new(PgStore::new(pool.clone()));
    let queue = Arc::new(PgQueue::new(pool));

    // Providers are only required once a job actually asks for them — a
    // deployment that only ever transcribes via AssemblyAI need not set
    // `OPENAI_API_KEY` (spec §6).
    let openai: Arc<dyn Transcriber> = Arc::new(OpenAiTranscriber::new(
        config.require_openai_key().map(|k| k.expose_secret().to_string()).unwrap_or_default(),
    ));
    let assembly: Arc<dyn Transcriber> = Arc::new(AssemblyTranscriber::new(
        config.require_assembly_key().map(|k| k.expose_secret().to_string()).unwrap_or_default(),
    ));

    let shutdown = sn_supervisor::shutdown::shutdown_signal();

    sn_supervisor::poll_loop::run_poll_loop("transcribe-worker", config.poll_interval, shutdown, || {
        let store = store.clone();
        let queue = queue.clone();
        let openai = openai.clone();
        let assembly = assembly.clone();
        async move {
            match sn_transcribe_worker::process_next_job(store.as_ref(), queue.as_ref(), &openai, &assembly).await {
                Ok(claimed) => {
                    sn_supervisor::metrics::record_queue_claim("transcription", claimed);
                }
                Err(e) => {
                    tracing::error!(error = %e, "transcription poll iteration failed");
                }
            }
        }
    })
    .await;

    Ok(())
}
