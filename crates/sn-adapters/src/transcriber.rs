//! `Transcriber` (spec §4.3): turns an audio URL into text. Full-length runs
//! update the document's canonical text; windowed runs only append a
//! transcript asset — the worker (not this trait) decides which, based on
//! whether `start`/`end` were supplied.

use crate::retry::{with_retry, AdapterError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TranscribeRequest<'a> {
    pub audio_url: &'a str,
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
    pub model: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct TranscribeResult {
    pub text: String,
    pub metadata: serde_json::Value,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, req: TranscribeRequest<'_>) -> Result<TranscribeResult, AdapterError>;
}

/// Whisper-compatible `/v1/audio/transcriptions` (spec §4.3).
///
/// The endpoint only accepts multipart file uploads, not a URL, so this
/// downloads the audio first and re-uploads it — windowing (`start`/`end`)
/// is not supported server-side by Whisper, so it's recorded in metadata
/// only and left to the caller to trim before upload if it matters.
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: crate::http::client(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: "whisper-1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, req: TranscribeRequest<'_>) -> Result<TranscribeResult, AdapterError> {
        let model = req.model.unwrap_or(&self.model).to_string();
        let audio_url = req.audio_url.to_string();

        let bytes = with_retry("openai_transcribe_fetch_audio", || async {
            let resp = self.client.get(&audio_url).send().await.map_err(crate::http::map_reqwest_err)?;
            let resp = crate::http::check_status(resp).await?;
            resp.bytes().await.map_err(crate::http::map_reqwest_err)
        })
        .await?;

        let url = format!("{}/audio/transcriptions", self.base_url);
        let result = with_retry("openai_transcribe", || async {
            let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("audio");
            let form = reqwest::multipart::Form::new().part("file", part).text("model", model.clone());

            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .multipart(form)
                .send()
                .await
                .map_err(crate::http::map_reqwest_err)?;
            let resp = crate::http::check_status(resp).await?;
            resp.json::<WhisperResponse>().await.map_err(crate::http::map_reqwest_err)
        })
        .await?;

        Ok(TranscribeResult {
            text: result.text,
            metadata: serde_json::json!({
                "provider": "openai",
                "model": model,
                "start_seconds": req.start_seconds,
                "end_seconds": req.end_seconds,
            }),
        })
    }
}

#[derive(Deserialize)]
struct AssemblySubmitResponse {
    id: String,
}

#[derive(Deserialize)]
struct AssemblyPollResponse {
    status: String,
    text: Option<String>,
    error: Option<String>,
}

/// AssemblyAI's submit-then-poll transcript API (spec §4.3). Unlike Whisper
/// this accepts a plain `audio_url`, so no download/re-upload round trip.
pub struct AssemblyTranscriber {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl AssemblyTranscriber {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: crate::http::client(),
            base_url: "https://api.assemblyai.com/v2".to_string(),
            api_key: api_key.into(),
            poll_interval: Duration::from_secs(3),
            max_polls: 100,
        }
    }
}

#[async_trait]
impl Transcriber for AssemblyTranscriber {
    async fn transcribe(&self, req: TranscribeRequest<'_>) -> Result<TranscribeResult, AdapterError> {
        let submit_url = format!("{}/transcript", self.base_url);
        let audio_url = req.audio_url.to_string();

        let submission = with_retry("assembly_submit", || async {
            let resp = self
                .client
                .post(&submit_url)
                .header("authorization", &self.api_key)
                .json(&serde_json::json!({ "audio_url": audio_url }))
                .send()
                .await
                .map_err(crate::http::map_reqwest_err)?;
            let resp = crate::http::check_status(resp).await?;
            resp.json::<AssemblySubmitResponse>().await.map_err(crate::http::map_reqwest_err)
        })
        .await?;

        let poll_url = format!("{}/transcript/{}", self.base_url, submission.id);
        for _ in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            let poll: AssemblyPollResponse = with_retry("assembly_poll", || async {
                let resp = self
                    .client
                    .get(&poll_url)
                    .header("authorization", &self.api_key)
                    .send()
                    .await
                    .map_err(crate::http::map_reqwest_err)?;
                let resp = crate::http::check_status(resp).await?;
                resp.json().await.map_err(crate::http::map_reqwest_err)
            })
            .await?;

            match poll.status.as_str() {
                "completed" => {
                    return Ok(TranscribeResult {
                        text: poll.text.unwrap_or_default(),
                        metadata: serde_json::json!({
                            "provider": "assembly",
                            "transcript_id": submission.id,
                            "start_seconds": req.start_seconds,
                            "end_seconds": req.end_seconds,
                        }),
                    });
                }
                "error" => {
                    return Err(AdapterError::Transient(
                        poll.error.unwrap_or_else(|| "assembly transcription failed".to_string()),
                    ));
                }
                _ => continue,
            }
        }

        Err(AdapterError::Timeout("assembly transcript never completed".to_string()))
    }
}
