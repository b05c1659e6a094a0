//! `Analyzer` (spec §4.3): judges a segment against a single hypothesis,
//! optionally grounded in reference text fetched by the `Crawler`/reference
//! cache (C6) when the caller asked for a full-reference analysis.

use crate::retry::{with_retry, AdapterError};
use async_trait::async_trait;
use serde::Deserialize;
use sn_common::enums::Verdict;

#[derive(Debug, Clone)]
pub struct AnalyzeRequest<'a> {
    pub segment_text: &'a str,
    pub hypothesis_text: &'a str,
    pub description: Option<&'a str>,
    pub reference_text: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct AnalyzeResult {
    pub verdict: Verdict,
    pub analysis_text: String,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, req: AnalyzeRequest<'_>) -> Result<AnalyzeResult, AdapterError>;
}

const SYSTEM_PROMPT: &str = "You are a research assistant judging whether a passage confirms, \
refutes, nuances, or is irrelevant to a hypothesis. When reference material is supplied, ground \
your judgement in it. Respond with strict JSON: {\"verdict\": \"confirms\"|\"refutes\"|\"nuances\"| \
\"irrelevant\", \"analysis_text\": string}.";

#[derive(Deserialize)]
struct AnalyzeResponse {
    verdict: Verdict,
    analysis_text: String,
}

/// Chat-completion-backed `Analyzer`, JSON-mode.
pub struct OpenAiAnalyzer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiAnalyzer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: crate::http::client(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Analyzer for OpenAiAnalyzer {
    async fn analyze(&self, req: AnalyzeRequest<'_>) -> Result<AnalyzeResult, AdapterError> {
        let url = format!("{}/chat/completions", self.base_url);
        let user_prompt = serde_json::json!({
            "segment_text": req.segment_text,
            "hypothesis_text": req.hypothesis_text,
            "description": req.description,
            "reference_text": req.reference_text,
        });

        let body = serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt.to_string() },
            ],
        });

        let parsed: AnalyzeResponse = with_retry("openai_analyze", || async {
            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(crate::http::map_reqwest_err)?;
            let resp = crate::http::check_status(resp).await?;
            let json: serde_json::Value = resp.json().await.map_err(crate::http::map_reqwest_err)?;
            let content = json["choices"][0]["message"]["content"].as_str().unwrap_or("{}");
            serde_json::from_str(content)
                .map_err(|e| AdapterError::BadRequest(format!("malformed analyzer JSON: {e}")))
        })
        .await?;

        Ok(AnalyzeResult { verdict: parsed.verdict, analysis_text: parsed.analysis_text })
    }
}
