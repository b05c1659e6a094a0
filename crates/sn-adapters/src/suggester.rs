//! `Suggester` (spec §4.3): given a segment's text and the standing
//! hypothesis list, proposes hypotheses to check it against — reusing an
//! existing one when confident, otherwise generating a new candidate.

use crate::retry::{with_retry, AdapterError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sn_common::enums::SuggestionSource;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ExistingHypothesis {
    pub id: Uuid,
    pub text: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisSuggestion {
    pub hypothesis_id: Option<Uuid>,
    pub hypothesis_text: String,
    pub description: Option<String>,
    pub source: SuggestionSource,
}

#[async_trait]
pub trait Suggester: Send + Sync {
    async fn suggest_hypotheses(
        &self,
        segment_text: &str,
        existing_hypotheses: &[ExistingHypothesis],
    ) -> Result<Vec<HypothesisSuggestion>, AdapterError>;
}

const SYSTEM_PROMPT: &str = "You are a research assistant. Given a passage of prose and a list \
of existing hypotheses, propose hypotheses the passage bears on. Reuse an existing hypothesis id \
only when you are highly confident it is the same claim; otherwise propose a new one with no id. \
Respond with strict JSON: {\"suggestions\": [{\"hypothesis_id\": string|null, \"hypothesis_text\": \
string, \"description\": string|null, \"source\": \"existing\"|\"generated\"}]}.";

#[derive(Deserialize)]
struct SuggestResponse {
    suggestions: Vec<HypothesisSuggestion>,
}

/// Chat-completion-backed `Suggester`, JSON-mode, matching this codebase's
/// existing LLM backend calling convention (`bearer_auth` + raw completion
/// indexing, see `ferrumyx-llm::backend::OpenAiBackend`).
pub struct OpenAiSuggester {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiSuggester {
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
impl Suggester for OpenAiSuggester {
    async fn suggest_hypotheses(
        &self,
        segment_text: &str,
        existing_hypotheses: &[ExistingHypothesis],
    ) -> Result<Vec<HypothesisSuggestion>, AdapterError> {
        let url = format!("{}/chat/completions", self.base_url);
        let user_prompt = serde_json::json!({
            "segment_text": segment_text,
            "existing_hypotheses": existing_hypotheses,
        });

        let body = serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt.to_string() },
            ],
        });

        let parsed: SuggestResponse = with_retry("openai_suggest", || async {
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
                .map_err(|e| AdapterError::BadRequest(format!("malformed suggester JSON: {e}")))
        })
        .await?;

        Ok(parsed.suggestions)
    }
}
