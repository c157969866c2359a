use super::prompt::{parse_string_array, standalone_prompt};
use super::{send_json, TranslationBackend};
use crate::error::{GlossaError, GlossaResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Alibaba Bailian (DashScope) application completion backend
#[derive(Debug, Clone)]
pub struct BailianBackend {
    client: reqwest::Client,
    api_key: String,
    app_id: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    input: CompletionInput,
}

#[derive(Debug, Serialize)]
struct CompletionInput {
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    output: Option<CompletionOutput>,
}

#[derive(Debug, Deserialize)]
struct CompletionOutput {
    text: Option<String>,
}

impl BailianBackend {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        app_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            app_id: app_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/v1/apps/{}/completion", self.base_url, self.app_id)
    }
}

#[async_trait]
impl TranslationBackend for BailianBackend {
    fn name(&self) -> &'static str {
        "Bailian"
    }

    async fn translate(&self, texts: &[String], target_language: &str) -> GlossaResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CompletionRequest {
            input: CompletionInput {
                prompt: standalone_prompt(texts, target_language)?,
            },
        };

        debug!(app_id = %self.app_id, texts = texts.len(), "calling Bailian");
        let builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request);
        let response: CompletionResponse = send_json(builder, self.name()).await?;

        let reply = response
            .output
            .and_then(|output| output.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                GlossaError::Backend("Bailian response has no 'output.text' field".to_string())
            })?;

        parse_string_array(&reply, texts.len(), self.name())
    }
}
